//! # nsndswap
//!
//! Scrapes hand-maintained, inconsistently-formatted HTML tables of music references into a
//! deduplicated directed reference graph, and writes that graph out for graph tools and people.
//!
//! The name comes from the "nsnd" reference tables the tool was written against: pages where each
//! row is a song and the trailing cells list what it remixes, samples or covers.
//!
//! ## Overview
//!
//! Data flows one way:
//!
//! ```text
//! markup -> tag stream -> extractor -> Vec<Track> -> Web::append -> Web -> snapshot -> exports
//! ```
//!
//! - **[`markup`]**: a forgiving start-tag/end-tag/text tokenizer. Not a DOM parser.
//! - **[`codec`]**: one state machine per source layout ([`codec::SourceKind`]). Each turns a
//!   page into ordered [`properties::Track`]s, recovering from the malformations its source is
//!   known for (missing markers, split cells, rows that continue the previous record).
//! - **[`normalize`]**: title corrections and benchmark-driven disambiguation, called once per
//!   finished title or reference.
//! - **[`web`]**: the reference graph, its per-append duplicate policy, per-node snapshots and
//!   the export formats.
//! - **[`config`]**: the TOML manifest tying sources, normalizer tables and webs together.
//!
//! ## Quick Start
//!
//! ### Extracting one page
//!
//! ```rust
//! use nsndswap::{codec::SourceKind, normalize::Identity};
//!
//! # fn main() -> Result<(), nsndswap::NsndError> {
//! let page = r#"<table>
//!     <tr><td class="hasquotes">Sburban Jungle</td><td>Beatdown</td><td>Doctor</td></tr>
//! </table></body>"#;
//! let extraction = SourceKind::Makin.extractor().extract(page, &Identity)?;
//! assert!(extraction.is_complete());
//! for track in extraction.tracks.iter() {
//!     println!("{track}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Building a web
//!
//! ```rust
//! use nsndswap::{
//!     properties::Track,
//!     web::{DuplicatePolicy, Web},
//! };
//!
//! # fn main() -> Result<(), nsndswap::NsndError> {
//! let mut web = Web::new();
//! web.append(
//!     &[Track::with_references("A", ["B"]), Track::new("B")],
//!     &DuplicatePolicy::new(),
//! )?;
//! // A second source disagrees about "A"; let it win.
//! web.append(
//!     &[Track::with_references("A", ["C"])],
//!     &DuplicatePolicy::new().overriding(["A"]),
//! )?;
//! assert_eq!(web.node_count(), 3);
//! assert_eq!(web.edge_count(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ### Running a manifest
//!
//! ```rust,no_run
//! use nsndswap::config::Config;
//!
//! # fn main() -> Result<(), nsndswap::NsndError> {
//! let config = Config::from_path("config/nsndswap.toml")?;
//! for report in config.run()? {
//!     println!("{}: {} nodes, {} edges", report.name, report.nodes, report.edges);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Extraction is permissive, with two exceptions
//!
//! Markup an extractor has no transition for is ignored. Running out of input before the
//! extractor reaches its end-of-listing marker is not fatal either: the active record is flushed
//! and the [`codec::Extraction`] carries an [`codec::ExtractDiagnostic::Incomplete`]. What is
//! fatal is scanning references for a record with no title
//! ([`NsndError::ReferenceBeforeTitle`]), and a title the normalizer refuses to guess about
//! ([`NsndError::ForbiddenTitle`]). Both mean the document was misread upstream.
//!
//! ### Duplicate subjects
//!
//! Two sources often describe the same track. [`web::Web::append`] refuses to merge them
//! silently: a subject scanned twice must be named in the append's
//! [`web::DuplicatePolicy`], either to override the earlier references or to skip the new ones.
//! Appends are all or nothing.
//!
//! ### Stable layout
//!
//! Node color and position are drawn from a generator seeded by the title's SHA-256, so the same
//! track sits in the same place in every export of every web.

pub mod codec;
pub mod config;
pub mod error;
pub mod markup;
pub mod normalize;
pub mod properties;
#[cfg(test)]
mod tests;
pub mod web;

pub use error::*;
