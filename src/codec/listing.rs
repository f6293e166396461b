//! Hand-written track lists.
//!
//! Some sources never had a page to scrape. Their tracks are kept as TOML:
//!
//! ```toml
//! [[tracks]]
//! title = "Taureg"
//! references = ["Sburban Jungle", "Beatdown"]
//! ```
//!
//! Entries still go through the normalizer and the same reference filters as scraped rows.

use serde::{Deserialize, Serialize};

use super::{Effect, Extraction, OnBlankTitle, Scan, TrackExtractor};
use crate::{error::NsndError, normalize::TitleNormalizer, properties::Track};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListingExtractor;

impl TrackExtractor for ListingExtractor {
    fn name(&self) -> &'static str {
        "listing"
    }

    fn extract(
        &mut self,
        markup: &str,
        normalizer: &dyn TitleNormalizer,
    ) -> Result<Extraction, NsndError> {
        let listing: Listing = toml::from_str(markup)?;
        let mut scan = Scan::new(self.name(), normalizer);
        for (index, track) in listing.tracks.into_iter().enumerate() {
            let mut effects = vec![
                Effect::BeginRecord,
                Effect::BeginTitle,
                Effect::AppendText(track.title),
                Effect::FinishTitle(OnBlankTitle::Drop),
            ];
            for reference in track.references {
                effects.push(Effect::BeginReference);
                effects.push(Effect::AppendText(reference));
                effects.push(Effect::FinishReference);
            }
            effects.push(Effect::Emit);
            scan.apply(effects, &format!("tracks[{index}]"))?;
        }
        Ok(scan.finish(true, &"end of listing"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Identity, TitleTables};
    use test_log::test;

    #[test]
    fn test_listing_normalizes_and_filters() {
        let tables = TitleTables::default().with_rename("Flare (Cascade Cut)", "Flare");
        let extraction = ListingExtractor
            .extract(
                r#"
                [[tracks]]
                title = "Ignition"
                references = ["Flare (Cascade Cut)", "MeGaLoVania", "", "N/A"]

                [[tracks]]
                title = "Tales of an Unknown Universe"

                [[tracks]]
                title = "  "
                "#,
                &tables,
            )
            .unwrap();
        assert!(extraction.is_complete());
        assert_eq!(
            extraction.tracks,
            vec![
                Track::with_references("Ignition", ["Flare", "MeGaLoVania"]),
                Track::new("Tales of an Unknown Universe"),
            ]
        );
    }

    #[test]
    fn test_untitled_entry_is_dropped_with_its_references() {
        let extraction = ListingExtractor
            .extract(
                r#"
                [[tracks]]
                title = ""
                references = ["Doctor"]

                [[tracks]]
                title = "Taureg"
                references = ["Beatdown"]
                "#,
                &Identity,
            )
            .unwrap();
        assert_eq!(
            extraction.tracks,
            vec![Track::with_references("Taureg", ["Beatdown"])]
        );
    }

    #[test]
    fn test_invalid_toml() {
        let err = ListingExtractor
            .extract("[[tracks]\ntitle = 1", &Identity)
            .unwrap_err();
        assert!(matches!(err, NsndError::Serialization(_)));
    }
}
