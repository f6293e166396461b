//! Track extraction from tabular source pages.
//!
//! Every source lays its songs out as table rows, one subject title followed by the cells it
//! references, but no two sources agree on the details. Each layout gets its own
//! [TrackExtractor]: a closed state enum and a pure `transition(state, flags, event)` function
//! returning the next state plus a list of [Effect]s. The effects are the only way a machine
//! touches its output, and they are interpreted here, by [Scan], so that every layout shares one
//! definition of what "begin a record", "finish a reference" or "resume the previous record"
//! means.
//!
//! ## Built-in layouts
//!
//! - [makin::MakinExtractor] - `hasquotes`/`original` title cells, an unreleased section and a
//!   trailing single-cell section of songs from outside the canon.
//! - [cookie::CookieExtractor] - one table per album, `no-sep` continuation rows, blank-title
//!   continuation rows, and an optional album art column.
//! - [xzaz::XzazExtractor] - an early single-section layout ended by a rule.
//! - [listing::ListingExtractor] - a hand-written TOML list for sources with no page at all.
//!
//! ## Resumption
//!
//! Records can continue on the following row. Finished records go to a [RecordLog], and only the
//! most recently emitted one can be reopened. A record that was dropped (because its title came
//! out empty) leaves nothing to reopen, so a continuation row can never attach to an older
//! record by accident.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Formatter},
    mem,
    str::FromStr,
};

use crate::{
    error::NsndError,
    markup::{tokenize, MarkupEvent},
    normalize::{TitleContext, TitleNormalizer},
    properties::{Benchmark, Track},
};

pub mod cookie;
pub mod diagnostic;
pub mod listing;
pub mod makin;
pub mod xzaz;

pub use diagnostic::ExtractDiagnostic;

/// The literal a source writes in a reference cell that has nothing in it.
pub const NOT_APPLICABLE: &str = "N/A";

/// Reference cells that point at another source's list instead of naming a track.
pub const CROSS_REFERENCE_PLACEHOLDERS: [&str; 1] = ["[see CANWC list]"];

/// The outcome of scanning one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub tracks: Vec<Track>,
    pub diagnostics: Vec<ExtractDiagnostic>,
    /// The benchmark the normalizer had reached when the scan stopped.
    pub benchmark: Benchmark,
}

impl Extraction {
    /// False when the markup ran out before the extractor saw the end of the listing.
    pub fn is_complete(&self) -> bool {
        !self.diagnostics.iter().any(ExtractDiagnostic::is_incomplete)
    }
}

pub trait TrackExtractor {
    fn name(&self) -> &'static str;

    /// Scans `markup` and returns its tracks in document order. Every finished title and
    /// reference goes through `normalizer` exactly once.
    fn extract(
        &mut self,
        markup: &str,
        normalizer: &dyn TitleNormalizer,
    ) -> Result<Extraction, NsndError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Makin,
    Cookie,
    Xzaz,
    Listing,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Makin,
        SourceKind::Cookie,
        SourceKind::Xzaz,
        SourceKind::Listing,
    ];

    pub fn extractor(&self) -> Box<dyn TrackExtractor> {
        match self {
            SourceKind::Makin => Box::new(makin::MakinExtractor),
            SourceKind::Cookie => Box::new(cookie::CookieExtractor),
            SourceKind::Xzaz => Box::new(xzaz::XzazExtractor),
            SourceKind::Listing => Box::new(listing::ListingExtractor),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Makin => "makin",
            SourceKind::Cookie => "cookie",
            SourceKind::Xzaz => "xzaz",
            SourceKind::Listing => "listing",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = NsndError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                NsndError::Config(format!(
                    "Unknown source kind \"{s}\", expected one of makin, cookie, xzaz, listing"
                ))
            })
    }
}

/// Finished records in emission order. Only the last one may be taken back.
#[derive(Debug, Default)]
pub struct RecordLog {
    tracks: Vec<Track>,
    reopenable: bool,
}

impl RecordLog {
    /// Appends a finished record. Null records are dropped, and leave nothing to reopen.
    pub fn emit(&mut self, track: Track) {
        if track.is_null() {
            if !track.references.is_empty() {
                tracing::debug!(
                    "Dropping a record with no title and {} references",
                    track.references.len()
                );
            }
            self.reopenable = false;
            return;
        }
        self.tracks.push(track);
        self.reopenable = true;
    }

    /// Takes back the record emitted immediately before this call, if there is one.
    pub fn reopen(&mut self) -> Option<Track> {
        if !self.reopenable {
            return None;
        }
        self.reopenable = false;
        self.tracks.pop()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

/// Source-specific switches that effects can flip and transitions can read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// A classless cell at the start of a row continues the previous record.
    pub allow_resume: bool,
    /// The current album table has an album art column to skip.
    pub album_has_art: bool,
    pub benchmark: Benchmark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    AllowResume,
    AlbumHasArt,
}

/// What to do with a title cell that finishes empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnBlankTitle {
    /// Drop the record, and any references scanned for it before the next emit.
    Drop,
    /// The row continues the previous record.
    Resume,
    /// References are about to be scanned for it, which is a structural error.
    Fail,
}

/// The side effects a transition can request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Remember the class attribute of the cell being entered.
    SetClass(String),
    /// Emit the active record, if any, and start a new empty one.
    BeginRecord,
    BeginTitle,
    AppendText(String),
    FinishTitle(OnBlankTitle),
    BeginReference,
    FinishReference,
    /// Move the active record, if any, to the log.
    Emit,
    /// Make the most recently emitted record active again.
    Resume,
    SetBenchmark(Benchmark),
    Set(Flag, bool),
    Note(ExtractDiagnostic),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Title,
    Reference,
}

/// The interpreter for [Effect]s: holds the active record, the current cell's text, and the log.
pub struct Scan<'n> {
    source_name: &'static str,
    normalizer: &'n dyn TitleNormalizer,
    flags: Flags,
    log: RecordLog,
    active: Option<Track>,
    cell: Option<Cell>,
    buffer: String,
    class: String,
    /// The active record was dropped; its reference cells are swallowed until the next emit.
    discarding: bool,
    diagnostics: Vec<ExtractDiagnostic>,
}

impl<'n> Scan<'n> {
    pub fn new(source_name: &'static str, normalizer: &'n dyn TitleNormalizer) -> Self {
        Scan {
            source_name,
            normalizer,
            flags: Flags::default(),
            log: RecordLog::default(),
            active: None,
            cell: None,
            buffer: String::new(),
            class: String::new(),
            discarding: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    /// Applies `effects` in order. `state` is only used to describe failures.
    pub fn apply<S: Debug>(&mut self, effects: Vec<Effect>, state: &S) -> Result<(), NsndError> {
        for effect in effects {
            self.apply_one(effect, state)?;
        }
        Ok(())
    }

    fn apply_one<S: Debug>(&mut self, effect: Effect, state: &S) -> Result<(), NsndError> {
        match effect {
            Effect::SetClass(class) => self.class = class,
            Effect::BeginRecord => {
                self.emit_active();
                self.active = Some(Track::default());
                self.cell = None;
                self.buffer.clear();
            }
            Effect::BeginTitle => self.begin_cell(Cell::Title),
            Effect::AppendText(text) => match self.cell {
                Some(Cell::Title) => self.buffer.push_str(&text),
                Some(Cell::Reference) if self.discarding => {}
                Some(Cell::Reference) => {
                    if !self.has_title() {
                        return Err(self.reference_before_title(state));
                    }
                    self.buffer.push_str(&text);
                }
                None => {}
            },
            Effect::FinishTitle(on_blank) => self.finish_title(on_blank, state)?,
            Effect::BeginReference => self.begin_cell(Cell::Reference),
            Effect::FinishReference => self.finish_reference(state)?,
            Effect::Emit => self.emit_active(),
            Effect::Resume => self.resume(state),
            Effect::SetBenchmark(benchmark) => {
                tracing::info!("Entering section {}", benchmark);
                self.flags.benchmark = benchmark;
            }
            Effect::Set(Flag::AllowResume, value) => self.flags.allow_resume = value,
            Effect::Set(Flag::AlbumHasArt, value) => self.flags.album_has_art = value,
            Effect::Note(diagnostic) => {
                tracing::warn!("[{}] {}", self.source_name, diagnostic);
                self.diagnostics.push(diagnostic);
            }
        }
        Ok(())
    }

    fn begin_cell(&mut self, cell: Cell) {
        self.cell = Some(cell);
        self.buffer.clear();
    }

    fn has_title(&self) -> bool {
        self.active.as_ref().is_some_and(|track| !track.is_null())
    }

    fn reference_before_title<S: Debug>(&self, state: &S) -> NsndError {
        tracing::error!(
            "[{}] Tried to scan references for a track with no title",
            self.source_name
        );
        NsndError::ReferenceBeforeTitle {
            source_name: self.source_name.to_string(),
            state: format!("{state:?}"),
        }
    }

    fn emit_active(&mut self) {
        self.discarding = false;
        if let Some(track) = self.active.take() {
            self.log.emit(track);
        }
    }

    fn resume<S: Debug>(&mut self, state: &S) {
        self.emit_active();
        match self.log.reopen() {
            Some(track) => {
                tracing::debug!("Resuming \"{}\"", track.title);
                self.active = Some(track);
            }
            None => {
                let diagnostic = ExtractDiagnostic::NothingToResume {
                    state: format!("{state:?}"),
                };
                tracing::warn!("[{}] {}", self.source_name, diagnostic);
                self.diagnostics.push(diagnostic);
                self.discarding = true;
            }
        }
    }

    fn finish_title<S: Debug>(
        &mut self,
        on_blank: OnBlankTitle,
        state: &S,
    ) -> Result<(), NsndError> {
        let raw = mem::take(&mut self.buffer);
        self.cell = None;
        if raw.trim().is_empty() {
            return match on_blank {
                OnBlankTitle::Drop => {
                    self.drop_active();
                    Ok(())
                }
                OnBlankTitle::Fail => Err(self.reference_before_title(state)),
                OnBlankTitle::Resume => {
                    // The blank record never held anything, so discard it rather than emit it.
                    self.active = None;
                    self.resume(state);
                    Ok(())
                }
            };
        }
        let normalized = self.normalizer.normalize(
            &raw,
            &TitleContext::title(&self.class),
            self.flags.benchmark,
        )?;
        self.flags.benchmark = normalized.benchmark;
        if normalized.title.is_empty() {
            tracing::debug!("Title {:?} normalized to nothing, dropping it", raw.trim());
            self.drop_active();
            return Ok(());
        }
        tracing::debug!("Scanning \"{}\"", normalized.title);
        self.active.get_or_insert_with(Track::default).title = normalized.title;
        Ok(())
    }

    /// Drops the active record. Emitting the null record keeps a later resume from reaching past
    /// it to an unrelated one.
    fn drop_active(&mut self) {
        self.active = Some(Track::default());
        self.discarding = true;
    }

    fn finish_reference<S: Debug>(&mut self, state: &S) -> Result<(), NsndError> {
        let raw = mem::take(&mut self.buffer);
        self.cell = None;
        let raw = raw.trim();
        if self.discarding || raw.is_empty() || raw == NOT_APPLICABLE {
            return Ok(());
        }
        let Some(active) = self.active.as_ref().filter(|track| !track.is_null()) else {
            return Err(self.reference_before_title(state));
        };
        if let Some(placeholder) = CROSS_REFERENCE_PLACEHOLDERS.iter().find(|p| **p == raw) {
            let diagnostic = ExtractDiagnostic::Placeholder {
                owner: active.title.clone(),
                placeholder: placeholder.to_string(),
            };
            tracing::debug!("[{}] {}", self.source_name, diagnostic);
            self.diagnostics.push(diagnostic);
            return Ok(());
        }
        let normalized = self.normalizer.normalize(
            raw,
            &TitleContext::reference(&active.title, &self.class),
            self.flags.benchmark,
        )?;
        self.flags.benchmark = normalized.benchmark;
        if normalized.title.is_empty() {
            return Ok(());
        }
        if let Some(active) = self.active.as_mut() {
            tracing::debug!(
                "Got \"{}\" referencing \"{}\"",
                active.title,
                normalized.title
            );
            active.references.push(normalized.title);
        }
        Ok(())
    }

    /// Flushes the active record and packages the result. `done` is whether the machine reached
    /// its terminal state.
    pub fn finish<S: Debug>(mut self, done: bool, state: &S) -> Extraction {
        self.emit_active();
        if !done {
            let diagnostic = ExtractDiagnostic::Incomplete {
                state: format!("{state:?}"),
            };
            tracing::warn!(
                "[{}] {}; the track list may be truncated",
                self.source_name,
                diagnostic
            );
            self.diagnostics.push(diagnostic);
        }
        tracing::info!(
            "[{}] Extracted {} tracks",
            self.source_name,
            self.log.len()
        );
        Extraction {
            tracks: self.log.into_tracks(),
            diagnostics: self.diagnostics,
            benchmark: self.flags.benchmark,
        }
    }
}

/// Runs a layout's transition function over `markup` and interprets its effects.
pub(crate) fn drive<S, F>(
    source_name: &'static str,
    markup: &str,
    normalizer: &dyn TitleNormalizer,
    start: S,
    done: S,
    transition: F,
) -> Result<Extraction, NsndError>
where
    S: Debug + PartialEq + Copy,
    F: Fn(S, &Flags, &MarkupEvent) -> (S, Vec<Effect>),
{
    let mut scan = Scan::new(source_name, normalizer);
    let mut state = start;
    for event in table_events(markup) {
        if state == done {
            break;
        }
        let (next, effects) = transition(state, scan.flags(), &event);
        scan.apply(effects, &state)?;
        state = next;
    }
    Ok(scan.finish(state == done, &state))
}

/// Removes line breaks and surrounding whitespace, as the pages were fetched with them stripped.
pub fn prepare_markup(markup: &str) -> String {
    markup.trim().replace(['\r', '\n'], "")
}

/// Tokenizes a page and makes its cell boundaries explicit. A `td` left open is closed before
/// the next cell, row or table boundary (or the end of input), and stray `</td>`s are removed.
#[tracing::instrument(skip_all)]
pub fn table_events(markup: &str) -> Vec<MarkupEvent> {
    let close_cell = || MarkupEvent::End {
        tag: "td".to_string(),
    };
    let raw = tokenize(&prepare_markup(markup));
    let mut events = Vec::with_capacity(raw.len());
    let mut in_cell = false;
    for event in raw {
        match &event {
            MarkupEvent::Start { tag, .. } if tag == "td" => {
                if in_cell {
                    events.push(close_cell());
                }
                in_cell = true;
            }
            MarkupEvent::End { tag } if tag == "td" => {
                if !in_cell {
                    continue;
                }
                in_cell = false;
            }
            MarkupEvent::Start { tag, .. } | MarkupEvent::End { tag }
                if matches!(tag.as_str(), "tr" | "table" | "body") =>
            {
                if in_cell {
                    events.push(close_cell());
                    in_cell = false;
                }
            }
            _ => {}
        }
        events.push(event);
    }
    if in_cell {
        events.push(close_cell());
    }
    events
}

/// The class attribute of a start tag, empty when absent.
pub(crate) fn class_of(event: &MarkupEvent) -> String {
    event.attr("class").unwrap_or("").to_string()
}

/// The structural cues the layouts react to. Start cues keep their event for attribute checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue<'e> {
    RowStart(&'e MarkupEvent),
    RowEnd,
    CellStart(&'e MarkupEvent),
    CellEnd,
    TableEnd,
    BodyEnd,
    Rule,
    Text(&'e str),
    Other,
}

impl<'e> Cue<'e> {
    pub fn of(event: &'e MarkupEvent) -> Self {
        match event {
            MarkupEvent::Start { tag, .. } => match tag.as_str() {
                "tr" => Cue::RowStart(event),
                "td" => Cue::CellStart(event),
                "hr" => Cue::Rule,
                _ => Cue::Other,
            },
            MarkupEvent::End { tag } => match tag.as_str() {
                "tr" => Cue::RowEnd,
                "td" => Cue::CellEnd,
                "table" => Cue::TableEnd,
                "body" => Cue::BodyEnd,
                _ => Cue::Other,
            },
            MarkupEvent::Text(text) => Cue::Text(text),
        }
    }
}
