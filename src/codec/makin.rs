//! The `hasquotes` layout.
//!
//! Subject cells carry class `hasquotes` (a track with references) or `original` (a track that
//! references nothing, whose remaining cells are ignored). A row whose first cell has no class at
//! all continues the previous `hasquotes` record. Two text sentinels switch sections: the
//! unreleased section keeps the same layout at [Benchmark::UNRELEASED], and the final section
//! lists one `nonhomestucksongname` cell per track. `</body>` ends the listing.

use super::{
    class_of, drive, Cue, Effect, Extraction, ExtractDiagnostic, Flag, Flags, OnBlankTitle,
    TrackExtractor,
};
use crate::{
    error::NsndError, markup::MarkupEvent, normalize::TitleNormalizer, properties::Benchmark,
};

pub const UNRELEASED_SENTINEL: &str = "Unreleased or removed songs";
pub const NON_HOMESTUCK_SENTINEL: &str = "Non-Homestuck songs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakinState {
    SeekingSong,
    ScanningTitle { original: bool },
    /// Inside a row naming the artist of the unreleased songs that follow.
    SkippingArtistRow,
    SeekingReference,
    ScanningReference,
    SeekingUnhomestuck,
    ScanningUnhomestuck,
    Done,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MakinExtractor;

impl TrackExtractor for MakinExtractor {
    fn name(&self) -> &'static str {
        "makin"
    }

    #[tracing::instrument(skip_all)]
    fn extract(
        &mut self,
        markup: &str,
        normalizer: &dyn TitleNormalizer,
    ) -> Result<Extraction, NsndError> {
        drive(
            self.name(),
            markup,
            normalizer,
            MakinState::SeekingSong,
            MakinState::Done,
            transition,
        )
    }
}

pub fn transition(
    state: MakinState,
    flags: &Flags,
    event: &MarkupEvent,
) -> (MakinState, Vec<Effect>) {
    use MakinState::*;

    let cue = Cue::of(event);
    match (state, cue) {
        (Done, _) => return (Done, vec![]),
        (_, Cue::BodyEnd) => return (Done, vec![Effect::Emit]),
        (_, Cue::RowStart(row)) if row.class_contains("unreleasedartist") => {
            return (SkippingArtistRow, vec![])
        }
        (_, Cue::Text(text)) if text.trim() == UNRELEASED_SENTINEL => {
            return (
                SeekingSong,
                vec![Effect::Emit, Effect::SetBenchmark(Benchmark::UNRELEASED)],
            )
        }
        (_, Cue::Text(text)) if text.trim() == NON_HOMESTUCK_SENTINEL => {
            return (
                SeekingUnhomestuck,
                vec![Effect::Emit, Effect::SetBenchmark(Benchmark::NON_HOMESTUCK)],
            )
        }
        _ => {}
    }

    match (state, cue) {
        (SeekingSong, Cue::CellStart(cell)) => song_cell(cell, flags),
        (ScanningTitle { .. } | ScanningReference | ScanningUnhomestuck, Cue::Text(text)) => {
            (state, vec![Effect::AppendText(text.to_string())])
        }
        (ScanningTitle { original: true }, Cue::CellEnd) => (
            SeekingSong,
            vec![
                Effect::FinishTitle(OnBlankTitle::Drop),
                Effect::Emit,
                Effect::Set(Flag::AllowResume, false),
            ],
        ),
        (ScanningTitle { original: false }, Cue::CellEnd) => (
            SeekingReference,
            vec![
                Effect::FinishTitle(OnBlankTitle::Fail),
                Effect::Set(Flag::AllowResume, true),
            ],
        ),
        (SeekingReference, Cue::CellStart(cell)) => (
            ScanningReference,
            vec![Effect::SetClass(class_of(cell)), Effect::BeginReference],
        ),
        (ScanningReference, Cue::CellEnd) => (SeekingReference, vec![Effect::FinishReference]),
        // A missing </tr> ends the row just the same.
        (SeekingReference, Cue::RowEnd | Cue::RowStart(_)) => {
            let mut effects = vec![Effect::Emit];
            if flags.benchmark == Benchmark::UNRELEASED {
                effects.push(Effect::Set(Flag::AllowResume, false));
            }
            (SeekingSong, effects)
        }
        (SkippingArtistRow, Cue::CellEnd) => (SeekingSong, vec![]),
        (SeekingUnhomestuck, Cue::CellStart(cell))
            if cell.class_contains("nonhomestucksongname") =>
        {
            (
                ScanningUnhomestuck,
                vec![
                    Effect::SetClass(class_of(cell)),
                    Effect::BeginRecord,
                    Effect::BeginTitle,
                ],
            )
        }
        (ScanningUnhomestuck, Cue::CellEnd) => (
            SeekingUnhomestuck,
            vec![Effect::FinishTitle(OnBlankTitle::Drop), Effect::Emit],
        ),
        _ => (state, vec![]),
    }
}

fn song_cell(cell: &MarkupEvent, flags: &Flags) -> (MakinState, Vec<Effect>) {
    let title_cell = |original| {
        (
            MakinState::ScanningTitle { original },
            vec![
                Effect::SetClass(class_of(cell)),
                Effect::BeginRecord,
                Effect::BeginTitle,
            ],
        )
    };
    match cell.attr("class") {
        None if flags.allow_resume => (MakinState::SeekingReference, vec![Effect::Resume]),
        // Unreleased rows open with an empty cell; the continuation marker is the one after it.
        None if flags.benchmark >= Benchmark::UNRELEASED => (
            MakinState::SeekingSong,
            vec![Effect::Set(Flag::AllowResume, true)],
        ),
        None => (
            MakinState::SeekingSong,
            vec![Effect::Note(ExtractDiagnostic::SkippedResume {
                benchmark: flags.benchmark,
            })],
        ),
        Some(class) if class.contains("original") => title_cell(true),
        Some(class) if class.contains("hasquotes") => title_cell(false),
        Some(_) => (MakinState::SeekingSong, vec![]),
    }
}
