//! The earliest `hasquotes` layout, a single section ended by a horizontal rule.
//!
//! Same cell classes as [super::makin], except every classless first cell continues the previous
//! record, text is stripped down to ASCII, and a cell of nothing but question marks (the
//! placeholder zone at the bottom of the page) ends the listing.

use super::{class_of, drive, Cue, Effect, Extraction, Flags, OnBlankTitle, TrackExtractor};
use crate::{error::NsndError, markup::MarkupEvent, normalize::TitleNormalizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XzazState {
    SeekingSong,
    ScanningTitle { original: bool },
    /// The rest of a row whose subject references nothing.
    SkippingOriginalRow,
    SkippingBlankTitle,
    SeekingReference,
    ScanningReference,
    Done,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XzazExtractor;

impl TrackExtractor for XzazExtractor {
    fn name(&self) -> &'static str {
        "xzaz"
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
            XzazState::SeekingSong,
            XzazState::Done,
            transition,
        )
    }
}

fn is_question_marks(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.chars().all(|c| c == '?')
}

fn ascii_only(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

pub fn transition(
    state: XzazState,
    flags: &Flags,
    event: &MarkupEvent,
) -> (XzazState, Vec<Effect>) {
    use XzazState::*;

    match (state, Cue::of(event)) {
        (Done, _) => (Done, vec![]),
        (_, Cue::Rule) => (Done, vec![Effect::Emit]),
        (ScanningTitle { original: false } | SeekingReference | ScanningReference, Cue::Text(text))
            if is_question_marks(text) =>
        {
            tracing::info!("Caught a question marks zone, ending now");
            (Done, vec![Effect::Emit])
        }
        (SeekingSong, Cue::CellStart(cell)) => match cell.attr("class") {
            None => (SkippingBlankTitle, vec![Effect::Resume]),
            Some(class) if class.contains("original") || class.contains("hasquotes") => (
                ScanningTitle {
                    original: class.contains("original"),
                },
                vec![
                    Effect::SetClass(class.to_string()),
                    Effect::BeginRecord,
                    Effect::BeginTitle,
                ],
            ),
            Some(_) => (state, vec![]),
        },
        (ScanningTitle { .. } | ScanningReference, Cue::Text(text)) => {
            (state, vec![Effect::AppendText(ascii_only(text))])
        }
        (ScanningTitle { original: true }, Cue::CellEnd) => {
            (SkippingOriginalRow, vec![Effect::FinishTitle(OnBlankTitle::Drop)])
        }
        (ScanningTitle { original: false }, Cue::CellEnd) => {
            (SeekingReference, vec![Effect::FinishTitle(OnBlankTitle::Fail)])
        }
        (SkippingBlankTitle, Cue::CellEnd) => (SeekingReference, vec![]),
        (SeekingReference, Cue::CellStart(cell)) => (
            ScanningReference,
            vec![Effect::SetClass(class_of(cell)), Effect::BeginReference],
        ),
        (ScanningReference, Cue::CellEnd) => (SeekingReference, vec![Effect::FinishReference]),
        (SeekingReference | SkippingOriginalRow, Cue::RowEnd) => (SeekingSong, vec![Effect::Emit]),
        (SeekingReference | SkippingOriginalRow, Cue::RowStart(_)) => {
            let (next, more) = transition(SeekingSong, flags, event);
            let mut effects = vec![Effect::Emit];
            effects.extend(more);
            (next, effects)
        }
        _ => (state, vec![]),
    }
}
