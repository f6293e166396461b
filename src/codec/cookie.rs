//! The word-processor export layout.
//!
//! Each album is its own table. The first row of a table is an unmarked header; if any header
//! cell starts with "T" or "Album" the album has an extra column to skip. Every other row is
//! track number, title, artist, optionally the extra column, then one reference per cell.
//!
//! A record continues on the next row in two ways: the row carries class `no-sep`, or the row's
//! title cell is blank. Word also likes to split one phrase over several inline elements, so
//! cell text is joined until the cell ends.

use super::{
    class_of, drive, Cue, Effect, Extraction, ExtractDiagnostic, Flag, Flags, OnBlankTitle,
    TrackExtractor,
};
use crate::{error::NsndError, markup::MarkupEvent, normalize::TitleNormalizer};

pub const END_SENTINEL: &str = "Non-Homestuck music (Homestuck and CANWC musicians only)";
pub const CONTINUATION_CLASS: &str = "no-sep";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieState {
    SeekingAlbum,
    ReadingAlbumHeader,
    SeekingSong,
    SkippingTrackNumber,
    ScanningTitle,
    /// `remaining` more whole cells to skip before references start.
    SkippingFields { remaining: u8 },
    ScanningReference,
    /// A `no-sep` row has reopened the previous record; the next cell is its track number.
    Resuming,
    Done,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CookieExtractor;

impl TrackExtractor for CookieExtractor {
    fn name(&self) -> &'static str {
        "cookie"
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
            CookieState::SeekingAlbum,
            CookieState::Done,
            transition,
        )
    }
}

/// Cells between the title and the first reference.
fn fixed_fields(flags: &Flags) -> u8 {
    if flags.album_has_art {
        2
    } else {
        1
    }
}

fn declares_extra_column(header: &str) -> bool {
    let header = header.trim();
    header.starts_with('T') || header.starts_with("Album")
}

pub fn transition(
    state: CookieState,
    flags: &Flags,
    event: &MarkupEvent,
) -> (CookieState, Vec<Effect>) {
    use CookieState::*;

    match (state, Cue::of(event)) {
        (Done, _) => (Done, vec![]),
        (_, Cue::Text(text)) if text.trim() == END_SENTINEL => {
            tracing::info!("Ending at the non-Homestuck section");
            (Done, vec![Effect::Emit])
        }
        (_, Cue::TableEnd) => {
            let mut effects = vec![Effect::Emit, Effect::Set(Flag::AlbumHasArt, false)];
            if !matches!(state, SeekingSong | SeekingAlbum) {
                effects.push(Effect::Note(ExtractDiagnostic::UnexpectedAlbumEnd {
                    state: format!("{state:?}"),
                }));
            }
            (SeekingAlbum, effects)
        }
        (SeekingAlbum, Cue::RowStart(_)) => (ReadingAlbumHeader, vec![]),
        (ReadingAlbumHeader, Cue::Text(text)) if declares_extra_column(text) => {
            tracing::debug!("Album has an extra column ({:?})", text.trim());
            (ReadingAlbumHeader, vec![Effect::Set(Flag::AlbumHasArt, true)])
        }
        (ReadingAlbumHeader, Cue::RowEnd) => (SeekingSong, vec![]),
        (SeekingSong, Cue::RowStart(row)) if row.class_contains(CONTINUATION_CLASS) => {
            (Resuming, vec![Effect::Resume])
        }
        (SeekingSong, Cue::CellStart(_)) => (SkippingTrackNumber, vec![Effect::BeginRecord]),
        (SkippingTrackNumber, Cue::CellStart(cell)) => (
            ScanningTitle,
            vec![Effect::SetClass(class_of(cell)), Effect::BeginTitle],
        ),
        (ScanningTitle | ScanningReference, Cue::Text(text)) => {
            (state, vec![Effect::AppendText(text.to_string())])
        }
        (ScanningTitle, Cue::CellEnd) => (
            SkippingFields {
                remaining: fixed_fields(flags),
            },
            vec![Effect::FinishTitle(OnBlankTitle::Resume)],
        ),
        // The track number cell, then a blank title and the fixed fields.
        (Resuming, Cue::CellStart(_)) => (
            SkippingFields {
                remaining: fixed_fields(flags) + 1,
            },
            vec![],
        ),
        (SkippingFields { remaining: 0 }, Cue::CellStart(cell)) => (
            ScanningReference,
            vec![Effect::SetClass(class_of(cell)), Effect::BeginReference],
        ),
        (SkippingFields { remaining }, Cue::CellStart(_)) => (
            SkippingFields {
                remaining: remaining - 1,
            },
            vec![],
        ),
        (ScanningReference, Cue::CellEnd) => (
            SkippingFields { remaining: 0 },
            vec![Effect::FinishReference],
        ),
        (SkippingTrackNumber | SkippingFields { .. } | Resuming, Cue::RowEnd) => {
            (SeekingSong, vec![Effect::Emit])
        }
        // A row that never closed; finish it and read the new one from the top.
        (SkippingTrackNumber | SkippingFields { .. } | Resuming, Cue::RowStart(_)) => {
            let (next, more) = transition(SeekingSong, flags, event);
            let mut effects = vec![Effect::Emit];
            effects.extend(more);
            (next, effects)
        }
        _ => (state, vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{normalize::Identity, properties::Track};
    use test_log::test;

    const PLAIN_HEADER: &str =
        "<tr><td>#</td><td>Song</td><td>Musician</td><td>References</td></tr>";
    const ART_HEADER: &str =
        "<tr><td>#</td><td>Song</td><td>Musician</td><td>Album Art</td><td>References</td></tr>";

    fn page(tables: &[String]) -> String {
        format!(
            "<html><body>{}<p>{END_SENTINEL}</p><table><tr><td>1</td><td>Ignored</td></tr></table></body></html>",
            tables.join("\n")
        )
    }

    fn album(header: &str, rows: &str) -> String {
        format!("<table>\n{header}\n{rows}\n</table>")
    }

    fn extract(markup: &str) -> Result<Extraction, NsndError> {
        CookieExtractor.extract(markup, &Identity)
    }

    #[test]
    fn test_continuation_rows_extend_the_record() {
        let markup = page(&[album(
            PLAIN_HEADER,
            r#"<tr><td>1</td><td>Moonshine</td><td>Someone</td><td>Sburban Jungle</td><td>Doctor</td></tr>
            <tr class="no-sep"><td></td><td></td><td></td><td>Harlequin</td></tr>
            <tr><td>2</td><td></td><td></td><td>Showtime</td></tr>
            <tr><td>3</td><td>Dogtor</td><td>Someone</td><td>N/A</td></tr>"#,
        )]);
        let extraction = extract(&markup).unwrap();
        assert!(extraction.is_complete());
        assert_eq!(
            extraction.tracks,
            vec![
                Track::with_references(
                    "Moonshine",
                    ["Sburban Jungle", "Doctor", "Harlequin", "Showtime"]
                ),
                Track::new("Dogtor"),
            ]
        );
    }

    #[test]
    fn test_titled_row_without_marker_is_a_new_record() {
        let markup = page(&[album(
            PLAIN_HEADER,
            r#"<tr><td>1</td><td>Moonshine</td><td>Someone</td><td>Sburban Jungle</td></tr>
            <tr><td>2</td><td>Moonsetter</td><td>Someone</td><td>Harlequin</td></tr>"#,
        )]);
        let extraction = extract(&markup).unwrap();
        assert_eq!(
            extraction.tracks,
            vec![
                Track::with_references("Moonshine", ["Sburban Jungle"]),
                Track::with_references("Moonsetter", ["Harlequin"]),
            ]
        );
    }

    #[test]
    fn test_extra_column_and_split_text() {
        let markup = page(&[
            album(
                ART_HEADER,
                r#"<tr><td>1</td><td><b>Rex </b><span>Duodecim Angelus</span></td><td>X</td><td>art</td><td>Sburban <i>Countdown</i></td></tr>"#,
            ),
            album(
                PLAIN_HEADER,
                r#"<tr><td>1</td><td>Ruses</td><td>Y</td><td>Aggrieve</td></tr>"#,
            ),
        ]);
        let extraction = extract(&markup).unwrap();
        assert_eq!(
            extraction.tracks,
            vec![
                Track::with_references("Rex Duodecim Angelus", ["Sburban Countdown"]),
                Track::with_references("Ruses", ["Aggrieve"]),
            ]
        );
    }

    #[test]
    fn test_table_closing_mid_row() {
        let markup = page(&[
            "<table><tr><td>#</td></tr><tr><td>1</td><td>Amen</td></table>".to_string(),
        ]);
        let extraction = extract(&markup).unwrap();
        assert_eq!(extraction.tracks, vec![Track::new("Amen")]);
        assert!(extraction
            .diagnostics
            .iter()
            .any(|d| matches!(d, ExtractDiagnostic::UnexpectedAlbumEnd { .. })));
    }

    #[test]
    fn test_blank_first_title_has_nothing_to_resume() {
        let markup = page(&[album(
            PLAIN_HEADER,
            r#"<tr><td>1</td><td></td><td>Someone</td><td>Orphan</td></tr>
            <tr><td>2</td><td>Moonshine</td><td>Someone</td><td>Doctor</td></tr>"#,
        )]);
        let extraction = extract(&markup).unwrap();
        assert_eq!(
            extraction.tracks,
            vec![Track::with_references("Moonshine", ["Doctor"])]
        );
        assert!(extraction
            .diagnostics
            .iter()
            .any(|d| matches!(d, ExtractDiagnostic::NothingToResume { .. })));
    }

    #[test]
    fn test_continuation_marker_on_first_row_is_dropped() {
        let markup = page(&[album(
            PLAIN_HEADER,
            r#"<tr class="no-sep"><td></td><td></td><td></td><td>Harlequin</td></tr>
            <tr><td>1</td><td>Moonshine</td><td>Someone</td><td>Doctor</td></tr>"#,
        )]);
        let extraction = extract(&markup).unwrap();
        assert!(extraction.is_complete());
        assert_eq!(
            extraction.tracks,
            vec![Track::with_references("Moonshine", ["Doctor"])]
        );
        assert_eq!(
            extraction
                .diagnostics
                .iter()
                .filter(|d| matches!(d, ExtractDiagnostic::NothingToResume { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_missing_sentinel_is_incomplete() {
        let markup = album(
            PLAIN_HEADER,
            "<tr><td>1</td><td>Moonshine</td><td>Someone</td><td>Doctor</td></tr>",
        );
        let extraction = extract(&markup).unwrap();
        assert!(!extraction.is_complete());
        assert_eq!(
            extraction.tracks,
            vec![Track::with_references("Moonshine", ["Doctor"])]
        );
    }

    #[test]
    fn test_unclosed_row_before_continuation() {
        let markup = page(&[album(
            PLAIN_HEADER,
            r#"<tr><td>1</td><td>Moonshine</td><td>Someone</td><td>Doctor</td>
            <tr class="no-sep"><td></td><td></td><td></td><td>Harlequin</td></tr>"#,
        )]);
        let extraction = extract(&markup).unwrap();
        assert_eq!(
            extraction.tracks,
            vec![Track::with_references("Moonshine", ["Doctor", "Harlequin"])]
        );
    }
}
