//! Diagnostic types for track extraction.
//!
//! Diagnostics are things a caller may want to know about a source without them being worth
//! aborting the extraction for. Fatal conditions are [crate::NsndError]s instead.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::properties::Benchmark;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractDiagnostic {
    /// The markup ended without the extractor reaching its terminal state, so the track list may
    /// be truncated. The state the extractor was left in is recorded for debugging.
    Incomplete { state: String },

    /// A row looked like a continuation but resumption was not allowed at this point.
    SkippedResume { benchmark: Benchmark },

    /// A continuation row had no completed record immediately before it to reopen.
    NothingToResume { state: String },

    /// A table closed while a row was still being read.
    UnexpectedAlbumEnd { state: String },

    /// A "see the other list" placeholder was dropped instead of becoming a reference.
    Placeholder { owner: String, placeholder: String },
}

impl ExtractDiagnostic {
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ExtractDiagnostic::Incomplete { .. })
    }
}

impl Display for ExtractDiagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractDiagnostic::Incomplete { state } => {
                write!(f, "Markup ended before the listing did (state: {state})")
            }
            ExtractDiagnostic::SkippedResume { benchmark } => {
                write!(f, "Skipped a resume (benchmark: {benchmark})")
            }
            ExtractDiagnostic::NothingToResume { state } => {
                write!(f, "No preceding record to resume (state: {state})")
            }
            ExtractDiagnostic::UnexpectedAlbumEnd { state } => {
                write!(f, "Reached unexpected end of album in state {state}")
            }
            ExtractDiagnostic::Placeholder { owner, placeholder } => {
                write!(f, "Skipping \"{owner}\" linking to {placeholder}")
            }
        }
    }
}
