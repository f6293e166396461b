use std::{fmt, io};

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum NsndError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "\"{title}\" was already scanned by an earlier source; name it in override_on_duplicate \
         or skip_on_duplicate"
    )]
    DuplicateSubject { title: String },
    #[error("{source_name} tried to scan references for a track with no title (state: {state})")]
    ReferenceBeforeTitle { source_name: String, state: String },
    #[error("Forbidden title \"{title}\" needs manual disambiguation (context: \"{context}\")")]
    ForbiddenTitle { title: String, context: String },
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl NsndError {
    /// Whether the error is a caller configuration mistake rather than a problem with the data.
    pub fn is_config(&self) -> bool {
        matches!(self, NsndError::Config(_))
    }
}

impl From<toml::de::Error> for NsndError {
    fn from(src: toml::de::Error) -> NsndError {
        NsndError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for NsndError {
    fn from(src: toml::ser::Error) -> NsndError {
        NsndError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for NsndError {
    fn from(src: JsonError) -> NsndError {
        NsndError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for NsndError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => NsndError::NotFound(format!("{x}")),
            _ => NsndError::Io(format!("IOError: {}: {x}", x.kind())),
        }
    }
}

impl From<fmt::Error> for NsndError {
    fn from(x: fmt::Error) -> Self {
        NsndError::Serialization(format!("{x}"))
    }
}
