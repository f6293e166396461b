//! Shared test utilities for extractor and web testing

use crate::{
    properties::Track,
    web::{DuplicatePolicy, Web},
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Shorthand for a track literal
pub fn track(title: &str, references: &[&str]) -> Track {
    Track::with_references(title, references.iter().copied())
}

/// A web holding `tracks`, appended once with no duplicate policy
pub fn web_from(tracks: &[Track]) -> Web {
    init_logging();
    let mut web = Web::new();
    web.append(tracks, &DuplicatePolicy::new())
        .expect("fixture tracks should have distinct subjects");
    web
}
