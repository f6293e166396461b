//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::PathBuf;
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; later calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub const MAKIN_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>nsnd</title></head><body>
<table>
<tr><td class="hasquotes">Sburban Jungle</td><td>Beatdown</td><td>Doctor</td></tr>
<tr><td></td><td>Harlequin</td></tr>
<tr><td class="original">Doctor</td><td class="artist">Toby Fox</td></tr>
<tr><td class="hasquotes">Showtime (Imp Strife Mix)</td><td>Showtime (Original Mix)</td></tr>
</table>
</body></html>
"#;

#[allow(dead_code)]
pub const COOKIE_PAGE: &str = r#"<html><body>
<table>
<tr><td>#</td><td>Song</td><td>Musician</td><td>References</td></tr>
<tr><td>1</td><td>Moonshine</td><td>Someone</td><td>Sburban Jungle</td><td>Doctor</td></tr>
<tr class="no-sep"><td></td><td></td><td></td><td>Harlequin</td></tr>
<tr><td>2</td><td>Showtime (Imp Strife Mix)</td><td>Someone</td><td>Doctor</td></tr>
</table>
<p>Non-Homestuck music (Homestuck and CANWC musicians only)</p>
<table><tr><td>1</td><td>Ignored</td></tr></table>
</body></html>
"#;

#[allow(dead_code)]
pub const LISTING: &str = r#"
[[tracks]]
title = "Taureg"
references = ["Sburban Jungle", "Beatdown (Strider Style)"]

[[tracks]]
title = "Moonshine"
references = ["Doctor"]
"#;

#[allow(dead_code)]
pub const MANIFEST: &str = r#"
output_dir = "out"

[normalizer]
renames = { "Showtime (Original Mix)" = "Showtime", "Beatdown (Strider Style)" = "Beatdown" }

[[sources]]
name = "homestuck"
kind = "makin"
path = "pages/nsnd.html"

[[sources]]
name = "canwc"
kind = "cookie"
path = "pages/canwc.html"

[[sources]]
name = "viko"
kind = "listing"
path = "viko.toml"

[[webs]]
name = "homestuck"
appends = [{ source = "homestuck" }]

[[webs]]
name = "everything"
appends = [
    { source = "homestuck" },
    { source = "canwc", skip_on_duplicate = ["Showtime (Imp Strife Mix)"] },
    { source = "viko", override_on_duplicate = ["Moonshine"] },
]
"#;

/// Lays out the sample pages, the listing and `manifest` under `temp_dir`.
///
/// Returns the path to the manifest.
#[allow(dead_code)]
pub fn write_fixture(temp_dir: &TempDir, manifest: &str) -> PathBuf {
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join("pages")).unwrap();
    std::fs::write(root.join("pages/nsnd.html"), MAKIN_PAGE).unwrap();
    std::fs::write(root.join("pages/canwc.html"), COOKIE_PAGE).unwrap();
    std::fs::write(root.join("viko.toml"), LISTING).unwrap();
    let config = root.join("nsndswap.toml");
    std::fs::write(&config, manifest).unwrap();
    config
}
