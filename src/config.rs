//! The build manifest.
//!
//! A [Config] is read from TOML and names everything a run needs: the shared title corrections,
//! per-source benchmark rules, snapshot constants, where each source's markup lives, and how the
//! sources are combined into webs.
//!
//! ```toml
//! output_dir = "output"
//!
//! [normalizer]
//! renames = { "Showtime (Original Mix)" = "Showtime" }
//! forbidden = ["Light"]
//!
//! [[sources]]
//! name = "canwc"
//! kind = "cookie"
//! path = "pages/canwc.html"
//!
//! [[webs]]
//! name = "canwc"
//! appends = [
//!     { tracks = [{ title = "Showtime (Imp Strife Mix)", references = ["Showtime"] }] },
//!     { source = "canwc", skip_on_duplicate = ["Showtime (Imp Strife Mix)"] },
//! ]
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    codec::{Extraction, SourceKind},
    error::NsndError,
    normalize::{BenchmarkRules, SourceNormalizer, TitleTables},
    properties::Track,
    web::{export::export_all, DuplicatePolicy, SnapshotConfig, Web},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub path: PathBuf,
}

/// One [Web::append] call. Tracks come either from a named source or inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendConfig {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(flatten)]
    pub policy: DuplicatePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebConfig {
    pub name: String,
    #[serde(default)]
    pub appends: Vec<AppendConfig>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub normalizer: TitleTables,
    /// Benchmark rules keyed by source name.
    #[serde(default)]
    pub benchmarks: BTreeMap<String, BenchmarkRules>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub webs: Vec<WebConfig>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_dir: default_output_dir(),
            snapshot: SnapshotConfig::default(),
            normalizer: TitleTables::default(),
            benchmarks: BTreeMap::new(),
            sources: Vec::new(),
            webs: Vec::new(),
            base_dir: PathBuf::new(),
        }
    }
}

impl FromStr for Config {
    type Err = NsndError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

/// What one built web looked like, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebReport {
    pub name: String,
    pub nodes: usize,
    pub edges: usize,
    pub unknown: usize,
    /// Sources whose markup ended before the extractor saw the end of the listing.
    pub incomplete_sources: Vec<String>,
    pub written: Vec<PathBuf>,
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, NsndError> {
        let path = path.as_ref();
        tracing::debug!("Reading config from {:?}", path);
        let mut config: Config = read_to_string(path)?.parse()?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Resolves relative paths against the config file's directory.
    pub fn with_base_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|source| source.name == name)
    }

    pub fn web(&self, name: &str) -> Option<&WebConfig> {
        self.webs.iter().find(|web| web.name == name)
    }

    /// The normalizer a source's extractor runs with: its own benchmark rules, if any, then the
    /// shared tables.
    pub fn normalizer_for(&self, source: &str) -> SourceNormalizer {
        SourceNormalizer::new(
            self.benchmarks.get(source).cloned().unwrap_or_default(),
            self.normalizer.clone(),
        )
    }

    /// Checks cross references inside the manifest. Nothing here looks at the filesystem.
    pub fn validate(&self) -> Result<(), NsndError> {
        let mut sources = BTreeSet::new();
        for source in self.sources.iter() {
            if !sources.insert(source.name.as_str()) {
                return Err(NsndError::Config(format!(
                    "Source \"{}\" is declared more than once",
                    source.name
                )));
            }
        }
        for name in self.benchmarks.keys() {
            if !sources.contains(name.as_str()) {
                tracing::warn!("Benchmark rules for \"{}\" match no source", name);
            }
        }
        let mut webs = BTreeSet::new();
        for web in self.webs.iter() {
            if !webs.insert(web.name.as_str()) {
                return Err(NsndError::Config(format!(
                    "Web \"{}\" is declared more than once",
                    web.name
                )));
            }
            for (i, append) in web.appends.iter().enumerate() {
                match (&append.source, append.tracks.is_empty()) {
                    (Some(_), false) => {
                        return Err(NsndError::Config(format!(
                            "webs.{}.appends[{i}] names a source and also lists tracks",
                            web.name
                        )))
                    }
                    (None, true) => {
                        return Err(NsndError::Config(format!(
                            "webs.{}.appends[{i}] names no source and lists no tracks",
                            web.name
                        )))
                    }
                    (Some(source), true) if !sources.contains(source.as_str()) => {
                        return Err(NsndError::Config(format!(
                            "webs.{}.appends[{i}] names unknown source \"{source}\"",
                            web.name
                        )))
                    }
                    _ => {}
                }
                append.policy.validate()?;
            }
        }
        Ok(())
    }

    /// Reads and scans one source.
    #[tracing::instrument(skip(self, source), fields(source = %source.name))]
    pub fn extract(&self, source: &SourceConfig) -> Result<Extraction, NsndError> {
        let path = self.resolve(&source.path);
        tracing::info!("Scanning {} source \"{}\"", source.kind, source.name);
        let markup = read_to_string(&path)?;
        let normalizer = self.normalizer_for(&source.name);
        let extraction = source.kind.extractor().extract(&markup, &normalizer)?;
        if !extraction.is_complete() {
            tracing::warn!(
                "\"{}\" ({}) ended before the end of its listing",
                source.name,
                path.display()
            );
        }
        tracing::info!(
            "Scanned {} tracks from \"{}\"",
            extraction.tracks.len(),
            source.name
        );
        Ok(extraction)
    }

    /// Scans every source the webs use, each exactly once.
    pub fn extract_all(&self) -> Result<BTreeMap<String, Extraction>, NsndError> {
        let mut extractions = BTreeMap::new();
        for web in self.webs.iter() {
            for name in web.appends.iter().filter_map(|a| a.source.as_ref()) {
                if extractions.contains_key(name) {
                    continue;
                }
                let source = self
                    .source(name)
                    .ok_or_else(|| NsndError::Config(format!("Unknown source \"{name}\"")))?;
                extractions.insert(name.clone(), self.extract(source)?);
            }
        }
        Ok(extractions)
    }

    /// Runs a web's appends in order against already scanned sources.
    pub fn build_web(
        &self,
        web: &WebConfig,
        extractions: &BTreeMap<String, Extraction>,
    ) -> Result<Web, NsndError> {
        let mut built = Web::new();
        for append in web.appends.iter() {
            let tracks = match &append.source {
                Some(name) => &extractions
                    .get(name)
                    .ok_or_else(|| NsndError::NotFound(format!("No extraction for \"{name}\"")))?
                    .tracks,
                None => &append.tracks,
            };
            tracing::debug!(
                "Appending {} tracks from {} to \"{}\"",
                tracks.len(),
                append.source.as_deref().unwrap_or("inline listing"),
                web.name
            );
            built.append(tracks, &append.policy)?;
        }
        Ok(built)
    }

    /// Scans every source, builds every web and writes each web's exports to the output
    /// directory.
    #[tracing::instrument(skip_all)]
    pub fn run(&self) -> Result<Vec<WebReport>, NsndError> {
        let extractions = self.extract_all()?;
        let output_dir = self.resolve(&self.output_dir);
        let mut reports = Vec::new();
        for web_config in self.webs.iter() {
            let web = self.build_web(web_config, &extractions)?;
            let written = export_all(&web, &output_dir, &web_config.name, &self.snapshot)?;
            let incomplete_sources = web_config
                .appends
                .iter()
                .filter_map(|a| a.source.as_ref())
                .filter(|name| extractions.get(*name).is_some_and(|e| !e.is_complete()))
                .cloned()
                .collect();
            reports.push(WebReport {
                name: web_config.name.clone(),
                nodes: web.node_count(),
                edges: web.edge_count(),
                unknown: web.unknown().count(),
                incomplete_sources,
                written,
            });
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::Benchmark;
    use test_log::test;

    const MANIFEST: &str = r#"
output_dir = "out"

[snapshot]
size_scale = 50.0
edge_color = [10, 20, 30]

[normalizer]
replacements = [["’", "'"]]
renames = { "Showtime (Original Mix)" = "Showtime" }
special_cases = [{ context = "Lilith In Starlight", title = "Mother", use = "Mother (Malcolm Brown)" }]
forbidden = ["Light"]

[benchmarks.homestuck]
apply_to_references = false
milestones = [{ title = "Rest a While", benchmark = 1, name = "ALTERNIABOUND" }]
disambiguate = [{ title = "Light", when = [{ below = 1, use = "Light (Vol. 5)" }], otherwise = "Light (Medium)" }]

[[sources]]
name = "homestuck"
kind = "makin"
path = "pages/nsnd.html"

[[sources]]
name = "viko"
kind = "listing"
path = "viko.toml"

[[webs]]
name = "everything"
appends = [
    { source = "homestuck", skip_on_duplicate = ["Skaia Voyages"] },
    { source = "viko", override_on_duplicate = ["Taureg"] },
    { tracks = [{ title = "Showtime (Imp Strife Mix)", references = ["Showtime"] }] },
]
"#;

    #[test]
    fn test_manifest_parses() {
        let config: Config = MANIFEST.parse().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.snapshot.size_scale, 50.0);
        assert_eq!(config.snapshot.size_offset, SnapshotConfig::default().size_offset);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.source("viko").unwrap().kind, SourceKind::Listing);

        let web = config.web("everything").unwrap();
        assert_eq!(web.appends.len(), 3);
        assert!(web.appends[0]
            .policy
            .skip_on_duplicate
            .contains("Skaia Voyages"));
        assert!(web.appends[1].policy.override_on_duplicate.contains("Taureg"));
        assert_eq!(
            web.appends[2].tracks,
            vec![Track::with_references("Showtime (Imp Strife Mix)", ["Showtime"])]
        );
    }

    #[test]
    fn test_normalizer_for_source() {
        use crate::normalize::{TitleContext, TitleNormalizer};
        let config: Config = MANIFEST.parse().unwrap();

        let homestuck = config.normalizer_for("homestuck");
        let light = homestuck
            .normalize("Light", &TitleContext::title("hasquotes"), Benchmark::NONE)
            .unwrap();
        assert_eq!(light.title, "Light (Vol. 5)");

        // Without the source's rules the raw title is forbidden.
        let viko = config.normalizer_for("viko");
        let err = viko
            .normalize("Light", &TitleContext::title(""), Benchmark::NONE)
            .unwrap_err();
        assert!(matches!(err, NsndError::ForbiddenTitle { .. }));

        let mother = viko
            .normalize(
                "Mother",
                &TitleContext::reference("Lilith In Starlight", ""),
                Benchmark::NONE,
            )
            .unwrap();
        assert_eq!(mother.title, "Mother (Malcolm Brown)");
    }

    #[test]
    fn test_unknown_source_in_web() {
        let err = "[[webs]]\nname = \"w\"\nappends = [{ source = \"nope\" }]\n"
            .parse::<Config>()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_append_needs_exactly_one_origin() {
        let empty = "[[webs]]\nname = \"w\"\nappends = [{ skip_on_duplicate = [\"A\"] }]\n";
        assert!(empty.parse::<Config>().unwrap_err().is_config());

        let both = r#"
[[sources]]
name = "s"
kind = "listing"
path = "s.toml"

[[webs]]
name = "w"
appends = [{ source = "s", tracks = [{ title = "A" }] }]
"#;
        assert!(both.parse::<Config>().unwrap_err().is_config());
    }

    #[test]
    fn test_overlapping_policy_in_manifest() {
        let overlap = r#"
[[webs]]
name = "w"
appends = [{ tracks = [{ title = "A" }], override_on_duplicate = ["A"], skip_on_duplicate = ["A"] }]
"#;
        assert!(overlap.parse::<Config>().unwrap_err().is_config());
    }

    #[test]
    fn test_duplicate_names() {
        let sources = r#"
[[sources]]
name = "s"
kind = "listing"
path = "a.toml"

[[sources]]
name = "s"
kind = "makin"
path = "b.html"
"#;
        assert!(sources.parse::<Config>().unwrap_err().is_config());

        let webs = "[[webs]]\nname = \"w\"\n\n[[webs]]\nname = \"w\"\n";
        assert!(webs.parse::<Config>().unwrap_err().is_config());
    }

    #[test]
    fn test_unknown_kind() {
        let err = "[[sources]]\nname = \"s\"\nkind = \"geocities\"\npath = \"x\"\n"
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, NsndError::Serialization(_)));
    }

    #[test]
    fn test_resolve_against_base_dir() {
        let config = Config::default().with_base_dir("/data/nsnd");
        assert_eq!(
            config.resolve(Path::new("pages/a.html")),
            PathBuf::from("/data/nsnd/pages/a.html")
        );
        assert_eq!(
            config.resolve(Path::new("/abs/b.html")),
            PathBuf::from("/abs/b.html")
        );
    }

    #[test]
    fn test_bundled_manifest_and_listing() {
        use crate::codec::{listing::ListingExtractor, TrackExtractor};

        let config: Config = include_str!("../config/nsndswap.toml").parse().unwrap();
        assert_eq!(config.webs.len(), 4);
        assert_eq!(config.source("viko").unwrap().kind, SourceKind::Listing);

        let viko = ListingExtractor
            .extract(include_str!("../data/viko.toml"), &config.normalizer_for("viko"))
            .unwrap();
        assert!(viko.is_complete());
        let taureg = viko.tracks.iter().find(|t| t.title == "Taureg").unwrap();
        assert_eq!(taureg.references, vec!["Sburban Jungle", "Beatdown"]);
        let sleuth = viko.tracks.iter().find(|t| t.title == "Temmie Sleuth").unwrap();
        assert_eq!(
            sleuth.references,
            vec!["Problem Sleuth Title Theme", "Temmie Village"]
        );
    }

    #[test]
    fn test_inline_appends_build_without_sources() {
        let config: Config = r#"
[[webs]]
name = "canwc"
appends = [
    { tracks = [{ title = "Showtime (Imp Strife Mix)", references = ["Showtime"] }] },
    { tracks = [{ title = "Showtime (Imp Strife Mix)", references = ["Doctor"] }], skip_on_duplicate = ["Showtime (Imp Strife Mix)"] },
]
"#
        .parse()
        .unwrap();
        let web = config
            .build_web(config.web("canwc").unwrap(), &BTreeMap::new())
            .unwrap();
        assert_eq!(web.node_count(), 2);
        assert_eq!(web.edge_count(), 1);
        assert_eq!(web.node_index("Doctor"), None);
    }
}
