//! Title normalization.
//!
//! Extractors hand every finished title and reference string to a [TitleNormalizer] exactly once.
//! Two table-driven implementations live here:
//!
//! - [BenchmarkRules]: per-source rules that tell apart works sharing a title by how far through
//!   the document parsing has progressed (the [Benchmark]). The benchmark is threaded through the
//!   call: the caller passes the current value in and keeps the one handed back.
//! - [TitleTables]: source-independent corrections (typo fixes, renames, context-sensitive
//!   special cases) plus a list of titles too ambiguous to accept without a human deciding.
//!
//! [SourceNormalizer] composes the two, rules first.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{error::NsndError, properties::Benchmark};

/// What a normalizer knows about where a string came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TitleContext<'a> {
    /// The owning track's final title when normalizing a reference, `None` for a subject title.
    pub owner: Option<&'a str>,
    /// The class attribute of the cell the string was read from.
    pub class: &'a str,
}

impl<'a> TitleContext<'a> {
    pub fn title(class: &'a str) -> Self {
        TitleContext { owner: None, class }
    }

    pub fn reference(owner: &'a str, class: &'a str) -> Self {
        TitleContext {
            owner: Some(owner),
            class,
        }
    }

    pub fn is_reference(&self) -> bool {
        self.owner.is_some()
    }

    /// The disambiguation context: the owner's title, or empty for subject titles.
    pub fn context_title(&self) -> &'a str {
        self.owner.unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub title: String,
    pub benchmark: Benchmark,
}

pub trait TitleNormalizer {
    fn normalize(
        &self,
        raw: &str,
        ctx: &TitleContext<'_>,
        benchmark: Benchmark,
    ) -> Result<Normalized, NsndError>;
}

/// Trims surrounding whitespace and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl TitleNormalizer for Identity {
    fn normalize(
        &self,
        raw: &str,
        _ctx: &TitleContext<'_>,
        benchmark: Benchmark,
    ) -> Result<Normalized, NsndError> {
        Ok(Normalized {
            title: raw.trim().to_string(),
            benchmark,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCase {
    pub context: String,
    pub title: String,
    #[serde(rename = "use")]
    pub replacement: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TitleTablesToml {
    #[serde(default)]
    replacements: Vec<(String, String)>,
    #[serde(default)]
    renames: BTreeMap<String, String>,
    #[serde(default)]
    special_cases: Vec<SpecialCase>,
    #[serde(default)]
    forbidden: BTreeSet<String>,
}

/// Source-independent title corrections.
///
/// Applied in this order: substring `replacements` (in the order written), trim, exact `renames`,
/// `special_cases` keyed by `(context, title)`, then the `forbidden` check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "TitleTablesToml", into = "TitleTablesToml")]
pub struct TitleTables {
    replacements: Vec<(String, String)>,
    renames: BTreeMap<String, String>,
    special_cases: BTreeMap<(String, String), String>,
    forbidden: BTreeSet<String>,
}

impl From<TitleTablesToml> for TitleTables {
    fn from(raw: TitleTablesToml) -> Self {
        TitleTables {
            replacements: raw.replacements,
            renames: raw.renames,
            special_cases: raw
                .special_cases
                .into_iter()
                .map(|case| ((case.context, case.title), case.replacement))
                .collect(),
            forbidden: raw.forbidden,
        }
    }
}

impl From<TitleTables> for TitleTablesToml {
    fn from(tables: TitleTables) -> Self {
        TitleTablesToml {
            replacements: tables.replacements,
            renames: tables.renames,
            special_cases: tables
                .special_cases
                .into_iter()
                .map(|((context, title), replacement)| SpecialCase {
                    context,
                    title,
                    replacement,
                })
                .collect(),
            forbidden: tables.forbidden,
        }
    }
}

impl TitleTables {
    pub fn with_replacement<S: Into<String>>(mut self, from: S, to: S) -> Self {
        self.replacements.push((from.into(), to.into()));
        self
    }

    pub fn with_rename<S: Into<String>>(mut self, from: S, to: S) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    pub fn with_special_case<S: Into<String>>(mut self, context: S, title: S, to: S) -> Self {
        self.special_cases
            .insert((context.into(), title.into()), to.into());
        self
    }

    pub fn with_forbidden<S: Into<String>>(mut self, title: S) -> Self {
        self.forbidden.insert(title.into());
        self
    }

    pub fn apply(&self, raw: &str, context: &str) -> Result<String, NsndError> {
        let mut title = raw.to_string();
        for (from, to) in self.replacements.iter() {
            if title.contains(from.as_str()) {
                title = title.replace(from.as_str(), to);
            }
        }
        let mut title = title.trim().to_string();
        if let Some(renamed) = self.renames.get(&title) {
            title = renamed.clone();
        }
        if let Some(special) = self
            .special_cases
            .get(&(context.to_string(), title.clone()))
        {
            title = special.clone();
        }
        if self.forbidden.contains(&title) {
            tracing::error!(
                "Got a forbidden name \"{}\", aborting (context: \"{}\")",
                title,
                context
            );
            return Err(NsndError::ForbiddenTitle {
                title,
                context: context.to_string(),
            });
        }
        Ok(title)
    }
}

impl TitleNormalizer for TitleTables {
    fn normalize(
        &self,
        raw: &str,
        ctx: &TitleContext<'_>,
        benchmark: Benchmark,
    ) -> Result<Normalized, NsndError> {
        Ok(Normalized {
            title: self.apply(raw, ctx.context_title())?,
            benchmark,
        })
    }
}

/// The key rules are matched on: trimmed, with runs of spaces collapsed to one.
pub fn rule_key(raw: &str) -> String {
    let mut key = raw.trim().to_string();
    while key.contains("  ") {
        key = key.replace("  ", " ");
    }
    key
}

/// Seeing `title` moves the benchmark up to `benchmark`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub benchmark: Benchmark,
    #[serde(default)]
    pub name: Option<String>,
}

/// One arm of a [Disambiguation]. Every predicate that is set must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub below: Option<Benchmark>,
    #[serde(default)]
    pub at_least: Option<Benchmark>,
    #[serde(default)]
    pub class_contains: Option<String>,
    #[serde(rename = "use")]
    pub replacement: String,
}

impl Condition {
    fn matches(&self, benchmark: Benchmark, class: &str) -> bool {
        self.below.is_none_or(|below| benchmark < below)
            && self.at_least.is_none_or(|at_least| benchmark >= at_least)
            && self
                .class_contains
                .as_deref()
                .is_none_or(|needle| class.contains(needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disambiguation {
    pub title: String,
    #[serde(default)]
    pub when: Vec<Condition>,
    #[serde(default)]
    pub otherwise: Option<String>,
}

impl Disambiguation {
    fn resolve(&self, benchmark: Benchmark, class: &str) -> Option<&str> {
        self.when
            .iter()
            .find(|cond| cond.matches(benchmark, class))
            .map(|cond| cond.replacement.as_str())
            .or(self.otherwise.as_deref())
    }
}

/// Per-source rules for same-named works.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkRules {
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub disambiguate: Vec<Disambiguation>,
    /// Whether references go through the rules too, or only subject titles.
    #[serde(default)]
    pub apply_to_references: bool,
}

impl BenchmarkRules {
    /// Disambiguates `title` against `benchmark`. A title that is not disambiguated may instead
    /// advance the benchmark if it is a milestone.
    pub fn apply(&self, title: &str, ctx: &TitleContext<'_>, benchmark: Benchmark) -> Normalized {
        if ctx.is_reference() && !self.apply_to_references {
            return Normalized {
                title: title.to_string(),
                benchmark,
            };
        }
        if let Some(resolved) = self
            .disambiguate
            .iter()
            .find(|rule| rule.title == title)
            .and_then(|rule| rule.resolve(benchmark, ctx.class))
        {
            if resolved != title {
                tracing::warn!(
                    "Disambiguated \"{}\" to \"{}\", class is \"{}\"",
                    title,
                    resolved,
                    ctx.class
                );
            }
            return Normalized {
                title: resolved.to_string(),
                benchmark,
            };
        }
        let mut benchmark = benchmark;
        if let Some(milestone) = self
            .milestones
            .iter()
            .find(|m| m.title == title && benchmark < m.benchmark)
        {
            benchmark = benchmark.advance(milestone.benchmark);
            tracing::info!(
                "Reached benchmark: {}",
                milestone
                    .name
                    .clone()
                    .unwrap_or_else(|| milestone.benchmark.to_string())
            );
        }
        Normalized {
            title: title.to_string(),
            benchmark,
        }
    }
}

impl TitleNormalizer for BenchmarkRules {
    fn normalize(
        &self,
        raw: &str,
        ctx: &TitleContext<'_>,
        benchmark: Benchmark,
    ) -> Result<Normalized, NsndError> {
        Ok(self.apply(&rule_key(raw), ctx, benchmark))
    }
}

/// [BenchmarkRules] for one source followed by the shared [TitleTables].
#[derive(Debug, Clone, Default)]
pub struct SourceNormalizer {
    pub rules: BenchmarkRules,
    pub tables: TitleTables,
}

impl SourceNormalizer {
    pub fn new(rules: BenchmarkRules, tables: TitleTables) -> Self {
        SourceNormalizer { rules, tables }
    }
}

impl TitleNormalizer for SourceNormalizer {
    fn normalize(
        &self,
        raw: &str,
        ctx: &TitleContext<'_>,
        benchmark: Benchmark,
    ) -> Result<Normalized, NsndError> {
        let disambiguated = self.rules.apply(&rule_key(raw), ctx, benchmark);
        Ok(Normalized {
            title: self
                .tables
                .apply(&disambiguated.title, ctx.context_title())?,
            benchmark: disambiguated.benchmark,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn light_rules() -> BenchmarkRules {
        BenchmarkRules {
            milestones: vec![Milestone {
                title: "Rest a While".to_string(),
                benchmark: Benchmark(1),
                name: Some("ALTERNIABOUND".to_string()),
            }],
            disambiguate: vec![
                Disambiguation {
                    title: "Light".to_string(),
                    when: vec![Condition {
                        below: Some(Benchmark(1)),
                        replacement: "Light (Vol. 5)".to_string(),
                        ..Default::default()
                    }],
                    otherwise: Some("Light (Medium)".to_string()),
                },
                Disambiguation {
                    title: "Game Over".to_string(),
                    when: vec![Condition {
                        class_contains: Some("unofficial".to_string()),
                        replacement: "Game Over (Jailbreak Vol. 1)".to_string(),
                        ..Default::default()
                    }],
                    otherwise: None,
                },
            ],
            apply_to_references: false,
        }
    }

    #[test]
    fn test_benchmark_threads_through_calls() {
        let rules = light_rules();
        let ctx = TitleContext::title("hasquotes");
        let first = rules.apply("Light", &ctx, Benchmark::NONE);
        assert_eq!(first.title, "Light (Vol. 5)");
        assert_eq!(first.benchmark, Benchmark::NONE);

        let milestone = rules.apply("Rest a While", &ctx, first.benchmark);
        assert_eq!(milestone.title, "Rest a While");
        assert_eq!(milestone.benchmark, Benchmark(1));

        let second = rules.apply("Light", &ctx, milestone.benchmark);
        assert_eq!(second.title, "Light (Medium)");
    }

    #[test]
    fn test_rules_match_despite_doubled_spaces() {
        let normalizer = SourceNormalizer::new(light_rules(), TitleTables::default());
        let ctx = TitleContext::title("hasquotes");
        let milestone = normalizer
            .normalize(" Rest  a   While ", &ctx, Benchmark::NONE)
            .unwrap();
        assert_eq!(milestone.title, "Rest a While");
        assert_eq!(milestone.benchmark, Benchmark(1));
        assert_eq!(rule_key("Game  Over"), "Game Over");
    }

    #[test]
    fn test_milestones_never_move_backwards() {
        let rules = light_rules();
        let ctx = TitleContext::title("");
        let out = rules.apply("Rest a While", &ctx, Benchmark::UNRELEASED);
        assert_eq!(out.benchmark, Benchmark::UNRELEASED);
    }

    #[test]
    fn test_class_condition_and_missing_otherwise() {
        let rules = light_rules();
        let unofficial = rules.apply(
            "Game Over",
            &TitleContext::title("x unofficial"),
            Benchmark::NONE,
        );
        assert_eq!(unofficial.title, "Game Over (Jailbreak Vol. 1)");
        let official = rules.apply(
            "Game Over",
            &TitleContext::title("hasquotes"),
            Benchmark::NONE,
        );
        assert_eq!(official.title, "Game Over");
    }

    #[test]
    fn test_references_skip_rules_unless_enabled() {
        let mut rules = light_rules();
        let ctx = TitleContext::reference("Owner", "");
        assert_eq!(rules.apply("Light", &ctx, Benchmark::NONE).title, "Light");
        rules.apply_to_references = true;
        assert_eq!(
            rules.apply("Light", &ctx, Benchmark::NONE).title,
            "Light (Vol. 5)"
        );
    }

    #[test]
    fn test_tables_order_of_operations() {
        let tables = TitleTables::default()
            .with_replacement("ICBSITC", "I Can Barely Sleep In This Casino")
            .with_replacement("\u{2019}", "'")
            .with_rename("Upward Movement", "Upward Movement (Dave Owns)")
            .with_special_case("Mutiny (Piano)", "Mutiny", "Mutiny (Bill Bolin)")
            .with_forbidden("Mother");

        assert_eq!(
            tables.apply(" Three in the Morning (RJ's ICBSITC Remix) ", "").unwrap(),
            "Three in the Morning (RJ's I Can Barely Sleep In This Casino Remix)"
        );
        assert_eq!(
            tables.apply("Upward Movement", "").unwrap(),
            "Upward Movement (Dave Owns)"
        );
        assert_eq!(
            tables.apply("Mutiny", "Mutiny (Piano)").unwrap(),
            "Mutiny (Bill Bolin)"
        );
        assert_eq!(tables.apply("Mutiny", "Other").unwrap(), "Mutiny");
        assert_eq!(
            tables.apply("Mother", "Lilith"),
            Err(NsndError::ForbiddenTitle {
                title: "Mother".to_string(),
                context: "Lilith".to_string()
            })
        );
    }

    #[test]
    fn test_tables_from_toml() {
        let tables: TitleTables = toml::from_str(
            r#"
            replacements = [[" (unreleased)", ""]]
            forbidden = ["Light"]

            [renames]
            "TBoSRE" = "The Beginning of Something Really Excellent"

            [[special_cases]]
            context = "Descend"
            title = "Mutiny"
            use = "Mutiny (Bill Bolin)"
            "#,
        )
        .unwrap();
        assert_eq!(tables.apply("Null (unreleased)", "").unwrap(), "Null");
        assert_eq!(
            tables.apply("TBoSRE", "").unwrap(),
            "The Beginning of Something Really Excellent"
        );
        assert_eq!(tables.apply("Mutiny", "Descend").unwrap(), "Mutiny (Bill Bolin)");
        assert!(tables.apply("Light", "").is_err());
    }

    #[test]
    fn test_source_normalizer_uses_final_owner_title() {
        let normalizer = SourceNormalizer::new(
            light_rules(),
            TitleTables::default().with_special_case(
                "Light (Vol. 5)",
                "Frost",
                "Frost (Vol. 6)",
            ),
        );
        let title = normalizer
            .normalize("Light", &TitleContext::title(""), Benchmark::NONE)
            .unwrap();
        assert_eq!(title.title, "Light (Vol. 5)");
        let reference = normalizer
            .normalize(
                "Frost",
                &TitleContext::reference(&title.title, ""),
                title.benchmark,
            )
            .unwrap();
        assert_eq!(reference.title, "Frost (Vol. 6)");
    }
}
