//! Prompt → predicted `file::function` labels.
//!
//! The curated rule table always wins; the model is only asked when no word
//! of the prompt is a rule keyword.

mod model;

pub use model::{CommandGenerator, Generator, ModelError, MAX_LENGTH, NUM_BEAMS};

use crate::rules::RuleTable;
use serde::Serialize;
use std::collections::BTreeSet;

/// Fixed prompts for eyeballing model quality with `--batch`.
pub const BATCH_PROMPTS: &[&str] = &[
    "taskwait codegen",
    "flush ir target",
    "parallel parse runtime",
    "atomic sema",
    "for codegen parse",
    "sections runtime ast",
    "ordered flush",
    "barrier codegen",
    "masked parse ast",
    "taskgroup codegen",
];

/// Where a prediction came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionSource {
    Rules { matched_keywords: Vec<String> },
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub source: PredictionSource,
    /// Distinct files of `labels`, sorted.
    pub files: Vec<String>,
    /// `file::function` labels, sorted and deduplicated.
    pub labels: Vec<String>,
    /// Model output tokens that were not `file::function` pairs.
    pub discarded: usize,
}

/// Model text split into files and labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    pub files: Vec<String>,
    pub labels: Vec<String>,
    pub discarded: usize,
}

/// Parse comma-separated `file::function` pairs. Tokens without `::` are
/// counted as discarded; each kept token is split at its first `::` and both
/// halves trimmed.
pub fn parse_model_output(text: &str) -> ParsedOutput {
    let mut files = BTreeSet::new();
    let mut labels = BTreeSet::new();
    let mut discarded = 0;

    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.split_once("::") {
            Some((file, func)) => {
                let (file, func) = (file.trim(), func.trim());
                files.insert(file.to_owned());
                labels.insert(format!("{file}::{func}"));
            }
            None => discarded += 1,
        }
    }

    ParsedOutput {
        files: files.into_iter().collect(),
        labels: labels.into_iter().collect(),
        discarded,
    }
}

/// Distinct files named by `labels`, sorted.
pub fn files_of(labels: &[String]) -> Vec<String> {
    let files: BTreeSet<&str> = labels
        .iter()
        .filter_map(|l| l.split_once("::").map(|(file, _)| file.trim()))
        .collect();
    files.into_iter().map(str::to_owned).collect()
}

pub struct Recommender<'a, G> {
    rules: &'a RuleTable,
    generator: &'a G,
}

impl<'a, G: Generator> Recommender<'a, G> {
    pub fn new(rules: &'a RuleTable, generator: &'a G) -> Self {
        Self { rules, generator }
    }

    /// Rules first, then the model.
    pub fn recommend(&self, prompt: &str) -> Result<Prediction, ModelError> {
        if let Some(hit) = self.rules.lookup(prompt) {
            log::info!(
                "[recommend] Rule match on {}",
                hit.matched_keywords.join(", ")
            );
            return Ok(Prediction {
                files: files_of(&hit.labels),
                labels: hit.labels,
                source: PredictionSource::Rules {
                    matched_keywords: hit.matched_keywords,
                },
                discarded: 0,
            });
        }

        predict_with_model(self.generator, prompt)
    }
}

/// Ask the model directly, ignoring any rule table.
pub fn predict_with_model<G: Generator + ?Sized>(
    generator: &G,
    prompt: &str,
) -> Result<Prediction, ModelError> {
    let text = generator.generate(prompt)?;
    let parsed = parse_model_output(&text);
    if parsed.discarded > 0 {
        log::warn!(
            "[recommend] Discarded {} malformed token(s) from model output",
            parsed.discarded
        );
    }

    Ok(Prediction {
        source: PredictionSource::Model,
        files: parsed.files,
        labels: parsed.labels,
        discarded: parsed.discarded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeGenerator {
        output: &'static str,
        calls: Cell<usize>,
    }

    impl FakeGenerator {
        fn new(output: &'static str) -> Self {
            Self {
                output,
                calls: Cell::new(0),
            }
        }
    }

    impl Generator for FakeGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.output.to_owned())
        }
    }

    fn table() -> RuleTable {
        RuleTable::from_entries([
            ("taskwait", vec!["CGOpenMPRuntime.cpp::emitTaskwaitCall"]),
            ("flush", vec!["CGOpenMPRuntime.cpp::emitFlush", "SemaOpenMP.cpp::ActOnOpenMPFlushDirective"]),
        ])
    }

    #[test]
    fn test_parse_model_output() {
        let parsed = parse_model_output("foo.cpp::bar, baz.cpp::qux, garbage");
        assert_eq!(parsed.files, vec!["baz.cpp", "foo.cpp"]);
        assert_eq!(parsed.labels, vec!["baz.cpp::qux", "foo.cpp::bar"]);
        assert_eq!(parsed.discarded, 1);
    }

    #[test]
    fn test_parse_model_output_splits_at_first_separator() {
        let parsed = parse_model_output(" a.cpp :: Sema::Check ,a.cpp::Sema::Check,,");
        assert_eq!(parsed.files, vec!["a.cpp"]);
        assert_eq!(parsed.labels, vec!["a.cpp::Sema::Check"]);
        assert_eq!(parsed.discarded, 0);
    }

    #[test]
    fn test_rule_keyword_never_invokes_model() {
        let rules = table();
        let generator = FakeGenerator::new("x.cpp::y");
        let recommender = Recommender::new(&rules, &generator);

        let prediction = recommender.recommend("Add TASKWAIT depend clause").unwrap();

        assert_eq!(generator.calls.get(), 0);
        assert_eq!(
            prediction.source,
            PredictionSource::Rules {
                matched_keywords: vec!["taskwait".to_owned()]
            }
        );
        assert_eq!(prediction.files, vec!["CGOpenMPRuntime.cpp"]);
    }

    #[test]
    fn test_rule_labels_are_unioned() {
        let rules = table();
        let generator = FakeGenerator::new("");
        let recommender = Recommender::new(&rules, &generator);

        let prediction = recommender.recommend("flush taskwait").unwrap();

        assert_eq!(prediction.labels.len(), 3);
        assert_eq!(
            prediction.files,
            vec!["CGOpenMPRuntime.cpp", "SemaOpenMP.cpp"]
        );
    }

    #[test]
    fn test_model_only_ignores_rule_keywords() {
        let generator = FakeGenerator::new("CGStmtOpenMP.cpp::emitTaskwait");

        let prediction = predict_with_model(&generator, "taskwait codegen").unwrap();

        assert_eq!(generator.calls.get(), 1);
        assert_eq!(prediction.source, PredictionSource::Model);
        assert_eq!(prediction.files, vec!["CGStmtOpenMP.cpp"]);
    }

    #[test]
    fn test_model_fallback() {
        let rules = table();
        let generator = FakeGenerator::new("CGStmtOpenMP.cpp::EmitOMPSimdDirective, junk");
        let recommender = Recommender::new(&rules, &generator);

        let prediction = recommender.recommend("simd codegen").unwrap();

        assert_eq!(generator.calls.get(), 1);
        assert_eq!(prediction.source, PredictionSource::Model);
        assert_eq!(prediction.labels, vec!["CGStmtOpenMP.cpp::EmitOMPSimdDirective"]);
        assert_eq!(prediction.discarded, 1);
    }

    #[test]
    fn test_batch_prompts() {
        assert_eq!(BATCH_PROMPTS.len(), 10);
        assert!(BATCH_PROMPTS.contains(&"taskwait codegen"));
    }
}
