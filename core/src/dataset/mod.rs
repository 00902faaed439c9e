//! Turns mined change records into prompt → label training examples.
//!
//! Every change contributes its labels to each non-empty subset of its
//! keywords, so a short prompt like `taskwait` learns the union of everything
//! ever tagged with it.

mod split;
mod subsets;

pub use split::{train_val_split, validation_size};
pub use subsets::{subset_count, Subsets};

use crate::mine::{read_records, ChangeRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Names the extraction heuristic picks up from control flow and templates.
const STOPLIST: &[&str] = &["if", "else", "for", "while", "switch", "case", "new", "T"];

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{2,}$").unwrap());

/// Above this many keywords a single record expands into thousands of prompts.
const SUBSET_WARN_THRESHOLD: usize = 12;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One prompt and its comma-joined target labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct DatasetSettings {
    pub input: PathBuf,
    pub train_out: PathBuf,
    pub val_out: PathBuf,
    pub val_ratio: f64,
    pub seed: u64,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("all_openmp_prs2.jsonl"),
            train_out: PathBuf::from("omp_train2.jsonl"),
            val_out: PathBuf::from("omp_val2.jsonl"),
            val_ratio: 0.1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    /// Records that could not be decoded and were skipped.
    pub bad_lines: usize,
    /// Records that contributed to at least one prompt.
    pub used_records: usize,
    /// Unique prompts.
    pub total: usize,
    pub train: usize,
    pub val: usize,
}

impl DatasetSummary {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Keep a function name only if it looks like a real identifier.
pub fn sanitize_function_name(name: &str) -> Option<&str> {
    let name = name.trim();
    if STOPLIST.contains(&name) || !IDENTIFIER.is_match(name) {
        return None;
    }
    Some(name)
}

/// Sorted, deduplicated `filename::function` labels of a record, after
/// sanitization.
pub fn output_targets(record: &ChangeRecord) -> BTreeSet<String> {
    record
        .files_changed
        .iter()
        .flat_map(|file| {
            file.functions
                .iter()
                .filter_map(|f| sanitize_function_name(f))
                .map(move |f| format!("{}::{f}", file.filename))
        })
        .collect()
}

/// Lower-cased, deduplicated, sorted union of a record's tags.
pub fn record_keywords(record: &ChangeRecord) -> Vec<String> {
    let set: BTreeSet<String> = record
        .layer_tags
        .iter()
        .chain(&record.directive_tags)
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    set.into_iter().collect()
}

/// Prompt → union of labels, across every record sharing that keyword subset.
#[derive(Debug, Default)]
pub struct PromptAccumulator {
    prompts: BTreeMap<String, BTreeSet<String>>,
    used_records: usize,
}

impl PromptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record in. Returns `false` when the record carries nothing
    /// usable (no files, no tags, or no label surviving sanitization).
    pub fn add(&mut self, record: &ChangeRecord) -> bool {
        if record.files_changed.is_empty() || !record.has_tags() {
            return false;
        }
        let targets = output_targets(record);
        if targets.is_empty() {
            return false;
        }

        let keywords = record_keywords(record);
        if keywords.len() > SUBSET_WARN_THRESHOLD {
            log::warn!(
                "[dataset] #{} has {} keywords, expanding into {} prompts",
                record.id,
                keywords.len(),
                subset_count(keywords.len())
            );
        }

        for subset in Subsets::new(&keywords) {
            let prompt = subset
                .into_iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            self.prompts
                .entry(prompt)
                .or_default()
                .extend(targets.iter().cloned());
        }
        self.used_records += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn used_records(&self) -> usize {
        self.used_records
    }

    /// Examples in prompt order.
    pub fn into_examples(self) -> Vec<TrainingExample> {
        self.prompts
            .into_iter()
            .map(|(input, labels)| TrainingExample {
                input,
                output: labels.into_iter().collect::<Vec<_>>().join(", "),
            })
            .collect()
    }
}

/// Write examples as JSON lines.
pub fn save_examples(path: &Path, examples: &[TrainingExample]) -> Result<(), DatasetError> {
    let write_err = |source| DatasetError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut out = BufWriter::new(file);
    for example in examples {
        let line = serde_json::to_string(example)?;
        writeln!(out, "{line}").map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;
    Ok(())
}

/// Read the mined records, expand, split and persist both halves.
///
/// An input without a single usable example writes nothing and returns an
/// empty summary.
pub fn build_dataset(settings: &DatasetSettings) -> Result<DatasetSummary, DatasetError> {
    let read_err = |source| DatasetError::Read {
        path: settings.input.clone(),
        source,
    };

    let file = File::open(&settings.input).map_err(read_err)?;
    let (records, bad) = read_records(BufReader::new(file)).map_err(read_err)?;
    for line in &bad {
        log::warn!(
            "[dataset] Skipping line {} of {}: {}",
            line.line,
            settings.input.display(),
            line.error
        );
    }

    let mut acc = PromptAccumulator::new();
    for record in &records {
        acc.add(record);
    }

    let mut summary = DatasetSummary {
        bad_lines: bad.len(),
        used_records: acc.used_records(),
        total: acc.len(),
        ..DatasetSummary::default()
    };

    if acc.is_empty() {
        log::warn!("[dataset] No usable examples in {}", settings.input.display());
        return Ok(summary);
    }

    let (train, val) = train_val_split(acc.into_examples(), settings.val_ratio, settings.seed);
    save_examples(&settings.train_out, &train)?;
    save_examples(&settings.val_out, &val)?;

    summary.train = train.len();
    summary.val = val.len();
    log::info!(
        "[dataset] {} prompts from {} records: {} train, {} val",
        summary.total,
        summary.used_records,
        summary.train,
        summary.val
    );
    Ok(summary)
}
