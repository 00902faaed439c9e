//! Hand-curated keyword → `file::function` table consulted before the model.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid rule table: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleTable {
    rules: BTreeMap<String, BTreeSet<String>>,
}

/// Result of a successful rule lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    /// Prompt words that are rule keys, sorted.
    pub matched_keywords: Vec<String>,
    /// Union of the labels of every matched keyword, sorted.
    pub labels: Vec<String>,
}

impl RuleTable {
    /// The table shipped with the crate.
    pub fn bundled() -> Self {
        let json_str = include_str!("../resources/rules.json");
        match Self::from_json(json_str) {
            Ok(table) => table,
            Err(e) => {
                log::error!("[rules] Failed to parse bundled rule table: {e}");
                Self::default()
            }
        }
    }

    /// Load a replacement table with the same shape as the bundled one.
    pub fn from_path(path: &Path) -> Result<Self, RulesError> {
        let json_str = std::fs::read_to_string(path)?;
        Self::from_json(&json_str)
    }

    pub fn from_json(json_str: &str) -> Result<Self, RulesError> {
        let table: Self = serde_json::from_str(json_str)?;
        Ok(Self {
            rules: table
                .rules
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        })
    }

    pub fn from_entries<I, K, L>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<L>)>,
        K: Into<String>,
        L: Into<String>,
    {
        let mut rules: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (keyword, labels) in entries {
            rules
                .entry(keyword.into().to_lowercase())
                .or_default()
                .extend(labels.into_iter().map(Into::into));
        }
        Self { rules }
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn labels_for(&self, keyword: &str) -> Option<&BTreeSet<String>> {
        self.rules.get(keyword)
    }

    /// Look up every whitespace-separated word of `prompt`, lower-cased.
    /// Returns `None` when no word is a rule key.
    pub fn lookup(&self, prompt: &str) -> Option<RuleHit> {
        let matched: BTreeSet<String> = prompt
            .split_whitespace()
            .map(str::to_lowercase)
            .filter(|word| self.rules.contains_key(word))
            .collect();

        if matched.is_empty() {
            return None;
        }

        let labels: BTreeSet<&String> = matched
            .iter()
            .filter_map(|word| self.rules.get(word))
            .flatten()
            .collect();

        Some(RuleHit {
            labels: labels.into_iter().cloned().collect(),
            matched_keywords: matched.into_iter().collect(),
        })
    }
}
