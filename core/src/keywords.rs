//! The two controlled vocabularies used to select changes and key prompts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keywords {
    /// Compiler layers: parsing, semantic analysis, codegen, runtime...
    pub layer: Vec<String>,
    /// OpenMP directive names.
    pub directives: Vec<String>,
}

/// Tags found in a piece of text, in vocabulary order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordMatch {
    pub layer: Vec<String>,
    pub directives: Vec<String>,
}

impl KeywordMatch {
    pub fn is_empty(&self) -> bool {
        self.layer.is_empty() && self.directives.is_empty()
    }
}

impl Keywords {
    /// The vocabulary shipped with the crate.
    pub fn bundled() -> Self {
        let json_str = include_str!("../resources/keywords.json");
        match serde_json::from_str(json_str) {
            Ok(keywords) => keywords,
            Err(e) => {
                log::error!("[keywords] Failed to parse bundled vocabulary: {e}");
                Self {
                    layer: Vec::new(),
                    directives: Vec::new(),
                }
            }
        }
    }

    /// Case-insensitive substring containment, so "ir" also fires on words
    /// like "first". The loose match is what the historical corpus was mined
    /// with.
    pub fn match_text(&self, text: &str) -> KeywordMatch {
        let text = text.to_lowercase();
        let hits = |terms: &[String]| -> Vec<String> {
            terms
                .iter()
                .filter(|kw| text.contains(kw.as_str()))
                .cloned()
                .collect()
        };

        KeywordMatch {
            layer: hits(&self.layer),
            directives: hits(&self.directives),
        }
    }
}
