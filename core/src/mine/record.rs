use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

/// Functions extracted for one changed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    #[serde(default)]
    pub functions: BTreeSet<String>,
}

/// One mined pull request, persisted as a single JSON line.
///
/// Field names on disk match the historical mined corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "pr_number")]
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "feature_layers", default)]
    pub layer_tags: Vec<String>,
    #[serde(rename = "feature_directives", default)]
    pub directive_tags: Vec<String>,
    #[serde(default)]
    pub files_changed: Vec<ChangedFile>,
}

impl ChangeRecord {
    pub fn has_tags(&self) -> bool {
        !self.layer_tags.is_empty() || !self.directive_tags.is_empty()
    }
}

/// Append one record as a JSON line and flush, so an interrupted run keeps
/// everything written so far.
pub fn write_record<W: Write>(out: &mut W, record: &ChangeRecord) -> Result<(), super::MineError> {
    let line = serde_json::to_string(record)?;
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

/// Open a mined file for appending, creating it if needed. Records from
/// earlier runs are kept, so repeated runs accumulate duplicates.
pub fn open_append(path: &Path) -> io::Result<BufWriter<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

/// A line of a mined file that could not be decoded.
#[derive(Debug)]
pub struct BadLine {
    pub line: usize,
    pub error: serde_json::Error,
}

/// Read every record of a mined JSONL stream. Blank lines are skipped; lines
/// that fail to decode are returned separately so callers decide how loud to
/// be about them.
pub fn read_records<R: BufRead>(reader: R) -> io::Result<(Vec<ChangeRecord>, Vec<BadLine>)> {
    let mut records = Vec::new();
    let mut bad = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str(trimmed) {
            Ok(record) => records.push(record),
            Err(error) => bad.push(BadLine {
                line: idx + 1,
                error,
            }),
        }
    }

    Ok((records, bad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_historical_field_names() {
        let line = r#"{"pr_number": 5, "url": "u", "title": "t", "body": "b",
            "feature_layers": ["codegen"], "feature_directives": ["task"],
            "files_changed": [{"filename": "a.cpp", "functions": ["g", "f", "g"]}]}"#;
        let (records, bad) = read_records(line.replace('\n', " ").as_bytes()).unwrap();
        assert!(bad.is_empty());
        let record = &records[0];
        assert_eq!(record.id, 5);
        assert_eq!(record.layer_tags, vec!["codegen"]);
        assert_eq!(record.files_changed[0].functions.len(), 2);
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let (records, _) = read_records(r#"{"pr_number": 1}"#.as_bytes()).unwrap();
        assert!(!records[0].has_tags());
        assert!(records[0].files_changed.is_empty());
    }

    #[test]
    fn test_bad_and_blank_lines() {
        let input = "\n{\"pr_number\": 1}\nnot json\n\n{\"pr_number\": 2}\n";
        let (records, bad) = read_records(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].line, 3);
    }

    #[test]
    fn test_write_record_is_one_line() {
        let record = ChangeRecord {
            id: 9,
            url: "https://example.com/9".to_owned(),
            title: "title".to_owned(),
            body: "line one\nline two".to_owned(),
            layer_tags: vec!["sema".to_owned()],
            directive_tags: vec![],
            files_changed: vec![ChangedFile {
                filename: "a.cpp".to_owned(),
                functions: ["f".to_owned()].into_iter().collect(),
            }],
        };
        let mut out = Vec::new();
        write_record(&mut out, &record).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"pr_number\":9"));
        assert!(text.contains("\"feature_layers\":[\"sema\"]"));
    }
}
