//! Heuristic extraction of function-like names from changed patch lines.
//!
//! This is a textual pattern, not a parser. It misses multi-line signatures
//! and picks up some macro invocations and `return foo(...)` statements;
//! dataset sanitization and the curated rule table absorb that noise.

use super::parser::{parse_patch, DiffParseError};
use crate::failure_log::{FailureKind, FailureLog};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Changed source file → function names seen on its added/removed lines.
pub type FileFunctions = BTreeMap<String, BTreeSet<String>>;

/// Only implementation files carry signal; headers are skipped on purpose.
const SOURCE_EXTENSIONS: &[&str] = &[".cpp", ".cc", ".c", ".inc"];

/// Return-type-like prefix, identifier, parenthesized argument list without
/// a semicolon, optionally followed by `{` or `;`.
static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[\w:*&<>\[\]]+\s+)+(?P<name>\w+)\s*\([^;]*\)\s*[{;]?").unwrap()
});

pub fn is_source_file(path: &str) -> bool {
    SOURCE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Match a single line against the signature heuristic.
pub fn function_name_in_line(line: &str) -> Option<&str> {
    SIGNATURE
        .captures(line)
        .and_then(|caps| caps.name("name"))
        .map(|m| m.as_str())
}

/// Parse `patch_text` and collect function names per source file.
pub fn functions_by_file(patch_text: &str) -> Result<FileFunctions, DiffParseError> {
    let mut result = FileFunctions::new();

    for file in parse_patch(patch_text)? {
        let path = file.path();
        if !is_source_file(path) {
            continue;
        }

        let names: BTreeSet<String> = file
            .hunks
            .iter()
            .flat_map(|hunk| hunk.changed_lines())
            .filter_map(|line| function_name_in_line(&line.content))
            .map(str::to_owned)
            .collect();

        if !names.is_empty() {
            // A patch series can touch the same file in several commits.
            result.entry(path.to_owned()).or_default().extend(names);
        }
    }

    Ok(result)
}

/// Like [`functions_by_file`], but a malformed patch is written to the parse
/// failure log and yields an empty map.
pub fn extract_functions(patch_text: &str, change_id: u64, failures: &FailureLog) -> FileFunctions {
    match functions_by_file(patch_text) {
        Ok(map) => map,
        Err(e) => {
            failures.record(FailureKind::Parse, change_id, &e);
            FileFunctions::new()
        }
    }
}
