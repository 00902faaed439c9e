use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffParseError {
    #[error("line {line}: invalid hunk header: {header}")]
    InvalidHunkHeader { line: usize, header: String },
    #[error("line {line}: hunk found outside of a file section")]
    HunkWithoutFile { line: usize },
    #[error("line {line}: target file header without a source header")]
    TargetWithoutSource { line: usize },
    #[error("line {line}: hunk diff line expected, found {found:?}")]
    UnexpectedHunkLine { line: usize, found: String },
    #[error("hunk starting at line {line} is shorter than expected")]
    TruncatedHunk { line: usize },
    #[error("line {line}: line number overflows")]
    LineNumberOverflow { line: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    #[serde(rename = "oldStart")]
    pub old_start: u32,
    #[serde(rename = "oldCount")]
    pub old_count: u32,
    #[serde(rename = "newStart")]
    pub new_start: u32,
    #[serde(rename = "newCount")]
    pub new_count: u32,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// Lines that were added or removed, skipping context.
    pub fn changed_lines(&self) -> impl Iterator<Item = &DiffLine> {
        self.lines
            .iter()
            .filter(|line| matches!(line.line_type, LineType::Added | LineType::Removed))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub line_type: LineType,
    pub content: String,
    #[serde(rename = "oldLineNumber")]
    pub old_line_number: Option<u32>,
    #[serde(rename = "newLineNumber")]
    pub new_line_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Context,
    Added,
    Removed,
}

/// One file section of a patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchedFile {
    /// Path from the `---` header, `a/` prefix stripped.
    pub source: String,
    /// Path from the `+++` header, `b/` prefix stripped.
    pub target: String,
    pub hunks: Vec<DiffHunk>,
}

impl PatchedFile {
    /// The path this section refers to. Deleted files report their old path.
    pub fn path(&self) -> &str {
        if self.target == "/dev/null" {
            &self.source
        } else {
            &self.target
        }
    }
}

/// Parse a unified diff (optionally an mbox-formatted patch series) into
/// per-file sections.
///
/// Hunks are consumed by the counts in their headers, so removed lines that
/// happen to start with `---` are not mistaken for file headers. Text outside
/// file sections (mail headers, commit messages, diffstat) is ignored.
pub fn parse_patch(text: &str) -> Result<Vec<PatchedFile>, DiffParseError> {
    let mut files = Vec::new();
    let mut current_file: Option<PatchedFile> = None;
    let mut pending_source: Option<String> = None;
    let mut current_hunk: Option<HunkBuilder> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(builder) = current_hunk.as_mut() {
            builder.push(line, line_no)?;
            if builder.is_complete() {
                if let (Some(builder), Some(file)) = (current_hunk.take(), current_file.as_mut()) {
                    file.hunks.push(builder.build());
                }
            }
            continue;
        }

        if line.starts_with("diff --git ") {
            files.extend(current_file.take());
            pending_source = None;
        } else if let Some(rest) = line.strip_prefix("--- ") {
            pending_source = Some(header_path(rest, "a/"));
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            let source = pending_source
                .take()
                .ok_or(DiffParseError::TargetWithoutSource { line: line_no })?;
            files.extend(current_file.take());
            current_file = Some(PatchedFile {
                source,
                target: header_path(rest, "b/"),
                hunks: Vec::new(),
            });
        } else if line.starts_with("@@") {
            let Some(file) = current_file.as_mut() else {
                return Err(DiffParseError::HunkWithoutFile { line: line_no });
            };
            let (old_start, old_count, new_start, new_count) = parse_hunk_header(line)
                .ok_or_else(|| DiffParseError::InvalidHunkHeader {
                    line: line_no,
                    header: line.to_owned(),
                })?;
            let builder = HunkBuilder {
                header_line: line_no,
                old_start,
                old_count,
                new_start,
                new_count,
                lines: Vec::new(),
                old_line: old_start,
                new_line: new_start,
                old_seen: 0,
                new_seen: 0,
            };
            if builder.is_complete() {
                file.hunks.push(builder.build());
            } else {
                current_hunk = Some(builder);
            }
        }
    }

    if let Some(builder) = current_hunk {
        return Err(DiffParseError::TruncatedHunk {
            line: builder.header_line,
        });
    }
    files.extend(current_file);

    Ok(files)
}

/// Strip the `a/` or `b/` prefix and any trailing timestamp from a file header.
fn header_path(rest: &str, prefix: &str) -> String {
    let path = rest.split('\t').next().unwrap_or(rest).trim_end();
    path.strip_prefix(prefix).unwrap_or(path).to_owned()
}

struct HunkBuilder {
    header_line: usize,
    old_start: u32,
    old_count: u32,
    new_start: u32,
    new_count: u32,
    lines: Vec<DiffLine>,
    old_line: u32,
    new_line: u32,
    old_seen: u32,
    new_seen: u32,
}

impl HunkBuilder {
    fn push(&mut self, line: &str, line_no: usize) -> Result<(), DiffParseError> {
        if let Some(content) = line.strip_prefix('+') {
            self.add_line(LineType::Added, content, line_no)
        } else if let Some(content) = line.strip_prefix('-') {
            self.add_line(LineType::Removed, content, line_no)
        } else if let Some(content) = line.strip_prefix(' ') {
            self.add_line(LineType::Context, content, line_no)
        } else if line.is_empty() {
            self.add_line(LineType::Context, "", line_no)
        } else if line.starts_with('\\') {
            Ok(())
        } else {
            Err(DiffParseError::UnexpectedHunkLine {
                line: line_no,
                found: line.to_owned(),
            })
        }
    }

    fn is_complete(&self) -> bool {
        self.old_seen >= self.old_count && self.new_seen >= self.new_count
    }

    fn add_line(
        &mut self,
        line_type: LineType,
        content: &str,
        line_no: usize,
    ) -> Result<(), DiffParseError> {
        let overflow = || DiffParseError::LineNumberOverflow { line: line_no };
        let (old_ln, new_ln) = match line_type {
            LineType::Added => {
                let n = self.new_line;
                self.new_line = n.checked_add(1).ok_or_else(overflow)?;
                self.new_seen = self.new_seen.saturating_add(1);
                (None, Some(n))
            }
            LineType::Removed => {
                let o = self.old_line;
                self.old_line = o.checked_add(1).ok_or_else(overflow)?;
                self.old_seen = self.old_seen.saturating_add(1);
                (Some(o), None)
            }
            LineType::Context => {
                let o = self.old_line;
                let n = self.new_line;
                self.old_line = o.checked_add(1).ok_or_else(overflow)?;
                self.new_line = n.checked_add(1).ok_or_else(overflow)?;
                self.old_seen = self.old_seen.saturating_add(1);
                self.new_seen = self.new_seen.saturating_add(1);
                (Some(o), Some(n))
            }
        };

        self.lines.push(DiffLine {
            line_type,
            content: content.to_owned(),
            old_line_number: old_ln,
            new_line_number: new_ln,
        });
        Ok(())
    }

    fn build(self) -> DiffHunk {
        DiffHunk {
            old_start: self.old_start,
            old_count: self.old_count,
            new_start: self.new_start,
            new_count: self.new_count,
            lines: self.lines,
        }
    }
}

fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    // @@ -1,5 +1,7 @@ optional context
    let line = line.trim_start_matches("@@ ");
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() < 2 {
        return None;
    }

    let old = parts[0].strip_prefix('-')?;
    let new = parts[1].strip_prefix('+')?;

    let (old_start, old_count) = parse_range(old)?;
    let (new_start, new_count) = parse_range(new)?;

    Some((old_start, old_count, new_start, new_count))
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    if let Some((start, count)) = range.split_once(',') {
        Some((start.parse().ok()?, count.parse().ok()?))
    } else {
        // Single line: "5" means line 5, count 1
        Some((range.parse().ok()?, 1))
    }
}
