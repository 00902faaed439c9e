//! Append-only plain-text logs for per-change failures.
//!
//! Each line is `<id> - <context>: <error>`. The files accumulate across runs.

use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Patch download failed (network error or non-200 response).
    Download,
    /// Patch text was not a valid unified diff.
    Parse,
    /// Anything else that went wrong while handling one change.
    General,
}

impl FailureKind {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Download => "failed_downloads.txt",
            Self::Parse => "failed_parsing.txt",
            Self::General => "failed_prs.txt",
        }
    }

    pub fn context(self) -> &'static str {
        match self {
            Self::Download => "download error",
            Self::Parse => "parse error",
            Self::General => "general error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FailureLog {
    dir: PathBuf,
}

impl FailureLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, kind: FailureKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Record a failure. Never fails; a log that cannot be written is
    /// reported through `log::error!` instead.
    pub fn record(&self, kind: FailureKind, id: u64, error: &dyn Display) {
        let line = format!("{id} - {}: {error}", kind.context());
        log::warn!("[failures] {line}");

        if let Err(e) = self.append(kind, &line) {
            log::error!(
                "[failures] Could not write to {}: {e}",
                self.path_for(kind).display()
            );
        }
    }

    fn append(&self, kind: FailureKind, line: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(kind))?;
        writeln!(file, "{line}")
    }
}
