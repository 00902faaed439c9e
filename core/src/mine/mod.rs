//! Walks closed pull requests and turns the OpenMP-relevant ones into
//! [`ChangeRecord`]s.
//!
//! Everything is sequential. A change that fails at any step is logged and
//! skipped; only a failure to list pull requests stops the run.

pub mod record;

pub use record::{open_append, read_records, write_record, ChangeRecord, ChangedFile};

use crate::diff::extract_functions;
use crate::failure_log::{FailureKind, FailureLog};
use crate::keywords::Keywords;
use crate::sources::{GitHubProvider, PatchFetcher, PullRequest};
use serde::Serialize;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MineError {
    #[error("Listing pull requests failed on page {page}: {message}")]
    Listing { page: u32, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct MinerSettings {
    /// Base branch the pull requests were opened against.
    pub base: String,
    /// Stop after this many records have been written.
    pub max_records: usize,
    pub per_page: u32,
}

impl Default for MinerSettings {
    fn default() -> Self {
        Self {
            base: "main".to_owned(),
            max_records: 3000,
            per_page: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MineSummary {
    pub scanned: usize,
    pub no_keywords: usize,
    pub download_failed: usize,
    pub no_functions: usize,
    pub written: usize,
    pub errors: usize,
}

/// What happened to a single pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    NoKeywords,
    DownloadFailed,
    NoFunctions,
    Written,
}

pub struct Miner<'a, P, F> {
    provider: &'a P,
    fetcher: &'a F,
    keywords: &'a Keywords,
    failures: &'a FailureLog,
    settings: MinerSettings,
}

impl<'a, P, F> Miner<'a, P, F>
where
    P: GitHubProvider,
    F: PatchFetcher,
{
    pub fn new(
        provider: &'a P,
        fetcher: &'a F,
        keywords: &'a Keywords,
        failures: &'a FailureLog,
        settings: MinerSettings,
    ) -> Self {
        Self {
            provider,
            fetcher,
            keywords,
            failures,
            settings,
        }
    }

    /// Mine until `max_records` have been written to `out` or the listing is
    /// exhausted.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<MineSummary, MineError> {
        let mut summary = MineSummary::default();
        let mut page = 1;

        'pages: while summary.written < self.settings.max_records {
            let prs = self
                .provider
                .list_closed_pull_requests(&self.settings.base, page, self.settings.per_page)
                .map_err(|e| MineError::Listing {
                    page,
                    message: e.to_string(),
                })?;

            if prs.is_empty() {
                break;
            }

            for pr in &prs {
                if summary.written >= self.settings.max_records {
                    break 'pages;
                }
                summary.scanned += 1;

                match self.process(pr, out) {
                    Ok(Outcome::NoKeywords) => summary.no_keywords += 1,
                    Ok(Outcome::DownloadFailed) => summary.download_failed += 1,
                    Ok(Outcome::NoFunctions) => summary.no_functions += 1,
                    Ok(Outcome::Written) => summary.written += 1,
                    Err(e) => {
                        summary.errors += 1;
                        self.failures.record(FailureKind::General, pr.number, &e);
                    }
                }
            }

            page += 1;
        }

        log::info!(
            "[miner] Scanned {} pull request(s), wrote {} record(s)",
            summary.scanned,
            summary.written
        );
        Ok(summary)
    }

    fn process<W: Write>(&self, pr: &PullRequest, out: &mut W) -> Result<Outcome, MineError> {
        let text = format!("{}\n{}", pr.title(), pr.body());
        let tags = self.keywords.match_text(&text);
        if tags.is_empty() {
            return Ok(Outcome::NoKeywords);
        }

        let patch = match self.fetcher.fetch_patch(pr.number) {
            Ok(patch) => patch,
            Err(e) => {
                self.failures.record(FailureKind::Download, pr.number, &e);
                return Ok(Outcome::DownloadFailed);
            }
        };

        let functions = extract_functions(&patch, pr.number, self.failures);
        if functions.is_empty() {
            return Ok(Outcome::NoFunctions);
        }

        let record = ChangeRecord {
            id: pr.number,
            url: pr.html_url.clone(),
            title: pr.title().to_owned(),
            body: pr.body().to_owned(),
            layer_tags: tags.layer,
            directive_tags: tags.directives,
            files_changed: functions
                .into_iter()
                .map(|(filename, functions)| ChangedFile {
                    filename,
                    functions,
                })
                .collect(),
        };

        write_record(out, &record)?;
        log::info!(
            "[miner] #{}: {} file(s) recorded",
            record.id,
            record.files_changed.len()
        );
        Ok(Outcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::FetchError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct FakeError;

    impl std::fmt::Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "listing unavailable")
        }
    }

    impl std::error::Error for FakeError {}

    struct FakeProvider {
        pages: Vec<Vec<PullRequest>>,
        fail: bool,
    }

    impl GitHubProvider for FakeProvider {
        type Error = FakeError;

        fn is_available(&self) -> bool {
            true
        }

        fn list_closed_pull_requests(
            &self,
            _base: &str,
            page: u32,
            _per_page: u32,
        ) -> Result<Vec<PullRequest>, FakeError> {
            if self.fail {
                return Err(FakeError);
            }
            Ok(self.pages.get(page as usize - 1).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        patches: HashMap<u64, String>,
        requested: RefCell<Vec<u64>>,
    }

    impl PatchFetcher for FakeFetcher {
        fn fetch_patch(&self, number: u64) -> Result<String, FetchError> {
            self.requested.borrow_mut().push(number);
            self.patches
                .get(&number)
                .cloned()
                .ok_or(FetchError::Status(404))
        }
    }

    fn pr(number: u64, title: &str) -> PullRequest {
        PullRequest {
            number,
            title: Some(title.to_owned()),
            body: None,
            html_url: format!("https://github.com/llvm/llvm-project/pull/{number}"),
            updated_at: String::new(),
        }
    }

    fn cpp_patch(name: &str) -> String {
        format!("--- a/clang/lib/CodeGen/CGOpenMPRuntime.cpp\n+++ b/clang/lib/CodeGen/CGOpenMPRuntime.cpp\n@@ -1,0 +1,1 @@\n+void {name}(CodeGenFunction &CGF) {{\n")
    }

    #[test]
    fn test_irrelevant_change_is_never_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let failures = FailureLog::new(dir.path());
        let keywords = Keywords::bundled();
        let provider = FakeProvider {
            pages: vec![vec![pr(1, "Update README")]],
            fail: false,
        };
        let fetcher = FakeFetcher::default();
        let miner = Miner::new(&provider, &fetcher, &keywords, &failures, MinerSettings::default());

        let mut out = Vec::new();
        let summary = miner.run(&mut out).unwrap();

        assert_eq!(summary.no_keywords, 1);
        assert!(fetcher.requested.borrow().is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_pipeline_skips_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let failures = FailureLog::new(dir.path());
        let keywords = Keywords::bundled();
        let provider = FakeProvider {
            pages: vec![
                vec![pr(10, "[OpenMP] taskwait codegen"), pr(11, "[OpenMP] barrier sema")],
                vec![pr(12, "[OpenMP] flush runtime")],
            ],
            fail: false,
        };
        let mut fetcher = FakeFetcher::default();
        fetcher.patches.insert(10, cpp_patch("emitTaskwaitCall"));
        // 11 has no patch: download failure
        fetcher.patches.insert(12, "--- a/README.md\n+++ b/README.md\n@@ -1 +1 @@\n-a\n+b\n".to_owned());
        let miner = Miner::new(&provider, &fetcher, &keywords, &failures, MinerSettings::default());

        let mut out = Vec::new();
        let summary = miner.run(&mut out).unwrap();

        assert_eq!(
            summary,
            MineSummary {
                scanned: 3,
                no_keywords: 0,
                download_failed: 1,
                no_functions: 1,
                written: 1,
                errors: 0,
            }
        );
        let (records, _) = read_records(out.as_slice()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 10);
        assert_eq!(records[0].layer_tags, vec!["codegen"]);
        assert_eq!(records[0].directive_tags, vec!["task", "taskwait"]);
        assert_eq!(
            records[0].files_changed[0].filename,
            "clang/lib/CodeGen/CGOpenMPRuntime.cpp"
        );

        let downloads = std::fs::read_to_string(dir.path().join("failed_downloads.txt")).unwrap();
        assert_eq!(downloads, "11 - download error: unexpected HTTP status 404\n");
    }

    #[test]
    fn test_stops_at_max_records() {
        let dir = tempfile::tempdir().unwrap();
        let failures = FailureLog::new(dir.path());
        let keywords = Keywords::bundled();
        let provider = FakeProvider {
            pages: vec![vec![pr(1, "simd codegen"), pr(2, "simd codegen"), pr(3, "simd codegen")]],
            fail: false,
        };
        let mut fetcher = FakeFetcher::default();
        for n in 1..=3 {
            fetcher.patches.insert(n, cpp_patch("emitSimd"));
        }
        let settings = MinerSettings {
            max_records: 2,
            ..MinerSettings::default()
        };
        let miner = Miner::new(&provider, &fetcher, &keywords, &failures, settings);

        let mut out = Vec::new();
        let summary = miner.run(&mut out).unwrap();

        assert_eq!(summary.written, 2);
        assert_eq!(*fetcher.requested.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_listing_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let failures = FailureLog::new(dir.path());
        let keywords = Keywords::bundled();
        let provider = FakeProvider {
            pages: vec![],
            fail: true,
        };
        let fetcher = FakeFetcher::default();
        let miner = Miner::new(&provider, &fetcher, &keywords, &failures, MinerSettings::default());

        let err = miner.run(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, MineError::Listing { page: 1, .. }));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_logged_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let failures = FailureLog::new(dir.path());
        let keywords = Keywords::bundled();
        let provider = FakeProvider {
            pages: vec![vec![pr(1, "simd codegen"), pr(2, "simd codegen")]],
            fail: false,
        };
        let mut fetcher = FakeFetcher::default();
        fetcher.patches.insert(1, cpp_patch("emitSimd"));
        fetcher.patches.insert(2, cpp_patch("emitSimd"));
        let miner = Miner::new(&provider, &fetcher, &keywords, &failures, MinerSettings::default());

        let summary = miner.run(&mut FailingWriter).unwrap();

        assert_eq!(summary.errors, 2);
        assert_eq!(summary.written, 0);
        let general = std::fs::read_to_string(dir.path().join("failed_prs.txt")).unwrap();
        assert!(general.starts_with("1 - general error: IO error: disk full"));
    }
}
