use super::print_json;
use crate::cli::OutputFormat;
use crate::config::Settings;
use crate::error::AppError;
use crate::failure_log::{FailureKind, FailureLog};
use crate::keywords::Keywords;
use crate::mine::{open_append, MineSummary, Miner, MinerSettings};
use crate::sources::{GhCliProvider, GitHubProvider, HttpPatchFetcher};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MineArgs {
    pub repo: String,
    pub base: String,
    pub max: usize,
    pub out: PathBuf,
    pub logs: PathBuf,
    pub timeout: u64,
}

pub fn run(settings: &Settings, args: &MineArgs, format: OutputFormat) -> Result<(), AppError> {
    let token = settings.require_token()?;
    let provider = GhCliProvider::new(&args.repo, Some(token.to_owned()));
    if !provider.is_available() {
        return Err(AppError::github(
            "gh CLI not found or not authenticated. Install from https://cli.github.com",
            "auth status",
        ));
    }
    let fetcher = HttpPatchFetcher::new(&args.repo, Duration::from_secs(args.timeout))?;
    let keywords = Keywords::bundled();
    let failures = FailureLog::new(&args.logs);

    let mut out = open_append(&args.out)?;

    let miner_settings = MinerSettings {
        base: args.base.clone(),
        max_records: args.max,
        ..MinerSettings::default()
    };
    log::info!(
        "[miner] Mining {} (base {}) into {}",
        args.repo,
        args.base,
        args.out.display()
    );
    let miner = Miner::new(&provider, &fetcher, &keywords, &failures, miner_settings);
    let summary = miner.run(&mut out)?;

    if format == OutputFormat::Json {
        return print_json(&summary);
    }
    print_summary(&summary, args, &failures);
    Ok(())
}

fn print_summary(summary: &MineSummary, args: &MineArgs, failures: &FailureLog) {
    println!(
        "{} Wrote {} record(s) to {}",
        "✓".green(),
        summary.written.to_string().green(),
        args.out.display()
    );
    println!("  Scanned:            {}", summary.scanned);
    println!("  No keywords:        {}", summary.no_keywords);
    println!("  Download failures:  {}", summary.download_failed);
    println!("  No functions found: {}", summary.no_functions);

    if summary.errors > 0 {
        println!(
            "  {} {} change(s) failed, see {}",
            "Errors:".red(),
            summary.errors,
            failures.path_for(FailureKind::General).display()
        );
    }
    if summary.download_failed > 0 {
        println!(
            "  Download failures are logged in {}",
            failures.path_for(FailureKind::Download).display()
        );
    }
}
