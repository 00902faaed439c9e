pub mod commands;

use crate::config::Settings;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "omp-impact")]
#[command(
    author,
    version,
    about = "Predict which LLVM files and functions an OpenMP feature touches",
    long_about = None
)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Feature description, e.g. "taskwait codegen" (read from stdin when omitted)
    pub prompt: Vec<String>,

    /// Model directory (default: $OMP_IMPACT_MODEL or extra/omp_t5_model2)
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Path to the clang binary used for AST validation (default: clang in PATH)
    #[arg(long, visible_alias = "libclang")]
    pub clang: Option<PathBuf>,

    /// Front-end used for AST validation
    #[arg(long, value_enum, default_value = "clang")]
    pub frontend: FrontendKind,

    /// Replacement rule table (JSON, same shape as the bundled one)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Run the built-in sample prompts through the model and exit
    #[arg(long)]
    pub batch: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FrontendKind {
    /// `clang -Xclang -ast-dump=json`
    #[default]
    Clang,
    /// Built-in tree-sitter C++ grammar
    TreeSitter,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mine closed pull requests into a JSONL file of change records
    Mine {
        /// Repository as owner/name
        #[arg(long, default_value = "llvm/llvm-project")]
        repo: String,

        /// Base branch the pull requests target
        #[arg(long, default_value = "main")]
        base: String,

        /// Stop after this many records have been written
        #[arg(long, default_value = "3000")]
        max: usize,

        /// Output file (appended to)
        #[arg(short, long, default_value = "all_openmp_prs2.jsonl")]
        out: PathBuf,

        /// Directory for the failure logs
        #[arg(long, default_value = "logs")]
        logs: PathBuf,

        /// Patch download timeout in seconds
        #[arg(long, default_value = "15")]
        timeout: u64,
    },

    /// Expand mined records into train/validation example files
    Dataset {
        /// Mined records
        #[arg(short, long, default_value = "all_openmp_prs2.jsonl")]
        input: PathBuf,

        /// Training examples output
        #[arg(long, default_value = "omp_train2.jsonl")]
        train: PathBuf,

        /// Validation examples output
        #[arg(long, default_value = "omp_val2.jsonl")]
        val: PathBuf,

        /// Fraction of prompts held out for validation
        #[arg(long, default_value = "0.1")]
        val_ratio: f64,

        /// Shuffle seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<(), String> {
    let settings = Settings::load();

    match cli.command {
        Some(Commands::Mine {
            repo,
            base,
            max,
            out,
            logs,
            timeout,
        }) => {
            let args = commands::mine::MineArgs {
                repo,
                base,
                max,
                out,
                logs,
                timeout,
            };
            commands::mine::run(&settings, &args, cli.format)?;
        }
        Some(Commands::Dataset {
            input,
            train,
            val,
            val_ratio,
            seed,
        }) => {
            let dataset = crate::dataset::DatasetSettings {
                input,
                train_out: train,
                val_out: val,
                val_ratio,
                seed,
            };
            commands::dataset::run(&dataset, cli.format)?;
        }
        None => {
            let options = commands::recommend::RecommendOptions {
                model: cli.model,
                clang: cli.clang,
                frontend: cli.frontend,
                rules: cli.rules,
            };
            if cli.batch {
                commands::recommend::run_batch(&settings, &options, cli.format)?;
            } else {
                let prompt = (!cli.prompt.is_empty()).then(|| cli.prompt.join(" "));
                commands::recommend::run(&settings, prompt, &options, cli.format)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_prompt_words_and_aliases() {
        let cli = Cli::try_parse_from([
            "omp-impact",
            "taskwait",
            "codegen",
            "--libclang",
            "/usr/bin/clang-18",
            "--frontend",
            "tree-sitter",
        ])
        .unwrap();
        assert_eq!(cli.prompt, vec!["taskwait", "codegen"]);
        assert_eq!(cli.clang, Some(PathBuf::from("/usr/bin/clang-18")));
        assert_eq!(cli.frontend, FrontendKind::TreeSitter);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_subcommand_defaults() {
        let cli = Cli::try_parse_from(["omp-impact", "dataset", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Some(Commands::Dataset {
                val_ratio, seed, ..
            }) => {
                assert!((val_ratio - 0.1).abs() < f64::EPSILON);
                assert_eq!(seed, 42);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["omp-impact", "mine"]).unwrap();
        match cli.command {
            Some(Commands::Mine { max, timeout, .. }) => {
                assert_eq!(max, 3000);
                assert_eq!(timeout, 15);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
