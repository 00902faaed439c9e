use super::print_json;
use crate::ast::{validate, AstMatch, ClangFrontend, ParseOptions, SourceFrontend};
use crate::cli::{FrontendKind, OutputFormat};
use crate::config::Settings;
use crate::error::AppError;
use crate::recommend::{
    predict_with_model, CommandGenerator, Prediction, PredictionSource, Recommender,
    BATCH_PROMPTS,
};
use crate::rules::RuleTable;
use colored::Colorize;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RecommendOptions {
    pub model: Option<PathBuf>,
    pub clang: Option<PathBuf>,
    pub frontend: FrontendKind,
    pub rules: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Report {
    prompt: String,
    #[serde(flatten)]
    prediction: Prediction,
    ast_matches: BTreeMap<String, Vec<ReportMatch>>,
}

#[derive(Debug, Serialize)]
struct ReportMatch {
    #[serde(flatten)]
    ast: AstMatch,
    /// `file::name` is one of the predicted labels.
    exact: bool,
}

impl Report {
    fn new(
        prompt: String,
        prediction: Prediction,
        ast_matches: BTreeMap<String, Vec<AstMatch>>,
    ) -> Self {
        let labels: BTreeSet<&str> = prediction.labels.iter().map(String::as_str).collect();
        let ast_matches = ast_matches
            .into_iter()
            .map(|(file, matches)| {
                let matches = matches
                    .into_iter()
                    .map(|ast| {
                        let exact = labels.contains(format!("{file}::{}", ast.name).as_str());
                        ReportMatch { ast, exact }
                    })
                    .collect();
                (file, matches)
            })
            .collect();

        Self {
            prompt,
            prediction,
            ast_matches,
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchEntry {
    prompt: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prediction: Option<Prediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Predict for one prompt and validate the prediction against the checkout.
pub fn run(
    settings: &Settings,
    prompt: Option<String>,
    options: &RecommendOptions,
    format: OutputFormat,
) -> Result<(), AppError> {
    // Everything that can be misconfigured is checked before reading input.
    let root = settings.require_checkout()?;
    let frontend = build_frontend(options)?;
    let rules = load_rules(options)?;
    let generator = build_generator(settings, options)?;

    let prompt = match prompt {
        Some(prompt) => prompt,
        None => read_prompt()?,
    };

    let recommender = Recommender::new(&rules, &generator);
    let prediction = recommender.recommend(&prompt)?;
    let ast_matches = validate(
        frontend.as_ref(),
        root,
        &prediction.files,
        &prediction.labels,
        &ParseOptions::default(),
    );

    let report = Report::new(prompt, prediction, ast_matches);
    if format == OutputFormat::Json {
        return print_json(&report);
    }
    print_report(&report);
    Ok(())
}

/// Run the fixed sample prompts through the model only.
pub fn run_batch(
    settings: &Settings,
    options: &RecommendOptions,
    format: OutputFormat,
) -> Result<(), AppError> {
    let generator = build_generator(settings, options)?;

    let entries: Vec<BatchEntry> = BATCH_PROMPTS
        .iter()
        .map(|&prompt| match predict_with_model(&generator, prompt) {
            Ok(prediction) => BatchEntry {
                prompt,
                prediction: Some(prediction),
                error: None,
            },
            Err(e) => {
                log::warn!("[recommend] {prompt:?}: {e}");
                BatchEntry {
                    prompt,
                    prediction: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    if format == OutputFormat::Json {
        return print_json(&entries);
    }

    for entry in &entries {
        println!("{} {}", "Prompt:".bold(), entry.prompt.cyan());
        match (&entry.prediction, &entry.error) {
            (Some(prediction), _) => print_prediction(prediction),
            (None, Some(error)) => println!("  {} {error}", "Error:".red()),
            (None, None) => {}
        }
        println!();
    }
    Ok(())
}

fn build_frontend(options: &RecommendOptions) -> Result<Box<dyn SourceFrontend>, AppError> {
    match options.frontend {
        FrontendKind::Clang => {
            let clang = ClangFrontend::locate(options.clang.as_deref())?;
            log::debug!("[ast] Using {}", clang.program().display());
            Ok(Box::new(clang))
        }
        FrontendKind::TreeSitter => tree_sitter_frontend(),
    }
}

#[cfg(feature = "symbols-cpp")]
fn tree_sitter_frontend() -> Result<Box<dyn SourceFrontend>, AppError> {
    Ok(Box::new(crate::ast::TreeSitterFrontend))
}

#[cfg(not(feature = "symbols-cpp"))]
fn tree_sitter_frontend() -> Result<Box<dyn SourceFrontend>, AppError> {
    Err(AppError::config(
        "built without the tree-sitter front-end (enable feature `symbols-cpp`)",
    ))
}

fn load_rules(options: &RecommendOptions) -> Result<RuleTable, AppError> {
    match &options.rules {
        Some(path) => Ok(RuleTable::from_path(path)?),
        None => Ok(RuleTable::bundled()),
    }
}

fn build_generator(
    settings: &Settings,
    options: &RecommendOptions,
) -> Result<CommandGenerator, AppError> {
    let model_dir = options.model.as_ref().unwrap_or(&settings.model_dir);
    Ok(CommandGenerator::new(&settings.infer_command, model_dir)?)
}

/// Interactive mode: one line from stdin.
fn read_prompt() -> Result<String, AppError> {
    print!("Feature description: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let prompt = line.trim();
    if prompt.is_empty() {
        return Err(AppError::config("No feature description given"));
    }
    Ok(prompt.to_owned())
}

fn print_prediction(prediction: &Prediction) {
    if let PredictionSource::Rules { matched_keywords } = &prediction.source {
        println!(
            "  {} {}",
            "Rule match:".green(),
            matched_keywords.join(", ")
        );
    }

    println!("  {}", "Predicted files:".bold());
    if prediction.files.is_empty() {
        println!("    {}", "(none)".dimmed());
    }
    for file in &prediction.files {
        println!("    {file}");
    }

    println!("  {}", "Predicted functions:".bold());
    if prediction.labels.is_empty() {
        println!("    {}", "(none)".dimmed());
    }
    for label in &prediction.labels {
        println!("    {label}");
    }

    if prediction.discarded > 0 {
        println!(
            "  {} {} malformed token(s) in model output ignored",
            "Note:".yellow(),
            prediction.discarded
        );
    }
}

fn print_report(report: &Report) {
    println!("{} {}", "Prompt:".bold(), report.prompt.cyan());
    print_prediction(&report.prediction);

    println!("  {}", "AST matches:".bold());
    if report.ast_matches.is_empty() {
        println!("    {}", "(none)".dimmed());
    }
    for (file, matches) in &report.ast_matches {
        println!("    {}", file.cyan());
        for m in matches {
            let flag = if m.exact { "✅" } else { "  " };
            println!(
                "      {flag} {} ({}, line {})",
                m.ast.name,
                m.ast.kind.as_str().dimmed(),
                m.ast.line
            );
        }
    }
}
