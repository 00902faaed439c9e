use super::print_json;
use crate::cli::OutputFormat;
use crate::dataset::{build_dataset, DatasetSettings};
use crate::error::AppError;
use colored::Colorize;

pub fn run(settings: &DatasetSettings, format: OutputFormat) -> Result<(), AppError> {
    let summary = build_dataset(settings)?;

    if format == OutputFormat::Json {
        return print_json(&summary);
    }

    if summary.bad_lines > 0 {
        eprintln!(
            "{} skipped {} undecodable line(s) in {}",
            "Warning:".yellow(),
            summary.bad_lines,
            settings.input.display()
        );
    }

    if summary.is_empty() {
        println!("No usable examples");
        return Ok(());
    }

    println!(
        "{} {} unique prompt(s) from {} record(s)",
        "✓".green(),
        summary.total.to_string().green(),
        summary.used_records
    );
    println!(
        "  Train: {} → {}",
        summary.train,
        settings.train_out.display()
    );
    println!("  Val:   {} → {}", summary.val, settings.val_out.display());
    Ok(())
}
