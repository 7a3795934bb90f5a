//! Import command - import a bank export

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use kasboek_core::services::LogEvent;
use kasboek_core::{ImportFailure, ImportOutcome, ImportRequest, ImportSummary, UploadedDocument};

use super::get_context;
use crate::output;

pub fn run(
    file: PathBuf,
    household: Option<String>,
    media_type: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    if let Some(logger) = &ctx.logger {
        logger.log_quietly(LogEvent::new("command_executed").with_command("import"));
    }

    let bytes = std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let media_type = media_type.unwrap_or_else(|| guess_media_type(&name).to_string());

    let request = ImportRequest {
        user_id: std::env::var("USER").ok().or_else(|| Some("local".to_string())),
        household_id: household,
        document: Some(UploadedDocument::new(name, media_type, bytes)),
    };

    if !json && !ctx.config.classification_enabled() {
        output::warning("OPENAI_API_KEY not set; transactions are imported without a category");
    }

    let spinner = (!json).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Importing {}", file.display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let outcome: ImportOutcome = rt.block_on(ctx.import_service.import(request));

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if json {
        let value = match &outcome {
            Ok(summary) => serde_json::json!({ "success": true, "summary": summary }),
            Err(failure) => serde_json::json!({ "success": false, "failure": failure }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return outcome.map(|_| ()).map_err(|f| anyhow!("{}", f));
    }

    match outcome {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(failure) => {
            print_failure_details(&failure);
            Err(anyhow!("{}", failure))
        }
    }
}

fn guess_media_type(name: &str) -> &'static str {
    if name.to_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "text/csv"
    }
}

fn print_summary(summary: &ImportSummary) {
    output::success(&format!(
        "Imported {} transactions ({})",
        summary.imported_count, summary.adapter
    ));

    if summary.duplicate_count > 0 {
        println!(
            "  {} already imported, skipped",
            summary.duplicate_count.to_string().dimmed()
        );
    }
    if summary.uncategorized_count > 0 {
        println!("  {} without a category", summary.uncategorized_count);
    }
    if !summary.categories_created.is_empty() {
        println!(
            "  New categories: {}",
            summary.categories_created.join(", ").cyan()
        );
    }

    if summary.has_warnings() {
        println!();
        output::warning(&format!("{} warning(s):", summary.warnings.len()));
        for warning in &summary.warnings {
            println!("  {}", warning);
        }
    }
}

fn print_failure_details(failure: &ImportFailure) {
    let Some(details) = &failure.details else {
        return;
    };
    if let Some(warnings) = details.get("warnings").and_then(|w| w.as_array()) {
        for warning in warnings.iter().filter_map(|w| w.as_str()) {
            output::warning(&format!("  {}", warning));
        }
    }
}
