//! Logs command - import history and log maintenance

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use kasboek_core::services::{ImportStats, LogEntry, LogQuery};

use super::get_logger;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events, newest first
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only events that carry an error
        #[arg(long)]
        errors: bool,
        /// Only one event, e.g. import_failed or classifier_retry_exhausted
        #[arg(long)]
        event: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than a number of days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import totals per adapter and failure kind
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List {
            limit,
            errors,
            event,
            json,
        } => list(
            LogQuery {
                event,
                errors_only: errors,
                limit,
            },
            json,
        ),
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(older_than_days, force, json),
        LogsCommands::Stats { json } => stats(json),
    }
}

fn list(query: LogQuery, json: bool) -> Result<()> {
    let entries = get_logger()?.query(&query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Adapter", "Result", "Error"]);
    for entry in &entries {
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.event.clone(),
            entry.source.clone().unwrap_or_default(),
            describe(entry),
            entry
                .error_message
                .as_deref()
                .map(|e| e.red().to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    Ok(())
}

/// One-line outcome of a logged event
fn describe(entry: &LogEntry) -> String {
    let count = |key| entry.detail(key).unwrap_or("0");
    match entry.event.as_str() {
        "import_completed" => format!(
            "{} imported, {} duplicate, {} uncategorized",
            count("imported"),
            count("duplicates"),
            count("uncategorized")
        ),
        "import_failed" => entry.detail("kind").unwrap_or("UNKNOWN").to_string(),
        "classifier_retry_exhausted" => format!("gave up after {} attempts", count("attempts")),
        _ => entry
            .command
            .clone()
            .or_else(|| entry.details.clone())
            .unwrap_or_default(),
    }
}

fn clear(older_than_days: u64, force: bool, json: bool) -> Result<()> {
    let service = get_logger()?;
    let cutoff = Utc::now() - Duration::days(older_than_days as i64);

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete log entries older than {} days?", older_than_days))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = service.delete_before(cutoff.timestamp_millis())?;
    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        output::success(&format!("Deleted {} log entries", deleted));
    }
    Ok(())
}

fn stats(json: bool) -> Result<()> {
    let service = get_logger()?;
    let imports = service.import_stats()?;
    let total = service.count()?;
    let db_path = service.db_path().to_path_buf();
    let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "imports": imports,
                "total_entries": total,
                "database_path": db_path.to_string_lossy(),
                "database_size_bytes": size_bytes,
            }))?
        );
        return Ok(());
    }

    print_import_stats(&imports);
    println!();
    println!(
        "{} entries in {} ({})",
        total,
        db_path.display(),
        output::format_size(size_bytes)
    );
    Ok(())
}

fn print_import_stats(stats: &ImportStats) {
    println!("{}", "Imports".bold());
    println!(
        "  {} completed, {} failed",
        stats.completed.to_string().green(),
        stats.failed.to_string().red()
    );
    println!("  Transactions imported: {}", stats.imported);
    println!("  Duplicates skipped:    {}", stats.duplicates);
    println!("  Without a category:    {}", stats.uncategorized);
    if stats.classifier_retries_exhausted > 0 {
        output::warning(&format!(
            "Classifier gave up on {} record(s)",
            stats.classifier_retries_exhausted
        ));
    }

    if !stats.by_adapter.is_empty() || !stats.failures_by_kind.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Adapter / failure", "Imports"]);
        for (adapter, n) in &stats.by_adapter {
            table.add_row(vec![adapter.clone(), n.to_string()]);
        }
        for (kind, n) in &stats.failures_by_kind {
            table.add_row(vec![kind.red().to_string(), n.to_string()]);
        }
        println!("{}", table);
    }
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}
