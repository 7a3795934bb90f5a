//! Kasboek CLI - Dutch bank exports into your household budget

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{categories, import, logs};

/// Kasboek - import bank exports into your household budget
#[derive(Parser)]
#[command(name = "kb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a bank export (ING or Rabobank CSV, or a PDF statement)
    Import {
        /// Path to the export file
        file: PathBuf,
        /// Household to import into
        #[arg(long, env = "KASBOEK_HOUSEHOLD")]
        household: Option<String>,
        /// Declared media type (guessed from the file extension by default)
        #[arg(long)]
        media_type: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List categories and how often they are used
    Categories {
        /// Household to list
        #[arg(long, env = "KASBOEK_HOUSEHOLD")]
        household: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import {
            file,
            household,
            media_type,
            json,
        } => import::run(file, household, media_type, json),
        Commands::Categories { household, json } => categories::run(&household, json),
        Commands::Logs { command } => logs::run(command),
    }
}
