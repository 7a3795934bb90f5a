//! CLI command implementations

pub mod categories;
pub mod import;
pub mod logs;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use kasboek_core::services::{EntryPoint, LoggingService};
use kasboek_core::KasboekContext;

/// Get the logging service for CLI operations
pub fn get_logger() -> Result<LoggingService> {
    let kasboek_dir = get_kasboek_dir()?;
    std::fs::create_dir_all(&kasboek_dir)
        .with_context(|| format!("Failed to create kasboek directory: {:?}", kasboek_dir))?;
    LoggingService::new(&kasboek_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

/// Get the kasboek directory from environment or default
pub fn get_kasboek_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("KASBOEK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".kasboek"))
        .ok_or_else(|| anyhow!("Could not find home directory; set KASBOEK_DIR"))
}

/// Get or create kasboek context
pub fn get_context() -> Result<KasboekContext> {
    let kasboek_dir = get_kasboek_dir()?;
    KasboekContext::new(&kasboek_dir, EntryPoint::Cli)
        .with_context(|| format!("Failed to initialize kasboek in {:?}", kasboek_dir))
}
