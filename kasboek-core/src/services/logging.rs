//! Logging service - structured event logging to DuckDB
//!
//! Events are stored in `logs.duckdb` next to the main database. Only
//! operational facts are recorded (event names, adapter keys, counts and
//! error messages); transaction content such as descriptions, amounts or
//! IBANs is never logged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    // Lower 16 bits hold the per-millisecond counter
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Current unix timestamp in milliseconds
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Where the logged work was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Service,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Service => "service",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    /// Adapter key or classifier name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Counts and other non-identifying context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the command context (for CLI events)
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub event: String,
    pub source: Option<String>,
    pub command: Option<String>,
    pub details: Option<String>,
    pub error_message: Option<String>,
}

impl LogEntry {
    /// Value of one `key=value` pair in the details column
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.as_deref().and_then(|d| detail_value(d, key))
    }

    fn from_row(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            entry_point: row.get(2)?,
            app_version: row.get(3)?,
            event: row.get(4)?,
            source: row.get(5)?,
            command: row.get(6)?,
            details: row.get(7)?,
            error_message: row.get(8)?,
        })
    }
}

/// Value of `key` in a `key=value key=value` details string
fn detail_value<'a>(details: &'a str, key: &str) -> Option<&'a str> {
    details
        .split_whitespace()
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Filter for [`LoggingService::query`]
#[derive(Debug, Clone)]
pub struct LogQuery {
    /// Exact event name, e.g. `import_failed`
    pub event: Option<String>,
    pub errors_only: bool,
    pub limit: usize,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            event: None,
            errors_only: false,
            limit: 50,
        }
    }
}

/// Aggregated import history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub completed: u64,
    pub failed: u64,
    pub imported: u64,
    pub duplicates: u64,
    pub uncategorized: u64,
    pub classifier_retries_exhausted: u64,
    /// Completed imports per adapter key
    pub by_adapter: BTreeMap<String, u64>,
    pub failures_by_kind: BTreeMap<String, u64>,
}

const ENTRY_COLUMNS: &str =
    "id, timestamp, entry_point, app_version, event, source, command, details, error_message";

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
}

impl LoggingService {
    /// Open or create logs.duckdb in the kasboek directory and run any
    /// pending migrations
    pub fn new(
        kasboek_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = kasboek_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;

        let service = Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
        };

        service.run_migrations()?;

        Ok(service)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !table_exists {
            if let Some((name, sql)) = LOG_MIGRATIONS.iter().find(|(n, _)| *n == "000_migrations.sql")
            {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                    [name],
                )?;
            }
        }

        let mut stmt = conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let applied: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for (name, sql) in LOG_MIGRATIONS.iter() {
            if *name == "000_migrations.sql" || applied.iter().any(|a| a == name) {
                continue;
            }
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                [name],
            )?;
        }

        Ok(())
    }

    /// Record an event
    ///
    /// Entry point and app version are added from the service configuration.
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version,
                event, source, command, details, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                &event.event,
                &event.source,
                &event.command,
                &event.details,
                &event.error_message,
            ],
        )?;

        Ok(())
    }

    /// Record an event, reporting failures on stderr only
    ///
    /// Used from code paths where a broken log must not fail the work.
    pub fn log_quietly(&self, event: LogEvent) {
        if let Err(e) = self.log(event) {
            eprintln!("[kasboek] Failed to write log event: {}", e);
        }
    }

    /// Entries matching `query`, newest first
    pub fn query(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let mut filters = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        if let Some(event) = &query.event {
            filters.push("event = ?");
            params.push(Value::Text(event.clone()));
        }
        if query.errors_only {
            filters.push("error_message IS NOT NULL");
        }
        params.push(Value::BigInt(query.limit as i64));

        let where_clause = if filters.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM sys_logs {} ORDER BY timestamp DESC, id DESC LIMIT ?",
            ENTRY_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(params), LogEntry::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Totals over every logged import and classifier give-up
    pub fn import_stats(&self) -> Result<ImportStats> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT event, source, details FROM sys_logs \
             WHERE event IN ('import_completed', 'import_failed', 'classifier_retry_exhausted')",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stats = ImportStats::default();
        for (event, source, details) in rows {
            let details = details.as_deref().unwrap_or("");
            let count = |key: &str| {
                detail_value(details, key)
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0)
            };
            match event.as_str() {
                "import_completed" => {
                    stats.completed += 1;
                    stats.imported += count("imported");
                    stats.duplicates += count("duplicates");
                    stats.uncategorized += count("uncategorized");
                    if let Some(adapter) = source {
                        *stats.by_adapter.entry(adapter).or_default() += 1;
                    }
                }
                "import_failed" => {
                    stats.failed += 1;
                    let kind = detail_value(details, "kind").unwrap_or("UNKNOWN");
                    *stats.failures_by_kind.entry(kind.to_string()).or_default() += 1;
                }
                _ => stats.classifier_retries_exhausted += 1,
            }
        }

        Ok(stats)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete logs older than the given unix-ms timestamp
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
