//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use duckdb::{params, Connection, OptionalExt};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error, Result as CoreResult};
use crate::domain::{Account, Category, CategoryType, NewTransaction};
use crate::ports::{ImportStore, InsertOutcome};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// A category together with how many of the household's transactions use it
#[derive(Debug, Clone, Serialize)]
pub struct CategoryUsage {
    #[serde(flatten)]
    pub category: Category,
    pub transaction_count: i64,
    /// Sum of the transactions' amounts in cents
    pub total_cents: i64,
}

/// DuckDB repository implementation
///
/// Clones share one connection.
#[derive(Clone)]
pub struct DuckDbRepository {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff on file locking errors, which occur
    /// when another kasboek process holds the file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Arc::new(Mutex::new(conn)),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[kasboek] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// In-memory database, used by tests and dry runs
    pub fn in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Run pending migrations
    pub fn run_migrations(&self) -> Result<crate::services::MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    // === Categories ===

    /// Household categories plus the shared defaults, shared first
    pub fn get_categories(&self, household_id: &str) -> Result<Vec<Category>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT CAST(id AS VARCHAR), household_id, name, type, is_fixed, is_allowance
             FROM categories
             WHERE household_id = ? OR household_id IS NULL
             ORDER BY household_id NULLS FIRST, name",
        )?;

        let rows = stmt
            .query_map([household_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, bool>(5)?,
                ))
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, household_id, name, kind, is_fixed, is_allowance)| {
                Ok(Category {
                    id: parse_uuid(&id)?,
                    household_id,
                    name,
                    category_type: CategoryType::from_str(&kind)?,
                    is_fixed,
                    is_allowance,
                })
            })
            .collect()
    }

    /// Create a household category, or return the one that already has
    /// this name (case-insensitive)
    pub fn create_category(
        &self,
        household_id: &str,
        name: &str,
        category_type: CategoryType,
    ) -> Result<Category> {
        let conn = self.lock()?;
        let name_key = name.to_lowercase();

        conn.execute(
            "INSERT INTO categories (id, household_id, scope, name, name_key, type)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (scope, name_key) DO NOTHING",
            params![
                Uuid::new_v4().to_string(),
                household_id,
                household_id,
                name,
                name_key,
                category_type.as_str(),
            ],
        )?;

        let (id, stored_name, kind, is_fixed, is_allowance) = conn.query_row(
            "SELECT CAST(id AS VARCHAR), name, type, is_fixed, is_allowance
             FROM categories WHERE scope = ? AND name_key = ?",
            params![household_id, name_key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            },
        )?;

        Ok(Category {
            id: parse_uuid(&id)?,
            household_id: Some(household_id.to_string()),
            name: stored_name,
            category_type: CategoryType::from_str(&kind)?,
            is_fixed,
            is_allowance,
        })
    }

    /// Categories with per-household transaction counts
    pub fn get_category_usage(&self, household_id: &str) -> Result<Vec<CategoryUsage>> {
        let categories = self.get_categories(household_id)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT CAST(category_id AS VARCHAR), COUNT(*), CAST(SUM(amount_cents) AS BIGINT)
             FROM transactions
             WHERE household_id = ? AND category_id IS NOT NULL
             GROUP BY category_id",
        )?;
        let counts = stmt
            .query_map([household_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(categories
            .into_iter()
            .map(|category| {
                let id = category.id.to_string();
                let (transaction_count, total_cents) = counts
                    .iter()
                    .find(|(c, _, _)| *c == id)
                    .map(|(_, n, total)| (*n, *total))
                    .unwrap_or((0, 0));
                CategoryUsage {
                    category,
                    transaction_count,
                    total_cents,
                }
            })
            .collect())
    }

    // === Accounts ===

    /// The household's oldest account, created with `default_name` if none exists
    pub fn get_or_create_default_account(
        &self,
        household_id: &str,
        default_name: &str,
    ) -> Result<Account> {
        let conn = self.lock()?;

        let existing = conn
            .query_row(
                "SELECT CAST(id AS VARCHAR), name, iban, CAST(created_at AS VARCHAR)
                 FROM accounts WHERE household_id = ?
                 ORDER BY created_at, id LIMIT 1",
                [household_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        if let Some((id, name, iban, created_at)) = existing {
            let mut account = Account::new(parse_uuid(&id)?, household_id, name);
            account.iban = iban;
            if let Some(ts) = created_at.as_deref().and_then(parse_timestamp) {
                account.created_at = ts;
            }
            return Ok(account);
        }

        let account = Account::new(Uuid::new_v4(), household_id, default_name);
        account.validate().map_err(|e| anyhow!(e))?;
        conn.execute(
            "INSERT INTO accounts (id, household_id, name, iban, created_at) VALUES (?, ?, ?, ?, ?)",
            params![
                account.id.to_string(),
                account.household_id,
                account.name,
                account.iban,
                account.created_at.naive_utc().to_string(),
            ],
        )?;

        Ok(account)
    }

    // === Transactions ===

    /// Insert rows in one transaction, skipping fingerprints already stored
    pub fn insert_transactions(&self, rows: &[NewTransaction]) -> Result<InsertOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut outcome = InsertOutcome::default();

        for row in rows {
            let rows_changed = tx.execute(
                "INSERT INTO transactions (id, household_id, account_id, category_id, date,
                                           amount_cents, description, counterparty_name,
                                           counterparty_iban, import_hash)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT (household_id, import_hash) DO NOTHING",
                params![
                    row.id.to_string(),
                    row.household_id,
                    row.account_id.to_string(),
                    row.category_id.map(|id| id.to_string()),
                    row.date.to_string(),
                    row.amount_cents,
                    row.description,
                    row.counterparty_name,
                    row.counterparty_iban,
                    row.import_hash,
                ],
            )?;

            if rows_changed > 0 {
                outcome.inserted += 1;
            } else {
                outcome.duplicates += 1;
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    /// Stored transactions for a household, oldest first
    pub fn get_transactions(&self, household_id: &str) -> Result<Vec<NewTransaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT CAST(id AS VARCHAR), CAST(account_id AS VARCHAR),
                    CAST(category_id AS VARCHAR), CAST(date AS VARCHAR), amount_cents,
                    description, counterparty_name, counterparty_iban, import_hash
             FROM transactions
             WHERE household_id = ?
             ORDER BY date, rowid",
        )?;

        let rows = stmt
            .query_map([household_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(id, account_id, category_id, date, amount_cents, description, name, iban, hash)| {
                    Ok(NewTransaction {
                        id: parse_uuid(&id)?,
                        household_id: household_id.to_string(),
                        account_id: parse_uuid(&account_id)?,
                        category_id: category_id.as_deref().map(parse_uuid).transpose()?,
                        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                            .with_context(|| format!("Invalid stored date '{}'", date))?,
                        amount_cents,
                        description,
                        counterparty_name: name,
                        counterparty_iban: iban,
                        import_hash: hash,
                    })
                },
            )
            .collect()
    }

    pub fn count_transactions(&self, household_id: &str) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE household_id = ?",
            [household_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl DuckDbRepository {
    /// Run store work on the blocking pool so a held connection lock never
    /// stalls an async worker
    async fn blocking<T, F>(&self, work: F) -> CoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DuckDbRepository) -> Result<T> + Send + 'static,
    {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || work(&repo))
            .await
            .map_err(|e| Error::database(format!("Store task failed: {}", e)))?
            .map_err(store_error)
    }
}

#[async_trait]
impl ImportStore for DuckDbRepository {
    async fn get_categories(&self, household_id: &str) -> CoreResult<Vec<Category>> {
        let household_id = household_id.to_string();
        self.blocking(move |repo| DuckDbRepository::get_categories(repo, &household_id))
            .await
    }

    async fn create_category(
        &self,
        household_id: &str,
        name: &str,
        category_type: CategoryType,
    ) -> CoreResult<Category> {
        let household_id = household_id.to_string();
        let name = name.to_string();
        self.blocking(move |repo| {
            DuckDbRepository::create_category(repo, &household_id, &name, category_type)
        })
        .await
    }

    async fn get_or_create_default_account(
        &self,
        household_id: &str,
        default_name: &str,
    ) -> CoreResult<Account> {
        let household_id = household_id.to_string();
        let default_name = default_name.to_string();
        self.blocking(move |repo| {
            DuckDbRepository::get_or_create_default_account(repo, &household_id, &default_name)
        })
        .await
    }

    async fn insert_transactions(&self, rows: &[NewTransaction]) -> CoreResult<InsertOutcome> {
        let rows = rows.to_vec();
        self.blocking(move |repo| DuckDbRepository::insert_transactions(repo, &rows))
            .await
    }
}

fn store_error(e: anyhow::Error) -> Error {
    Error::database(format!("{:#}", e))
}

// Helper functions

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("Invalid stored id '{}'", s))
}

fn parse_timestamp(s: &str) -> Option<chrono::DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn row(household: &str, account: Uuid, hash: &str) -> NewTransaction {
        NewTransaction {
            id: Uuid::new_v4(),
            household_id: household.to_string(),
            account_id: account,
            category_id: None,
            date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            amount_cents: -3141,
            description: "Albert Heijn 1585".to_string(),
            counterparty_name: Some("Albert Heijn".to_string()),
            counterparty_iban: None,
            import_hash: hash.to_string(),
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file: Database is locked"));
        assert!(is_retryable_error("The process cannot access the file"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }

    #[test]
    fn test_shared_categories_visible_to_every_household() {
        let repo = repo();
        let names: Vec<String> = repo
            .get_categories("h1")
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert!(names.contains(&"Vaste Lasten".to_string()));
        assert!(names.contains(&"Overig".to_string()));
    }

    #[test]
    fn test_create_category_is_idempotent_per_household() {
        let repo = repo();
        let first = repo.create_category("h1", "Boodschappen", CategoryType::Expense).unwrap();
        let again = repo.create_category("h1", "boodschappen", CategoryType::Income).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.name, "Boodschappen");
        assert_eq!(again.category_type, CategoryType::Expense);

        let other = repo.create_category("h2", "Boodschappen", CategoryType::Expense).unwrap();
        assert_ne!(other.id, first.id);

        let h1: Vec<_> = repo
            .get_categories("h1")
            .unwrap()
            .into_iter()
            .filter(|c| c.household_id.is_some())
            .collect();
        assert_eq!(h1.len(), 1);
    }

    #[test]
    fn test_default_account_created_once() {
        let repo = repo();
        let first = repo.get_or_create_default_account("h1", "Hoofdrekening").unwrap();
        let second = repo.get_or_create_default_account("h1", "Anders").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Hoofdrekening");
        assert_eq!(second.iban.as_deref(), Some("UNKNOWN"));
    }

    #[test]
    fn test_insert_ignores_known_fingerprints() {
        let repo = repo();
        let account = Uuid::new_v4();

        let outcome = repo
            .insert_transactions(&[row("h1", account, "a"), row("h1", account, "b")])
            .unwrap();
        assert_eq!(outcome, InsertOutcome { inserted: 2, duplicates: 0 });

        let outcome = repo
            .insert_transactions(&[row("h1", account, "b"), row("h1", account, "c")])
            .unwrap();
        assert_eq!(outcome, InsertOutcome { inserted: 1, duplicates: 1 });

        // Same fingerprint in another household is a different row
        let outcome = repo.insert_transactions(&[row("h2", account, "a")]).unwrap();
        assert_eq!(outcome.inserted, 1);

        assert_eq!(repo.count_transactions("h1").unwrap(), 3);
    }

    #[test]
    fn test_transactions_round_trip() {
        let repo = repo();
        let account = Uuid::new_v4();
        let category = repo.create_category("h1", "Boodschappen", CategoryType::Expense).unwrap();
        let mut stored = row("h1", account, "hash-1");
        stored.category_id = Some(category.id);
        repo.insert_transactions(&[stored.clone()]).unwrap();

        let rows = repo.get_transactions("h1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, stored.id);
        assert_eq!(rows[0].date, stored.date);
        assert_eq!(rows[0].category_id, Some(category.id));
        assert_eq!(rows[0].counterparty_iban, None);

        let usage = repo.get_category_usage("h1").unwrap();
        let groceries = usage.iter().find(|u| u.category.id == category.id).unwrap();
        assert_eq!(groceries.transaction_count, 1);
        assert_eq!(groceries.total_cents, -3141);
    }

    #[tokio::test]
    async fn test_store_calls_wait_off_the_runtime() {
        let repo = Arc::new(repo());
        let holder_repo = Arc::clone(&repo);
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let holder = thread::spawn(move || {
            let _conn = holder_repo.lock().unwrap();
            locked_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(300));
        });
        locked_rx.recv().unwrap();

        let store: Arc<dyn ImportStore> = repo.clone();
        let call = tokio::spawn(async move { store.get_categories("h1").await });

        // Timers still fire on this single-threaded runtime while the store
        // waits for the connection
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!call.is_finished());

        holder.join().unwrap();
        assert_eq!(call.await.unwrap().unwrap().len(), 4);
    }
}
