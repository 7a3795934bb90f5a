//! Repository port - persistence abstraction for imports

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{Account, Category, CategoryType, NewTransaction};

/// Counts from a conflict-ignoring bulk insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    /// Rows whose fingerprint was already stored for the household
    pub duplicates: usize,
}

/// Storage operations the import pipeline depends on
///
/// Implementations must enforce uniqueness of `(household_id, import_hash)`
/// and report a conflicting insert as a duplicate, not as an error.
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Categories owned by the household plus the shared defaults
    async fn get_categories(&self, household_id: &str) -> Result<Vec<Category>>;

    /// Create a household category
    ///
    /// If a category with the same name already exists for the household
    /// (for example created by a concurrent import), the existing one is
    /// returned.
    async fn create_category(
        &self,
        household_id: &str,
        name: &str,
        category_type: CategoryType,
    ) -> Result<Category>;

    /// The household's first account, created with `default_name` if absent
    async fn get_or_create_default_account(
        &self,
        household_id: &str,
        default_name: &str,
    ) -> Result<Account>;

    /// Insert rows, ignoring fingerprint conflicts
    async fn insert_transactions(&self, rows: &[NewTransaction]) -> Result<InsertOutcome>;
}
