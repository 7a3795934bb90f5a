//! Account domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bank account imported transactions are booked on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub household_id: String,
    pub name: String,
    /// "UNKNOWN" until the real IBAN is known
    pub iban: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with required fields
    pub fn new(id: Uuid, household_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            household_id: household_id.into(),
            name: name.into(),
            iban: Some("UNKNOWN".to_string()),
            created_at: Utc::now(),
        }
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("account name cannot be empty");
        }
        if self.household_id.trim().is_empty() {
            return Err("household id cannot be empty");
        }
        Ok(())
    }
}
