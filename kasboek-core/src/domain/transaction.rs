//! Transaction domain model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::category::CategoryLabel;

/// A parsed bank line before fingerprinting
///
/// Adapters and statement scanners produce drafts; `into_raw` seals them
/// with the import fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub date: NaiveDate,
    /// Minor units. Positive = inflow, negative = outflow.
    pub amount_cents: i64,
    pub description: String,
    pub counterparty_name: Option<String>,
    pub counterparty_iban: Option<String>,
}

impl TransactionDraft {
    /// Calculate the import fingerprint for this draft
    pub fn fingerprint(&self) -> String {
        compute_fingerprint(
            self.date,
            self.amount_cents,
            self.counterparty_iban.as_deref(),
            &self.description,
        )
    }

    /// Seal the draft into an immutable, fingerprinted transaction
    pub fn into_raw(self) -> RawTransaction {
        let import_hash = self.fingerprint();
        RawTransaction {
            date: self.date,
            amount_cents: self.amount_cents,
            description: self.description,
            counterparty_name: self.counterparty_name,
            counterparty_iban: self.counterparty_iban,
            import_hash,
        }
    }
}

/// A normalized, fingerprinted transaction recovered from a bank export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub description: String,
    pub counterparty_name: Option<String>,
    pub counterparty_iban: Option<String>,
    /// SHA-256 hex digest, the deduplication key
    pub import_hash: String,
}

impl RawTransaction {
    /// Amount as a decimal currency value (cents / 100)
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.amount_cents, 2)
    }
}

/// A transaction after classification
#[derive(Debug, Clone)]
pub struct EnrichedTransaction {
    pub transaction: RawTransaction,
    /// None when the classifier had no answer or failed
    pub category: Option<CategoryLabel>,
    pub confidence: Option<f64>,
}

/// A row ready for persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub id: Uuid,
    pub household_id: String,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub description: String,
    pub counterparty_name: Option<String>,
    pub counterparty_iban: Option<String>,
    pub import_hash: String,
}

/// Render a date as the ISO-8601 instant used in fingerprints
fn iso_instant(date: NaiveDate) -> String {
    format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))
}

/// Calculate the fingerprint hash for deduplication
///
/// Field order is fixed: date instant, amount in cents, counterparty IBAN
/// (empty when unknown) and the raw description, joined by `_`.
pub fn compute_fingerprint(
    date: NaiveDate,
    amount_cents: i64,
    counterparty_iban: Option<&str>,
    description: &str,
) -> String {
    let fingerprint_str = format!(
        "{}_{}_{}_{}",
        iso_instant(date),
        amount_cents,
        counterparty_iban.unwrap_or(""),
        description
    );

    let mut hasher = Sha256::new();
    hasher.update(fingerprint_str.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TransactionDraft {
        TransactionDraft {
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            amount_cents: -5000,
            description: "Albert Heijn 1585".to_string(),
            counterparty_name: Some("Albert Heijn".to_string()),
            counterparty_iban: Some("NL36INGB0003445588".to_string()),
        }
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = draft().fingerprint();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(draft().fingerprint(), draft().fingerprint());
        assert_eq!(draft().into_raw().import_hash, draft().fingerprint());
    }

    #[test]
    fn test_fingerprint_changes_with_each_field() {
        let base = draft().fingerprint();

        let mut d = draft();
        d.date = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        assert_ne!(d.fingerprint(), base);

        let mut d = draft();
        d.amount_cents = -5001;
        assert_ne!(d.fingerprint(), base);

        let mut d = draft();
        d.counterparty_iban = None;
        assert_ne!(d.fingerprint(), base);

        let mut d = draft();
        d.description.push('!');
        assert_ne!(d.fingerprint(), base);
    }

    #[test]
    fn test_counterparty_name_is_not_part_of_fingerprint() {
        let mut d = draft();
        d.counterparty_name = None;
        assert_eq!(d.fingerprint(), draft().fingerprint());
    }

    #[test]
    fn test_known_digest() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 17).unwrap();
        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"2025-11-17T00:00:00.000Z_-19000__SEPA Overboeking");
            hex::encode(hasher.finalize())
        };
        assert_eq!(compute_fingerprint(date, -19000, None, "SEPA Overboeking"), expected);
    }

    #[test]
    fn test_amount_as_decimal() {
        let tx = draft().into_raw();
        assert_eq!(tx.amount().to_string(), "-50.00");
    }
}
