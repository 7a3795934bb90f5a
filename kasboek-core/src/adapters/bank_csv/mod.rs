//! Delimited-text bank formats
//!
//! Each supported export is a variant of [`BankFormat`]. The registry is an
//! ordered slice; the first format whose `detect` accepts the header row
//! handles the document, so more specific formats go first.

mod ing;
mod rabo;

use csv::StringRecord;

use crate::domain::result::{Error, Result};
use crate::domain::TransactionDraft;

/// Known delimited-text export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankFormat {
    /// ING "Af Bij" export
    Ing,
    /// Rabobank signed-amount export
    Rabo,
}

/// Registration order used by the import pipeline
pub const REGISTRY: &[BankFormat] = &[BankFormat::Ing, BankFormat::Rabo];

impl BankFormat {
    pub fn key(&self) -> &'static str {
        match self {
            BankFormat::Ing => ing::KEY,
            BankFormat::Rabo => rabo::KEY,
        }
    }

    /// Does this format recognize the header row?
    pub fn detect(&self, headers: &[String]) -> bool {
        match self {
            BankFormat::Ing => ing::detect(headers),
            BankFormat::Rabo => rabo::detect(headers),
        }
    }

    /// Map one data row to an unhashed transaction
    pub fn parse_row(&self, row: &CsvRow<'_>) -> Result<TransactionDraft> {
        match self {
            BankFormat::Ing => ing::parse_row(row),
            BankFormat::Rabo => rabo::parse_row(row),
        }
    }
}

/// First format in `registry` that accepts `headers`
pub fn select_adapter(registry: &[BankFormat], headers: &[String]) -> Option<BankFormat> {
    registry.iter().copied().find(|format| format.detect(headers))
}

fn has_all(headers: &[String], required: &[&str]) -> bool {
    required.iter().all(|r| headers.iter().any(|h| h == r))
}

/// A data row addressed by header name
pub struct CsvRow<'a> {
    headers: &'a [String],
    record: &'a StringRecord,
}

impl<'a> CsvRow<'a> {
    pub fn new(headers: &'a [String], record: &'a StringRecord) -> Self {
        Self { headers, record }
    }

    /// Raw cell value, None when the column is absent
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.record.get(idx)
    }

    /// Trimmed cell value, None when absent or blank
    pub fn optional(&self, column: &str) -> Option<String> {
        self.get(column)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Cell value that must be present
    pub fn require(&self, column: &str) -> Result<&'a str> {
        self.get(column)
            .ok_or_else(|| Error::MissingColumn(column.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detects_ing() {
        let h = headers(&[
            "Datum",
            "Naam / Omschrijving",
            "Rekening",
            "Tegenrekening",
            "Code",
            "Af Bij",
            "Bedrag (EUR)",
            "Mutatiesoort",
            "Mededelingen",
        ]);
        assert_eq!(select_adapter(REGISTRY, &h), Some(BankFormat::Ing));
    }

    #[test]
    fn test_detects_rabo() {
        let h = headers(&["IBAN/BBAN", "Munt", "BIC", "Volgnr", "Datum", "Bedrag"]);
        assert_eq!(select_adapter(REGISTRY, &h), Some(BankFormat::Rabo));
    }

    #[test]
    fn test_unknown_headers() {
        let h = headers(&["Date", "Amount", "Description"]);
        assert_eq!(select_adapter(REGISTRY, &h), None);
    }

    #[test]
    fn test_tie_break_prefers_earlier_registration() {
        let h = headers(&[
            "Datum",
            "Naam / Omschrijving",
            "Rekening",
            "Tegenrekening",
            "Af Bij",
            "Bedrag (EUR)",
            "IBAN/BBAN",
            "Volgnr",
        ]);
        assert!(BankFormat::Ing.detect(&h));
        assert!(BankFormat::Rabo.detect(&h));

        assert_eq!(select_adapter(REGISTRY, &h), Some(BankFormat::Ing));
        assert_eq!(
            select_adapter(&[BankFormat::Rabo, BankFormat::Ing], &h),
            Some(BankFormat::Rabo)
        );
    }

    #[test]
    fn test_row_accessors() {
        let h = headers(&["A", "B"]);
        let record = StringRecord::from(vec!["x", "  "]);
        let row = CsvRow::new(&h, &record);
        assert_eq!(row.get("A"), Some("x"));
        assert_eq!(row.optional("B"), None);
        assert!(matches!(row.require("C"), Err(Error::MissingColumn(c)) if c == "C"));
    }
}
