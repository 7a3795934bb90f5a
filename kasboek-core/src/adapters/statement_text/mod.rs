//! Statement text scanners
//!
//! Extracted PDF text loses its column layout. Each bank family gets a
//! heuristic line scanner that recovers date, amount, sign, description and
//! counterparty from the remaining line structure.

mod ing;
mod rabobank;

use crate::domain::result::Result;
use crate::domain::TransactionDraft;

/// Bank families with a supported statement layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFamily {
    /// Single-line records with a type code and a year-less date
    Rabobank,
    /// Multi-line records starting with a full date
    Ing,
}

/// Records and line-level warnings recovered by one scan
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub drafts: Vec<TransactionDraft>,
    pub warnings: Vec<String>,
}

impl StatementFamily {
    /// Detect the bank family from marker phrases anywhere in the text
    pub fn detect(text: &str) -> Option<Self> {
        if text.contains("Rabobank") || text.contains("Rekeningafschrift") {
            Some(StatementFamily::Rabobank)
        } else if text.contains("ING Bank N.V.")
            || text.contains("Af- en bijschrijvingen")
            || text.contains("Bij- en afschrijvingen")
        {
            Some(StatementFamily::Ing)
        } else {
            None
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            StatementFamily::Rabobank => "RABO_PDF",
            StatementFamily::Ing => "ING_PDF",
        }
    }

    /// Bank name used in messages
    pub fn bank_name(&self) -> &'static str {
        match self {
            StatementFamily::Rabobank => "Rabobank",
            StatementFamily::Ing => "ING",
        }
    }

    pub fn scan(&self, text: &str) -> Result<ScanOutput> {
        match self {
            StatementFamily::Rabobank => rabobank::scan(text),
            StatementFamily::Ing => ing::scan(text),
        }
    }
}

/// Trimmed, non-empty lines
fn content_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}
