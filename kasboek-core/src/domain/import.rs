//! Import request and outcome types

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::transaction::RawTransaction;

/// Shape of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    DelimitedText,
}

/// An uploaded bank export
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub name: String,
    /// Declared media type, e.g. "application/pdf" or "text/csv"
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Declared kind: PDF by media type or extension, delimited text otherwise
    pub fn kind(&self) -> DocumentKind {
        if self.media_type.eq_ignore_ascii_case("application/pdf")
            || self.name.to_lowercase().ends_with(".pdf")
        {
            DocumentKind::Pdf
        } else {
            DocumentKind::DelimitedText
        }
    }
}

/// Everything the import entry point needs from its caller
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    /// Authenticated caller, None when the session is missing
    pub user_id: Option<String>,
    pub household_id: Option<String>,
    pub document: Option<UploadedDocument>,
}

/// Why a whole document could not be used
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("No supported bank format recognized")]
    UnsupportedFormat,

    #[error("Unknown PDF format. Supported formats: Rabobank, ING")]
    UnknownPdfFormat,

    #[error("PDF processing failed: {0}")]
    ExtractionFailed(String),

    #[error("No transactions found in {0} statement; the layout may not be supported")]
    NoTransactions(String),
}

/// Output of one parser pass over a document
#[derive(Debug, Default)]
pub struct ParsedDocument {
    /// Key of the adapter or scanner that handled the document
    pub adapter: Option<String>,
    /// Fingerprinted transactions in document order
    pub transactions: Vec<RawTransaction>,
    /// Line-level problems, one entry per dropped record
    pub warnings: Vec<String>,
    pub document_error: Option<DocumentError>,
}

impl ParsedDocument {
    pub fn failed(adapter: Option<String>, error: DocumentError) -> Self {
        Self {
            adapter,
            document_error: Some(error),
            ..Self::default()
        }
    }

    /// Adapter key, "UNKNOWN" when nothing matched
    pub fn adapter_key(&self) -> &str {
        self.adapter.as_deref().unwrap_or("UNKNOWN")
    }

    /// All problems as text, the document-level one last
    pub fn messages(&self) -> Vec<String> {
        let mut messages = self.warnings.clone();
        if let Some(err) = &self.document_error {
            messages.push(err.to_string());
        }
        messages
    }
}

/// Typed failure kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    Unauthorized,
    MissingHousehold,
    NoFile,
    InvalidFile,
    ParseError,
    NoTransactions,
    InternalError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unauthorized => "UNAUTHORIZED",
            FailureKind::MissingHousehold => "MISSING_HOUSEHOLD",
            FailureKind::NoFile => "NO_FILE",
            FailureKind::InvalidFile => "INVALID_FILE",
            FailureKind::ParseError => "PARSE_ERROR",
            FailureKind::NoTransactions => "NO_TRANSACTIONS",
            FailureKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed import
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ImportFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl ImportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }
}

/// A successful import, possibly with warnings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Rows actually inserted by this run
    pub imported_count: usize,
    /// Rows skipped because their fingerprint was already stored
    pub duplicate_count: usize,
    /// Records stored (or skipped as duplicates) without a category
    pub uncategorized_count: usize,
    pub categories_created: Vec<String>,
    pub adapter: String,
    /// Line-level and enrichment warnings in the order they occurred
    pub warnings: Vec<String>,
}

impl ImportSummary {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Result of one import call
pub type ImportOutcome = std::result::Result<ImportSummary, ImportFailure>;
