//! Positional-text import pipeline for PDF statements

use crate::adapters::statement_text::StatementFamily;
use crate::domain::{DocumentError, ParsedDocument};
use crate::ports::TextExtractor;

/// Extract a PDF's text and scan it
pub fn parse_pdf(extractor: &dyn TextExtractor, bytes: &[u8]) -> ParsedDocument {
    match extractor.extract_text(bytes) {
        Ok(text) => parse_statement_text(&text),
        Err(e) => ParsedDocument::failed(None, DocumentError::ExtractionFailed(e.to_string())),
    }
}

/// Detect the bank family and scan already-extracted statement text
pub fn parse_statement_text(text: &str) -> ParsedDocument {
    let Some(family) = StatementFamily::detect(text) else {
        return ParsedDocument::failed(None, DocumentError::UnknownPdfFormat);
    };
    let adapter = Some(family.key().to_string());

    let scan = match family.scan(text) {
        Ok(scan) => scan,
        Err(e) => {
            return ParsedDocument::failed(adapter, DocumentError::ExtractionFailed(e.to_string()))
        }
    };

    let mut doc = ParsedDocument {
        adapter,
        transactions: scan.drafts.into_iter().map(|d| d.into_raw()).collect(),
        warnings: scan.warnings,
        document_error: None,
    };

    if doc.transactions.is_empty() {
        doc.document_error = Some(DocumentError::NoTransactions(family.bank_name().to_string()));
    }

    doc
}
