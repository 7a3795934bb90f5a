//! Text extraction port
//!
//! Turns a page-layout document into plain text. Column structure does not
//! survive extraction; statement scanners work on the resulting lines.

use crate::domain::result::Result;

pub trait TextExtractor: Send + Sync {
    /// Extractor name (e.g., "pdftotext")
    fn name(&self) -> &str;

    fn extract_text(&self, pdf: &[u8]) -> Result<String>;
}
