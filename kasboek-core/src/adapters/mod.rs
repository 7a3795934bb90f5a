//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the ImportStore port
//! - OpenAI chat completions for the Classifier port
//! - poppler's pdftotext for the TextExtractor port
//!
//! The bank format readers live here too: `bank_csv` maps delimited
//! exports row by row, `statement_text` scans text pulled out of PDFs.

pub mod bank_csv;
pub mod disabled;
pub mod duckdb;
pub mod openai;
pub mod pdftotext;
pub mod statement_text;
