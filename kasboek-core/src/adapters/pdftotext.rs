//! Text extraction through poppler's `pdftotext`

use std::io::Write;
use std::process::Command;

use crate::domain::result::{Error, Result};
use crate::ports::TextExtractor;

/// Runs `pdftotext <file> -` on a temp copy of the document
///
/// Reading-order output (no `-layout`), so each statement line ends up on
/// one text line with its columns collapsed.
pub struct PdftotextExtractor {
    program: String,
}

impl PdftotextExtractor {
    pub fn new() -> Self {
        Self {
            program: "pdftotext".to_string(),
        }
    }

    /// Use another binary, e.g. an absolute path to pdftotext
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for PdftotextExtractor {
    fn name(&self) -> &str {
        "pdftotext"
    }

    fn extract_text(&self, pdf: &[u8]) -> Result<String> {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile()?;
        file.write_all(pdf)?;
        file.flush()?;

        let output = Command::new(&self.program)
            .args(["-enc", "UTF-8"])
            .arg(file.path())
            .arg("-")
            .output()
            .map_err(|e| Error::Extraction(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Extraction(format!(
                "{} failed (exit {}): {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
