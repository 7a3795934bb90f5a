//! Upload signature gate
//!
//! Checks that the bytes look like the declared kind before any parser
//! sees them.

use crate::domain::result::{Error, Result};
use crate::domain::DocumentKind;

const PDF_MAGIC: &[u8] = b"%PDF";
const TEXT_SNIFF_LEN: usize = 1024;

/// Validate the leading bytes of an upload against its declared kind
///
/// PDF uploads must start with `%PDF`. Delimited text may not contain
/// control bytes other than tab, LF and CR in its first kilobyte.
pub fn validate_file_signature(kind: DocumentKind, bytes: &[u8]) -> Result<()> {
    match kind {
        DocumentKind::Pdf => {
            if bytes.starts_with(PDF_MAGIC) {
                Ok(())
            } else {
                Err(Error::validation("file is not a PDF document"))
            }
        }
        DocumentKind::DelimitedText => {
            let head = &bytes[..bytes.len().min(TEXT_SNIFF_LEN)];
            match head
                .iter()
                .position(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'))
            {
                Some(offset) => Err(Error::validation(format!(
                    "file contains binary data at byte {}",
                    offset
                ))),
                None => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_magic() {
        assert!(validate_file_signature(DocumentKind::Pdf, b"%PDF-1.4\n%\xe2\xe3").is_ok());
        assert!(validate_file_signature(DocumentKind::Pdf, b"Datum,Bedrag\n").is_err());
        assert!(validate_file_signature(DocumentKind::Pdf, b"%PD").is_err());
    }

    #[test]
    fn test_pdf_bytes_declared_as_text() {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.extend_from_slice(&[0, 1, 2, 3]);
        assert!(validate_file_signature(DocumentKind::DelimitedText, &bytes).is_err());
    }

    #[test]
    fn test_plain_text_passes() {
        let csv = b"\"Datum\",\"Bedrag\"\r\n\"20250101\",\"1,00\"\t\n";
        assert!(validate_file_signature(DocumentKind::DelimitedText, csv).is_ok());
        assert!(validate_file_signature(DocumentKind::DelimitedText, b"").is_ok());
    }

    #[test]
    fn test_control_bytes_rejected() {
        assert!(validate_file_signature(DocumentKind::DelimitedText, &[0, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_only_first_kilobyte_is_checked() {
        let mut bytes = vec![b'a'; TEXT_SNIFF_LEN];
        bytes.push(0);
        assert!(validate_file_signature(DocumentKind::DelimitedText, &bytes).is_ok());
    }
}
