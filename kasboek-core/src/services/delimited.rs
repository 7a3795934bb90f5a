//! Delimited-text import pipeline
//!
//! Reads the header row, picks a bank format from the registry, then maps
//! each data row on its own. A bad row becomes a warning and never stops
//! the run.

use csv::{ReaderBuilder, StringRecord};

use crate::adapters::bank_csv::{select_adapter, BankFormat, CsvRow, REGISTRY};
use crate::domain::{DocumentError, ParsedDocument};

/// Parse a bank export with the default registry
pub fn parse_delimited(bytes: &[u8]) -> ParsedDocument {
    parse_delimited_with(REGISTRY, bytes)
}

/// Parse a bank export, trying `registry` in order
pub fn parse_delimited_with(registry: &[BankFormat], bytes: &[u8]) -> ParsedDocument {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}');

    let Some(header_line) = text.lines().find(|l| !l.trim().is_empty()) else {
        return ParsedDocument::failed(None, DocumentError::UnsupportedFormat);
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(sniff_delimiter(header_line))
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record.iter().map(|h| h.trim().to_string()).collect(),
        Err(_) => return ParsedDocument::failed(None, DocumentError::UnsupportedFormat),
    };

    let Some(format) = select_adapter(registry, &headers) else {
        return ParsedDocument::failed(None, DocumentError::UnsupportedFormat);
    };

    let mut doc = ParsedDocument {
        adapter: Some(format.key().to_string()),
        ..ParsedDocument::default()
    };

    let mut record = StringRecord::new();
    loop {
        let line = reader.position().line();
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                doc.warnings.push(format!("line {}: {}", line, e));
                continue;
            }
        }

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or(line);
        match format.parse_row(&CsvRow::new(&headers, &record)) {
            Ok(draft) => doc.transactions.push(draft.into_raw()),
            Err(e) => doc.warnings.push(format!("line {}: {}", line, e)),
        }
    }

    doc
}

/// Pick `;` or `,` from the header line, whichever occurs more
fn sniff_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ING_HEADER: &str = "\"Datum\",\"Naam / Omschrijving\",\"Rekening\",\"Tegenrekening\",\"Code\",\"Af Bij\",\"Bedrag (EUR)\",\"Mutatiesoort\",\"Mededelingen\"";

    fn ing_row(date: &str, name: &str, direction: &str, amount: &str) -> String {
        format!(
            "\"{}\",\"{}\",\"NL01INGB0001234567\",\"\",\"BA\",\"{}\",\"{}\",\"Betaalautomaat\",\"\"",
            date, name, direction, amount
        )
    }

    #[test]
    fn test_ing_document() {
        let csv = [
            ING_HEADER.to_string(),
            ing_row("20250131", "Albert Heijn 1585", "Af", "31,41"),
            ing_row("20250125", "Werkgever BV", "Bij", "2.500,00"),
        ]
        .join("\n");

        let doc = parse_delimited(csv.as_bytes());
        assert_eq!(doc.adapter_key(), "ING_NL");
        assert!(doc.document_error.is_none());
        assert!(doc.warnings.is_empty());
        assert_eq!(doc.transactions.len(), 2);
        assert_eq!(doc.transactions[0].amount_cents, -3141);
        assert_eq!(doc.transactions[1].amount_cents, 250000);
        assert_eq!(doc.transactions[0].counterparty_iban, None);
    }

    #[test]
    fn test_semicolon_rabo_document() {
        let csv = "IBAN/BBAN;Munt;Volgnr;Datum;Bedrag;Tegenrekening IBAN/BBAN;Naam tegenpartij;Omschrijving-1;Omschrijving-2\n\
                   NL11RABO0123456789;EUR;1;2025-02-03;-45,20;NL20ENEC0000000001;Eneco;Termijn;Feb\n\
                   \n\
                   NL11RABO0123456789;EUR;2;2025-02-04;+12,00;;;Teruggave;\n";

        let doc = parse_delimited(csv.as_bytes());
        assert_eq!(doc.adapter_key(), "RABO_NL");
        assert_eq!(doc.transactions.len(), 2);
        assert_eq!(doc.transactions[0].amount_cents, -4520);
        assert_eq!(doc.transactions[1].amount_cents, 1200);
    }

    #[test]
    fn test_unknown_format_is_document_error() {
        let doc = parse_delimited(b"Date,Amount,Description\n2025-01-01,1.00,Coffee\n");
        assert_eq!(doc.document_error, Some(DocumentError::UnsupportedFormat));
        assert!(doc.transactions.is_empty());
        assert_eq!(doc.adapter_key(), "UNKNOWN");
    }

    #[test]
    fn test_empty_document() {
        let doc = parse_delimited(b"\n\n");
        assert_eq!(doc.document_error, Some(DocumentError::UnsupportedFormat));
    }

    #[test]
    fn test_bad_row_is_isolated() {
        let mut lines = vec![ING_HEADER.to_string()];
        for day in 1..=50 {
            let date = if day == 17 {
                "2025-01-17".to_string()
            } else {
                format!("202501{:02}", (day % 28) + 1)
            };
            lines.push(ing_row(&date, &format!("Winkel {}", day), "Af", "1,00"));
        }

        let doc = parse_delimited(lines.join("\n").as_bytes());
        assert!(doc.document_error.is_none());
        assert_eq!(doc.transactions.len(), 49);
        assert_eq!(doc.warnings.len(), 1);
        assert!(doc.warnings[0].starts_with("line 18:"), "{}", doc.warnings[0]);
    }

    #[test]
    fn test_extreme_amount_becomes_row_warning() {
        let csv = [
            ING_HEADER.to_string(),
            ing_row("20250101", "Bank", "Af", "-92.233.720.368.547.758,08"),
            ing_row("20250102", "Winkel", "Af", "2,00"),
        ]
        .join("\n");

        let doc = parse_delimited(csv.as_bytes());
        assert!(doc.document_error.is_none());
        assert_eq!(doc.transactions.len(), 1);
        assert_eq!(doc.transactions[0].amount_cents, -200);
        assert_eq!(doc.warnings.len(), 1);
        assert!(doc.warnings[0].starts_with("line 2:"), "{}", doc.warnings[0]);
    }

    #[test]
    fn test_output_follows_input_order() {
        let csv = [
            ING_HEADER.to_string(),
            ing_row("20250103", "C", "Af", "3,00"),
            ing_row("20250101", "A", "Af", "1,00"),
            ing_row("20250102", "B", "Af", "2,00"),
        ]
        .join("\n");

        let doc = parse_delimited(csv.as_bytes());
        let names: Vec<_> = doc
            .transactions
            .iter()
            .map(|t| t.description.as_str())
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c"), b';');
        assert_eq!(sniff_delimiter("a,b,c"), b',');
        assert_eq!(sniff_delimiter("\"Naam, voluit\";b;c"), b';');
    }
}
