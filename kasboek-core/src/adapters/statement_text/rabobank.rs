//! Rabobank statement scanner
//!
//! ```text
//! Datum vanaf 01-01-2025
//! 05-01ba Albert Heijn 1585 12,50
//! Albert Heijn
//! Pasnummer 123
//! 06-01tb NL91ABNA0417164300      1.250,00
//! ```
//!
//! A record line holds `dd-MM`, a two-letter type code, free text and one
//! amount. The amount lands in either the debit or the credit column; after
//! extraction only the gap before it hints which one.

use chrono::{Datelike, Utc};
use regex::Regex;

use super::{content_lines, ScanOutput};
use crate::domain::result::Result;
use crate::domain::TransactionDraft;
use crate::services::normalize::{parse_date, string_to_cents};

/// Type codes booked in the "Bedrag af" column
const DEBIT_CODES: &[&str] = &[
    "ei", "bc", "ba", "bg", "wb", "st", "db", "cb", "tb", "ic", "gt", "ov", "ac",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmountColumn {
    Debit,
    Credit,
}

/// Column an amount was printed in
///
/// Only a wide gap before the amount survives extraction as a trace of the
/// credit column.
fn amount_column(code: &str, gap_before_amount: bool) -> AmountColumn {
    match (gap_before_amount, DEBIT_CODES.contains(&code)) {
        (true, _) => AmountColumn::Credit,
        (false, true) => AmountColumn::Debit,
        // Unknown codes are mostly payments too
        (false, false) => AmountColumn::Debit,
    }
}

pub(super) fn scan(text: &str) -> Result<ScanOutput> {
    scan_with_year(text, Utc::now().year())
}

pub(super) fn scan_with_year(text: &str, fallback_year: i32) -> Result<ScanOutput> {
    let record_re = Regex::new(r"^(\d{2}-\d{2})([a-z]{2})(.*?)(\d[\d.]*,\d{2})$")?;
    let gap_re = Regex::new(r"\s{3,}$")?;
    let iban_re = Regex::new(r"NL\d{2}\s?[A-Z]{4}\s?\d{4}\s?\d{4}\s?\d{2}")?;
    let year_re = Regex::new(r"Datum vanaf\s+\d{2}-\d{2}-(\d{4})")?;

    let year = year_re
        .captures(text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| fallback_year.to_string());

    let lines = content_lines(text);
    let mut out = ScanOutput::default();

    let mut i = 0;
    while i < lines.len() {
        let Some(caps) = record_re.captures(lines[i]) else {
            i += 1;
            continue;
        };
        let line_no = i + 1;

        let day_month = &caps[1];
        let middle_raw = &caps[3];
        let middle = middle_raw.trim();

        let raw = match string_to_cents(&caps[4]) {
            Ok(cents) => cents,
            Err(e) => {
                out.warnings.push(format!("line {}: {}", line_no, e));
                i += 1;
                continue;
            }
        };

        let amount_cents = match amount_column(&caps[2], gap_re.is_match(middle_raw)) {
            AmountColumn::Credit => raw,
            AmountColumn::Debit => -raw,
        };

        let counterparty_iban = iban_re
            .find(middle)
            .map(|m| m.as_str().split_whitespace().collect::<String>());

        let detail = |i: &mut usize| -> Option<String> {
            let next = lines.get(*i + 1)?;
            if record_re.is_match(next) {
                return None;
            }
            *i += 1;
            Some(next.to_string())
        };
        let counterparty = detail(&mut i);
        let description = detail(&mut i).unwrap_or_else(|| middle.to_string());

        let full_date = format!("{}-{}", day_month, year);
        let date = match parse_date(&full_date, "dd-MM-yyyy") {
            Ok(date) => date,
            Err(_) => {
                out.warnings
                    .push(format!("line {}: invalid date {}", line_no, full_date));
                i += 1;
                continue;
            }
        };

        out.drafts.push(TransactionDraft {
            date,
            amount_cents,
            counterparty_name: counterparty.or_else(|| Some(description.clone())),
            description,
            counterparty_iban,
        });

        i += 1;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const STATEMENT: &str = "
        Rabobank
        Rekeningafschrift
        Datum vanaf 01-01-2025 t/m 31-01-2025
        05-01ba Albert Heijn 1585 12,50
        Albert Heijn
        Pasnummer 123
        06-01tb NL91ABNA0417164300      1.250,00
        Werkgever BV
        Salaris januari
        07-01ei Energie 45,20
        08-01zz Onbekend 3,00
    ";

    #[test]
    fn test_scan_records() {
        let out = scan_with_year(STATEMENT, 1999).unwrap();
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(out.drafts.len(), 4);

        let groceries = &out.drafts[0];
        assert_eq!(groceries.date, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
        assert_eq!(groceries.amount_cents, -1250);
        assert_eq!(groceries.counterparty_name.as_deref(), Some("Albert Heijn"));
        assert_eq!(groceries.description, "Pasnummer 123");
    }

    #[test]
    fn test_gap_marks_credit_and_iban() {
        let out = scan_with_year(STATEMENT, 1999).unwrap();
        let salary = &out.drafts[1];
        assert_eq!(salary.amount_cents, 125000);
        assert_eq!(salary.counterparty_iban.as_deref(), Some("NL91ABNA0417164300"));
        assert_eq!(salary.description, "Salaris januari");
    }

    #[test]
    fn test_adjacent_records_fall_back_to_middle_text() {
        let out = scan_with_year(STATEMENT, 1999).unwrap();

        let energy = &out.drafts[2];
        assert_eq!(energy.amount_cents, -4520);
        assert_eq!(energy.description, "Energie");
        assert_eq!(energy.counterparty_name.as_deref(), Some("Energie"));

        // Unknown type codes default to outflow
        let unknown = &out.drafts[3];
        assert_eq!(unknown.amount_cents, -300);
        assert_eq!(unknown.counterparty_iban, None);
    }

    #[test]
    fn test_amount_column() {
        assert_eq!(amount_column("ba", false), AmountColumn::Debit);
        assert_eq!(amount_column("tb", true), AmountColumn::Credit);
        assert_eq!(amount_column("zz", false), AmountColumn::Debit);
        assert_eq!(amount_column("zz", true), AmountColumn::Credit);
        assert!(DEBIT_CODES.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn test_year_falls_back_when_no_period() {
        let out = scan_with_year("Rabobank\n05-01ba Winkel 1,00", 2024).unwrap();
        assert_eq!(out.drafts[0].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn test_invalid_date_is_a_warning() {
        let out = scan_with_year("Rabobank\n31-02ba Winkel 1,00\n05-01ba Winkel 2,00", 2025)
            .unwrap();
        assert_eq!(out.drafts.len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("31-02-2025"));
    }
}
