//! ING statement scanner
//!
//! ```text
//! 17-11-2025SEPA Overboeking IBAN:
//! NL36INGB0003445588 BIC: INGBNL2A
//! Naam: Iemand
//! 190,00
//! ```
//!
//! A line starting with `dd-MM-yyyy` opens a record. The amount is either at
//! the end of that line or alone on a later line; everything in between is
//! description. Af/Bij columns do not survive extraction, so amounts are
//! booked as outflow.

use regex::Regex;

use super::{content_lines, ScanOutput};
use crate::domain::result::Result;
use crate::domain::TransactionDraft;
use crate::services::normalize::{parse_date, string_to_cents};

pub(super) fn scan(text: &str) -> Result<ScanOutput> {
    let date_re = Regex::new(r"^(\d{2}-\d{2}-\d{4})")?;
    let amount_re = Regex::new(r"[\d.]+,\d{2}")?;
    let trailing_amount_re = Regex::new(r"[\d.]+,\d{2}$")?;
    let amount_line_re = Regex::new(r"^[\d.]+,\d{2}$")?;
    let iban_re = Regex::new(r"IBAN:\s*([A-Z]{2}\d{2}[A-Z0-9]{4,})")?;

    let lines = content_lines(text);
    let mut out = ScanOutput::default();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let Some(caps) = date_re.captures(line) else {
            i += 1;
            continue;
        };
        let line_no = i + 1;
        let date_str = &caps[1];

        let date = match parse_date(date_str, "dd-MM-yyyy") {
            Ok(date) => date,
            Err(e) => {
                out.warnings.push(format!("line {}: {}", line_no, e));
                i += 1;
                continue;
            }
        };

        let mut description = line[date_str.len()..].trim().to_string();
        let mut amount_text: Option<String> = None;

        if trailing_amount_re.is_match(line) {
            let amounts: Vec<&str> = amount_re.find_iter(line).map(|m| m.as_str()).collect();
            if let Some(last) = amounts.last() {
                amount_text = Some(last.to_string());
                description = description.replacen(last, "", 1).trim().to_string();
            }
            // Af and Bij columns may both be printed
            if amounts.len() > 1 {
                let previous = amounts[amounts.len() - 2];
                description = description.replacen(previous, "", 1).trim().to_string();
            }
        } else {
            let mut j = i + 1;
            while j < lines.len() {
                let next = lines[j];
                if date_re.is_match(next) {
                    break;
                }
                if amount_line_re.is_match(next) {
                    amount_text = Some(next.to_string());
                    i = j;
                    break;
                }
                description.push(' ');
                description.push_str(next);
                i = j;
                j += 1;
            }
        }

        // No amount before the next date: a heading such as a period line
        let Some(amount_text) = amount_text else {
            i += 1;
            continue;
        };

        let amount_cents = match string_to_cents(&amount_text) {
            Ok(cents) => -cents.abs(),
            Err(e) => {
                out.warnings.push(format!("line {}: {}", line_no, e));
                i += 1;
                continue;
            }
        };

        let description = description.trim().to_string();
        let counterparty_iban = iban_re
            .captures(&description)
            .map(|caps| caps[1].to_string());
        let counterparty_name = description
            .split("Naam:")
            .nth(1)
            .and_then(|rest| rest.split("Omschrijving:").next())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        out.drafts.push(TransactionDraft {
            date,
            amount_cents,
            description,
            counterparty_name,
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

    #[test]
    fn test_amount_on_separate_lines() {
        let text = "
            Datum: 18-11-2025
            17-11-2025SEPA Overboeking IBAN:
            NL36INGB0003445588 BIC: INGBNL2A
            Naam: Iemand
            190,00
            17-11-2025BEA, Apple Pay Jumbo Udenhout Kreit
            25,81
            17-11-2025BEA, Apple Pay Albert Heijn 1585
            31,41
        ";

        let out = scan(text).unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(out.drafts.len(), 3);
        assert_eq!(out.drafts[0].amount_cents, -19000);
        assert_eq!(out.drafts[1].amount_cents, -2581);
        assert_eq!(out.drafts[2].amount_cents, -3141);
        assert_eq!(out.drafts[2].description, "BEA, Apple Pay Albert Heijn 1585");
        assert_eq!(
            out.drafts[0].date,
            NaiveDate::from_ymd_opt(2025, 11, 17).unwrap()
        );
    }

    #[test]
    fn test_iban_and_name_from_description() {
        let text = "
            17-11-2025SEPA Overboeking IBAN:
            NL36INGB0003445588 BIC: INGBNL2A
            Naam: Iemand
            190,00
        ";

        let out = scan(text).unwrap();
        let tx = &out.drafts[0];
        assert_eq!(tx.counterparty_iban.as_deref(), Some("NL36INGB0003445588"));
        assert_eq!(tx.counterparty_name.as_deref(), Some("Iemand"));
    }

    #[test]
    fn test_multi_line_description() {
        let text = "
            Datum: 18-11-2025
            18-11-2025SEPA Incasso
            Omschrijving:
            Abonnement
            12,50
        ";

        let out = scan(text).unwrap();
        assert_eq!(out.drafts.len(), 1);
        assert_eq!(out.drafts[0].amount_cents, -1250);
        assert!(out.drafts[0].description.contains("Abonnement"));
        assert_eq!(out.drafts[0].counterparty_name, None);
    }

    #[test]
    fn test_amounts_on_the_date_line() {
        let out = scan("17-01-2025 Parkeren Centrum 3,703,70\n18-01-2025 Bakker 1.019,00").unwrap();
        assert_eq!(out.drafts.len(), 2);
        assert_eq!(out.drafts[0].amount_cents, -370);
        assert_eq!(out.drafts[0].description, "Parkeren Centrum");
        assert_eq!(out.drafts[1].amount_cents, -101900);
        assert_eq!(out.drafts[1].description, "Bakker");
    }

    #[test]
    fn test_record_without_amount_is_dropped() {
        let text = "
            01-01-2025 t/m 31-01-2025
            Periode
            02-01-2025Betaling
            5,00
        ";

        let out = scan(text).unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(out.drafts.len(), 1);
        assert_eq!(out.drafts[0].description, "Betaling");
    }

    #[test]
    fn test_invalid_date_is_a_warning() {
        let out = scan("31-02-2025Huur\n800,00\n01-03-2025Huur\n800,00").unwrap();
        assert_eq!(out.drafts.len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].starts_with("line 1:"));
    }
}
