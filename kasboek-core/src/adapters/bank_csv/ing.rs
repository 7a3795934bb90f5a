//! ING current-account export
//!
//! ```text
//! "Datum","Naam / Omschrijving","Rekening","Tegenrekening","Code","Af Bij","Bedrag (EUR)","Mutatiesoort","Mededelingen"
//! "20250131","Albert Heijn 1585","NL01INGB0001234567","","BA","Af","31,41","Betaalautomaat","Pasvolgnr: 001"
//! ```

use super::{has_all, CsvRow};
use crate::domain::result::{Error, Result};
use crate::domain::TransactionDraft;
use crate::services::normalize::{parse_date, string_to_cents};

pub(super) const KEY: &str = "ING_NL";

const REQUIRED: &[&str] = &[
    "Datum",
    "Naam / Omschrijving",
    "Rekening",
    "Tegenrekening",
    "Af Bij",
    "Bedrag (EUR)",
];

pub(super) fn detect(headers: &[String]) -> bool {
    has_all(headers, REQUIRED)
}

pub(super) fn parse_row(row: &CsvRow<'_>) -> Result<TransactionDraft> {
    let date = parse_date(row.require("Datum")?, "yyyyMMdd")?;

    let amount = row.require("Bedrag (EUR)")?;
    let magnitude = string_to_cents(amount)?
        .checked_abs()
        .ok_or_else(|| Error::InvalidAmountFormat(amount.to_string()))?;
    let amount_cents = if row.require("Af Bij")?.trim() == "Af" {
        -magnitude
    } else {
        magnitude
    };

    let name = row.optional("Naam / Omschrijving");
    let description = row
        .optional("Mededelingen")
        .or_else(|| name.clone())
        .unwrap_or_default();

    Ok(TransactionDraft {
        date,
        amount_cents,
        description,
        counterparty_name: name,
        counterparty_iban: row.optional("Tegenrekening"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use csv::StringRecord;

    fn headers() -> Vec<String> {
        [
            "Datum",
            "Naam / Omschrijving",
            "Rekening",
            "Tegenrekening",
            "Code",
            "Af Bij",
            "Bedrag (EUR)",
            "Mutatiesoort",
            "Mededelingen",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn record(date: &str, direction: &str, amount: &str, note: &str) -> StringRecord {
        StringRecord::from(vec![
            date,
            "Albert Heijn 1585",
            "NL01INGB0001234567",
            "NL36INGB0003445588",
            "BA",
            direction,
            amount,
            "Betaalautomaat",
            note,
        ])
    }

    #[test]
    fn test_debit_row() {
        let h = headers();
        let r = record("20250131", "Af", "31,41", "Pasvolgnr: 001");
        let draft = parse_row(&CsvRow::new(&h, &r)).unwrap();

        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(draft.amount_cents, -3141);
        assert_eq!(draft.description, "Pasvolgnr: 001");
        assert_eq!(draft.counterparty_name.as_deref(), Some("Albert Heijn 1585"));
        assert_eq!(draft.counterparty_iban.as_deref(), Some("NL36INGB0003445588"));
    }

    #[test]
    fn test_credit_row_with_empty_note() {
        let h = headers();
        let r = record("20250125", "Bij", "2.500,00", "");
        let draft = parse_row(&CsvRow::new(&h, &r)).unwrap();

        assert_eq!(draft.amount_cents, 250000);
        assert_eq!(draft.description, "Albert Heijn 1585");
    }

    #[test]
    fn test_amount_beyond_range_fails_row() {
        let h = headers();
        let r = record("20250131", "Af", "-92.233.720.368.547.758,08", "");
        assert!(matches!(
            parse_row(&CsvRow::new(&h, &r)),
            Err(Error::InvalidAmountFormat(_))
        ));
    }

    #[test]
    fn test_bad_date_fails_row() {
        let h = headers();
        let r = record("31-01-2025", "Af", "1,00", "");
        assert!(parse_row(&CsvRow::new(&h, &r)).is_err());
    }
}
