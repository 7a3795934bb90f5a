//! Rabobank current-account export
//!
//! Amounts carry their own sign. The date column follows the user's export
//! setting, so both ISO and day-first dates occur.

use super::{has_all, CsvRow};
use crate::domain::result::Result;
use crate::domain::TransactionDraft;
use crate::services::normalize::{parse_date_any, string_to_cents};

pub(super) const KEY: &str = "RABO_NL";

pub(super) fn detect(headers: &[String]) -> bool {
    has_all(headers, &["IBAN/BBAN", "Volgnr"])
}

pub(super) fn parse_row(row: &CsvRow<'_>) -> Result<TransactionDraft> {
    let date = parse_date_any(row.require("Datum")?, &["yyyy-MM-dd", "dd-MM-yyyy"])?;
    let amount_cents = string_to_cents(row.require("Bedrag")?)?;

    // Joined as-is so fingerprints stay stable across exports
    let description = format!(
        "{} {}",
        row.get("Omschrijving-1").unwrap_or(""),
        row.get("Omschrijving-2").unwrap_or("")
    );

    Ok(TransactionDraft {
        date,
        amount_cents,
        description,
        counterparty_name: row.optional("Naam tegenpartij"),
        counterparty_iban: row.optional("Tegenrekening IBAN/BBAN"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use csv::StringRecord;

    fn headers() -> Vec<String> {
        [
            "IBAN/BBAN",
            "Munt",
            "Volgnr",
            "Datum",
            "Bedrag",
            "Tegenrekening IBAN/BBAN",
            "Naam tegenpartij",
            "Omschrijving-1",
            "Omschrijving-2",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_signed_amount_and_iso_date() {
        let h = headers();
        let r = StringRecord::from(vec![
            "NL11RABO0123456789",
            "EUR",
            "000000000000001",
            "2025-02-03",
            "-45,20",
            "NL20ENEC0000000001",
            "Eneco",
            "Termijnbedrag",
            "Februari",
        ]);
        let draft = parse_row(&CsvRow::new(&h, &r)).unwrap();

        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2025, 2, 3).unwrap());
        assert_eq!(draft.amount_cents, -4520);
        assert_eq!(draft.description, "Termijnbedrag Februari");
        assert_eq!(draft.counterparty_name.as_deref(), Some("Eneco"));
        assert_eq!(draft.counterparty_iban.as_deref(), Some("NL20ENEC0000000001"));
    }

    #[test]
    fn test_day_first_date_and_positive_amount() {
        let h = headers();
        let r = StringRecord::from(vec![
            "NL11RABO0123456789",
            "EUR",
            "000000000000002",
            "03-02-2025",
            "+1.250,00",
            "",
            "",
            "Salaris",
            "",
        ]);
        let draft = parse_row(&CsvRow::new(&h, &r)).unwrap();

        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2025, 2, 3).unwrap());
        assert_eq!(draft.amount_cents, 125000);
        assert_eq!(draft.description, "Salaris ");
        assert_eq!(draft.counterparty_name, None);
        assert_eq!(draft.counterparty_iban, None);
    }

    #[test]
    fn test_unparseable_amount_fails_row() {
        let h = headers();
        let r = StringRecord::from(vec![
            "NL11RABO0123456789",
            "EUR",
            "3",
            "2025-02-03",
            "n.v.t.",
            "",
            "",
            "",
            "",
        ]);
        assert!(parse_row(&CsvRow::new(&h, &r)).is_err());
    }
}
