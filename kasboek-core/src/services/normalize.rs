//! Amount and date normalization for bank exports

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::result::{Error, Result};

/// Convert a locale-formatted currency string to cents
///
/// Handles Dutch and English conventions:
/// - `1.234,56` -> dots are thousands separators, comma is the decimal
/// - `19,00`    -> comma is the decimal
/// - `1234.56`  -> parsed as-is
///
/// Currency symbols and whitespace are ignored. The result is rounded
/// half away from zero and always has a representable magnitude.
pub fn string_to_cents(value: &str) -> Result<i64> {
    let mut clean: String = value
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | '£') && !c.is_whitespace())
        .collect();

    if clean.contains(',') && !clean.contains('.') {
        clean = clean.replacen(',', ".", 1);
    } else if clean.contains('.') && clean.contains(',') {
        clean = clean.replace('.', "").replacen(',', ".", 1);
    }

    let unsigned = clean.strip_prefix('+').unwrap_or(&clean);
    let amount = Decimal::from_str(unsigned)
        .map_err(|_| Error::InvalidAmountFormat(value.to_string()))?;

    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .filter(|cents| *cents != i64::MIN)
        .ok_or_else(|| Error::InvalidAmountFormat(value.to_string()))
}

/// Render cents as a Dutch euro amount, e.g. `€ 1.234,56` or `€ -19,00`
pub fn cents_to_euro(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let euros = (abs / 100).to_string();
    let fraction = abs % 100;

    let mut grouped = String::with_capacity(euros.len() + euros.len() / 3);
    for (i, ch) in euros.chars().enumerate() {
        if i > 0 && (euros.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("€ {}{},{:02}", sign, grouped, fraction)
}

/// Translate a `yyyy`/`MM`/`dd` pattern to a chrono format string
fn chrono_format(pattern: &str) -> String {
    pattern
        .replace("yyyy", "%Y")
        .replace("MM", "%m")
        .replace("dd", "%d")
}

/// Parse a date with an explicit per-source pattern such as `yyyyMMdd`
/// or `dd-MM-yyyy`
pub fn parse_date(input: &str, pattern: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    // chrono accepts fewer digits than the pattern implies; the exports never do
    if trimmed.len() != pattern.len() {
        return Err(Error::InvalidDate {
            input: input.to_string(),
            format: pattern.to_string(),
        });
    }

    NaiveDate::parse_from_str(trimmed, &chrono_format(pattern)).map_err(|_| Error::InvalidDate {
        input: input.to_string(),
        format: pattern.to_string(),
    })
}

/// Try several patterns in order, returning the first match
pub fn parse_date_any(input: &str, patterns: &[&str]) -> Result<NaiveDate> {
    for pattern in patterns {
        if let Ok(date) = parse_date(input, pattern) {
            return Ok(date);
        }
    }
    Err(Error::InvalidDate {
        input: input.to_string(),
        format: patterns.join(" or "),
    })
}
