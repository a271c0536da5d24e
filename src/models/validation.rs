//! Input checks shared by form submissions, CSV rows and backup restores.
//!
//! Nothing here coerces a bad value into a default: anything that does not
//! parse cleanly is rejected with a message naming the field.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{JournalError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("amount pattern is a valid regex")
    })
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let date = NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| JournalError::validation(format!("Invalid date '{}': expected YYYY-MM-DD", trimmed)))?;
    check_year(date.year())?;
    Ok(date)
}

/// Parse a signed currency amount such as `-1250.50`, `$1,250.50` or `+20`.
pub fn parse_amount(field: &str, raw: &str) -> Result<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();

    if cleaned.is_empty() {
        return Err(JournalError::validation(format!("{} is required", field)));
    }
    if !amount_pattern().is_match(&cleaned) {
        return Err(JournalError::validation(format!(
            "{} must be a number, got '{}'",
            field,
            raw.trim()
        )));
    }

    let value = cleaned
        .parse::<f64>()
        .map_err(|e| JournalError::validation(format!("{}: {}", field, e)))?;
    check_amount(field, value)?;
    Ok(value)
}

/// Parse an integer field (`year`, `month`).
pub fn parse_int(field: &str, raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(JournalError::validation(format!("{} is required", field)));
    }
    trimmed.parse::<i64>().map_err(|_| {
        JournalError::validation(format!("{} must be a whole number, got '{}'", field, trimmed))
    })
}

pub fn check_amount(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(JournalError::validation(format!("{} must be a finite number", field)));
    }
    Ok(())
}

pub fn check_year(year: i32) -> Result<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(JournalError::validation(format!(
            "Invalid year: {}. Must be between {} and {}.",
            year, MIN_YEAR, MAX_YEAR
        )));
    }
    Ok(())
}

pub fn check_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(JournalError::validation(format!(
            "Invalid month: {}. Must be between 1 and 12.",
            month
        )));
    }
    Ok(())
}

pub fn check_nav_value(value: f64) -> Result<()> {
    check_amount("nav_value", value)?;
    if value <= 0.0 {
        return Err(JournalError::validation(
            "Please enter a valid NAV value greater than 0",
        ));
    }
    Ok(())
}

/// Blank notes are stored as absent.
pub fn normalize_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_accepts_iso() {
        let date = parse_date(" 2025-01-05 ").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2025-13-01").is_err());
        assert!(parse_date("01/05/2025").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_parse_amount_strips_currency_decoration() {
        assert_eq!(parse_amount("realized_pnl", "$1,250.50").unwrap(), 1250.5);
        assert_eq!(parse_amount("realized_pnl", "-20").unwrap(), -20.0);
        assert_eq!(parse_amount("realized_pnl", "+.5").unwrap(), 0.5);
    }

    #[test]
    fn test_parse_amount_never_coerces() {
        assert!(parse_amount("paper_pnl", "").is_err());
        assert!(parse_amount("paper_pnl", "abc").is_err());
        assert!(parse_amount("paper_pnl", "NaN").is_err());
        assert!(parse_amount("paper_pnl", "inf").is_err());
        assert!(parse_amount("paper_pnl", "12abc").is_err());
    }

    #[test]
    fn test_nav_must_be_positive() {
        assert!(check_nav_value(0.0).is_err());
        assert!(check_nav_value(-10.0).is_err());
        assert!(check_nav_value(f64::NAN).is_err());
        assert!(check_nav_value(250000.0).is_ok());
    }

    #[test]
    fn test_month_bounds() {
        assert!(check_month(0).is_err());
        assert!(check_month(13).is_err());
        assert!(check_month(1).is_ok());
        assert!(check_month(12).is_ok());
    }

    #[test]
    fn test_normalize_notes() {
        assert_eq!(normalize_notes(Some("  ")), None);
        assert_eq!(normalize_notes(Some(" good day ")), Some("good day".to_string()));
        assert_eq!(normalize_notes(None), None);
    }
}
