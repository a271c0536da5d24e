//! NASDAQ market holidays and the trading-day predicate.
//!
//! The table is static reference data and must be extended by hand each
//! year. Dates in years it does not cover count as trading days unless
//! they fall on a weekend.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

// (year, month, day, name)
const NASDAQ_HOLIDAYS: &[(i32, u32, u32, &str)] = &[
    // 2024
    (2024, 1, 1, "New Year's Day"),
    (2024, 1, 15, "Martin Luther King Jr. Day"),
    (2024, 2, 19, "Presidents' Day"),
    (2024, 3, 29, "Good Friday"),
    (2024, 5, 27, "Memorial Day"),
    (2024, 6, 19, "Juneteenth"),
    (2024, 7, 4, "Independence Day"),
    (2024, 9, 2, "Labor Day"),
    (2024, 11, 28, "Thanksgiving Day"),
    (2024, 12, 25, "Christmas Day"),
    // 2025
    (2025, 1, 1, "New Year's Day"),
    (2025, 1, 20, "Martin Luther King Jr. Day"),
    (2025, 2, 17, "Presidents' Day"),
    (2025, 4, 18, "Good Friday"),
    (2025, 5, 26, "Memorial Day"),
    (2025, 6, 19, "Juneteenth"),
    (2025, 7, 4, "Independence Day"),
    (2025, 9, 1, "Labor Day"),
    (2025, 11, 27, "Thanksgiving Day"),
    (2025, 12, 25, "Christmas Day"),
    // 2026
    (2026, 1, 1, "New Year's Day"),
    (2026, 1, 19, "Martin Luther King Jr. Day"),
    (2026, 2, 16, "Presidents' Day"),
    (2026, 4, 3, "Good Friday"),
    (2026, 5, 25, "Memorial Day"),
    (2026, 6, 19, "Juneteenth"),
    (2026, 7, 3, "Independence Day (observed)"),
    (2026, 9, 7, "Labor Day"),
    (2026, 11, 26, "Thanksgiving Day"),
    (2026, 12, 25, "Christmas Day"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: &'static str,
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Name of the market holiday falling on `date`, if any.
pub fn trading_holiday(date: NaiveDate) -> Option<&'static str> {
    NASDAQ_HOLIDAYS
        .iter()
        .find(|(y, m, d, _)| *y == date.year() && *m == date.month() && *d == date.day())
        .map(|(_, _, _, name)| *name)
}

pub fn is_trading_day(date: NaiveDate) -> bool {
    !is_weekend(date) && trading_holiday(date).is_none()
}

pub fn holidays_for_year(year: i32) -> Vec<Holiday> {
    NASDAQ_HOLIDAYS
        .iter()
        .filter(|(y, _, _, _)| *y == year)
        .filter_map(|(y, m, d, name)| {
            NaiveDate::from_ymd_opt(*y, *m, *d).map(|date| Holiday { date, name })
        })
        .collect()
}

/// Years the holiday table has rows for, ascending.
pub fn covered_years() -> Vec<i32> {
    let mut years: Vec<i32> = NASDAQ_HOLIDAYS.iter().map(|(y, _, _, _)| *y).collect();
    years.dedup();
    years
}
