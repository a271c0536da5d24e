use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::calendar::holidays::{is_weekend, trading_holiday};
use crate::error::{JournalError, Result};
use crate::models::validation::{check_month, check_year};
use crate::models::TradingEntry;
use crate::rollup::dedup_by_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "name")]
pub enum DayKind {
    Trading,
    Weekend,
    Holiday(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PnlStatus {
    Profit,
    Loss,
    Flat,
}

impl PnlStatus {
    pub fn from_realized(realized_pnl: f64) -> Self {
        if realized_pnl > 0.0 {
            PnlStatus::Profit
        } else if realized_pnl < 0.0 {
            PnlStatus::Loss
        } else {
            PnlStatus::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub kind: DayKind,
    pub entry: Option<TradingEntry>,
    pub status: Option<PnlStatus>,
}

impl CalendarDay {
    pub fn is_trading_day(&self) -> bool {
        self.kind == DayKind::Trading
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    /// Empty cells before day 1 in a Sunday-first week.
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

impl CalendarMonth {
    pub fn trading_days(&self) -> usize {
        self.days.iter().filter(|d| d.is_trading_day()).count()
    }

    pub fn logged_days(&self) -> usize {
        self.days.iter().filter(|d| d.entry.is_some()).count()
    }
}

pub fn classify_day(date: NaiveDate) -> DayKind {
    if let Some(name) = trading_holiday(date) {
        DayKind::Holiday(name)
    } else if is_weekend(date) {
        DayKind::Weekend
    } else {
        DayKind::Trading
    }
}

/// Lay out one month of day cells. Entries outside the month are ignored;
/// duplicate dates resolve the same way as in the monthly rollup.
pub fn month_grid(year: i32, month: u32, entries: &[TradingEntry]) -> Result<CalendarMonth> {
    check_year(year)?;
    check_month(month)?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| JournalError::validation(format!("Invalid month {}-{:02}", year, month)))?;

    let in_month: Vec<&TradingEntry> = dedup_by_date(entries)
        .into_iter()
        .filter(|e| e.year() == year && e.month() == month)
        .collect();

    let days = first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|date| {
            let entry = in_month.iter().find(|e| e.date == date).map(|e| (*e).clone());
            let status = entry.as_ref().map(|e| PnlStatus::from_realized(e.realized_pnl));
            CalendarDay {
                date,
                kind: classify_day(date),
                entry,
                status,
            }
        })
        .collect();

    Ok(CalendarMonth {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_sunday(),
        days,
    })
}
