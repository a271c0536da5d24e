use serde::{Deserialize, Serialize};

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Three-letter label for a 1-based month. Out-of-range months give `"???"`.
pub fn month_label(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_LABELS.get(i as usize))
        .copied()
        .unwrap_or("???")
}

/// Calendar month key. Orders by year, then month number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

/// Per-month rollup of trading entries joined with the month's NAV mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub total_realized_pnl: f64,
    pub total_paper_pnl: f64,
    /// `None` when no NAV was recorded for the month.
    pub end_of_month_nav: Option<f64>,
    pub entry_count: usize,
}

impl MonthlySummary {
    pub fn empty(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            total_realized_pnl: 0.0,
            total_paper_pnl: 0.0,
            end_of_month_nav: None,
            entry_count: 0,
        }
    }

    pub fn key(&self) -> MonthKey {
        MonthKey::new(self.year, self.month)
    }

    pub fn label(&self) -> &'static str {
        month_label(self.month)
    }

    pub fn has_nav(&self) -> bool {
        self.end_of_month_nav.is_some()
    }

    pub fn nav_or_zero(&self) -> f64 {
        self.end_of_month_nav.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YtdSummary {
    pub year: i32,
    pub total_realized_pnl: f64,
    pub total_paper_pnl: f64,
    pub trading_days: usize,
    pub current_nav: f64,
    /// Set when no NAV mark exists up to the end of `year` and
    /// `current_nav` is the configured default.
    pub nav_is_default: bool,
    pub months: Vec<MonthlySummary>,
}
