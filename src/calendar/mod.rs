pub mod grid;
pub mod holidays;

pub use grid::{classify_day, month_grid, CalendarDay, CalendarMonth, DayKind, PnlStatus};
pub use holidays::{covered_years, holidays_for_year, is_trading_day, is_weekend, trading_holiday, Holiday};
