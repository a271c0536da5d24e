use crate::calendar::{month_grid, CalendarMonth};
use crate::commands::entries::get_entries;
use crate::commands::nav::get_monthly_nav;
use crate::commands::settings::get_settings;
use crate::db::Database;
use crate::error::Result;
use crate::models::{EntryFilters, MonthlySummary, YtdSummary};
use crate::rollup::{aggregate_monthly, ytd_summary};

/// Monthly rows recomputed from a fresh read of entries and NAV marks.
pub fn get_monthly_summaries(db: &Database) -> Result<Vec<MonthlySummary>> {
    let entries = get_entries(db, &EntryFilters::default())?;
    let navs = get_monthly_nav(db)?;
    Ok(aggregate_monthly(&entries, &navs))
}

pub fn get_ytd_summary(db: &Database, year: i32) -> Result<YtdSummary> {
    let settings = get_settings(db)?;
    let summaries = get_monthly_summaries(db)?;
    Ok(ytd_summary(&summaries, year, settings.default_nav))
}

pub fn get_calendar_month(db: &Database, year: i32, month: u32) -> Result<CalendarMonth> {
    let entries = get_entries(db, &EntryFilters::for_month(year, month))?;
    month_grid(year, month, &entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::entries::create_entry;
    use crate::commands::nav::upsert_monthly_nav;
    use crate::models::{CreateEntryInput, NavInput, DEFAULT_NAV};
    use chrono::NaiveDate;

    fn add(db: &Database, date: &str, realized: f64, paper: f64) {
        create_entry(
            db,
            CreateEntryInput {
                date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                realized_pnl: realized,
                paper_pnl: paper,
                notes: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_monthly_summaries_reflect_store() {
        let db = Database::open_in_memory().unwrap();
        add(&db, "2025-01-02", 100.0, -20.0);
        add(&db, "2025-01-03", -50.0, 10.0);
        upsert_monthly_nav(&db, NavInput::new(2025, 2, 300000.0)).unwrap();

        let rows = get_monthly_summaries(&db).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].year, rows[0].month), (2025, 1));
        assert_eq!(rows[0].total_realized_pnl, 50.0);
        assert_eq!(rows[0].total_paper_pnl, -10.0);
        assert_eq!(rows[0].entry_count, 2);
        assert_eq!(rows[0].end_of_month_nav, None);
        assert_eq!((rows[1].year, rows[1].month), (2025, 2));
        assert_eq!(rows[1].end_of_month_nav, Some(300000.0));
        assert_eq!(rows[1].entry_count, 0);
    }

    #[test]
    fn test_mutation_then_recompute() {
        let db = Database::open_in_memory().unwrap();
        add(&db, "2025-03-03", 10.0, 0.0);
        assert_eq!(get_monthly_summaries(&db).unwrap()[0].total_realized_pnl, 10.0);

        add(&db, "2025-03-04", 15.0, 0.0);
        assert_eq!(get_monthly_summaries(&db).unwrap()[0].total_realized_pnl, 25.0);
    }

    #[test]
    fn test_ytd_uses_default_nav_until_a_mark_exists() {
        let db = Database::open_in_memory().unwrap();
        add(&db, "2025-01-02", 100.0, 0.0);

        let ytd = get_ytd_summary(&db, 2025).unwrap();
        assert_eq!(ytd.current_nav, DEFAULT_NAV);
        assert!(ytd.nav_is_default);
        assert_eq!(ytd.trading_days, 1);

        upsert_monthly_nav(&db, NavInput::new(2025, 1, 260000.0)).unwrap();
        let ytd = get_ytd_summary(&db, 2025).unwrap();
        assert_eq!(ytd.current_nav, 260000.0);
        assert!(!ytd.nav_is_default);
    }

    #[test]
    fn test_calendar_month_only_reads_that_month() {
        let db = Database::open_in_memory().unwrap();
        add(&db, "2025-01-31", 5.0, 0.0);
        add(&db, "2025-02-03", -5.0, 0.0);

        let grid = get_calendar_month(&db, 2025, 2).unwrap();

        assert_eq!(grid.logged_days(), 1);
        assert_eq!(grid.days[2].entry.as_ref().map(|e| e.realized_pnl), Some(-5.0));
    }
}
