//! Monthly rollup of daily entries joined with end-of-month NAV marks.
//!
//! Duplicate policy: when several entries share a `date`, the one seen
//! last in the input slice wins. The store hands entries over ordered by
//! `(date, updated_at, id)`, so the most recently edited row is kept. The
//! same rule applies to NAV marks sharing a `(year, month)` key.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{MonthKey, MonthlyNav, MonthlySummary, TradingEntry};

/// Keep one entry per date, last-seen wins. Output is in date order.
pub fn dedup_by_date(entries: &[TradingEntry]) -> Vec<&TradingEntry> {
    let mut by_date: BTreeMap<NaiveDate, &TradingEntry> = BTreeMap::new();
    for entry in entries {
        by_date.insert(entry.date, entry);
    }
    by_date.into_values().collect()
}

/// Build one summary per month that has an entry or a NAV mark, sorted by
/// `(year, month)`. Months with only a NAV mark are included with zero
/// totals and `entry_count == 0`.
pub fn aggregate_monthly(entries: &[TradingEntry], navs: &[MonthlyNav]) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<MonthKey, MonthlySummary> = BTreeMap::new();

    for nav in navs {
        let summary = months
            .entry(MonthKey::new(nav.year, nav.month))
            .or_insert_with(|| MonthlySummary::empty(nav.year, nav.month));
        summary.end_of_month_nav = Some(nav.nav_value);
    }

    let unique = dedup_by_date(entries);
    if unique.len() != entries.len() {
        log::warn!(
            "Ignoring {} duplicate-date entries while aggregating",
            entries.len() - unique.len()
        );
    }

    for entry in unique {
        let (year, month) = (entry.year(), entry.month());
        let summary = months
            .entry(MonthKey::new(year, month))
            .or_insert_with(|| MonthlySummary::empty(year, month));
        summary.total_realized_pnl += entry.realized_pnl;
        summary.total_paper_pnl += entry.paper_pnl;
        summary.entry_count += 1;
    }

    log::debug!(
        "Aggregated {} entries and {} NAV marks into {} months",
        entries.len(),
        navs.len(),
        months.len()
    );

    months.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, date: &str, realized: f64, paper: f64) -> TradingEntry {
        TradingEntry {
            id: id.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            realized_pnl: realized,
            paper_pnl: paper,
            notes: None,
            import_source: "USER_CREATED".to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn nav(year: i32, month: u32, value: f64) -> MonthlyNav {
        MonthlyNav {
            id: format!("NAV-{}-{}", year, month),
            year,
            month,
            nav_value: value,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_sums_entries_within_month() {
        let entries = vec![
            entry("a", "2025-01-05", 100.0, -20.0),
            entry("b", "2025-01-20", -50.0, 10.0),
        ];

        let summaries = aggregate_monthly(&entries, &[]);

        assert_eq!(summaries.len(), 1);
        let jan = &summaries[0];
        assert_eq!((jan.year, jan.month), (2025, 1));
        assert_eq!(jan.total_realized_pnl, 50.0);
        assert_eq!(jan.total_paper_pnl, -10.0);
        assert_eq!(jan.entry_count, 2);
        assert!(!jan.has_nav());
        assert_eq!(jan.nav_or_zero(), 0.0);
    }

    #[test]
    fn test_duplicate_dates_counted_once_last_seen_wins() {
        let entries = vec![
            entry("first", "2025-01-05", 100.0, 1.0),
            entry("other", "2025-01-06", 10.0, 0.0),
            entry("second", "2025-01-05", 300.0, 3.0),
        ];

        let summaries = aggregate_monthly(&entries, &[]);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].entry_count, 2);
        assert_eq!(summaries[0].total_realized_pnl, 310.0);
        assert_eq!(summaries[0].total_paper_pnl, 3.0);
    }

    #[test]
    fn test_dedup_by_date_keeps_last_and_sorts() {
        let entries = vec![
            entry("late", "2025-02-01", 1.0, 0.0),
            entry("x", "2025-01-05", 1.0, 0.0),
            entry("y", "2025-01-05", 2.0, 0.0),
        ];

        let unique = dedup_by_date(&entries);

        let ids: Vec<&str> = unique.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["y", "late"]);
    }

    #[test]
    fn test_nav_only_month_appears() {
        let entries = vec![entry("a", "2025-01-15", 500.0, 0.0)];
        let navs = vec![nav(2025, 2, 300000.0)];

        let summaries = aggregate_monthly(&entries, &navs);

        assert_eq!(summaries.len(), 2);
        assert_eq!((summaries[0].year, summaries[0].month), (2025, 1));
        assert_eq!(summaries[0].end_of_month_nav, None);
        assert_eq!(summaries[0].entry_count, 1);
        assert_eq!((summaries[1].year, summaries[1].month), (2025, 2));
        assert_eq!(summaries[1].end_of_month_nav, Some(300000.0));
        assert_eq!(summaries[1].entry_count, 0);
        assert_eq!(summaries[1].total_realized_pnl, 0.0);
    }

    #[test]
    fn test_nav_joined_to_entry_month() {
        let entries = vec![entry("a", "2025-03-03", 250.0, 5.0)];
        let navs = vec![nav(2025, 3, 310000.0)];

        let summaries = aggregate_monthly(&entries, &navs);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].end_of_month_nav, Some(310000.0));
        assert_eq!(summaries[0].entry_count, 1);
    }

    #[test]
    fn test_chronological_order_regardless_of_input_order() {
        let entries = vec![
            entry("feb", "2025-02-10", 1.0, 0.0),
            entry("dec", "2024-12-10", 1.0, 0.0),
            entry("oct", "2025-10-01", 1.0, 0.0),
            entry("jan", "2025-01-10", 1.0, 0.0),
        ];
        let navs = vec![nav(2025, 9, 1.0)];

        let summaries = aggregate_monthly(&entries, &navs);

        let keys: Vec<(i32, u32)> = summaries.iter().map(|s| (s.year, s.month)).collect();
        assert_eq!(
            keys,
            vec![(2024, 12), (2025, 1), (2025, 2), (2025, 9), (2025, 10)]
        );
    }

    #[test]
    fn test_idempotent() {
        let entries = vec![
            entry("a", "2025-01-05", 100.1, -20.3),
            entry("b", "2025-01-20", -50.7, 10.9),
            entry("c", "2025-01-05", 12.0, 1.0),
            entry("d", "2025-04-02", 0.3, 0.1),
        ];
        let navs = vec![nav(2025, 1, 250000.0), nav(2025, 6, 260000.0)];

        let first = aggregate_monthly(&entries, &navs);
        let second = aggregate_monthly(&entries, &navs);

        assert_eq!(first, second);
    }

    #[test]
    fn test_inputs_untouched() {
        let entries = vec![
            entry("b", "2025-01-20", -50.0, 10.0),
            entry("a", "2025-01-05", 100.0, -20.0),
            entry("c", "2025-01-05", 1.0, 1.0),
        ];
        let navs = vec![nav(2025, 2, 1.0), nav(2024, 2, 2.0)];
        let entries_before = entries.clone();
        let navs_before = navs.clone();

        let _ = aggregate_monthly(&entries, &navs);

        assert_eq!(entries, entries_before);
        assert_eq!(navs, navs_before);
    }

    #[test]
    fn test_duplicate_nav_keys_last_seen_wins() {
        let navs = vec![nav(2025, 3, 100.0), nav(2025, 3, 200.0)];

        let summaries = aggregate_monthly(&[], &navs);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].end_of_month_nav, Some(200.0));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(aggregate_monthly(&[], &[]).is_empty());
    }
}
