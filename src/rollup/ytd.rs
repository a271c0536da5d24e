use crate::models::{MonthKey, MonthlySummary, YtdSummary};

/// Fold monthly summaries into year-to-date figures for `year`.
///
/// `current_nav` is the NAV of the latest month, up to December of `year`,
/// that has a mark. With no mark at all it falls back to `default_nav`.
pub fn ytd_summary(summaries: &[MonthlySummary], year: i32, default_nav: f64) -> YtdSummary {
    let mut months: Vec<MonthlySummary> = summaries
        .iter()
        .filter(|s| s.year == year)
        .cloned()
        .collect();
    months.sort_by_key(MonthlySummary::key);

    let total_realized_pnl = months.iter().map(|m| m.total_realized_pnl).sum();
    let total_paper_pnl = months.iter().map(|m| m.total_paper_pnl).sum();
    let trading_days = months.iter().map(|m| m.entry_count).sum();

    let year_end = MonthKey::new(year, 12);
    let latest_nav = summaries
        .iter()
        .filter(|s| s.key() <= year_end)
        .filter_map(|s| s.end_of_month_nav.map(|nav| (s.key(), nav)))
        .max_by_key(|(key, _)| *key)
        .map(|(_, nav)| nav);

    YtdSummary {
        year,
        total_realized_pnl,
        total_paper_pnl,
        trading_days,
        current_nav: latest_nav.unwrap_or(default_nav),
        nav_is_default: latest_nav.is_none(),
        months,
    }
}
