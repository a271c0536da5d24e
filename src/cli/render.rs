//! Plain-text tables for terminal output.

use chrono::Datelike;
use serde::Serialize;

use crate::calendar::{CalendarMonth, DayKind, Holiday, PnlStatus};
use crate::commands::{EntryImportPlan, NavImportPlan};
use crate::models::{month_label, MonthlyNav, MonthlySummary, Settings, TradingEntry, YtdSummary};

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `-$1,250.50` for USD, `1,250.50 EUR` for anything else.
pub fn format_money(value: f64, currency: &str) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let amount = format!("{}.{}", group_thousands(whole), cents);

    if currency.eq_ignore_ascii_case("USD") {
        format!("{}${}", sign, amount)
    } else {
        format!("{}{} {}", sign, amount, currency)
    }
}

pub fn entries_table(entries: &[TradingEntry], currency: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<12} {:<4} {:>16} {:>16} {:<30} {:<12}\n",
        "DATE", "DAY", "REALIZED", "PAPER", "NOTES", "SOURCE"
    ));
    output.push_str(&"-".repeat(95));
    output.push('\n');

    for entry in entries {
        output.push_str(&format!(
            "{:<12} {:<4} {:>16} {:>16} {:<30} {:<12}\n",
            entry.date.to_string(),
            entry.date.format("%a").to_string(),
            format_money(entry.realized_pnl, currency),
            format_money(entry.paper_pnl, currency),
            truncate(entry.notes.as_deref().unwrap_or("-"), 30),
            entry.import_source,
        ));
    }

    output.push('\n');
    output.push_str(&format!("Total: {} entries", entries.len()));
    output
}

pub fn entry_detail(entry: &TradingEntry, currency: &str) -> String {
    format!(
        "ID:        {}\nDate:      {} ({})\nRealized:  {}\nPaper:     {}\nNotes:     {}\nSource:    {}",
        entry.id,
        entry.date,
        entry.date.format("%A"),
        format_money(entry.realized_pnl, currency),
        format_money(entry.paper_pnl, currency),
        entry.notes.as_deref().unwrap_or("-"),
        entry.import_source,
    )
}

pub fn monthly_table(rows: &[MonthlySummary], currency: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<10} {:>16} {:>16} {:>18} {:>6}\n",
        "MONTH", "REALIZED", "PAPER", "END NAV", "DAYS"
    ));
    output.push_str(&"-".repeat(70));
    output.push('\n');

    for row in rows {
        let nav = row
            .end_of_month_nav
            .map(|nav| format_money(nav, currency))
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "{:<10} {:>16} {:>16} {:>18} {:>6}\n",
            format!("{} {}", row.label(), row.year),
            format_money(row.total_realized_pnl, currency),
            format_money(row.total_paper_pnl, currency),
            nav,
            row.entry_count,
        ));
    }

    output.push('\n');
    output.push_str(&format!("Total: {} months", rows.len()));
    output
}

pub fn nav_table(navs: &[MonthlyNav], currency: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("{:<10} {:>18}\n", "MONTH", "NAV"));
    output.push_str(&"-".repeat(29));
    output.push('\n');

    for nav in navs {
        output.push_str(&format!(
            "{:<10} {:>18}\n",
            format!("{} {}", month_label(nav.month), nav.year),
            format_money(nav.nav_value, currency),
        ));
    }

    output
}

pub fn ytd_report(ytd: &YtdSummary, currency: &str) -> String {
    let nav_note = if ytd.nav_is_default { " (default, no NAV recorded)" } else { "" };

    let mut output = format!(
        "Year to date {}\n\nRealized P&L:  {}\nPaper P&L:     {}\nTrading days:  {}\nCurrent NAV:   {}{}\n",
        ytd.year,
        format_money(ytd.total_realized_pnl, currency),
        format_money(ytd.total_paper_pnl, currency),
        ytd.trading_days,
        format_money(ytd.current_nav, currency),
        nav_note,
    );

    if !ytd.months.is_empty() {
        output.push('\n');
        output.push_str(&monthly_table(&ytd.months, currency));
    }
    output
}

fn day_marker(kind: DayKind, status: Option<PnlStatus>) -> char {
    match (status, kind) {
        (Some(PnlStatus::Profit), _) => '+',
        (Some(PnlStatus::Loss), _) => '-',
        (Some(PnlStatus::Flat), _) => '=',
        (None, DayKind::Holiday(_)) => 'H',
        (None, DayKind::Weekend) => ' ',
        (None, DayKind::Trading) => '.',
    }
}

/// Sunday-first month grid followed by the logged days.
pub fn calendar_view(grid: &CalendarMonth, currency: &str) -> String {
    let mut output = format!("{} {}\n", month_label(grid.month), grid.year);
    output.push_str(" Su  Mo  Tu  We  Th  Fr  Sa\n");

    let mut column = grid.leading_blanks;
    output.push_str(&"    ".repeat(column as usize));
    for day in &grid.days {
        output.push_str(&format!("{:>3}{}", day.date.day(), day_marker(day.kind, day.status)));
        column += 1;
        if column == 7 {
            output.push('\n');
            column = 0;
        }
    }
    if column != 0 {
        output.push('\n');
    }

    output.push_str("\n+ profit  - loss  = flat  . no entry  H holiday\n");
    output.push_str(&format!(
        "Trading days: {}  Logged: {}\n",
        grid.trading_days(),
        grid.logged_days()
    ));

    for day in &grid.days {
        if let DayKind::Holiday(name) = day.kind {
            output.push_str(&format!("  {}  {}\n", day.date, name));
        }
    }
    for day in &grid.days {
        if let Some(entry) = &day.entry {
            output.push_str(&format!(
                "  {}  {:>14}  {}\n",
                day.date,
                format_money(entry.realized_pnl, currency),
                entry.notes.as_deref().unwrap_or("")
            ));
        }
    }
    output
}

pub fn holidays_table(year: i32, holidays: &[Holiday], covered: &[i32]) -> String {
    if holidays.is_empty() {
        let years: Vec<String> = covered.iter().map(|y| y.to_string()).collect();
        return format!(
            "No holiday data for {}. Known years: {}. Only weekends are excluded.",
            year,
            years.join(", ")
        );
    }

    let mut output = String::new();
    output.push_str(&format!("{:<12} {:<4} {:<30}\n", "DATE", "DAY", "HOLIDAY"));
    output.push_str(&"-".repeat(48));
    output.push('\n');
    for holiday in holidays {
        output.push_str(&format!(
            "{:<12} {:<4} {:<30}\n",
            holiday.date.to_string(),
            holiday.date.format("%a").to_string(),
            holiday.name
        ));
    }
    output
}

pub fn entry_import_plan(plan: &EntryImportPlan, currency: &str) -> String {
    let mut output = format!(
        "{} new, {} updates, {} errors\n",
        plan.inserts.len(),
        plan.updates.len(),
        plan.errors.len()
    );

    for insert in &plan.inserts {
        output.push_str(&format!(
            "  + line {:<4} {}  realized {}  paper {}\n",
            insert.line,
            insert.input.date,
            format_money(insert.input.realized_pnl, currency),
            format_money(insert.input.paper_pnl, currency),
        ));
    }
    for update in &plan.updates {
        output.push_str(&format!(
            "  ~ line {:<4} {}  realized {} -> {}  paper {} -> {}\n",
            update.line,
            update.previous.date,
            format_money(update.previous.realized_pnl, currency),
            format_money(update.update.realized_pnl.unwrap_or(update.previous.realized_pnl), currency),
            format_money(update.previous.paper_pnl, currency),
            format_money(update.update.paper_pnl.unwrap_or(update.previous.paper_pnl), currency),
        ));
    }
    for error in &plan.errors {
        output.push_str(&format!("  ! {}\n", error));
    }
    output
}

pub fn nav_import_plan(plan: &NavImportPlan, currency: &str) -> String {
    let mut output = format!(
        "{} new, {} updates, {} errors\n",
        plan.inserts.len(),
        plan.updates.len(),
        plan.errors.len()
    );

    for insert in &plan.inserts {
        output.push_str(&format!(
            "  + line {:<4} {} {}  {}\n",
            insert.line,
            month_label(insert.input.month),
            insert.input.year,
            format_money(insert.input.nav_value, currency),
        ));
    }
    for update in &plan.updates {
        output.push_str(&format!(
            "  ~ line {:<4} {} {}  {} -> {}\n",
            update.line,
            month_label(update.previous.month),
            update.previous.year,
            format_money(update.previous.nav_value, currency),
            format_money(update.nav_value, currency),
        ));
    }
    for error in &plan.errors {
        output.push_str(&format!("  ! {}\n", error));
    }
    output
}

pub fn settings_view(settings: &Settings) -> String {
    format!(
        "Currency:     {}\nDefault NAV:  {}",
        settings.currency,
        format_money(settings.default_nav, &settings.currency)
    )
}
