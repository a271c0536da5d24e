use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;

use crate::commands::entries::{get_entries, write_entry_batch};
use crate::commands::nav::{get_monthly_nav, write_nav_batch};
use crate::db::Database;
use crate::error::{JournalError, Result};
use crate::models::validation::{parse_amount, parse_date, parse_int};
use crate::models::{
    CreateEntryInput, EntryFilters, EntryUpdate, MonthKey, MonthlyNav, NavInput, NavUpdate,
    TradingEntry, UpdateEntryInput, SOURCE_CSV_IMPORT,
};

const ENTRY_TEMPLATE: &str = "date,realized_pnl,paper_pnl,notes
2025-01-02,1250.50,-300.00,Opening range breakout
2025-01-03,-420.00,0.00,
";

const NAV_TEMPLATE: &str = "year,month,nav_value
2025,1,251250.50
2025,2,248900.00
";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLineError {
    pub line: u64,
    pub message: String,
}

impl fmt::Display for ImportLineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedEntryInsert {
    pub line: u64,
    pub input: CreateEntryInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedEntryUpdate {
    pub line: u64,
    pub previous: TradingEntry,
    pub update: UpdateEntryInput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntryImportPlan {
    pub inserts: Vec<PlannedEntryInsert>,
    pub updates: Vec<PlannedEntryUpdate>,
    pub errors: Vec<ImportLineError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedNavInsert {
    pub line: u64,
    pub input: NavInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedNavUpdate {
    pub line: u64,
    pub previous: MonthlyNav,
    pub nav_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NavImportPlan {
    pub inserts: Vec<PlannedNavInsert>,
    pub updates: Vec<PlannedNavUpdate>,
    pub errors: Vec<ImportLineError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub inserted: usize,
    pub updated: usize,
}

/// A parsed entry CSV row. `notes` is `None` when the file has no notes
/// column, so updates leave existing notes alone.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EntryRow {
    pub line: u64,
    pub date: NaiveDate,
    pub realized_pnl: f64,
    pub paper_pnl: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NavRow {
    pub line: u64,
    pub input: NavInput,
}

fn row_message(err: JournalError) -> String {
    match err {
        JournalError::ValidationError(msg) => msg,
        other => other.to_string(),
    }
}

fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

fn csv_reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(strip_bom(content).as_bytes())
}

/// A record csv could not read. Field-count mismatches usually mean an
/// unquoted amount with a thousands separator.
fn record_error(err: &csv::Error, fallback_line: u64) -> ImportLineError {
    let line = err.position().map(|p| p.line()).unwrap_or(fallback_line);
    let message = match err.kind() {
        csv::ErrorKind::UnequalLengths { expected_len, len, .. } => format!(
            "expected {} fields, found {}; quote amounts that contain commas",
            expected_len, len
        ),
        _ => err.to_string(),
    };
    ImportLineError { line, message }
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn required_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    column(headers, name)
        .ok_or_else(|| JournalError::CsvError(format!("Missing required column '{}'", name)))
}

fn field<'r>(record: &'r csv::StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or("")
}

fn record_line(record: &csv::StringRecord, fallback: u64) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(fallback)
}

/// Parse `date,realized_pnl,paper_pnl[,notes]`. A missing required column
/// fails the whole file; bad values are reported per line.
pub(crate) fn parse_entry_csv(content: &str) -> Result<(Vec<EntryRow>, Vec<ImportLineError>)> {
    let mut reader = csv_reader(content);
    let headers = reader.headers()?.clone();

    let date_col = required_column(&headers, "date")?;
    let realized_col = required_column(&headers, "realized_pnl")?;
    let paper_col = required_column(&headers, "paper_pnl")?;
    let notes_col = column(&headers, "notes");

    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (index, result) in reader.records().enumerate() {
        // Header is line 1
        let fallback_line = index as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                errors.push(record_error(&e, fallback_line));
                continue;
            }
        };
        let line = record_line(&record, fallback_line);

        let parsed = parse_date(field(&record, date_col)).and_then(|date| {
            let realized_pnl = parse_amount("realized_pnl", field(&record, realized_col))?;
            let paper_pnl = parse_amount("paper_pnl", field(&record, paper_col))?;
            Ok((date, realized_pnl, paper_pnl))
        });

        match parsed {
            Ok((date, realized_pnl, paper_pnl)) => rows.push(EntryRow {
                line,
                date,
                realized_pnl,
                paper_pnl,
                notes: notes_col.map(|i| field(&record, i).to_string()),
            }),
            Err(e) => errors.push(ImportLineError { line, message: row_message(e) }),
        }
    }

    Ok((rows, errors))
}

/// Parse `year,month,nav_value`.
pub(crate) fn parse_nav_csv(content: &str) -> Result<(Vec<NavRow>, Vec<ImportLineError>)> {
    let mut reader = csv_reader(content);
    let headers = reader.headers()?.clone();

    let year_col = required_column(&headers, "year")?;
    let month_col = required_column(&headers, "month")?;
    let nav_col = required_column(&headers, "nav_value")?;

    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                errors.push(record_error(&e, fallback_line));
                continue;
            }
        };
        let line = record_line(&record, fallback_line);

        let parsed = (|| -> Result<NavInput> {
            let year = parse_int("year", field(&record, year_col))?;
            let month = parse_int("month", field(&record, month_col))?;
            let year = i32::try_from(year)
                .map_err(|_| JournalError::validation(format!("Invalid year: {}", year)))?;
            let month = u32::try_from(month)
                .map_err(|_| JournalError::validation(format!("Invalid month: {}", month)))?;
            let nav_value = parse_amount("nav_value", field(&record, nav_col))?;
            let input = NavInput::new(year, month, nav_value);
            input.validate()?;
            Ok(input)
        })();

        match parsed {
            Ok(input) => rows.push(NavRow { line, input }),
            Err(e) => errors.push(ImportLineError { line, message: row_message(e) }),
        }
    }

    Ok((rows, errors))
}

/// Route parsed rows to inserts or updates against what is already stored.
pub(crate) fn plan_entry_import(
    rows: Vec<EntryRow>,
    mut errors: Vec<ImportLineError>,
    existing: &[TradingEntry],
) -> EntryImportPlan {
    let by_date: HashMap<NaiveDate, &TradingEntry> = existing.iter().map(|e| (e.date, e)).collect();
    let mut seen: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut plan = EntryImportPlan::default();

    for row in rows {
        if let Some(first_line) = seen.get(&row.date) {
            errors.push(ImportLineError {
                line: row.line,
                message: format!("Date {} appears more than once (first on line {})", row.date, first_line),
            });
            continue;
        }
        seen.insert(row.date, row.line);

        match by_date.get(&row.date) {
            Some(previous) => plan.updates.push(PlannedEntryUpdate {
                line: row.line,
                previous: (*previous).clone(),
                update: UpdateEntryInput {
                    date: None,
                    realized_pnl: Some(row.realized_pnl),
                    paper_pnl: Some(row.paper_pnl),
                    notes: row.notes,
                },
            }),
            None => plan.inserts.push(PlannedEntryInsert {
                line: row.line,
                input: CreateEntryInput {
                    date: row.date,
                    realized_pnl: row.realized_pnl,
                    paper_pnl: row.paper_pnl,
                    notes: row.notes,
                },
            }),
        }
    }

    errors.sort_by_key(|e| e.line);
    plan.errors = errors;
    plan
}

pub(crate) fn plan_nav_import(
    rows: Vec<NavRow>,
    mut errors: Vec<ImportLineError>,
    existing: &[MonthlyNav],
) -> NavImportPlan {
    let by_key: HashMap<MonthKey, &MonthlyNav> = existing
        .iter()
        .map(|n| (MonthKey::new(n.year, n.month), n))
        .collect();
    let mut seen: BTreeMap<MonthKey, u64> = BTreeMap::new();
    let mut plan = NavImportPlan::default();

    for row in rows {
        let key = MonthKey::new(row.input.year, row.input.month);
        if let Some(first_line) = seen.get(&key) {
            errors.push(ImportLineError {
                line: row.line,
                message: format!(
                    "{}-{:02} appears more than once (first on line {})",
                    key.year, key.month, first_line
                ),
            });
            continue;
        }
        seen.insert(key, row.line);

        match by_key.get(&key) {
            Some(previous) => plan.updates.push(PlannedNavUpdate {
                line: row.line,
                previous: (*previous).clone(),
                nav_value: row.input.nav_value,
            }),
            None => plan.inserts.push(PlannedNavInsert {
                line: row.line,
                input: row.input,
            }),
        }
    }

    errors.sort_by_key(|e| e.line);
    plan.errors = errors;
    plan
}

fn refuse_with_errors(errors: &[ImportLineError]) -> JournalError {
    let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    JournalError::validation(format!(
        "{} row(s) failed validation, nothing was imported:\n{}",
        errors.len(),
        details.join("\n")
    ))
}

/// Parse and plan an entry CSV without writing anything.
pub fn preview_entry_import(db: &Database, csv_content: &str) -> Result<EntryImportPlan> {
    let (rows, errors) = parse_entry_csv(csv_content)?;
    let existing = get_entries(db, &EntryFilters::default())?;
    Ok(plan_entry_import(rows, errors, &existing))
}

/// Apply an entry CSV in one transaction. Any row error aborts the import
/// before a single row is written.
pub fn import_entry_csv(db: &Database, csv_content: &str) -> Result<ImportResult> {
    let plan = preview_entry_import(db, csv_content)?;
    if !plan.errors.is_empty() {
        log::warn!("Entry import refused: {} row errors", plan.errors.len());
        return Err(refuse_with_errors(&plan.errors));
    }

    let inserts: Vec<CreateEntryInput> = plan.inserts.iter().map(|i| i.input.clone()).collect();
    let updates: Vec<EntryUpdate> = plan
        .updates
        .iter()
        .map(|u| EntryUpdate {
            id: u.previous.id.clone(),
            data: u.update.clone(),
        })
        .collect();
    write_entry_batch(db, &inserts, &updates, SOURCE_CSV_IMPORT)?;

    let result = ImportResult {
        inserted: plan.inserts.len(),
        updated: plan.updates.len(),
    };
    log::info!(
        "Imported entry CSV: {} inserted, {} updated",
        result.inserted,
        result.updated
    );
    Ok(result)
}

pub fn preview_nav_import(db: &Database, csv_content: &str) -> Result<NavImportPlan> {
    let (rows, errors) = parse_nav_csv(csv_content)?;
    let existing = get_monthly_nav(db)?;
    Ok(plan_nav_import(rows, errors, &existing))
}

pub fn import_nav_csv(db: &Database, csv_content: &str) -> Result<ImportResult> {
    let plan = preview_nav_import(db, csv_content)?;
    if !plan.errors.is_empty() {
        log::warn!("NAV import refused: {} row errors", plan.errors.len());
        return Err(refuse_with_errors(&plan.errors));
    }

    let inserts: Vec<NavInput> = plan.inserts.iter().map(|i| i.input.clone()).collect();
    let updates: Vec<NavUpdate> = plan
        .updates
        .iter()
        .map(|u| NavUpdate {
            id: u.previous.id.clone(),
            nav_value: u.nav_value,
        })
        .collect();
    write_nav_batch(db, &inserts, &updates)?;

    let result = ImportResult {
        inserted: plan.inserts.len(),
        updated: plan.updates.len(),
    };
    log::info!(
        "Imported NAV CSV: {} inserted, {} updated",
        result.inserted,
        result.updated
    );
    Ok(result)
}

pub fn entry_template() -> &'static str {
    ENTRY_TEMPLATE
}

pub fn nav_template() -> &'static str {
    NAV_TEMPLATE
}
