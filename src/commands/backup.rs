use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::commands::entries::{date_key, map_row_to_entry};
use crate::commands::nav::map_row_to_nav;
use crate::commands::settings::read_settings;
use crate::db::Database;
use crate::error::{JournalError, Result};
use crate::models::{MonthlyNav, Settings, TradingEntry, UpdateSettingsInput};

pub const BACKUP_FORMAT_VERSION: &str = "1.0.0";

/// A backup that repeats a date or month would have its earlier rows
/// silently replaced, so refuse it instead.
fn check_unique_keys(backup: &BackupData) -> Result<()> {
    let mut dates = HashMap::new();
    let mut entry_ids = HashMap::new();
    for entry in &backup.entries {
        if let Some(first) = dates.insert(entry.date, &entry.id) {
            return Err(JournalError::validation(format!(
                "Backup has two entries for {} ({} and {})",
                date_key(entry.date),
                first,
                entry.id
            )));
        }
        if entry_ids.insert(&entry.id, entry.date).is_some() {
            return Err(JournalError::validation(format!(
                "Backup repeats entry id {}",
                entry.id
            )));
        }
    }

    let mut months = HashMap::new();
    let mut nav_ids = HashMap::new();
    for nav in &backup.monthly_nav {
        if let Some(first) = months.insert((nav.year, nav.month), &nav.id) {
            return Err(JournalError::validation(format!(
                "Backup has two NAV marks for {}-{:02} ({} and {})",
                nav.year, nav.month, first, nav.id
            )));
        }
        if nav_ids.insert(&nav.id, (nav.year, nav.month)).is_some() {
            return Err(JournalError::validation(format!(
                "Backup repeats NAV id {}",
                nav.id
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupData {
    pub settings: Settings,
    pub entries: Vec<TradingEntry>,
    #[serde(default)]
    pub monthly_nav: Vec<MonthlyNav>,
    pub export_date: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreResult {
    pub entries: usize,
    pub navs: usize,
}

/// Export all data to pretty-printed JSON
pub fn export_all_data(db: &Database) -> Result<String> {
    let conn = db.conn.lock()?;

    let settings = read_settings(&conn)?;

    let mut stmt = conn.prepare(
        "SELECT id, date, realized_pnl, paper_pnl, notes, import_source, created_at, updated_at
         FROM trading_entries ORDER BY date ASC",
    )?;
    let entries = stmt
        .query_map([], map_row_to_entry)?
        .collect::<rusqlite::Result<Vec<TradingEntry>>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, year, month, nav_value, created_at, updated_at
         FROM monthly_nav ORDER BY year ASC, month ASC",
    )?;
    let monthly_nav = stmt
        .query_map([], map_row_to_nav)?
        .collect::<rusqlite::Result<Vec<MonthlyNav>>>()?;

    log::info!(
        "Exporting {} entries and {} NAV marks",
        entries.len(),
        monthly_nav.len()
    );

    let backup = BackupData {
        settings,
        entries,
        monthly_nav,
        export_date: Utc::now().to_rfc3339(),
        version: BACKUP_FORMAT_VERSION.to_string(),
    };

    Ok(serde_json::to_string_pretty(&backup)?)
}

/// Restore a JSON backup. Settings are overwritten; entries and NAV marks
/// replace any stored row with the same id, date or `(year, month)`.
/// A backup repeating one of those keys is refused. Everything is
/// validated first and written in one transaction.
pub fn import_all_data(db: &Database, json_data: &str) -> Result<RestoreResult> {
    let backup: BackupData = serde_json::from_str(json_data)?;

    UpdateSettingsInput {
        currency: Some(backup.settings.currency.clone()),
        default_nav: Some(backup.settings.default_nav),
    }
    .validate()?;
    for entry in &backup.entries {
        entry
            .validate()
            .map_err(|e| JournalError::validation(format!("entry {}: {}", entry.id, e)))?;
    }
    for nav in &backup.monthly_nav {
        nav.validate()
            .map_err(|e| JournalError::validation(format!("NAV {}: {}", nav.id, e)))?;
    }
    check_unique_keys(&backup)?;

    let mut conn = db.conn.lock()?;
    let tx = conn.transaction()?;

    tx.execute(
        "UPDATE settings SET currency = ?, default_nav = ?, updated_at = ? WHERE id = 1",
        rusqlite::params![
            backup.settings.currency.trim().to_ascii_uppercase(),
            backup.settings.default_nav,
            Utc::now().timestamp(),
        ],
    )?;

    // REPLACE also drops a row that collides on the unique date index
    for entry in &backup.entries {
        tx.execute(
            "REPLACE INTO trading_entries (id, date, realized_pnl, paper_pnl, notes, import_source, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                entry.id,
                date_key(entry.date),
                entry.realized_pnl,
                entry.paper_pnl,
                entry.notes,
                entry.import_source,
                entry.created_at,
                entry.updated_at,
            ],
        )?;
    }

    for nav in &backup.monthly_nav {
        tx.execute(
            "REPLACE INTO monthly_nav (id, year, month, nav_value, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                nav.id,
                nav.year,
                nav.month,
                nav.nav_value,
                nav.created_at,
                nav.updated_at,
            ],
        )?;
    }

    tx.commit()?;

    let result = RestoreResult {
        entries: backup.entries.len(),
        navs: backup.monthly_nav.len(),
    };
    log::info!(
        "Restored backup from {} (format {}): {} entries, {} NAV marks",
        backup.export_date,
        backup.version,
        result.entries,
        result.navs
    );
    Ok(result)
}
