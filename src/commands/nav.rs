use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::db::Database;
use crate::error::{is_unique_violation, JournalError, Result};
use crate::models::validation::check_nav_value;
use crate::models::{MonthlyNav, NavInput, NavUpdate};

const NAV_COLUMNS: &str = "id, year, month, nav_value, created_at, updated_at";

pub(crate) fn map_row_to_nav(row: &rusqlite::Row) -> rusqlite::Result<MonthlyNav> {
    Ok(MonthlyNav {
        id: row.get(0)?,
        year: row.get(1)?,
        month: row.get(2)?,
        nav_value: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn new_nav_id() -> String {
    format!("NAV-{}-{}", Utc::now().timestamp_millis(), uuid::Uuid::new_v4())
}

pub(crate) fn find_nav_id(conn: &Connection, year: i32, month: u32) -> Result<Option<String>> {
    let id = conn
        .query_row(
            "SELECT id FROM monthly_nav WHERE year = ? AND month = ?",
            rusqlite::params![year, month],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Insert or overwrite the mark for `(year, month)`. Returns the row id,
/// which is kept when the key already existed.
pub(crate) fn upsert_nav_row(conn: &Connection, input: &NavInput) -> Result<String> {
    let now = Utc::now().timestamp();

    conn.execute(
        "INSERT INTO monthly_nav (id, year, month, nav_value, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(year, month) DO UPDATE SET
            nav_value = excluded.nav_value,
            updated_at = excluded.updated_at",
        rusqlite::params![new_nav_id(), input.year, input.month, input.nav_value, now, now],
    )?;

    find_nav_id(conn, input.year, input.month)?.ok_or_else(|| {
        JournalError::NotFound(format!("NAV for {}-{:02}", input.year, input.month))
    })
}

fn insert_nav_row(conn: &Connection, input: &NavInput) -> Result<String> {
    let id = new_nav_id();
    let now = Utc::now().timestamp();

    conn.execute(
        "INSERT INTO monthly_nav (id, year, month, nav_value, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        rusqlite::params![id, input.year, input.month, input.nav_value, now, now],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            JournalError::validation(format!(
                "NAV for {}-{:02} already exists",
                input.year, input.month
            ))
        } else {
            e.into()
        }
    })?;

    Ok(id)
}

fn set_nav_value(conn: &Connection, id: &str, nav_value: f64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE monthly_nav SET nav_value = ?, updated_at = ? WHERE id = ?",
        rusqlite::params![nav_value, Utc::now().timestamp(), id],
    )?;
    if changed == 0 {
        return Err(JournalError::NotFound(format!("NAV {}", id)));
    }
    Ok(())
}

/// Every NAV mark, ordered by `(year, month)`.
pub fn get_monthly_nav(db: &Database) -> Result<Vec<MonthlyNav>> {
    let conn = db.conn.lock()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM monthly_nav ORDER BY year ASC, month ASC",
        NAV_COLUMNS
    ))?;
    let navs = stmt
        .query_map([], map_row_to_nav)?
        .collect::<rusqlite::Result<Vec<MonthlyNav>>>()?;

    log::debug!("Fetched {} NAV marks", navs.len());
    Ok(navs)
}

pub fn get_nav(db: &Database, year: i32, month: u32) -> Result<Option<MonthlyNav>> {
    let conn = db.conn.lock()?;

    let nav = conn
        .query_row(
            &format!("SELECT {} FROM monthly_nav WHERE year = ? AND month = ?", NAV_COLUMNS),
            rusqlite::params![year, month],
            map_row_to_nav,
        )
        .optional()?;
    Ok(nav)
}

/// Set the end-of-month NAV. Writing the same `(year, month)` twice leaves a
/// single row holding the latest value.
pub fn upsert_monthly_nav(db: &Database, input: NavInput) -> Result<MonthlyNav> {
    input.validate()?;

    {
        let conn = db.conn.lock()?;
        let id = upsert_nav_row(&conn, &input)?;
        log::info!(
            "Set NAV {}-{:02} = {:.2} ({})",
            input.year,
            input.month,
            input.nav_value,
            id
        );
    }

    get_nav(db, input.year, input.month)?.ok_or_else(|| {
        JournalError::NotFound(format!("NAV for {}-{:02}", input.year, input.month))
    })
}

/// Insert new marks and overwrite existing ones by id in one transaction.
/// A new mark whose key already exists fails the whole batch. Inputs must
/// already be validated.
pub(crate) fn write_nav_batch(db: &Database, inserts: &[NavInput], updates: &[NavUpdate]) -> Result<()> {
    let mut conn = db.conn.lock()?;
    let tx = conn.transaction()?;
    for input in inserts {
        insert_nav_row(&tx, input)?;
    }
    for update in updates {
        set_nav_value(&tx, &update.id, update.nav_value)?;
    }
    tx.commit()?;
    Ok(())
}

/// Insert new marks in one transaction. A key that already exists fails the
/// whole batch.
pub fn add_bulk_nav(db: &Database, inputs: &[NavInput]) -> Result<usize> {
    for input in inputs {
        input.validate()?;
    }

    write_nav_batch(db, inputs, &[])?;

    log::info!("Added {} NAV marks in bulk", inputs.len());
    Ok(inputs.len())
}

/// Overwrite values of existing marks by id in one transaction.
pub fn update_bulk_nav(db: &Database, updates: &[NavUpdate]) -> Result<usize> {
    for update in updates {
        check_nav_value(update.nav_value)?;
    }

    write_nav_batch(db, &[], updates)?;

    log::info!("Updated {} NAV marks in bulk", updates.len());
    Ok(updates.len())
}

pub fn delete_nav(db: &Database, year: i32, month: u32) -> Result<()> {
    let conn = db.conn.lock()?;
    let count = conn.execute(
        "DELETE FROM monthly_nav WHERE year = ? AND month = ?",
        rusqlite::params![year, month],
    )?;
    if count == 0 {
        return Err(JournalError::NotFound(format!("NAV for {}-{:02}", year, month)));
    }
    log::info!("Deleted NAV {}-{:02}", year, month);
    Ok(())
}
