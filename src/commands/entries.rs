use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::db::Database;
use crate::error::{is_unique_violation, JournalError, Result};
use crate::models::validation::{normalize_notes, DATE_FORMAT};
use crate::models::{
    CreateEntryInput, EntryFilters, EntryUpdate, TradingEntry, UpdateEntryInput, SOURCE_USER_CREATED,
};

const ENTRY_COLUMNS: &str =
    "id, date, realized_pnl, paper_pnl, notes, import_source, created_at, updated_at";

/// Helper function to map a database row to a TradingEntry struct
pub(crate) fn map_row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<TradingEntry> {
    let raw_date: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(TradingEntry {
        id: row.get(0)?,
        date,
        realized_pnl: row.get(2)?,
        paper_pnl: row.get(3)?,
        notes: row.get(4)?,
        import_source: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub(crate) fn new_entry_id() -> String {
    format!("ENTRY-{}-{}", Utc::now().timestamp_millis(), uuid::Uuid::new_v4())
}

pub(crate) fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn find_entry_id_by_date(conn: &Connection, date: NaiveDate) -> Result<Option<String>> {
    let id = conn
        .query_row(
            "SELECT id FROM trading_entries WHERE date = ?",
            [date_key(date)],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn duplicate_date(conn: &Connection, date: NaiveDate, err: rusqlite::Error) -> JournalError {
    if is_unique_violation(&err) {
        if let Ok(Some(existing_id)) = find_entry_id_by_date(conn, date) {
            return JournalError::DuplicateDate { date, existing_id };
        }
    }
    err.into()
}

/// Insert one validated entry. Works on a plain connection or inside a
/// transaction.
pub(crate) fn insert_entry(
    conn: &Connection,
    input: &CreateEntryInput,
    import_source: &str,
) -> Result<String> {
    let id = new_entry_id();
    let now = Utc::now().timestamp();

    conn.execute(
        "INSERT INTO trading_entries (
            id, date, realized_pnl, paper_pnl, notes, import_source, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            date_key(input.date),
            input.realized_pnl,
            input.paper_pnl,
            input.normalized_notes(),
            import_source,
            now,
            now
        ],
    )
    .map_err(|e| duplicate_date(conn, input.date, e))?;

    Ok(id)
}

/// Apply a partial update. Works on a plain connection or inside a
/// transaction.
pub(crate) fn apply_entry_update(conn: &Connection, id: &str, update: &UpdateEntryInput) -> Result<()> {
    let now = Utc::now().timestamp();

    let mut updates = vec!["updated_at = ?"];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now)];

    if let Some(date) = update.date {
        updates.push("date = ?");
        values.push(Box::new(date_key(date)));
    }
    if let Some(realized_pnl) = update.realized_pnl {
        updates.push("realized_pnl = ?");
        values.push(Box::new(realized_pnl));
    }
    if let Some(paper_pnl) = update.paper_pnl {
        updates.push("paper_pnl = ?");
        values.push(Box::new(paper_pnl));
    }
    if let Some(notes) = &update.notes {
        updates.push("notes = ?");
        values.push(Box::new(normalize_notes(Some(notes))));
    }

    let query = format!("UPDATE trading_entries SET {} WHERE id = ?", updates.join(", "));
    values.push(Box::new(id.to_string()));

    let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let changed = match conn.execute(&query, params.as_slice()) {
        Ok(n) => n,
        Err(e) => {
            return Err(match update.date {
                Some(date) => duplicate_date(conn, date, e),
                None => e.into(),
            })
        }
    };

    if changed == 0 {
        return Err(JournalError::NotFound(format!("entry {}", id)));
    }
    Ok(())
}

/// All entries matching `filters`, ordered by `(date, updated_at, id)` so the
/// rollup's last-seen-wins rule keeps the most recently edited row.
pub fn get_entries(db: &Database, filters: &EntryFilters) -> Result<Vec<TradingEntry>> {
    filters.validate()?;
    let conn = db.conn.lock()?;

    let mut query = format!("SELECT {} FROM trading_entries WHERE 1=1", ENTRY_COLUMNS);
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(from) = filters.from {
        conditions.push("date >= ?");
        params.push(Box::new(date_key(from)));
    }
    if let Some(to) = filters.to {
        conditions.push("date <= ?");
        params.push(Box::new(date_key(to)));
    }
    if let Some(year) = filters.year {
        match filters.month {
            Some(month) => {
                conditions.push("substr(date, 1, 7) = ?");
                params.push(Box::new(format!("{:04}-{:02}", year, month)));
            }
            None => {
                conditions.push("substr(date, 1, 4) = ?");
                params.push(Box::new(format!("{:04}", year)));
            }
        }
    }

    if !conditions.is_empty() {
        query.push_str(&format!(" AND {}", conditions.join(" AND ")));
    }

    query.push_str(" ORDER BY date ASC, updated_at ASC, id ASC");

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query)?;
    let entries = stmt
        .query_map(param_refs.as_slice(), map_row_to_entry)?
        .collect::<rusqlite::Result<Vec<TradingEntry>>>()?;

    log::debug!("Fetched {} entries", entries.len());
    Ok(entries)
}

pub fn get_entry(db: &Database, id: &str) -> Result<TradingEntry> {
    let conn = db.conn.lock()?;

    conn.query_row(
        &format!("SELECT {} FROM trading_entries WHERE id = ?", ENTRY_COLUMNS),
        [id],
        map_row_to_entry,
    )
    .optional()?
    .ok_or_else(|| JournalError::NotFound(format!("entry {}", id)))
}

pub fn get_entry_by_date(db: &Database, date: NaiveDate) -> Result<Option<TradingEntry>> {
    let conn = db.conn.lock()?;

    let entry = conn
        .query_row(
            &format!("SELECT {} FROM trading_entries WHERE date = ?", ENTRY_COLUMNS),
            [date_key(date)],
            map_row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

/// Create the entry for a new date. If the date already has one, fails with
/// `DuplicateDate` naming the existing entry so the caller can open it instead.
pub fn create_entry(db: &Database, input: CreateEntryInput) -> Result<TradingEntry> {
    input.validate()?;

    let id = {
        let conn = db.conn.lock()?;

        if let Some(existing_id) = find_entry_id_by_date(&conn, input.date)? {
            log::info!("Entry for {} already exists ({})", input.date, existing_id);
            return Err(JournalError::DuplicateDate {
                date: input.date,
                existing_id,
            });
        }

        insert_entry(&conn, &input, SOURCE_USER_CREATED)?
    };

    log::info!("Created entry {} for {}", id, input.date);
    get_entry(db, &id)
}

pub fn update_entry(db: &Database, id: &str, update: UpdateEntryInput) -> Result<TradingEntry> {
    update.validate()?;

    {
        let conn = db.conn.lock()?;
        apply_entry_update(&conn, id, &update)?;
    }

    log::info!("Updated entry {}", id);
    get_entry(db, id)
}

pub fn delete_entry(db: &Database, id: &str) -> Result<()> {
    let conn = db.conn.lock()?;
    let count = conn.execute("DELETE FROM trading_entries WHERE id = ?", [id])?;
    if count == 0 {
        return Err(JournalError::NotFound(format!("entry {}", id)));
    }
    log::info!("Deleted entry {}", id);
    Ok(())
}

/// Insert and update entries in one transaction. Nothing is written unless
/// every row goes in. Inputs must already be validated.
pub(crate) fn write_entry_batch(
    db: &Database,
    inserts: &[CreateEntryInput],
    updates: &[EntryUpdate],
    import_source: &str,
) -> Result<()> {
    let mut conn = db.conn.lock()?;
    let tx = conn.transaction()?;
    for input in inserts {
        insert_entry(&tx, input, import_source)?;
    }
    for update in updates {
        apply_entry_update(&tx, &update.id, &update.data)?;
    }
    tx.commit()?;
    Ok(())
}

/// Insert many entries in one transaction. Nothing is written unless every
/// row goes in.
pub fn add_bulk_entries(db: &Database, inputs: &[CreateEntryInput], import_source: &str) -> Result<usize> {
    for input in inputs {
        input.validate()?;
    }

    write_entry_batch(db, inputs, &[], import_source)?;

    log::info!("Added {} entries in bulk", inputs.len());
    Ok(inputs.len())
}

/// Apply many partial updates in one transaction. Nothing is written unless
/// every update succeeds.
pub fn update_bulk_entries(db: &Database, updates: &[EntryUpdate]) -> Result<usize> {
    for update in updates {
        update.data.validate()?;
    }

    write_entry_batch(db, &[], updates, SOURCE_USER_CREATED)?;

    log::info!("Updated {} entries in bulk", updates.len());
    Ok(updates.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn input(date: &str, realized: f64, paper: f64) -> CreateEntryInput {
        CreateEntryInput {
            date: d(date),
            realized_pnl: realized,
            paper_pnl: paper,
            notes: None,
        }
    }

    #[test]
    fn test_create_and_fetch_entry() {
        let db = Database::open_in_memory().unwrap();

        let created = create_entry(
            &db,
            CreateEntryInput {
                notes: Some("  breakout worked  ".to_string()),
                ..input("2025-01-02", 150.0, -20.0)
            },
        )
        .unwrap();

        assert!(created.id.starts_with("ENTRY-"));
        assert_eq!(created.date, d("2025-01-02"));
        assert_eq!(created.realized_pnl, 150.0);
        assert_eq!(created.notes.as_deref(), Some("breakout worked"));
        assert_eq!(created.import_source, SOURCE_USER_CREATED);

        let by_date = get_entry_by_date(&db, d("2025-01-02")).unwrap();
        assert_eq!(by_date, Some(created));
        assert_eq!(get_entry_by_date(&db, d("2025-01-03")).unwrap(), None);
    }

    #[test]
    fn test_duplicate_date_points_at_existing_entry() {
        let db = Database::open_in_memory().unwrap();
        let existing = create_entry(&db, input("2025-01-02", 1.0, 0.0)).unwrap();

        let err = create_entry(&db, input("2025-01-02", 2.0, 0.0)).unwrap_err();

        match err {
            JournalError::DuplicateDate { date, existing_id } => {
                assert_eq!(date, d("2025-01-02"));
                assert_eq!(existing_id, existing.id);
            }
            other => panic!("expected DuplicateDate, got {:?}", other),
        }
        assert_eq!(get_entries(&db, &EntryFilters::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_update_entry_fields() {
        let db = Database::open_in_memory().unwrap();
        let created = create_entry(&db, input("2025-01-02", 1.0, 2.0)).unwrap();

        let updated = update_entry(
            &db,
            &created.id,
            UpdateEntryInput {
                realized_pnl: Some(-40.5),
                notes: Some("revised".to_string()),
                ..UpdateEntryInput::default()
            },
        )
        .unwrap();

        assert_eq!(updated.realized_pnl, -40.5);
        assert_eq!(updated.paper_pnl, 2.0);
        assert_eq!(updated.notes.as_deref(), Some("revised"));

        let cleared = update_entry(
            &db,
            &created.id,
            UpdateEntryInput {
                notes: Some(String::new()),
                ..UpdateEntryInput::default()
            },
        )
        .unwrap();
        assert_eq!(cleared.notes, None);
    }

    #[test]
    fn test_update_date_onto_taken_date_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let first = create_entry(&db, input("2025-01-02", 1.0, 0.0)).unwrap();
        let second = create_entry(&db, input("2025-01-03", 1.0, 0.0)).unwrap();

        let err = update_entry(
            &db,
            &second.id,
            UpdateEntryInput {
                date: Some(d("2025-01-02")),
                ..UpdateEntryInput::default()
            },
        )
        .unwrap_err();

        assert!(
            matches!(err, JournalError::DuplicateDate { ref existing_id, .. } if *existing_id == first.id),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_update_and_delete_missing_entry() {
        let db = Database::open_in_memory().unwrap();

        let err = update_entry(
            &db,
            "ENTRY-missing",
            UpdateEntryInput {
                paper_pnl: Some(1.0),
                ..UpdateEntryInput::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, JournalError::NotFound(_)));

        let err = delete_entry(&db, "ENTRY-missing").unwrap_err();
        assert!(matches!(err, JournalError::NotFound(_)));
    }

    #[test]
    fn test_empty_update_rejected() {
        let db = Database::open_in_memory().unwrap();
        let created = create_entry(&db, input("2025-01-02", 1.0, 0.0)).unwrap();

        let err = update_entry(&db, &created.id, UpdateEntryInput::default()).unwrap_err();
        assert!(matches!(err, JournalError::ValidationError(_)));
    }

    #[test]
    fn test_delete_entry() {
        let db = Database::open_in_memory().unwrap();
        let created = create_entry(&db, input("2025-01-02", 1.0, 0.0)).unwrap();

        delete_entry(&db, &created.id).unwrap();

        assert!(matches!(get_entry(&db, &created.id), Err(JournalError::NotFound(_))));
    }

    #[test]
    fn test_filters() {
        let db = Database::open_in_memory().unwrap();
        for date in ["2024-12-31", "2025-01-02", "2025-01-31", "2025-02-03"] {
            create_entry(&db, input(date, 1.0, 0.0)).unwrap();
        }

        let january = get_entries(&db, &EntryFilters::for_month(2025, 1)).unwrap();
        assert_eq!(january.len(), 2);

        let year = get_entries(
            &db,
            &EntryFilters {
                year: Some(2025),
                ..EntryFilters::default()
            },
        )
        .unwrap();
        assert_eq!(year.len(), 3);

        let range = get_entries(
            &db,
            &EntryFilters {
                from: Some(d("2024-12-31")),
                to: Some(d("2025-01-02")),
                ..EntryFilters::default()
            },
        )
        .unwrap();
        let dates: Vec<NaiveDate> = range.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![d("2024-12-31"), d("2025-01-02")]);
    }

    #[test]
    fn test_bulk_insert_is_all_or_nothing() {
        let db = Database::open_in_memory().unwrap();
        create_entry(&db, input("2025-01-03", 1.0, 0.0)).unwrap();

        let batch = vec![input("2025-01-02", 1.0, 0.0), input("2025-01-03", 5.0, 0.0)];
        let err = add_bulk_entries(&db, &batch, SOURCE_USER_CREATED).unwrap_err();

        assert!(matches!(err, JournalError::DuplicateDate { .. }));
        assert_eq!(get_entries(&db, &EntryFilters::default()).unwrap().len(), 1);

        let batch = vec![input("2025-01-02", 1.0, 0.0), input("2025-01-06", 5.0, 0.0)];
        assert_eq!(add_bulk_entries(&db, &batch, SOURCE_USER_CREATED).unwrap(), 2);
        assert_eq!(get_entries(&db, &EntryFilters::default()).unwrap().len(), 3);
    }

    #[test]
    fn test_bulk_update_is_all_or_nothing() {
        let db = Database::open_in_memory().unwrap();
        let entry = create_entry(&db, input("2025-01-02", 1.0, 0.0)).unwrap();

        let updates = vec![
            EntryUpdate {
                id: entry.id.clone(),
                data: UpdateEntryInput {
                    realized_pnl: Some(99.0),
                    ..UpdateEntryInput::default()
                },
            },
            EntryUpdate {
                id: "ENTRY-missing".to_string(),
                data: UpdateEntryInput {
                    realized_pnl: Some(1.0),
                    ..UpdateEntryInput::default()
                },
            },
        ];

        assert!(update_bulk_entries(&db, &updates).is_err());
        assert_eq!(get_entry(&db, &entry.id).unwrap().realized_pnl, 1.0);

        assert_eq!(update_bulk_entries(&db, &updates[..1]).unwrap(), 1);
        assert_eq!(get_entry(&db, &entry.id).unwrap().realized_pnl, 99.0);
    }

    #[test]
    fn test_invalid_amount_rejected_before_store() {
        let db = Database::open_in_memory().unwrap();

        let err = create_entry(&db, input("2025-01-02", f64::NAN, 0.0)).unwrap_err();

        assert!(matches!(err, JournalError::ValidationError(_)));
        assert!(get_entries(&db, &EntryFilters::default()).unwrap().is_empty());
    }
}
