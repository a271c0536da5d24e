use rusqlite::Connection;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Settings, UpdateSettingsInput};

pub(crate) fn read_settings(conn: &Connection) -> Result<Settings> {
    let settings = conn.query_row(
        "SELECT id, currency, default_nav, created_at, updated_at FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(Settings {
                id: row.get(0)?,
                currency: row.get(1)?,
                default_nav: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        },
    )?;

    Ok(settings)
}

pub fn get_settings(db: &Database) -> Result<Settings> {
    let conn = db.conn.lock()?;
    read_settings(&conn)
}

pub fn update_settings(db: &Database, settings: UpdateSettingsInput) -> Result<Settings> {
    settings.validate()?;

    {
        let conn = db.conn.lock()?;

        // Build dynamic UPDATE query
        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(val) = settings.currency {
            updates.push("currency = ?");
            values.push(Box::new(val.trim().to_ascii_uppercase()));
        }
        if let Some(val) = settings.default_nav {
            updates.push("default_nav = ?");
            values.push(Box::new(val));
        }

        updates.push("updated_at = strftime('%s', 'now')");

        let query = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));
        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();

        conn.execute(&query, params.as_slice())?;
    }

    log::info!("Settings updated");
    get_settings(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JournalError;
    use crate::models::{DEFAULT_CURRENCY, DEFAULT_NAV};

    #[test]
    fn test_defaults_after_fresh_install() {
        let db = Database::open_in_memory().unwrap();
        let settings = get_settings(&db).unwrap();

        assert_eq!(settings.id, 1);
        assert_eq!(settings.currency, DEFAULT_CURRENCY);
        assert_eq!(settings.default_nav, DEFAULT_NAV);
    }

    #[test]
    fn test_partial_update() {
        let db = Database::open_in_memory().unwrap();

        let updated = update_settings(
            &db,
            UpdateSettingsInput {
                currency: Some("eur".to_string()),
                default_nav: None,
            },
        )
        .unwrap();
        assert_eq!(updated.currency, "EUR");
        assert_eq!(updated.default_nav, DEFAULT_NAV);

        let updated = update_settings(
            &db,
            UpdateSettingsInput {
                currency: None,
                default_nav: Some(100000.0),
            },
        )
        .unwrap();
        assert_eq!(updated.currency, "EUR");
        assert_eq!(updated.default_nav, 100000.0);
    }

    #[test]
    fn test_invalid_update_rejected() {
        let db = Database::open_in_memory().unwrap();

        let err = update_settings(
            &db,
            UpdateSettingsInput {
                currency: Some("dollars".to_string()),
                default_nav: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, JournalError::ValidationError(_)));

        let err = update_settings(
            &db,
            UpdateSettingsInput {
                currency: None,
                default_nav: Some(-5.0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, JournalError::ValidationError(_)));

        assert_eq!(get_settings(&db).unwrap().currency, DEFAULT_CURRENCY);
    }
}
