use rusqlite::{Connection, Result};
use std::sync::Mutex;
use crate::db::migration_runner::MigrationRunner;

pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::migrate(conn, db_path)
    }

    /// Fresh, fully migrated journal that lives only as long as the value.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Self::migrate(conn, ":memory:")
    }

    fn migrate(conn: Connection, db_path: &str) -> Result<Self> {
        let runner = MigrationRunner::new();

        log::info!("=== Starting database migration check ===");

        let current_version = runner.get_current_version(&conn)?;
        log::info!("Current schema version: {:?}", current_version);

        let applied = runner.run_pending_migrations(&conn, db_path)?;

        if applied > 0 {
            log::info!("✅ Applied {} migrations successfully", applied);
        } else {
            log::info!("✅ Database schema is up to date");
        }

        // Verify migration integrity (checksums)
        runner.verify_migrations(&conn)?;

        if let Some(version) = runner.get_current_version(&conn)? {
            log::info!("Final schema version: {}", version);
        }

        log::info!("=== Migration check complete ===");

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }
}
