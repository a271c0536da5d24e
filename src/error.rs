use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("An entry for {date} already exists ({existing_id})")]
    DuplicateDate { date: NaiveDate, existing_id: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("JSON error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database lock poisoned: {0}")]
    LockError(String),
}

impl JournalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        JournalError::ValidationError(msg.into())
    }
}

impl From<rusqlite::Error> for JournalError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => {
                JournalError::NotFound("no matching row".to_string())
            }
            other => JournalError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::ParseError(err.to_string())
    }
}

impl From<csv::Error> for JournalError {
    fn from(err: csv::Error) -> Self {
        JournalError::CsvError(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for JournalError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        JournalError::LockError(err.to_string())
    }
}

/// True when a rusqlite error is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub type Result<T> = std::result::Result<T, JournalError>;
