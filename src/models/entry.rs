use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};
use crate::models::validation::{check_amount, check_month, check_year, normalize_notes};

pub const SOURCE_USER_CREATED: &str = "USER_CREATED";
pub const SOURCE_CSV_IMPORT: &str = "CSV_IMPORT";
pub const SOURCE_BACKUP_RESTORE: &str = "BACKUP_RESTORE";

fn default_import_source() -> String {
    SOURCE_USER_CREATED.to_string()
}

/// One trading day's realized and paper P&L.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingEntry {
    pub id: String,
    pub date: NaiveDate,
    pub realized_pnl: f64,
    pub paper_pnl: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_import_source")]
    pub import_source: String, // USER_CREATED | CSV_IMPORT | BACKUP_RESTORE
    pub created_at: i64,
    pub updated_at: i64,
}

impl TradingEntry {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn validate(&self) -> Result<()> {
        check_year(self.date.year())?;
        check_amount("realized_pnl", self.realized_pnl)?;
        check_amount("paper_pnl", self.paper_pnl)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEntryInput {
    pub date: NaiveDate,
    pub realized_pnl: f64,
    pub paper_pnl: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateEntryInput {
    pub fn validate(&self) -> Result<()> {
        check_year(self.date.year())?;
        check_amount("realized_pnl", self.realized_pnl)?;
        check_amount("paper_pnl", self.paper_pnl)?;
        Ok(())
    }

    pub fn normalized_notes(&self) -> Option<String> {
        normalize_notes(self.notes.as_deref())
    }
}

/// Partial update; `None` leaves a field untouched. `Some("")` for notes
/// clears them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateEntryInput {
    pub date: Option<NaiveDate>,
    pub realized_pnl: Option<f64>,
    pub paper_pnl: Option<f64>,
    pub notes: Option<String>,
}

impl UpdateEntryInput {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.realized_pnl.is_none()
            && self.paper_pnl.is_none()
            && self.notes.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(JournalError::validation("Nothing to update"));
        }
        if let Some(date) = self.date {
            check_year(date.year())?;
        }
        if let Some(value) = self.realized_pnl {
            check_amount("realized_pnl", value)?;
        }
        if let Some(value) = self.paper_pnl {
            check_amount("paper_pnl", value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryUpdate {
    pub id: String,
    pub data: UpdateEntryInput,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilters {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl EntryFilters {
    pub fn for_month(year: i32, month: u32) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(month) = self.month {
            check_month(month)?;
            if self.year.is_none() {
                return Err(JournalError::validation("A month filter needs a year"));
            }
        }
        if let Some(year) = self.year {
            check_year(year)?;
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(JournalError::validation(format!(
                    "Start date {} is after end date {}",
                    from, to
                )));
            }
        }
        Ok(())
    }
}
