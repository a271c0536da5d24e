use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};
use crate::models::validation::check_nav_value;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_NAV: f64 = 250_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: i32,
    pub currency: String,
    /// NAV shown when no month has a mark yet.
    pub default_nav: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettingsInput {
    pub currency: Option<String>,
    pub default_nav: Option<f64>,
}

impl UpdateSettingsInput {
    pub fn validate(&self) -> Result<()> {
        if let Some(currency) = &self.currency {
            let code = currency.trim();
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(JournalError::validation(format!(
                    "Currency must be a three-letter code, got '{}'",
                    currency
                )));
            }
        }
        if let Some(nav) = self.default_nav {
            check_nav_value(nav)?;
        }
        Ok(())
    }
}
