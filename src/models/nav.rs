use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::validation::{check_month, check_nav_value, check_year};

/// End-of-month net asset value mark. At most one per `(year, month)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyNav {
    pub id: String,
    pub year: i32,
    pub month: u32,
    pub nav_value: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MonthlyNav {
    pub fn validate(&self) -> Result<()> {
        check_year(self.year)?;
        check_month(self.month)?;
        check_nav_value(self.nav_value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavInput {
    pub year: i32,
    pub month: u32,
    pub nav_value: f64,
}

impl NavInput {
    pub fn new(year: i32, month: u32, nav_value: f64) -> Self {
        Self { year, month, nav_value }
    }

    pub fn validate(&self) -> Result<()> {
        check_year(self.year)?;
        check_month(self.month)?;
        check_nav_value(self.nav_value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavUpdate {
    pub id: String,
    pub nav_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_input_validation() {
        assert!(NavInput::new(2025, 3, 300000.0).validate().is_ok());
        assert!(NavInput::new(2025, 0, 300000.0).validate().is_err());
        assert!(NavInput::new(2025, 13, 300000.0).validate().is_err());
        assert!(NavInput::new(2025, 3, 0.0).validate().is_err());
        assert!(NavInput::new(2025, 3, -1.0).validate().is_err());
        assert!(NavInput::new(1850, 3, 1.0).validate().is_err());
    }
}
