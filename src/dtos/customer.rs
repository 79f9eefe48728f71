// src/dtos/customer.rs
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::resource::Validate;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerDraft {
    #[serde(default)]
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

impl Validate for CustomerDraft {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Name is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    /// Prefix of the creation date, `YYYY-MM-DD` or shorter.
    pub date: Option<String>,
}
