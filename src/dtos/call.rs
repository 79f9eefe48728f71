use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::resource::Validate;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallDraft {
    pub customer_id: Option<i64>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub reason: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl Validate for CallDraft {
    fn validate(&self) -> Result<(), AppError> {
        if self.customer_id.is_none() || self.scheduled_at.is_none() {
            return Err(AppError::validation("Customer and date are required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletedFilter {
    #[default]
    All,
    Yes,
    No,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallFilter {
    pub customer: Option<String>,
    pub date: Option<String>,
    pub reason: Option<String>,
    pub completed: Option<CompletedFilter>,
}
