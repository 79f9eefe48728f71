use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::payment::PaymentMethod;
use crate::resource::Validate;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentDraft {
    pub customer_id: Option<i64>,
    pub amount: Option<f64>,
    #[serde(default)]
    pub method: PaymentMethod,
}

impl Validate for PaymentDraft {
    fn validate(&self) -> Result<(), AppError> {
        match (self.customer_id, self.amount) {
            (Some(_), Some(amount)) if amount > 0.0 => Ok(()),
            (Some(_), Some(_)) => Err(AppError::validation("Amount must be greater than 0")),
            _ => Err(AppError::validation("Customer and amount are required")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentFilter {
    pub customer: Option<String>,
    pub date: Option<String>,
    pub method: Option<PaymentMethod>,
    /// Substring of the amount as written, e.g. `150` matches 1500 and 150.5.
    pub amount: Option<String>,
}
