use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::resource::Validate;

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseDraft {
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub product: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub unit_price: Option<f64>,
}

impl Default for PurchaseDraft {
    fn default() -> Self {
        Self {
            customer_id: None,
            product: String::new(),
            quantity: default_quantity(),
            unit_price: None,
        }
    }
}

impl Validate for PurchaseDraft {
    fn validate(&self) -> Result<(), AppError> {
        if self.customer_id.is_none() || self.product.trim().is_empty() || self.unit_price.is_none() {
            return Err(AppError::validation("Customer, product and price are required"));
        }
        if self.quantity <= 0 {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }
        if self.unit_price.is_some_and(|price| price < 0.0) {
            return Err(AppError::validation("Price cannot be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseFilter {
    pub customer: Option<String>,
    pub date: Option<String>,
    pub product: Option<String>,
}
