// src/dtos/product.rs
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::resource::Validate;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub min_stock: i32,
    #[serde(default)]
    pub category: String,
}

impl Validate for ProductDraft {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() || self.category.trim().is_empty() {
            return Err(AppError::validation("Name and category are required"));
        }
        match self.price {
            None => return Err(AppError::validation("Price is required")),
            Some(price) if price < 0.0 => {
                return Err(AppError::validation("Price cannot be negative"))
            }
            Some(_) => {}
        }
        if self.stock < 0 || self.min_stock < 0 {
            return Err(AppError::validation("Stock cannot be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    #[default]
    All,
    Low,
    Normal,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub category: Option<String>,
    pub stock: Option<StockLevel>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}
