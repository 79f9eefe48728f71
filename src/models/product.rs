use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::dtos::product::{ProductDraft, ProductFilter, StockLevel};
use crate::filter::{contains_ci, exact};
use crate::gateway::{Gateway, Table};
use crate::resource::Resource;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub min_stock: i32,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// Distinct categories in first-seen order.
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for product in products {
        if !seen.contains(&product.category) {
            seen.push(product.category.clone());
        }
    }
    seen
}

impl Resource for Product {
    type Draft = ProductDraft;
    type Filter = ProductFilter;

    const LABEL: &'static str = "Product";

    fn id(&self) -> i64 {
        self.id
    }

    fn draft(&self) -> ProductDraft {
        ProductDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            price: Some(self.price),
            stock: self.stock,
            min_stock: self.min_stock,
            category: self.category.clone(),
        }
    }

    fn matches(&self, filter: &ProductFilter) -> bool {
        let stock_ok = match filter.stock.unwrap_or_default() {
            StockLevel::All => true,
            StockLevel::Low => self.is_low_stock(),
            StockLevel::Normal => !self.is_low_stock(),
        };
        let category = filter.category.as_ref().filter(|c| !c.is_empty());

        contains_ci(Some(&self.name), filter.name.as_deref())
            && exact(&self.category, category)
            && stock_ok
    }

    fn table(gateway: &dyn Gateway) -> &dyn Table<Self> {
        gateway.products()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, category: &str, stock: i32, min_stock: i32) -> Product {
        Product {
            id: 1,
            name: name.to_string(),
            description: None,
            price: 10.0,
            stock,
            min_stock,
            category: category.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn low_stock_includes_threshold() {
        assert!(product("Yerba", "Almacén", 5, 5).is_low_stock());
        assert!(!product("Yerba", "Almacén", 6, 5).is_low_stock());
    }

    #[test]
    fn stock_level_filter_splits_low_and_normal() {
        let low = product("Azúcar", "Almacén", 1, 3);
        let normal = product("Arroz", "Almacén", 10, 3);
        let filter = ProductFilter { stock: Some(StockLevel::Low), ..Default::default() };
        assert!(low.matches(&filter));
        assert!(!normal.matches(&filter));
    }

    #[test]
    fn category_filter_is_exact() {
        let p = product("Lavandina", "Limpieza", 4, 1);
        let partial = ProductFilter { category: Some("Limp".into()), ..Default::default() };
        let full = ProductFilter { category: Some("Limpieza".into()), ..Default::default() };
        assert!(!p.matches(&partial));
        assert!(p.matches(&full));
    }

    #[test]
    fn categories_are_distinct() {
        let list = vec![
            product("a", "Bebidas", 1, 0),
            product("b", "Almacén", 1, 0),
            product("c", "Bebidas", 1, 0),
        ];
        assert_eq!(categories(&list), vec!["Bebidas".to_string(), "Almacén".to_string()]);
    }
}
