use thiserror::Error;

use crate::error::AppError;
use crate::models::order::{order_total, OrderLine};
use crate::models::product::Product;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CartError {
    #[error("Quantity must be greater than 0")]
    InvalidQuantity,
    #[error("Only {available} units of {product} available")]
    InsufficientStock { product: String, available: i32 },
    #[error("{0} is not in the order")]
    NotInCart(i64),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        AppError::validation(err.to_string())
    }
}

/// Unsaved order lines, at most one per product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: Vec<OrderLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from stored lines, keeping their quantities and prices.
    pub fn from_lines(lines: Vec<OrderLine>) -> Self {
        Self { lines }
    }

    /// Adds `quantity` units of `product`, capturing its current price.
    ///
    /// The quantity is checked against the product's stock on its own. When
    /// the product is already in the cart the quantities are summed without
    /// re-checking the combined amount; that happens when the order is saved.
    pub fn add(&mut self, product: &Product, quantity: i32) -> Result<(), CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity);
        }
        if quantity > product.stock {
            return Err(CartError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
            });
        }

        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                    CartError::InsufficientStock { product: product.name.clone(), available: product.stock }
                })?;
            }
            None => self.lines.push(OrderLine {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity,
                unit_price: product.price,
            }),
        }
        Ok(())
    }

    /// Overwrites the quantity of a line already in the cart, keeping its price.
    pub fn set_quantity(&mut self, product_id: i64, quantity: i32) -> Result<(), CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity);
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(CartError::NotInCart(product_id))?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove(&mut self, product_id: i64) -> Option<OrderLine> {
        let index = self.lines.iter().position(|l| l.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    pub fn contains(&self, product_id: i64) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> f64 {
        order_total(&self.lines)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: i64, name: &str, price: f64, stock: i32) -> Product {
        Product {
            id,
            name: name.to_string(),
            description: None,
            price,
            stock,
            min_stock: 0,
            category: "General".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn over_stock_add_leaves_cart_untouched() {
        let yerba = product(1, "Yerba", 10.0, 4);
        let mut cart = Cart::new();
        cart.add(&yerba, 2).unwrap();
        let before = cart.clone();

        let err = cart.add(&yerba, 5).unwrap_err();
        assert_eq!(err, CartError::InsufficientStock { product: "Yerba".into(), available: 4 });
        assert_eq!(cart, before);
    }

    #[test]
    fn same_product_merges_by_addition() {
        let yerba = product(1, "Yerba", 10.0, 10);
        let mut cart = Cart::new();
        cart.add(&yerba, 2).unwrap();
        cart.add(&yerba, 3).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[test]
    fn merged_quantity_is_not_rechecked_against_stock() {
        let yerba = product(1, "Yerba", 10.0, 4);
        let mut cart = Cart::new();
        cart.add(&yerba, 3).unwrap();
        cart.add(&yerba, 3).unwrap();
        assert_eq!(cart.lines()[0].quantity, 6);
    }

    #[test]
    fn merge_that_would_overflow_is_rejected() {
        let bulk = product(1, "Yerba", 10.0, i32::MAX);
        let mut cart = Cart::new();
        cart.add(&bulk, i32::MAX).unwrap();

        let err = cart.add(&bulk, 1).unwrap_err();
        assert_eq!(err, CartError::InsufficientStock { product: "Yerba".into(), available: i32::MAX });
        assert_eq!(cart.lines()[0].quantity, i32::MAX);
    }

    #[test]
    fn total_is_sum_of_subtotals() {
        let mut cart = Cart::new();
        cart.add(&product(1, "Yerba", 10.0, 5), 2).unwrap();
        cart.add(&product(2, "Azúcar", 5.0, 5), 1).unwrap();
        assert_eq!(cart.total(), 25.0);
    }

    #[test]
    fn price_is_captured_when_added() {
        let mut yerba = product(1, "Yerba", 10.0, 5);
        let mut cart = Cart::new();
        cart.add(&yerba, 1).unwrap();
        yerba.price = 12.5;
        cart.add(&yerba, 1).unwrap();
        assert_eq!(cart.lines()[0].unit_price, 10.0);
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(&product(1, "Yerba", 10.0, 5), 0), Err(CartError::InvalidQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_drops_only_that_product() {
        let mut cart = Cart::new();
        cart.add(&product(1, "Yerba", 10.0, 5), 1).unwrap();
        cart.add(&product(2, "Azúcar", 5.0, 5), 1).unwrap();
        assert!(cart.remove(1).is_some());
        assert!(!cart.contains(1));
        assert!(cart.contains(2));
        assert!(cart.remove(1).is_none());
    }
}
