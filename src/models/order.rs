use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::dtos::order::OrderFilter;
use crate::filter::{contains_ci, date_prefix, exact, iso_timestamp};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// One product in an order. `unit_price` is the price captured when the line
/// was added and is never re-read from the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: f64,
}

impl OrderLine {
    pub fn subtotal(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

pub fn order_total(lines: &[OrderLine]) -> f64 {
    lines.iter().map(OrderLine::subtotal).sum()
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: Option<String>,
    pub description: Option<String>,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Derived from the lines; there is no stored total to drift.
    pub fn total(&self) -> f64 {
        order_total(&self.lines)
    }

    pub fn matches(&self, filter: &OrderFilter) -> bool {
        contains_ci(self.customer_name.as_deref(), filter.customer.as_deref())
            && date_prefix(&iso_timestamp(&self.ordered_at), filter.date.as_deref())
            && exact(&self.status, filter.status.as_ref())
            && contains_ci(self.description.as_deref(), filter.description.as_deref())
    }
}

/// Everything an order save writes: header fields plus the full replacement
/// line list. `id` is set when an existing order is being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlan {
    pub id: Option<i64>,
    pub customer_id: i64,
    pub description: Option<String>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, quantity: i32, unit_price: f64) -> OrderLine {
        OrderLine { product_id, product_name: format!("p{product_id}"), quantity, unit_price }
    }

    #[test]
    fn total_sums_line_subtotals() {
        let lines = vec![line(1, 2, 10.0), line(2, 1, 5.0)];
        assert_eq!(order_total(&lines), 25.0);
    }

    #[test]
    fn empty_order_totals_zero() {
        assert_eq!(order_total(&[]), 0.0);
    }

    #[test]
    fn status_filter_is_exact() {
        let order = Order {
            id: 1,
            customer_id: 1,
            customer_name: Some("Ana".into()),
            description: Some("Entrega semanal".into()),
            status: OrderStatus::InProgress,
            ordered_at: Utc::now(),
            lines: vec![],
        };
        let pending = OrderFilter { status: Some(OrderStatus::Pending), ..Default::default() };
        let in_progress = OrderFilter { status: Some(OrderStatus::InProgress), ..Default::default() };
        assert!(!order.matches(&pending));
        assert!(order.matches(&in_progress));
        let by_text = OrderFilter { description: Some("SEMANAL".into()), ..Default::default() };
        assert!(order.matches(&by_text));
    }
}
