use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::order::{Order, OrderLine, OrderStatus};

#[derive(Debug, Deserialize)]
pub struct SaveOrderRequest {
    pub customer_id: Option<i64>,
    pub description: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub customer: Option<String>,
    pub date: Option<String>,
    pub status: Option<OrderStatus>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: Option<String>,
    pub description: Option<String>,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
    pub lines: Vec<OrderLineResponse>,
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub subtotal: f64,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            subtotal: line.subtotal(),
            product_id: line.product_id,
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price: line.unit_price,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let total = order.total();
        Self {
            id: order.id,
            customer_id: order.customer_id,
            customer_name: order.customer_name,
            description: order.description,
            status: order.status,
            ordered_at: order.ordered_at,
            lines: order.lines.into_iter().map(OrderLineResponse::from).collect(),
            total,
        }
    }
}
