use std::collections::HashMap;

use tracing::{info, instrument, warn};

use super::cart::{Cart, CartError};
use crate::error::AppError;
use crate::gateway::Gateway;
use crate::models::order::{Order, OrderPlan, OrderStatus};
use crate::models::product::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing entered yet.
    Idle,
    Building,
    Submitting,
}

/// The order form: header fields, the cart and, when editing, the order being replaced.
#[derive(Debug, Clone)]
pub struct OrderComposer {
    editing: Option<i64>,
    customer_id: Option<i64>,
    description: Option<String>,
    status: OrderStatus,
    cart: Cart,
    /// Quantities the edited order already holds, per product. They count as
    /// available again when the edited order is saved.
    held: HashMap<i64, i32>,
    phase: Phase,
}

impl Default for OrderComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderComposer {
    pub fn new() -> Self {
        Self {
            editing: None,
            customer_id: None,
            description: None,
            status: OrderStatus::Pending,
            cart: Cart::new(),
            held: HashMap::new(),
            phase: Phase::Idle,
        }
    }

    /// Loads a stored order for editing. Lines keep their stored quantities
    /// and prices; stock is only checked again on save.
    pub fn edit(order: &Order) -> Self {
        let held = order.lines.iter().map(|l| (l.product_id, l.quantity)).collect();
        Self {
            editing: Some(order.id),
            customer_id: Some(order.customer_id),
            description: order.description.clone(),
            status: order.status,
            cart: Cart::from_lines(order.lines.clone()),
            held,
            phase: Phase::Building,
        }
    }

    fn touch(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Building;
        }
    }

    pub fn select_customer(&mut self, customer_id: Option<i64>) {
        self.customer_id = customer_id;
        self.touch();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.touch();
    }

    pub fn add_line(&mut self, product: &Product, quantity: i32) -> Result<(), CartError> {
        self.cart.add(product, quantity)?;
        self.touch();
        Ok(())
    }

    pub fn set_quantity(&mut self, product_id: i64, quantity: i32) -> Result<(), CartError> {
        self.cart.set_quantity(product_id, quantity)?;
        self.touch();
        Ok(())
    }

    pub fn remove_line(&mut self, product_id: i64) {
        self.cart.remove(product_id);
        self.touch();
    }

    /// Back to an empty create form.
    pub fn cancel(&mut self) {
        *self = Self::new();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn editing(&self) -> Option<i64> {
        self.editing
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn total(&self) -> f64 {
        self.cart.total()
    }

    /// Checks the form against the last fetched products and produces what
    /// the gateway will write. Makes no gateway calls.
    pub fn plan(&self, products: &[Product]) -> Result<OrderPlan, AppError> {
        let customer_id = self
            .customer_id
            .ok_or_else(|| AppError::validation("Customer is required"))?;
        if self.cart.is_empty() {
            return Err(AppError::validation("Add at least one product to the order"));
        }

        for line in self.cart.lines() {
            let stock = products
                .iter()
                .find(|p| p.id == line.product_id)
                .map_or(0, |p| p.stock);
            let available = stock.saturating_add(self.held.get(&line.product_id).copied().unwrap_or(0));
            if line.quantity > available {
                return Err(AppError::validation(format!(
                    "Insufficient stock for {}",
                    line.product_name
                )));
            }
        }

        Ok(OrderPlan {
            id: self.editing,
            customer_id,
            description: self.description.clone().filter(|d| !d.trim().is_empty()),
            status: self.status,
            lines: self.cart.lines().to_vec(),
        })
    }

    /// Validates, then hands the plan to the gateway. On success the form is
    /// reset; on failure the cart is kept so the user can correct it.
    #[instrument(skip(self, gateway, products), fields(editing = ?self.editing))]
    pub async fn save(&mut self, gateway: &dyn Gateway, products: &[Product]) -> Result<Order, AppError> {
        let plan = self.plan(products)?;

        self.phase = Phase::Submitting;
        match gateway.save_order(&plan).await {
            Ok(order) => {
                info!(order_id = order.id, total = order.total(), "Order saved");
                self.cancel();
                Ok(order)
            }
            Err(e) => {
                warn!(error = %e, "Order save failed");
                self.phase = Phase::Building;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::customer::CustomerDraft;
    use crate::dtos::product::ProductDraft;
    use crate::gateway::{MemoryGateway, OrderStore};

    async fn seed(gw: &MemoryGateway, stock: i32) -> (i64, Product) {
        let customer = gw
            .customers()
            .insert(&CustomerDraft { name: "Ana".into(), ..Default::default() })
            .await
            .unwrap();
        let product = gw
            .products()
            .insert(&ProductDraft {
                name: "Yerba".into(),
                price: Some(10.0),
                stock,
                category: "Almacén".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (customer.id, product)
    }

    #[test]
    fn starts_idle_and_builds_on_first_input() {
        let mut composer = OrderComposer::new();
        assert_eq!(composer.phase(), Phase::Idle);
        composer.select_customer(Some(1));
        assert_eq!(composer.phase(), Phase::Building);
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_any_gateway_call() {
        let gw = MemoryGateway::new();
        let mut composer = OrderComposer::new();
        composer.select_customer(Some(1));

        let err = composer.save(&gw, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(gw.operations(), 0);
    }

    #[tokio::test]
    async fn missing_customer_is_rejected_before_any_gateway_call() {
        let gw = MemoryGateway::new();
        let (_, yerba) = seed(&gw, 5).await;
        let before = gw.operations();

        let mut composer = OrderComposer::new();
        composer.add_line(&yerba, 1).unwrap();
        let err = composer.save(&gw, &[yerba]).await.unwrap_err();
        assert_eq!(err.to_string(), "Customer is required");
        assert_eq!(gw.operations(), before);
    }

    #[tokio::test]
    async fn save_decrements_stock_by_ordered_quantity() {
        let gw = MemoryGateway::new();
        let (customer_id, yerba) = seed(&gw, 10).await;

        let mut composer = OrderComposer::new();
        composer.select_customer(Some(customer_id));
        composer.add_line(&yerba, 3).unwrap();
        let order = composer.save(&gw, &[yerba.clone()]).await.unwrap();

        assert_eq!(order.total(), 30.0);
        assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 7);
        assert_eq!(composer.phase(), Phase::Idle);
        assert!(composer.cart().is_empty());
    }

    #[tokio::test]
    async fn merged_lines_over_stock_fail_at_save_naming_the_product() {
        let gw = MemoryGateway::new();
        let (customer_id, yerba) = seed(&gw, 4).await;

        let mut composer = OrderComposer::new();
        composer.select_customer(Some(customer_id));
        composer.add_line(&yerba, 3).unwrap();
        composer.add_line(&yerba, 3).unwrap();

        let err = composer.save(&gw, &[yerba.clone()]).await.unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock for Yerba");
        assert_eq!(composer.cart().lines()[0].quantity, 6);
        assert!(gw.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_keeps_the_cart() {
        let gw = MemoryGateway::new();
        let (customer_id, yerba) = seed(&gw, 10).await;

        let mut composer = OrderComposer::new();
        composer.select_customer(Some(customer_id));
        composer.add_line(&yerba, 2).unwrap();

        gw.set_offline(true);
        assert!(composer.save(&gw, &[yerba.clone()]).await.is_err());
        assert_eq!(composer.phase(), Phase::Building);
        assert_eq!(composer.cart().lines().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_saves_cannot_overdraw_stock() {
        let gw = MemoryGateway::new();
        let (customer_id, yerba) = seed(&gw, 3).await;
        let snapshot = vec![yerba.clone()];

        // Both forms validate against the same stale snapshot.
        let mut first = OrderComposer::new();
        first.select_customer(Some(customer_id));
        first.add_line(&yerba, 3).unwrap();
        let mut second = first.clone();

        let (a, b) = tokio::join!(first.save(&gw, &snapshot), second.save(&gw, &snapshot));
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 0);
        assert_eq!(gw.list_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn edit_rebuilds_cart_and_counts_held_quantity_as_available() {
        let gw = MemoryGateway::new();
        let (customer_id, yerba) = seed(&gw, 5).await;

        let mut composer = OrderComposer::new();
        composer.select_customer(Some(customer_id));
        composer.add_line(&yerba, 5).unwrap();
        let order = composer.save(&gw, &[yerba.clone()]).await.unwrap();

        let mut editor = OrderComposer::edit(&order);
        assert_eq!(editor.editing(), Some(order.id));
        assert_eq!(editor.cart().lines()[0].quantity, 5);
        assert_eq!(editor.total(), 50.0);

        // Stock is now 0, yet lowering the order to 4 must be allowed.
        let products = gw.products().list().await.unwrap();
        editor.set_quantity(yerba.id, 4).unwrap();
        let saved = editor.save(&gw, &products).await.unwrap();
        assert_eq!(saved.lines[0].quantity, 4);
        assert_eq!(gw.products().get(yerba.id).await.unwrap().unwrap().stock, 1);
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut composer = OrderComposer::new();
        composer.select_customer(Some(7));
        composer.set_description(Some("Urgente".into()));
        composer.cancel();
        assert_eq!(composer.phase(), Phase::Idle);
        assert!(composer.cart().is_empty());
        assert!(composer.plan(&[]).is_err());
    }
}
