// src/gateway/postgres.rs
use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{error, instrument, warn};

use super::{AccountStore, Gateway, GatewayError, GatewayResult, OrderStore, Table};
use crate::dtos::call::CallDraft;
use crate::dtos::customer::CustomerDraft;
use crate::dtos::payment::PaymentDraft;
use crate::dtos::product::ProductDraft;
use crate::dtos::purchase::PurchaseDraft;
use crate::models::account::{Account, Profile};
use crate::models::call::Call;
use crate::models::customer::Customer;
use crate::models::order::{Order, OrderLine, OrderPlan};
use crate::models::payment::Payment;
use crate::models::product::Product;
use crate::models::purchase::Purchase;

#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn order_lines(&self, order_id: Option<i64>) -> GatewayResult<HashMap<i64, Vec<OrderLine>>> {
        let rows = sqlx::query_as::<_, LineRow>(
            "SELECT l.order_id, l.product_id, p.name AS product_name, l.quantity, l.unit_price
             FROM order_lines l
             JOIN products p ON p.id = l.product_id
             WHERE $1::BIGINT IS NULL OR l.order_id = $1
             ORDER BY l.order_id, l.id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row.line);
        }
        Ok(grouped)
    }
}

#[derive(FromRow)]
struct LineRow {
    order_id: i64,
    #[sqlx(flatten)]
    line: OrderLine,
}

// ==================== Customers ====================

#[async_trait]
impl Table<Customer> for PgGateway {
    async fn list(&self) -> GatewayResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, email, address, city, created_at
             FROM customers ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> GatewayResult<Option<Customer>> {
        let row = sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, email, address, city, created_at
             FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, draft: &CustomerDraft) -> GatewayResult<Customer> {
        let row = sqlx::query_as::<_, Customer>(
            "INSERT INTO customers (name, phone, email, address, city)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, phone, email, address, city, created_at",
        )
        .bind(draft.name.trim())
        .bind(&draft.phone)
        .bind(&draft.email)
        .bind(&draft.address)
        .bind(&draft.city)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, draft: &CustomerDraft) -> GatewayResult<Option<Customer>> {
        let row = sqlx::query_as::<_, Customer>(
            "UPDATE customers SET name = $1, phone = $2, email = $3, address = $4, city = $5
             WHERE id = $6
             RETURNING id, name, phone, email, address, city, created_at",
        )
        .bind(draft.name.trim())
        .bind(&draft.phone)
        .bind(&draft.email)
        .bind(&draft.address)
        .bind(&draft.city)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> GatewayResult<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Calls ====================

#[async_trait]
impl Table<Call> for PgGateway {
    async fn list(&self) -> GatewayResult<Vec<Call>> {
        let rows = sqlx::query_as::<_, Call>(
            "SELECT c.id, c.customer_id, cu.name AS customer_name, c.scheduled_at, c.reason, c.completed
             FROM calls c
             JOIN customers cu ON cu.id = c.customer_id
             ORDER BY c.scheduled_at DESC, c.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> GatewayResult<Option<Call>> {
        let row = sqlx::query_as::<_, Call>(
            "SELECT c.id, c.customer_id, cu.name AS customer_name, c.scheduled_at, c.reason, c.completed
             FROM calls c
             JOIN customers cu ON cu.id = c.customer_id
             WHERE c.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, draft: &CallDraft) -> GatewayResult<Call> {
        let row = sqlx::query_as::<_, Call>(
            "WITH saved AS (
                INSERT INTO calls (customer_id, scheduled_at, reason, completed)
                VALUES ($1, $2, $3, $4)
                RETURNING *
             )
             SELECT saved.id, saved.customer_id, cu.name AS customer_name,
                    saved.scheduled_at, saved.reason, saved.completed
             FROM saved JOIN customers cu ON cu.id = saved.customer_id",
        )
        .bind(draft.customer_id)
        .bind(draft.scheduled_at)
        .bind(&draft.reason)
        .bind(draft.completed)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, draft: &CallDraft) -> GatewayResult<Option<Call>> {
        let row = sqlx::query_as::<_, Call>(
            "WITH saved AS (
                UPDATE calls SET customer_id = $1, scheduled_at = $2, reason = $3, completed = $4
                WHERE id = $5
                RETURNING *
             )
             SELECT saved.id, saved.customer_id, cu.name AS customer_name,
                    saved.scheduled_at, saved.reason, saved.completed
             FROM saved JOIN customers cu ON cu.id = saved.customer_id",
        )
        .bind(draft.customer_id)
        .bind(draft.scheduled_at)
        .bind(&draft.reason)
        .bind(draft.completed)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> GatewayResult<bool> {
        let result = sqlx::query("DELETE FROM calls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Purchases ====================

#[async_trait]
impl Table<Purchase> for PgGateway {
    async fn list(&self) -> GatewayResult<Vec<Purchase>> {
        let rows = sqlx::query_as::<_, Purchase>(
            "SELECT p.id, p.customer_id, cu.name AS customer_name, p.product, p.quantity,
                    p.unit_price, p.purchased_at
             FROM purchases p
             JOIN customers cu ON cu.id = p.customer_id
             ORDER BY p.purchased_at DESC, p.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> GatewayResult<Option<Purchase>> {
        let row = sqlx::query_as::<_, Purchase>(
            "SELECT p.id, p.customer_id, cu.name AS customer_name, p.product, p.quantity,
                    p.unit_price, p.purchased_at
             FROM purchases p
             JOIN customers cu ON cu.id = p.customer_id
             WHERE p.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, draft: &PurchaseDraft) -> GatewayResult<Purchase> {
        let row = sqlx::query_as::<_, Purchase>(
            "WITH saved AS (
                INSERT INTO purchases (customer_id, product, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                RETURNING *
             )
             SELECT saved.id, saved.customer_id, cu.name AS customer_name, saved.product,
                    saved.quantity, saved.unit_price, saved.purchased_at
             FROM saved JOIN customers cu ON cu.id = saved.customer_id",
        )
        .bind(draft.customer_id)
        .bind(draft.product.trim())
        .bind(draft.quantity)
        .bind(draft.unit_price)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, draft: &PurchaseDraft) -> GatewayResult<Option<Purchase>> {
        let row = sqlx::query_as::<_, Purchase>(
            "WITH saved AS (
                UPDATE purchases SET customer_id = $1, product = $2, quantity = $3, unit_price = $4
                WHERE id = $5
                RETURNING *
             )
             SELECT saved.id, saved.customer_id, cu.name AS customer_name, saved.product,
                    saved.quantity, saved.unit_price, saved.purchased_at
             FROM saved JOIN customers cu ON cu.id = saved.customer_id",
        )
        .bind(draft.customer_id)
        .bind(draft.product.trim())
        .bind(draft.quantity)
        .bind(draft.unit_price)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> GatewayResult<bool> {
        let result = sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Payments ====================

#[async_trait]
impl Table<Payment> for PgGateway {
    async fn list(&self) -> GatewayResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, Payment>(
            "SELECT p.id, p.customer_id, cu.name AS customer_name, p.amount, p.method, p.paid_at
             FROM payments p
             JOIN customers cu ON cu.id = p.customer_id
             ORDER BY p.paid_at DESC, p.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> GatewayResult<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(
            "SELECT p.id, p.customer_id, cu.name AS customer_name, p.amount, p.method, p.paid_at
             FROM payments p
             JOIN customers cu ON cu.id = p.customer_id
             WHERE p.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, draft: &PaymentDraft) -> GatewayResult<Payment> {
        let row = sqlx::query_as::<_, Payment>(
            "WITH saved AS (
                INSERT INTO payments (customer_id, amount, method)
                VALUES ($1, $2, $3)
                RETURNING *
             )
             SELECT saved.id, saved.customer_id, cu.name AS customer_name,
                    saved.amount, saved.method, saved.paid_at
             FROM saved JOIN customers cu ON cu.id = saved.customer_id",
        )
        .bind(draft.customer_id)
        .bind(draft.amount)
        .bind(draft.method)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, draft: &PaymentDraft) -> GatewayResult<Option<Payment>> {
        let row = sqlx::query_as::<_, Payment>(
            "WITH saved AS (
                UPDATE payments SET customer_id = $1, amount = $2, method = $3
                WHERE id = $4
                RETURNING *
             )
             SELECT saved.id, saved.customer_id, cu.name AS customer_name,
                    saved.amount, saved.method, saved.paid_at
             FROM saved JOIN customers cu ON cu.id = saved.customer_id",
        )
        .bind(draft.customer_id)
        .bind(draft.amount)
        .bind(draft.method)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> GatewayResult<bool> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Products ====================

#[async_trait]
impl Table<Product> for PgGateway {
    async fn list(&self) -> GatewayResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, stock, min_stock, category, created_at
             FROM products ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> GatewayResult<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, price, stock, min_stock, category, created_at
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, draft: &ProductDraft) -> GatewayResult<Product> {
        let row = sqlx::query_as::<_, Product>(
            "INSERT INTO products (name, description, price, stock, min_stock, category)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, name, description, price, stock, min_stock, category, created_at",
        )
        .bind(draft.name.trim())
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.stock)
        .bind(draft.min_stock)
        .bind(draft.category.trim())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, draft: &ProductDraft) -> GatewayResult<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            "UPDATE products SET
                name = $1, description = $2, price = $3, stock = $4, min_stock = $5, category = $6
             WHERE id = $7
             RETURNING id, name, description, price, stock, min_stock, category, created_at",
        )
        .bind(draft.name.trim())
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.stock)
        .bind(draft.min_stock)
        .bind(draft.category.trim())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> GatewayResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Orders ====================

#[async_trait]
impl OrderStore for PgGateway {
    async fn list_orders(&self) -> GatewayResult<Vec<Order>> {
        let mut orders = sqlx::query_as::<_, Order>(
            "SELECT o.id, o.customer_id, cu.name AS customer_name, o.description, o.status, o.ordered_at
             FROM orders o
             JOIN customers cu ON cu.id = o.customer_id
             ORDER BY o.ordered_at DESC, o.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut lines = self.order_lines(None).await?;
        for order in &mut orders {
            order.lines = lines.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }

    async fn get_order(&self, id: i64) -> GatewayResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT o.id, o.customer_id, cu.name AS customer_name, o.description, o.status, o.ordered_at
             FROM orders o
             JOIN customers cu ON cu.id = o.customer_id
             WHERE o.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut order) = order else {
            return Ok(None);
        };
        order.lines = self.order_lines(Some(id)).await?.remove(&id).unwrap_or_default();
        Ok(Some(order))
    }

    #[instrument(skip(self, plan), fields(order_id = ?plan.id, lines = plan.lines.len()))]
    async fn save_order(&self, plan: &OrderPlan) -> GatewayResult<Order> {
        // Header, lines and stock commit together or not at all.
        let mut tx = self.pool.begin().await?;

        let order_id = match plan.id {
            Some(id) => {
                sqlx::query_scalar::<_, i64>(
                    "UPDATE orders SET customer_id = $1, description = $2, status = $3
                     WHERE id = $4 RETURNING id",
                )
                .bind(plan.customer_id)
                .bind(&plan.description)
                .bind(plan.status)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| GatewayError::NotFound("Order not found".to_string()))?;

                // Give back what the previous version of the order took.
                sqlx::query(
                    "UPDATE products p SET stock = p.stock + l.quantity
                     FROM order_lines l
                     WHERE l.order_id = $1 AND l.product_id = p.id",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                id
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    "INSERT INTO orders (customer_id, description, status)
                     VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(plan.customer_id)
                .bind(&plan.description)
                .bind(plan.status)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        for line in &plan.lines {
            sqlx::query(
                "INSERT INTO order_lines (order_id, product_id, quantity, unit_price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;

            // Row lock plus re-checked predicate: concurrent saves cannot overdraw.
            let taken = sqlx::query_scalar::<_, i64>(
                "UPDATE products SET stock = stock - $1
                 WHERE id = $2 AND stock >= $1 RETURNING id",
            )
            .bind(line.quantity)
            .bind(line.product_id)
            .fetch_optional(&mut *tx)
            .await?;

            if taken.is_none() {
                warn!(product_id = line.product_id, quantity = line.quantity, "Stock ran out during order save");
                return Err(GatewayError::InsufficientStock { product: line.product_name.clone() });
            }
        }

        tx.commit().await?;

        self.get_order(order_id).await?.ok_or_else(|| {
            error!(order_id, "Order vanished right after commit");
            GatewayError::NotFound("Order not found".to_string())
        })
    }

    async fn delete_order(&self, id: i64) -> GatewayResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ==================== Accounts ====================

#[async_trait]
impl AccountStore for PgGateway {
    async fn find_account(&self, email: &str) -> GatewayResult<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, created_at FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_account(&self, email: &str, password_hash: &str) -> GatewayResult<Account> {
        sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (email, password_hash) VALUES ($1, $2)
             RETURNING id, email, password_hash, created_at",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match GatewayError::from(e) {
            GatewayError::Conflict(_) => GatewayError::Conflict("Email already registered".to_string()),
            other => other,
        })
    }

    async fn find_profile(&self, user_id: i64) -> GatewayResult<Option<Profile>> {
        let row = sqlx::query_as::<_, Profile>(
            "SELECT id, email, created_at FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_profile(&self, user_id: i64, email: &str) -> GatewayResult<Profile> {
        let row = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles (id, email) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET email = profiles.email
             RETURNING id, email, created_at",
        )
        .bind(user_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl Gateway for PgGateway {
    fn customers(&self) -> &dyn Table<Customer> {
        self
    }

    fn calls(&self) -> &dyn Table<Call> {
        self
    }

    fn purchases(&self) -> &dyn Table<Purchase> {
        self
    }

    fn payments(&self) -> &dyn Table<Payment> {
        self
    }

    fn products(&self) -> &dyn Table<Product> {
        self
    }

    async fn health_check(&self) -> GatewayResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
