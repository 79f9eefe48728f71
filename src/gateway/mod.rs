//! Persistence seam for every entity.
//!
//! The rest of the crate talks to storage only through [`Gateway`]. Two
//! implementations exist: [`PgGateway`] on top of a `sqlx` pool and
//! [`MemoryGateway`], an in-process store used by tests and `GATEWAY=memory`.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::account::{Account, Profile};
use crate::models::call::Call;
use crate::models::customer::Customer;
use crate::models::order::{Order, OrderPlan};
use crate::models::payment::Payment;
use crate::models::product::Product;
use crate::models::purchase::Purchase;
use crate::resource::Resource;

pub mod memory;
pub mod postgres;

pub use memory::MemoryGateway;
pub use postgres::PgGateway;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure reported by the storage layer. The message is meant for end users.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// A not-null, check or type constraint refused the row.
    #[error("{0}")]
    Rejected(String),
    /// Unique or foreign-key constraint violation.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    /// The conditional stock decrement of an order save found too few units.
    #[error("Insufficient stock for {product}")]
    InsufficientStock { product: String },
    /// Connection, pool or I/O failure.
    #[error("{0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") | Some("23503") => GatewayError::Conflict(message),
                    _ => GatewayError::Rejected(message),
                }
            }
            sqlx::Error::RowNotFound => GatewayError::NotFound("Row not found".to_string()),
            other => GatewayError::Unavailable(other.to_string()),
        }
    }
}

/// Table-level CRUD for one entity.
#[async_trait]
pub trait Table<R: Resource>: Send + Sync {
    /// All rows, joined with the customer name where the entity has one,
    /// in the entity's natural listing order.
    async fn list(&self) -> GatewayResult<Vec<R>>;

    async fn get(&self, id: i64) -> GatewayResult<Option<R>>;

    async fn insert(&self, draft: &R::Draft) -> GatewayResult<R>;

    /// `Ok(None)` when no row has this id.
    async fn update(&self, id: i64, draft: &R::Draft) -> GatewayResult<Option<R>>;

    /// `Ok(false)` when no row has this id.
    async fn delete(&self, id: i64) -> GatewayResult<bool>;
}

/// Orders own their lines, so they are stored as a unit rather than through [`Table`].
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders with their lines, newest first.
    async fn list_orders(&self) -> GatewayResult<Vec<Order>>;

    async fn get_order(&self, id: i64) -> GatewayResult<Option<Order>>;

    /// Persists the header, replaces the lines and takes the ordered quantities
    /// out of stock, all or nothing. When `plan.id` names an existing order its
    /// previous lines are returned to stock first.
    async fn save_order(&self, plan: &OrderPlan) -> GatewayResult<Order>;

    async fn delete_order(&self, id: i64) -> GatewayResult<bool>;
}

/// Accounts back the session provider; profiles are the application-side user rows.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, email: &str) -> GatewayResult<Option<Account>>;

    async fn create_account(&self, email: &str, password_hash: &str) -> GatewayResult<Account>;

    async fn find_profile(&self, user_id: i64) -> GatewayResult<Option<Profile>>;

    async fn create_profile(&self, user_id: i64, email: &str) -> GatewayResult<Profile>;
}

#[async_trait]
pub trait Gateway: OrderStore + AccountStore + Send + Sync {
    fn customers(&self) -> &dyn Table<Customer>;
    fn calls(&self) -> &dyn Table<Call>;
    fn purchases(&self) -> &dyn Table<Purchase>;
    fn payments(&self) -> &dyn Table<Payment>;
    fn products(&self) -> &dyn Table<Product>;

    async fn health_check(&self) -> GatewayResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_becomes_not_found() {
        assert!(matches!(GatewayError::from(sqlx::Error::RowNotFound), GatewayError::NotFound(_)));
    }

    #[test]
    fn pool_failures_are_unavailable() {
        assert!(matches!(GatewayError::from(sqlx::Error::PoolTimedOut), GatewayError::Unavailable(_)));
    }
}
