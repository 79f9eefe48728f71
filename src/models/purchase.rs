use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::dtos::purchase::{PurchaseDraft, PurchaseFilter};
use crate::filter::{contains_ci, date_prefix, iso_timestamp};
use crate::gateway::{Gateway, Table};
use crate::resource::Resource;

/// A purchase recorded against a customer. `product` is free text, not a
/// reference into the product catalogue.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct Purchase {
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: Option<String>,
    pub product: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub purchased_at: DateTime<Utc>,
}

impl Resource for Purchase {
    type Draft = PurchaseDraft;
    type Filter = PurchaseFilter;

    const LABEL: &'static str = "Purchase";

    fn id(&self) -> i64 {
        self.id
    }

    fn draft(&self) -> PurchaseDraft {
        PurchaseDraft {
            customer_id: Some(self.customer_id),
            product: self.product.clone(),
            quantity: self.quantity,
            unit_price: Some(self.unit_price),
        }
    }

    fn matches(&self, filter: &PurchaseFilter) -> bool {
        contains_ci(self.customer_name.as_deref(), filter.customer.as_deref())
            && date_prefix(&iso_timestamp(&self.purchased_at), filter.date.as_deref())
            && contains_ci(Some(&self.product), filter.product.as_deref())
    }

    fn table(gateway: &dyn Gateway) -> &dyn Table<Self> {
        gateway.purchases()
    }
}
