use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::dtos::payment::{PaymentDraft, PaymentFilter};
use crate::filter::{contains_ci, date_prefix, exact, iso_timestamp};
use crate::gateway::{Gateway, Table};
use crate::resource::Resource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Transfer,
    Card,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: Option<String>,
    pub amount: f64,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
}

impl Resource for Payment {
    type Draft = PaymentDraft;
    type Filter = PaymentFilter;

    const LABEL: &'static str = "Payment";

    fn id(&self) -> i64 {
        self.id
    }

    fn draft(&self) -> PaymentDraft {
        PaymentDraft {
            customer_id: Some(self.customer_id),
            amount: Some(self.amount),
            method: self.method,
        }
    }

    fn matches(&self, filter: &PaymentFilter) -> bool {
        contains_ci(self.customer_name.as_deref(), filter.customer.as_deref())
            && date_prefix(&iso_timestamp(&self.paid_at), filter.date.as_deref())
            && exact(&self.method, filter.method.as_ref())
            && contains_ci(Some(&self.amount.to_string()), filter.amount.as_deref())
    }

    fn table(gateway: &dyn Gateway) -> &dyn Table<Self> {
        gateway.payments()
    }
}
