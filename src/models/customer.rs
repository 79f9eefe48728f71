use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::dtos::customer::{CustomerDraft, CustomerFilter};
use crate::filter::{contains_ci, date_prefix, iso_timestamp};
use crate::gateway::{Gateway, Table};
use crate::resource::Resource;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Resource for Customer {
    type Draft = CustomerDraft;
    type Filter = CustomerFilter;

    const LABEL: &'static str = "Customer";

    fn id(&self) -> i64 {
        self.id
    }

    fn draft(&self) -> CustomerDraft {
        CustomerDraft {
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
        }
    }

    fn matches(&self, filter: &CustomerFilter) -> bool {
        contains_ci(Some(&self.name), filter.name.as_deref())
            && contains_ci(self.email.as_deref(), filter.email.as_deref())
            && contains_ci(self.city.as_deref(), filter.city.as_deref())
            && date_prefix(&iso_timestamp(&self.created_at), filter.date.as_deref())
    }

    fn table(gateway: &dyn Gateway) -> &dyn Table<Self> {
        gateway.customers()
    }
}
