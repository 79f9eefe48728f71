use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

use crate::dtos::call::{CallDraft, CallFilter, CompletedFilter};
use crate::filter::{contains_ci, date_prefix, iso_local};
use crate::gateway::{Gateway, Table};
use crate::resource::Resource;

/// A scheduled phone call to a customer.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct Call {
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: Option<String>,
    pub scheduled_at: NaiveDateTime,
    pub reason: Option<String>,
    pub completed: bool,
}

impl Resource for Call {
    type Draft = CallDraft;
    type Filter = CallFilter;

    const LABEL: &'static str = "Call";

    fn id(&self) -> i64 {
        self.id
    }

    fn draft(&self) -> CallDraft {
        CallDraft {
            customer_id: Some(self.customer_id),
            scheduled_at: Some(self.scheduled_at),
            reason: self.reason.clone(),
            completed: self.completed,
        }
    }

    fn matches(&self, filter: &CallFilter) -> bool {
        let completed_ok = match filter.completed.unwrap_or_default() {
            CompletedFilter::All => true,
            CompletedFilter::Yes => self.completed,
            CompletedFilter::No => !self.completed,
        };

        contains_ci(self.customer_name.as_deref(), filter.customer.as_deref())
            && date_prefix(&iso_local(&self.scheduled_at), filter.date.as_deref())
            && contains_ci(self.reason.as_deref(), filter.reason.as_deref())
            && completed_ok
    }

    fn table(gateway: &dyn Gateway) -> &dyn Table<Self> {
        gateway.calls()
    }
}
