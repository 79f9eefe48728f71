//! The one parameterized list/editor component behind every simple entity.
//!
//! An entity plugs in by naming its form ([`Resource::Draft`]), its filter
//! ([`Resource::Filter`]), how to match rows against that filter and which
//! gateway table stores it. Handlers and views are written once against this
//! trait.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;
use crate::gateway::{Gateway, Table};

/// Required-field and range checks run before any gateway call.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

pub trait Resource: Clone + Debug + Serialize + Send + Sync + 'static {
    /// Form fields used to create or update a row. `Default` is the empty form.
    type Draft: Validate + Clone + Debug + Default + PartialEq + DeserializeOwned + Send + Sync + 'static;
    /// Filter fields; `Default` matches every row.
    type Filter: Default + DeserializeOwned + Send + Sync + 'static;

    /// Human name used in messages, e.g. "Customer".
    const LABEL: &'static str;

    fn id(&self) -> i64;

    /// The form as it looks when this row is loaded for editing.
    fn draft(&self) -> Self::Draft;

    fn matches(&self, filter: &Self::Filter) -> bool;

    fn table(gateway: &dyn Gateway) -> &dyn Table<Self>;
}
