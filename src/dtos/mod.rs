pub mod auth;
pub mod call;
pub mod customer;
pub mod order;
pub mod payment;
pub mod product;
pub mod purchase;

use serde::Deserialize;

use crate::views::Confirm;

/// `?confirm=true` on every DELETE route. Anything else declines.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    pub confirm: Option<bool>,
}

impl Confirm for DeleteParams {
    fn confirm(&self, _prompt: &str) -> bool {
        self.confirm.unwrap_or(false)
    }
}
