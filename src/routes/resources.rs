use axum::{routing::get, Router};

use crate::handlers::resource::{create, delete, get_one, list, list_categories, update};
use crate::models::call::Call;
use crate::models::customer::Customer;
use crate::models::payment::Payment;
use crate::models::product::Product;
use crate::models::purchase::Purchase;
use crate::resource::Resource;
use crate::state::AppState;

/// The five CRUD routes for one entity.
fn resource<R: Resource>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, get(list::<R>).post(create::<R>))
        .route(&format!("{path}/{{id}}"), get(get_one::<R>).put(update::<R>).delete(delete::<R>))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(resource::<Customer>("/customers"))
        .merge(resource::<Call>("/calls"))
        .merge(resource::<Purchase>("/purchases"))
        .merge(resource::<Payment>("/payments"))
        .route("/products/categories", get(list_categories))
        .merge(resource::<Product>("/products"))
}
