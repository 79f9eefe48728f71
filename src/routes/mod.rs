pub mod auth;
pub mod orders;
pub mod resources;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::handlers::health_check;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

/// Every endpoint, nested under `/api`.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(resources::routes())
        .merge(orders::routes())
        .merge(auth::protected_routes())
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .route("/", get(|| async { "Gestión API" }))
        .route("/health", get(health_check))
        .merge(auth::public_routes())
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
