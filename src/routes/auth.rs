use axum::{routing::{get, post}, Router};

use crate::handlers::auth::{get_me, sign_in, sign_out, sign_up};
use crate::state::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/me", get(get_me))
}
