use axum::{extract::State, http::StatusCode, Extension, Json};
use bcrypt::{hash, verify};
use tracing::{info, instrument};

use crate::auth::jwt::sign_token;
use crate::dtos::auth::{CredentialsRequest, SignInResponse, SignUpResponse};
use crate::error::AppError;
use crate::gateway::GatewayError;
use crate::middleware::auth::AuthContext;
use crate::models::account::Profile;
use crate::state::AppState;

fn check_credentials(payload: &CredentialsRequest) -> Result<String, AppError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("Email required"));
    }
    if payload.password.is_empty() {
        return Err(AppError::validation("Password required"));
    }
    Ok(email)
}

// POST /auth/sign-up
#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), AppError> {
    let email = check_credentials(&payload)?;
    if payload.password.len() < 6 {
        return Err(AppError::validation("Password too short"));
    }

    let password_hash = hash(&payload.password, state.config.bcrypt_cost)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;

    let account = state
        .gateway
        .create_account(&email, &password_hash)
        .await
        .map_err(|e| match e {
            GatewayError::Conflict(_) => AppError::conflict("Email already registered"),
            other => other.into(),
        })?;

    info!(user_id = account.id, "Account created");
    Ok((StatusCode::CREATED, Json(SignUpResponse { id: account.id, email: account.email })))
}

// POST /auth/sign-in - Issues a bearer token and ensures the profile row exists
#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<SignInResponse>, AppError> {
    let email = check_credentials(&payload)?;

    let account = state
        .gateway
        .find_account(&email)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    let ok = verify(&payload.password, &account.password_hash)
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))?;
    if !ok {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let profile = match state.gateway.find_profile(account.id).await? {
        Some(profile) => profile,
        None => {
            let profile = state.gateway.create_profile(account.id, &account.email).await?;
            info!(user_id = account.id, "Profile created on first sign-in");
            profile
        }
    };

    let ttl_hours = state.config.token_ttl_hours;
    let token = sign_token(account.id, &account.email, &state.config.jwt_secret, ttl_hours)?;

    Ok(Json(SignInResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in_seconds: ttl_hours * 60 * 60,
        profile,
    }))
}

// POST /auth/sign-out - The presented token stops working immediately
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> StatusCode {
    state.sessions.revoke(auth.jti, auth.exp).await;
    info!("Signed out");
    StatusCode::NO_CONTENT
}

// GET /auth/me
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Profile>, AppError> {
    let profile = state
        .gateway
        .find_profile(auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;
    Ok(Json(profile))
}
