use serde::{Deserialize, Serialize};

use crate::models::account::Profile;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    pub id: i64,
    pub email: String,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in_seconds: i64,
    pub profile: Profile,
}
