use serde::Serialize;
use chrono::{DateTime, Utc};

/// Credentials held by the session provider.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Application-side user row, created on first sign-in.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Profile {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
