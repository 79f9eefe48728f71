// src/config.rs
use std::net::IpAddr;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    Postgres,
    Memory,
}

/// Runtime settings, read once at start-up after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub gateway: GatewayKind,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            gateway: GatewayKind::Postgres,
            database_url: None,
            max_connections: 5,
            jwt_secret: String::new(),
            token_ttl_hours: 8,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Invalid value, using default");
            fallback
        }),
        Err(_) => fallback,
    }
}

/// Longest accepted token lifetime: 30 days.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 30;

fn bounded_ttl(hours: i64, fallback: i64) -> i64 {
    if (1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        hours
    } else {
        warn!(hours, max = MAX_TOKEN_TTL_HOURS, "TOKEN_TTL_HOURS out of range, using default");
        fallback
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let gateway = match std::env::var("GATEWAY").as_deref() {
            Ok("memory") => GatewayKind::Memory,
            Ok("postgres") | Err(_) => GatewayKind::Postgres,
            Ok(other) => {
                warn!(value = other, "Unknown GATEWAY, using postgres");
                GatewayKind::Postgres
            }
        };

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, tokens will not survive a restart");
            uuid::Uuid::new_v4().to_string()
        });

        Self {
            host: parsed("HOST", defaults.host),
            port: parsed("PORT", defaults.port),
            gateway,
            database_url: std::env::var("DATABASE_URL").ok(),
            max_connections: parsed("DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            jwt_secret,
            token_ttl_hours: bounded_ttl(parsed("TOKEN_TTL_HOURS", defaults.token_ttl_hours), defaults.token_ttl_hours),
            bcrypt_cost: parsed("BCRYPT_COST", defaults.bcrypt_cost),
        }
    }
}
