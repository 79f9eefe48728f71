// src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use gestion_backend::config::{AppConfig, GatewayKind};
use gestion_backend::database;
use gestion_backend::gateway::{Gateway, MemoryGateway, PgGateway};
use gestion_backend::routes::create_router;
use gestion_backend::state::AppState;

#[tokio::main]
async fn main() {
    // Load environment variables before the filter reads RUST_LOG
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();

    let gateway: Arc<dyn Gateway> = match config.gateway {
        GatewayKind::Memory => {
            tracing::warn!("Using in-memory gateway, data is lost on exit");
            Arc::new(MemoryGateway::new())
        }
        GatewayKind::Postgres => {
            let Some(database_url) = config.database_url.as_deref() else {
                tracing::error!("DATABASE_URL must be set when GATEWAY=postgres");
                return;
            };
            match database::create_pool(database_url, config.max_connections).await {
                Ok(pool) => Arc::new(PgGateway::new(pool)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create database pool");
                    return;
                }
            }
        }
    };

    let host = config.host;
    let base_port = config.port;
    let app = create_router(AppState::new(gateway, config));

    // Try base_port..base_port+20 to avoid crash when address is in use
    let listener = {
        let mut bound = None;
        for offset in 0u16..=20 {
            let port = base_port.saturating_add(offset);
            let addr = SocketAddr::from((host, port));
            match TcpListener::bind(addr).await {
                Ok(l) => { bound = Some((l, addr)); break; }
                Err(e) => {
                    if offset == 0 { tracing::warn!(%addr, error=%e, "Port in use, trying next"); }
                }
            }
        }
        match bound {
            Some((l, addr)) => {
                tracing::info!("Server running on {}", addr);
                l
            }
            None => {
                tracing::error!("Failed to bind to any port starting at {} on {}", base_port, host);
                return;
            }
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error=%e, "Server error");
    }
}
