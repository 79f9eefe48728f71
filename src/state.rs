// src/state.rs
use std::sync::Arc;

use crate::auth::session::SessionRegistry;
use crate::config::AppConfig;
use crate::gateway::Gateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub config: Arc<AppConfig>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>, config: AppConfig) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
            sessions: SessionRegistry::default(),
        }
    }
}
