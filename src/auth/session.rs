use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Tokens revoked by sign-out, kept until they would have expired anyway.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    revoked: Arc<RwLock<HashMap<Uuid, usize>>>,
}

impl SessionRegistry {
    pub async fn revoke(&self, jti: Uuid, exp: usize) {
        let now = Utc::now().timestamp() as usize;
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expires| *expires > now);
        revoked.insert(jti, exp);
    }

    pub async fn is_revoked(&self, jti: &Uuid) -> bool {
        self.revoked.read().await.contains_key(jti)
    }
}
