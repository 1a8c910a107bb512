use async_trait::async_trait;
use tokio::sync::RwLock;

use super::base::{SessionStore, SessionUpdate};
use crate::models::SessionState;

/// Keeps the session in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: RwLock<SessionState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SessionState) -> Self {
        MemorySessionStore {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<SessionState, String> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &SessionState) -> Result<(), String> {
        *self.state.write().await = state.clone();
        Ok(())
    }

    async fn update(&self, update: SessionUpdate) -> Result<SessionState, String> {
        let mut guard = self.state.write().await;
        update(&mut *guard);
        Ok(guard.clone())
    }
}
