use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_store::FileSessionStore, memory_store::MemorySessionStore};
use crate::config::SessionStoreConfig;
use crate::models::SessionState;

/// A mutation applied to the session while the store holds its lock.
pub type SessionUpdate = Box<dyn FnOnce(&mut SessionState) + Send>;

/// The SessionStore trait abstracts where credentials live (load, save, update, clear).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<SessionState, String>;
    async fn save(&self, state: &SessionState) -> Result<(), String>;
    /// Applies `update` atomically and returns the resulting state.
    async fn update(&self, update: SessionUpdate) -> Result<SessionState, String>;
    async fn clear(&self) -> Result<(), String> {
        self.save(&SessionState::default()).await
    }
    fn is_persistent(&self) -> bool {
        false
    }
}

/// Creates a concrete store implementation based on the SessionStoreConfig.
pub async fn create_session_store(
    config: &SessionStoreConfig,
) -> Result<Arc<dyn SessionStore>, String> {
    match config {
        SessionStoreConfig::Memory => {
            info!("Using in-memory session store.");
            Ok(Arc::new(MemorySessionStore::new()))
        }
        SessionStoreConfig::File(file_config) => {
            let store = FileSessionStore::open(&file_config.path).await?;
            info!("Using file session store at '{}'.", file_config.path);
            Ok(Arc::new(store))
        }
    }
}
