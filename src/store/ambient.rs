use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::AmbientState;

/// Shared handle to the device and currency context.
#[derive(Clone, Debug, Default)]
pub struct AmbientContext {
    state: Arc<RwLock<AmbientState>>,
}

impl AmbientContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AmbientState) -> Self {
        AmbientContext {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn snapshot(&self) -> AmbientState {
        self.state.read().await.clone()
    }

    pub async fn device_id(&self) -> Option<String> {
        self.state.read().await.device_id.clone()
    }

    pub async fn set_device_id(&self, device_id: impl Into<String>) {
        self.state.write().await.device_id = Some(device_id.into());
    }

    /// Drops the device association; the interceptor falls back to the sentinel id.
    pub async fn clear_device_id(&self) {
        self.state.write().await.device_id = None;
    }

    pub async fn currency(&self) -> Option<String> {
        self.state.read().await.currency.clone()
    }

    pub async fn set_currency(&self, currency: impl Into<String>) {
        self.state.write().await.currency = Some(currency.into());
    }

    pub async fn set_system_currency(&self, currency: impl Into<String>) {
        self.state.write().await.system_currency = Some(currency.into());
    }

    /// Session currency, then the backend's system currency, then `default`.
    pub async fn resolved_currency(&self, default: &str) -> String {
        let state = self.state.read().await;
        state
            .currency
            .as_deref()
            .filter(|c| !c.is_empty())
            .or_else(|| state.system_currency.as_deref().filter(|c| !c.is_empty()))
            .unwrap_or(default)
            .to_string()
    }
}
