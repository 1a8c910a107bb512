//! Client construction from configuration.
//!
//! Wires the session store, ambient context, sign-out hooks and metrics into
//! an [`ApiClient`].

use std::sync::Arc;

use tracing::info;

use crate::auth::SignOutHooks;
use crate::client::ApiClient;
use crate::config::ConfigV1;
use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::store::{create_session_store, AmbientContext};

/// Builds an [`ApiClient`] with the session store named in the configuration.
///
/// # Errors
///
/// Returns an error if the session store cannot be opened, the metrics
/// registry cannot be created, or the configured headers are invalid.
pub async fn build_client(
    config: &ConfigV1,
    ambient: AmbientContext,
    hooks: Arc<dyn SignOutHooks>,
) -> Result<ApiClient, ApiError> {
    let session = create_session_store(&config.session)
        .await
        .map_err(ApiError::Store)?;
    let metrics = Metrics::new()
        .map_err(|e| ApiError::Config(format!("Failed to create metrics registry: {}", e)))?;

    let client = ApiClient::new(&config.api, session, ambient, hooks, metrics)?;
    info!(
        "Client ready for {} (persistent session: {})",
        client.base_url(),
        client.session().is_persistent()
    );
    Ok(client)
}
