use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings for the backend REST API and the headers sent with every call.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Fixed `x-timezone` header, set once when the client is built.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Fixed `x-language` header, set once when the client is built.
    #[serde(default = "default_language")]
    pub language: String,
    /// Sent as `accept-language` on every request regardless of any stored preference.
    #[serde(default = "default_language")]
    pub accept_language: String,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_device_id")]
    pub default_device_id: String,
}

impl ApiConfig {
    /// A config with every optional field at its default.
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiConfig {
            base_url: base_url.into(),
            timeout_in_ms: default_timeout_in_ms(),
            refresh_path: default_refresh_path(),
            timezone: default_timezone(),
            language: default_language(),
            accept_language: default_language(),
            default_currency: default_currency(),
            default_device_id: default_device_id(),
        }
    }

    /// Base URL with a scheme and without a trailing slash.
    ///
    /// "localhost:3000" is accepted and turned into "http://localhost:3000".
    pub fn normalized_base_url(&self) -> String {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let normalized = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };
        if normalized != self.base_url {
            warn!(
                "Normalized base URL from '{}' to '{}'",
                self.base_url, normalized
            );
        }
        normalized
    }

    /// Absolute URL of the token refresh endpoint.
    pub fn refresh_url(&self) -> String {
        format!(
            "{}/{}",
            self.normalized_base_url(),
            self.refresh_path.trim_start_matches('/')
        )
    }
}

fn default_timeout_in_ms() -> u64 {
    30_000
}

fn default_refresh_path() -> String {
    "/api/v1/auth/refresh-token".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_device_id() -> String {
    "1234".to_string()
}
