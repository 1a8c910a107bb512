use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, AUTHORIZATION};
use tracing::debug;

use super::{X_CURRENCY, X_DEVICE_ID};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::store::{AmbientContext, SessionStore};

/// Fallback values for headers the ambient context may not provide.
#[derive(Debug, Clone)]
pub struct HeaderDefaults {
    pub accept_language: String,
    pub device_id: String,
    pub currency: String,
}

impl From<&ApiConfig> for HeaderDefaults {
    fn from(config: &ApiConfig) -> Self {
        HeaderDefaults {
            accept_language: config.accept_language.clone(),
            device_id: config.default_device_id.clone(),
            currency: config.default_currency.clone(),
        }
    }
}

/// Decorates every outgoing request with auth, device, currency and locale headers.
///
/// State is read at call time, so a sign-in or refresh is visible to the next request.
#[derive(Clone)]
pub struct RequestInterceptor {
    session: Arc<dyn SessionStore>,
    ambient: AmbientContext,
    defaults: HeaderDefaults,
}

impl RequestInterceptor {
    pub fn new(
        session: Arc<dyn SessionStore>,
        ambient: AmbientContext,
        defaults: HeaderDefaults,
    ) -> Self {
        RequestInterceptor {
            session,
            ambient,
            defaults,
        }
    }

    /// Adds the headers and returns the bearer token that was attached, if any.
    pub async fn decorate(&self, headers: &mut HeaderMap) -> Result<Option<String>, ApiError> {
        headers.insert(
            ACCEPT_LANGUAGE,
            header_value("accept-language", &self.defaults.accept_language)?,
        );

        let session = self.session.load().await.map_err(ApiError::Store)?;
        let active = session.active();
        // Without a token the device and currency headers are left off as well.
        let Some(token) = active.credentials().bearer() else {
            debug!("No bearer token resolved, sending request without auth headers");
            return Ok(None);
        };

        headers.insert(
            AUTHORIZATION,
            header_value("authorization", &format!("Bearer {}", token))?,
        );

        let device_id = self
            .ambient
            .device_id()
            .await
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.defaults.device_id.clone());
        headers.insert(X_DEVICE_ID, header_value(X_DEVICE_ID, &device_id)?);

        let currency = self.ambient.resolved_currency(&self.defaults.currency).await;
        headers.insert(X_CURRENCY, header_value(X_CURRENCY, &currency)?);

        debug!(session = active.kind(), "Attached session headers");
        Ok(Some(token.to_string()))
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| ApiError::InvalidHeader {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AmbientState, Credentials, SessionState};
    use crate::store::MemorySessionStore;

    fn defaults() -> HeaderDefaults {
        HeaderDefaults::from(&ApiConfig::new("http://localhost"))
    }

    fn authenticated(token: &str) -> Credentials {
        Credentials {
            access_token: Some(token.to_string()),
            refresh_token: Some(format!("{}-refresh", token)),
            user_token: None,
            is_authenticated: true,
        }
    }

    fn interceptor(state: SessionState, ambient: AmbientContext) -> RequestInterceptor {
        RequestInterceptor::new(
            Arc::new(MemorySessionStore::with_state(state)),
            ambient,
            defaults(),
        )
    }

    #[tokio::test]
    async fn test_no_token_sets_only_accept_language() {
        let interceptor = interceptor(SessionState::default(), AmbientContext::new());
        let mut headers = HeaderMap::new();
        let attached = interceptor.decorate(&mut headers).await.unwrap();

        assert_eq!(attached, None);
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), "en");
        assert!(headers.get(AUTHORIZATION).is_none());
        assert!(headers.get(X_DEVICE_ID).is_none());
        assert!(headers.get(X_CURRENCY).is_none());
    }

    #[tokio::test]
    async fn test_full_session_with_defaults() {
        let state = SessionState {
            full: authenticated("T1"),
            tmp: Credentials::default(),
        };
        let interceptor = interceptor(state, AmbientContext::new());
        let mut headers = HeaderMap::new();
        interceptor.decorate(&mut headers).await.unwrap();

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer T1");
        assert_eq!(headers.get(X_DEVICE_ID).unwrap(), "1234");
        assert_eq!(headers.get(X_CURRENCY).unwrap(), "EUR");
    }

    #[tokio::test]
    async fn test_temporary_session_wins_over_full_session() {
        let state = SessionState {
            full: authenticated("FULL"),
            tmp: authenticated("TMP"),
        };
        let interceptor = interceptor(state, AmbientContext::new());
        let mut headers = HeaderMap::new();
        let attached = interceptor.decorate(&mut headers).await.unwrap();

        assert_eq!(attached.as_deref(), Some("TMP"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer TMP");
    }

    #[tokio::test]
    async fn test_ambient_values_are_used() {
        let state = SessionState {
            full: authenticated("T1"),
            tmp: Credentials::default(),
        };
        let ambient = AmbientContext::with_state(AmbientState {
            device_id: Some("device-9".to_string()),
            currency: None,
            system_currency: Some("GBP".to_string()),
        });
        let interceptor = interceptor(state, ambient);
        let mut headers = HeaderMap::new();
        interceptor.decorate(&mut headers).await.unwrap();

        assert_eq!(headers.get(X_DEVICE_ID).unwrap(), "device-9");
        assert_eq!(headers.get(X_CURRENCY).unwrap(), "GBP");
    }

    #[tokio::test]
    async fn test_state_is_read_at_call_time() {
        let store = Arc::new(MemorySessionStore::new());
        let interceptor =
            RequestInterceptor::new(store.clone(), AmbientContext::new(), defaults());

        let mut before = HeaderMap::new();
        interceptor.decorate(&mut before).await.unwrap();
        assert!(before.get(AUTHORIZATION).is_none());

        store
            .save(&SessionState {
                full: authenticated("LATE"),
                tmp: Credentials::default(),
            })
            .await
            .unwrap();

        let mut after = HeaderMap::new();
        interceptor.decorate(&mut after).await.unwrap();
        assert_eq!(after.get(AUTHORIZATION).unwrap(), "Bearer LATE");
    }

    #[tokio::test]
    async fn test_token_with_newline_is_rejected() {
        let state = SessionState {
            full: authenticated("bad\ntoken"),
            tmp: Credentials::default(),
        };
        let interceptor = interceptor(state, AmbientContext::new());
        let mut headers = HeaderMap::new();
        let result = interceptor.decorate(&mut headers).await;
        assert!(matches!(
            result,
            Err(ApiError::InvalidHeader {
                name: "authorization",
                ..
            })
        ));
    }
}
