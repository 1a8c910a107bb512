use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::signout::{SignOut, SignOutReason};
use crate::interceptors::X_REFRESH_TOKEN;
use crate::metrics::{Metrics, MetricsRecorder};
use crate::models::{Envelope, TokenPayload};
use crate::store::SessionStore;
use crate::utils::redact::redact_token;

/// Why a refresh did not produce a new access token.
///
/// Cloneable because every caller waiting on the same refresh receives the result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No refresh token available for the active session")]
    MissingRefreshToken,
    #[error("Refresh endpoint rejected the token with status {status}")]
    Rejected { status: u16 },
    #[error("Failed to call refresh endpoint: {0}")]
    Transport(String),
    #[error("Failed to parse refresh response: {0}")]
    MalformedResponse(String),
    #[error("Failed to store refreshed token: {0}")]
    Store(String),
    #[error("Session was cleared while the request was in flight")]
    SessionCleared,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

struct RefreshInner {
    http: reqwest::Client,
    refresh_url: String,
    session: Arc<dyn SessionStore>,
    sign_out: SignOut,
    metrics: Metrics,
    in_flight: Mutex<Option<RefreshFuture>>,
}

/// Exchanges the active refresh token for a new access token.
///
/// Concurrent callers share one in-flight exchange: N requests failing with 401
/// at the same time cause a single call to the refresh endpoint. A failed
/// exchange signs the user out once, inside the shared future, so every
/// waiter sees the same teardown.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<RefreshInner>,
}

impl RefreshCoordinator {
    /// `http` must not carry the request interceptor; the refresh call is unauthenticated.
    pub fn new(
        http: reqwest::Client,
        refresh_url: String,
        session: Arc<dyn SessionStore>,
        sign_out: SignOut,
        metrics: Metrics,
    ) -> Self {
        RefreshCoordinator {
            inner: Arc::new(RefreshInner {
                http,
                refresh_url,
                session,
                sign_out,
                metrics,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Returns a usable access token after `rejected_token` was answered with 401.
    ///
    /// Joins a refresh already in progress if there is one. If another refresh
    /// finished after the rejected request was sent, its token is returned
    /// without calling the endpoint again. If a sign-out happened instead,
    /// `SessionCleared` is returned and nothing is torn down a second time.
    pub async fn refresh(&self, rejected_token: Option<&str>) -> Result<String, RefreshError> {
        let refresh = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(existing) => {
                    debug!("Joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    let session = self
                        .inner
                        .session
                        .load()
                        .await
                        .map_err(RefreshError::Store)?;
                    match (session.bearer_token(), rejected_token) {
                        (Some(current), Some(rejected)) if current != rejected => {
                            debug!("Session already holds a newer token, skipping refresh");
                            return Ok(current.to_string());
                        }
                        (None, Some(_)) => {
                            debug!("Session was signed out meanwhile, skipping refresh");
                            return Err(RefreshError::SessionCleared);
                        }
                        _ => {}
                    }

                    let inner = self.inner.clone();
                    let started = async move {
                        let result = inner.exchange().await;
                        // Later 401s must start a new exchange rather than reuse this result.
                        inner.in_flight.lock().await.take();
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(started.clone());
                    started
                }
            }
        };

        refresh.await
    }
}

impl RefreshInner {
    async fn exchange(&self) -> Result<String, RefreshError> {
        let result = self.call_refresh_endpoint().await;
        match &result {
            Ok(_) => {
                self.metrics.record_refresh("success");
                info!(
                    event_name = "client.refresh.success",
                    event_domain = "auth",
                    "access token refreshed"
                );
            }
            Err(e) => {
                self.metrics.record_refresh("failure");
                warn!(
                    event_name = "client.refresh.failure",
                    event_domain = "auth",
                    error = %e,
                    "token refresh failed"
                );
                self.sign_out.run(SignOutReason::RefreshFailed).await;
            }
        }
        result
    }

    async fn call_refresh_endpoint(&self) -> Result<String, RefreshError> {
        let session = self
            .session
            .load()
            .await
            .map_err(RefreshError::Store)?;
        let active = session.active();
        let refresh_token = active
            .credentials()
            .refresh()
            .ok_or(RefreshError::MissingRefreshToken)?
            .to_string();

        debug!(
            session = active.kind(),
            refresh_token = redact_token(&refresh_token).as_str(),
            "Calling refresh endpoint at '{}'",
            self.refresh_url
        );

        let resp = self
            .http
            .post(&self.refresh_url)
            .header(X_REFRESH_TOKEN, refresh_token)
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
            });
        }

        let envelope = resp
            .json::<Envelope<TokenPayload>>()
            .await
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;
        let TokenPayload {
            access_token,
            refresh_token: rotated,
            ..
        } = envelope.data;
        if access_token.trim().is_empty() {
            return Err(RefreshError::MalformedResponse(
                "access_token is empty".to_string(),
            ));
        }

        let stored = access_token.clone();
        self.session
            .update(Box::new(move |state| state.apply_refreshed(stored, rotated)))
            .await
            .map_err(RefreshError::Store)?;

        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NoopHooks;
    use crate::models::{Credentials, SessionState};
    use crate::store::{AmbientContext, MemorySessionStore};
    use mockito::{Matcher, Server};

    fn session_with(access: &str, refresh: Option<&str>) -> Arc<MemorySessionStore> {
        Arc::new(MemorySessionStore::with_state(SessionState {
            full: Credentials {
                access_token: Some(access.to_string()),
                refresh_token: refresh.map(str::to_string),
                user_token: None,
                is_authenticated: true,
            },
            tmp: Credentials::default(),
        }))
    }

    fn coordinator(url: String, session: Arc<MemorySessionStore>) -> RefreshCoordinator {
        coordinator_with(url, session, Metrics::new().unwrap())
    }

    fn coordinator_with(
        url: String,
        session: Arc<MemorySessionStore>,
        metrics: Metrics,
    ) -> RefreshCoordinator {
        let sign_out = SignOut::new(
            session.clone(),
            AmbientContext::new(),
            Arc::new(NoopHooks),
            metrics.clone(),
        );
        RefreshCoordinator::new(
            reqwest::Client::new(),
            format!("{}/api/v1/auth/refresh-token", url),
            session,
            sign_out,
            metrics,
        )
    }

    #[tokio::test]
    async fn test_refresh_success_updates_session() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/v1/auth/refresh-token")
            .match_header("x-refresh-token", "R1")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"access_token": "T2", "refresh_token": "R2"}}"#)
            .expect(1)
            .create_async()
            .await;

        let session = session_with("T1", Some("R1"));
        let refresher = coordinator(server.url(), session.clone());

        let token = refresher.refresh(Some("T1")).await;
        m.assert_async().await;
        assert_eq!(token, Ok("T2".to_string()));

        let state = session.load().await.unwrap();
        assert_eq!(state.bearer_token(), Some("T2"));
        assert_eq!(state.refresh_token(), Some("R2"));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_makes_no_call() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/v1/auth/refresh-token")
            .expect(0)
            .create_async()
            .await;

        let refresher = coordinator(server.url(), session_with("T1", None));
        assert_eq!(
            refresher.refresh(Some("T1")).await,
            Err(RefreshError::MissingRefreshToken)
        );
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_refresh() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/auth/refresh-token")
            .with_status(401)
            .create_async()
            .await;

        let session = session_with("T1", Some("R1"));
        let metrics = Metrics::new().unwrap();
        let refresher = coordinator_with(server.url(), session.clone(), metrics.clone());
        assert_eq!(
            refresher.refresh(Some("T1")).await,
            Err(RefreshError::Rejected { status: 401 })
        );
        assert!(session.load().await.unwrap().is_empty());
        assert_eq!(metrics.sign_out_count("refresh_failed"), 1);
        assert_eq!(metrics.refresh_count("failure"), 1);
    }

    #[tokio::test]
    async fn test_malformed_refresh_response() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/auth/refresh-token")
            .with_status(200)
            .with_body(r#"{"data": {"token": "T2"}}"#)
            .create_async()
            .await;

        let refresher = coordinator(server.url(), session_with("T1", Some("R1")));
        assert!(matches!(
            refresher.refresh(Some("T1")).await,
            Err(RefreshError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_call() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/v1/auth/refresh-token")
            .with_status(200)
            .with_body(r#"{"data": {"access_token": "T2"}}"#)
            .expect(1)
            .create_async()
            .await;

        let refresher = coordinator(server.url(), session_with("T1", Some("R1")));
        let (a, b, c) = tokio::join!(
            refresher.refresh(Some("T1")),
            refresher.refresh(Some("T1")),
            refresher.refresh(Some("T1"))
        );
        m.assert_async().await;
        assert_eq!(a, Ok("T2".to_string()));
        assert_eq!(b, Ok("T2".to_string()));
        assert_eq!(c, Ok("T2".to_string()));
    }

    #[tokio::test]
    async fn test_sequential_refreshes_call_again() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/v1/auth/refresh-token")
            .with_status(200)
            .with_body(r#"{"data": {"access_token": "T2"}}"#)
            .expect(2)
            .create_async()
            .await;

        let refresher = coordinator(server.url(), session_with("T1", Some("R1")));
        assert_eq!(refresher.refresh(Some("T1")).await, Ok("T2".to_string()));
        // The new token was rejected as well, so a second exchange is needed.
        assert_eq!(refresher.refresh(Some("T2")).await, Ok("T2".to_string()));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_stale_rejection_reuses_newer_token() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/v1/auth/refresh-token")
            .expect(0)
            .create_async()
            .await;

        // The session already moved on to T2 when the 401 for T1 arrives.
        let refresher = coordinator(server.url(), session_with("T2", Some("R2")));
        assert_eq!(refresher.refresh(Some("T1")).await, Ok("T2".to_string()));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_failed_refresh_signs_out_once() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/v1/auth/refresh-token")
            .with_status(400)
            .expect(1)
            .create_async()
            .await;

        let session = session_with("T1", Some("R1"));
        let metrics = Metrics::new().unwrap();
        let refresher = coordinator_with(server.url(), session.clone(), metrics.clone());
        let (a, b) = tokio::join!(refresher.refresh(Some("T1")), refresher.refresh(Some("T1")));
        m.assert_async().await;

        assert!(a.is_err());
        assert!(b.is_err());
        assert!(session.load().await.unwrap().is_empty());
        assert_eq!(metrics.sign_out_count("refresh_failed"), 1);
    }

    #[tokio::test]
    async fn test_rejection_after_sign_out_does_not_tear_down_again() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/v1/auth/refresh-token")
            .expect(0)
            .create_async()
            .await;

        let session = Arc::new(MemorySessionStore::new());
        let metrics = Metrics::new().unwrap();
        let refresher = coordinator_with(server.url(), session, metrics.clone());
        assert_eq!(
            refresher.refresh(Some("T1")).await,
            Err(RefreshError::SessionCleared)
        );
        m.assert_async().await;
        assert_eq!(metrics.sign_out_count("refresh_failed"), 0);
    }
}
