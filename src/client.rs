//! The authenticated API client.
//!
//! Every call runs the same pipeline: decorate headers, send, classify the
//! response, and then pass it on, refresh and replay once, force a sign-out,
//! or fail.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::auth::{RefreshCoordinator, SignOut, SignOutHooks, SignOutReason, SignOutReport};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::interceptors::{
    classify, HeaderDefaults, Outcome, RequestInterceptor, RetryState, X_LANGUAGE, X_TIMEZONE,
};
use crate::metrics::{Metrics, MetricsRecorder};
use crate::models::Envelope;
use crate::store::{AmbientContext, SessionStore};

/// A request as the caller describes it; headers are added by the interceptor.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub retry: RetryState,
    /// When false, 401/403 fail plainly instead of refreshing or signing out.
    pub recover_auth: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retry: RetryState::NotRetried,
            recover_auth: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Encode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Opts out of refresh and forced sign-out, for login and logout calls.
    pub fn without_auth_recovery(mut self) -> Self {
        self.recover_auth = false;
        self
    }
}

/// A successful response, body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Decodes the `{ "data": ... }` envelope and returns its payload.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.json::<Envelope<T>>().map(|e| e.data)
    }
}

/// HTTP client for the storefront backend with session handling built in.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
    ambient: AmbientContext,
    interceptor: RequestInterceptor,
    refresher: RefreshCoordinator,
    sign_out: SignOut,
    metrics: Metrics,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("persistent_session", &self.session.is_persistent())
            .finish()
    }
}

impl ApiClient {
    /// Builds the client. All shared state is passed in, nothing is read from globals.
    pub fn new(
        config: &ApiConfig,
        session: Arc<dyn SessionStore>,
        ambient: AmbientContext,
        hooks: Arc<dyn SignOutHooks>,
        metrics: Metrics,
    ) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(X_TIMEZONE, config_header(X_TIMEZONE, &config.timezone)?);
        default_headers.insert(X_LANGUAGE, config_header(X_LANGUAGE, &config.language)?);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .default_headers(default_headers)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config.normalized_base_url();
        info!("Creating API client with base URL: {}", base_url);

        let interceptor = RequestInterceptor::new(
            session.clone(),
            ambient.clone(),
            HeaderDefaults::from(config),
        );
        let sign_out = SignOut::new(session.clone(), ambient.clone(), hooks, metrics.clone());
        let refresher = RefreshCoordinator::new(
            http.clone(),
            config.refresh_url(),
            session.clone(),
            sign_out.clone(),
            metrics.clone(),
        );

        Ok(ApiClient {
            http,
            base_url,
            session,
            ambient,
            interceptor,
            refresher,
            sign_out,
            metrics,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    pub fn ambient(&self) -> &AmbientContext {
        &self.ambient
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Absolute URLs pass through; relative paths are joined onto the base URL.
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends a request through the full pipeline.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let span = info_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = %request.path,
        );
        let method = request.method.clone();
        let started = Instant::now();

        let result = self.run_pipeline(request).instrument(span).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ApiError::SessionExpired) => "session_expired",
            Err(ApiError::Forbidden { .. }) => "forbidden",
            Err(ApiError::Status { .. }) => "status",
            Err(ApiError::Transport(_)) => "transport",
            Err(_) => "client",
        };
        self.metrics.record_request(method.as_str(), outcome);
        self.metrics
            .record_request_duration(method.as_str(), started.elapsed().as_secs_f64());
        result
    }

    async fn run_pipeline(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        loop {
            let (response, sent_token) = self.dispatch(&request).await?;
            match classify(
                response.status,
                &response.body,
                request.retry,
                request.recover_auth,
            ) {
                Outcome::Pass => return Ok(response),
                Outcome::Retry => match self.refresher.refresh(sent_token.as_deref()).await {
                    Ok(_) => {
                        debug!("Replaying request with refreshed token");
                        // The interceptor runs again on replay and picks up the new token.
                        request.retry = RetryState::RetriedOnce;
                    }
                    // The coordinator has already signed the user out.
                    Err(e) => {
                        warn!("Could not recover from 401: {}", e);
                        return Err(ApiError::SessionExpired);
                    }
                },
                Outcome::ForceSignOut(reason, error) => {
                    self.sign_out.run(reason).await;
                    return Err(error);
                }
                Outcome::Fail(error) => {
                    debug!(status = response.status.as_u16(), "Request failed: {}", error);
                    return Err(error);
                }
            }
        }
    }

    /// Sends one attempt and returns the response with the bearer token it carried.
    async fn dispatch(
        &self,
        request: &ApiRequest,
    ) -> Result<(ApiResponse, Option<String>), ApiError> {
        let mut headers = HeaderMap::new();
        let sent_token = self.interceptor.decorate(&mut headers).await?;

        let mut builder = self
            .http
            .request(request.method.clone(), self.build_url(&request.path))
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?.to_vec();
        debug!(status = status.as_u16(), retry = ?request.retry, "Received response");

        Ok((
            ApiResponse {
                status,
                headers,
                body,
            },
            sent_token,
        ))
    }

    /// GET `path` and decode the `data` payload.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.data()
    }

    /// POST `body` to `path` and decode the `data` payload.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::post(path).json(body)?).await?.data()
    }

    /// PUT `body` to `path` and decode the `data` payload.
    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::put(path).json(body)?).await?.data()
    }

    /// DELETE `path` and decode the `data` payload.
    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::delete(path)).await?.data()
    }

    /// Local sign-out for the user: clears the session and notifies the hooks.
    pub async fn sign_out(&self) -> SignOutReport {
        self.sign_out.run(SignOutReason::UserInitiated).await
    }
}

fn config_header(name: &'static str, value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| ApiError::InvalidHeader {
        name,
        reason: e.to_string(),
    })
}
