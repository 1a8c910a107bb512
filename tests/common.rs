#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use simgate::auth::SignOutHooks;
use simgate::config::ApiConfig;
use simgate::metrics::Metrics;
use simgate::models::{Credentials, SessionState};
use simgate::store::{AmbientContext, MemorySessionStore, SessionStore, SessionUpdate};
use simgate::ApiClient;

pub const REFRESH_PATH: &str = "/api/v1/auth/refresh-token";

/// Counts every collaborator call made during sign-out.
#[derive(Default)]
pub struct RecordingHooks {
    pub cache_clears: AtomicUsize,
    pub push_revocations: AtomicUsize,
    pub provider_sign_outs: AtomicUsize,
}

impl RecordingHooks {
    pub fn cache_clears(&self) -> usize {
        self.cache_clears.load(Ordering::SeqCst)
    }

    pub fn push_revocations(&self) -> usize {
        self.push_revocations.load(Ordering::SeqCst)
    }

    pub fn provider_sign_outs(&self) -> usize {
        self.provider_sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignOutHooks for RecordingHooks {
    fn get_name(&self) -> &str {
        "recording"
    }

    async fn clear_query_cache(&self) -> Result<(), String> {
        self.cache_clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn revoke_push_token(&self) -> Result<(), String> {
        self.push_revocations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_out_provider(&self) -> Result<(), String> {
        self.provider_sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Loads and clears like the memory store, but every `update` fails.
pub struct ReadOnlyUpdates {
    pub inner: Arc<MemorySessionStore>,
}

#[async_trait]
impl SessionStore for ReadOnlyUpdates {
    async fn load(&self) -> Result<SessionState, String> {
        self.inner.load().await
    }

    async fn save(&self, state: &SessionState) -> Result<(), String> {
        self.inner.save(state).await
    }

    async fn update(&self, _update: SessionUpdate) -> Result<SessionState, String> {
        Err("disk full".to_string())
    }
}

pub struct TestClient {
    pub client: ApiClient,
    pub session: Arc<MemorySessionStore>,
    pub ambient: AmbientContext,
    pub hooks: Arc<RecordingHooks>,
    pub metrics: Metrics,
}

impl TestClient {
    pub async fn state(&self) -> SessionState {
        self.session.load().await.expect("memory store never fails")
    }
}

pub fn build_client(base_url: &str, state: SessionState) -> TestClient {
    build_client_with(ApiConfig::new(base_url), state)
}

pub fn build_client_with(config: ApiConfig, state: SessionState) -> TestClient {
    let session = Arc::new(MemorySessionStore::with_state(state));
    build_client_over(config, session.clone(), session)
}

/// Builds a client on `store`, while `session` is the memory the test inspects.
pub fn build_client_over(
    config: ApiConfig,
    session: Arc<MemorySessionStore>,
    store: Arc<dyn SessionStore>,
) -> TestClient {
    let ambient = AmbientContext::new();
    let hooks = Arc::new(RecordingHooks::default());
    let metrics = Metrics::new().expect("metrics registry");

    let client = ApiClient::new(
        &config,
        store,
        ambient.clone(),
        hooks.clone(),
        metrics.clone(),
    )
    .expect("failed to build client");

    TestClient {
        client,
        session,
        ambient,
        hooks,
        metrics,
    }
}

pub fn credentials(access: &str, refresh: &str) -> Credentials {
    Credentials {
        access_token: Some(access.to_string()),
        refresh_token: Some(refresh.to_string()),
        user_token: Some(format!("user-{}", access)),
        is_authenticated: true,
    }
}

pub fn full_session(access: &str, refresh: &str) -> SessionState {
    SessionState {
        full: credentials(access, refresh),
        tmp: Credentials::default(),
    }
}

pub fn refresh_body(access: &str) -> String {
    format!(r#"{{"data": {{"access_token": "{}"}}}}"#, access)
}
