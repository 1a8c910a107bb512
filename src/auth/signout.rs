use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::metrics::{Metrics, MetricsRecorder};
use crate::store::{AmbientContext, SessionStore};

/// Why the session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignOutReason {
    /// The backend answered 403.
    Forbidden,
    /// A 401 could not be recovered because the refresh call failed.
    RefreshFailed,
    /// The replay after a successful refresh was answered 401 again.
    RefreshRejected,
    /// The user asked to sign out.
    UserInitiated,
}

impl SignOutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignOutReason::Forbidden => "forbidden",
            SignOutReason::RefreshFailed => "refresh_failed",
            SignOutReason::RefreshRejected => "refresh_rejected",
            SignOutReason::UserInitiated => "user_initiated",
        }
    }
}

/// Collaborators outside this crate that must forget the user on sign-out:
/// the query cache, the push-messaging token and the third-party auth provider.
///
/// Every hook is best-effort. A failure is logged and the remaining steps still run.
#[async_trait]
pub trait SignOutHooks: Send + Sync {
    fn get_name(&self) -> &str {
        "noop"
    }

    async fn clear_query_cache(&self) -> Result<(), String> {
        Ok(())
    }

    async fn revoke_push_token(&self) -> Result<(), String> {
        Ok(())
    }

    async fn sign_out_provider(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Hooks for embeddings that have no external collaborators.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl SignOutHooks for NoopHooks {}

/// Which steps of a sign-out failed, if any.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SignOutReport {
    pub failures: Vec<String>,
}

impl SignOutReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Tears down every piece of session state in a fixed order:
/// credentials, device association, query cache, push token, auth provider.
#[derive(Clone)]
pub struct SignOut {
    session: Arc<dyn SessionStore>,
    ambient: AmbientContext,
    hooks: Arc<dyn SignOutHooks>,
    metrics: Metrics,
}

impl SignOut {
    pub fn new(
        session: Arc<dyn SessionStore>,
        ambient: AmbientContext,
        hooks: Arc<dyn SignOutHooks>,
        metrics: Metrics,
    ) -> Self {
        SignOut {
            session,
            ambient,
            hooks,
            metrics,
        }
    }

    pub async fn run(&self, reason: SignOutReason) -> SignOutReport {
        info!(
            event_name = "client.sign_out",
            event_domain = "auth",
            reason = reason.as_str(),
            hooks = self.hooks.get_name(),
            "signing out"
        );

        let mut report = SignOutReport::default();

        if let Err(e) = self.session.clear().await {
            record_failure(&mut report, "clear_session", e);
        }
        self.ambient.clear_device_id().await;
        if let Err(e) = self.hooks.clear_query_cache().await {
            record_failure(&mut report, "clear_query_cache", e);
        }
        if let Err(e) = self.hooks.revoke_push_token().await {
            record_failure(&mut report, "revoke_push_token", e);
        }
        if let Err(e) = self.hooks.sign_out_provider().await {
            record_failure(&mut report, "sign_out_provider", e);
        }

        self.metrics.record_sign_out(reason.as_str());
        report
    }
}

fn record_failure(report: &mut SignOutReport, step: &'static str, error: String) {
    warn!(
        event_name = "client.sign_out.step_failed",
        event_domain = "auth",
        step,
        error = error.as_str(),
        "sign-out step failed, continuing"
    );
    report.failures.push(format!("{}: {}", step, error));
}
