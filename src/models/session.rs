use serde::{Deserialize, Serialize};

use super::envelope::TokenPayload;

/// One credential set: either the full session or the limited checkout session.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user_token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

impl Credentials {
    /// Credentials minted by a successful login or verification response.
    pub fn from_payload(payload: &TokenPayload) -> Self {
        Credentials {
            access_token: Some(payload.access_token.clone()),
            refresh_token: payload.refresh_token.clone(),
            user_token: payload.user_token.clone(),
            is_authenticated: true,
        }
    }

    /// The access token, if present and non-empty.
    pub fn bearer(&self) -> Option<&str> {
        non_empty(self.access_token.as_deref())
    }

    /// The refresh token, if present and non-empty.
    pub fn refresh(&self) -> Option<&str> {
        non_empty(self.refresh_token.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Which credential set headers are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSession<'a> {
    Full(&'a Credentials),
    Temporary(&'a Credentials),
}

impl<'a> ActiveSession<'a> {
    pub fn credentials(&self) -> &'a Credentials {
        match *self {
            ActiveSession::Full(c) | ActiveSession::Temporary(c) => c,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ActiveSession::Full(_) => "full",
            ActiveSession::Temporary(_) => "temporary",
        }
    }
}

/// The full session plus the limited session used mid-checkout.
///
/// Exactly one of the two is active at a time: `tmp` when
/// `tmp.is_authenticated` is set, `full` otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    #[serde(default)]
    pub full: Credentials,
    #[serde(default)]
    pub tmp: Credentials,
}

impl SessionState {
    pub fn active(&self) -> ActiveSession<'_> {
        if self.tmp.is_authenticated {
            ActiveSession::Temporary(&self.tmp)
        } else {
            ActiveSession::Full(&self.full)
        }
    }

    fn active_mut(&mut self) -> &mut Credentials {
        if self.tmp.is_authenticated {
            &mut self.tmp
        } else {
            &mut self.full
        }
    }

    /// Bearer token of the active session. Never falls back to the other set.
    pub fn bearer_token(&self) -> Option<&str> {
        self.active().credentials().bearer()
    }

    /// Refresh token of the active session, with the same precedence as `bearer_token`.
    pub fn refresh_token(&self) -> Option<&str> {
        self.active().credentials().refresh()
    }

    /// Store a freshly minted access token on the active session.
    /// The refresh token is only replaced when the backend rotated it.
    pub fn apply_refreshed(&mut self, access_token: String, refresh_token: Option<String>) {
        let active = self.active_mut();
        active.access_token = Some(access_token);
        if let Some(refresh) = refresh_token.filter(|r| !r.is_empty()) {
            active.refresh_token = Some(refresh);
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == SessionState::default()
    }

    pub fn clear(&mut self) {
        *self = SessionState::default();
    }
}
