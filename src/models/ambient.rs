use serde::{Deserialize, Serialize};

/// Context that the request interceptor reads but never writes.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbientState {
    /// Session-scoped device identifier, cleared on sign-out.
    pub device_id: Option<String>,
    /// Currency the user picked for this session.
    pub currency: Option<String>,
    /// Currency announced by the backend, used when the user picked none.
    pub system_currency: Option<String>,
}
