use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::SignOutReport;
use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{Credentials, TokenPayload};

pub const LOGIN_PATH: &str = "/api/v1/auth/login";
pub const VERIFY_OTP_PATH: &str = "/api/v1/auth/verify-otp";
pub const LOGOUT_PATH: &str = "/api/v1/auth/logout";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Checkout verification: confirms an emailed one-time code.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OtpRequest {
    pub email: String,
    pub otp: String,
}

/// Signs in and makes the returned tokens the full session.
/// Any limited session left from checkout is discarded.
pub async fn sign_in(client: &ApiClient, request: &SignInRequest) -> Result<TokenPayload, ApiError> {
    let payload: TokenPayload = client
        .send(ApiRequest::post(LOGIN_PATH).json(request)?.without_auth_recovery())
        .await?
        .data()?;

    let full = Credentials::from_payload(&payload);
    client
        .session()
        .update(Box::new(move |state| {
            state.full = full;
            state.tmp = Credentials::default();
        }))
        .await
        .map_err(ApiError::Store)?;

    info!(
        event_name = "client.sign_in",
        event_domain = "auth",
        session = "full",
        "signed in"
    );
    Ok(payload)
}

/// Verifies a one-time code and stores the tokens as the limited session.
/// The full session, if any, is kept but stops being used until the limited one ends.
pub async fn verify_otp(client: &ApiClient, request: &OtpRequest) -> Result<TokenPayload, ApiError> {
    let payload: TokenPayload = client
        .send(ApiRequest::post(VERIFY_OTP_PATH).json(request)?.without_auth_recovery())
        .await?
        .data()?;

    let tmp = Credentials::from_payload(&payload);
    client
        .session()
        .update(Box::new(move |state| state.tmp = tmp))
        .await
        .map_err(ApiError::Store)?;

    info!(
        event_name = "client.sign_in",
        event_domain = "auth",
        session = "temporary",
        "one-time code verified"
    );
    Ok(payload)
}

/// Tells the backend, then signs out locally whatever the backend answered.
pub async fn sign_out(client: &ApiClient) -> SignOutReport {
    if let Err(e) = client
        .send(ApiRequest::post(LOGOUT_PATH).without_auth_recovery())
        .await
    {
        warn!("Backend logout failed, signing out locally anyway: {}", e);
    }
    client.sign_out().await
}
