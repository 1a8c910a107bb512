use serde_json::Value;

use crate::client::ApiClient;
use crate::error::ApiError;

pub const PROFILE_PATH: &str = "/api/v1/user/info";

/// Fetches the signed-in user's profile.
pub async fn get_profile(client: &ApiClient) -> Result<Value, ApiError> {
    client.get_json(PROFILE_PATH).await
}
