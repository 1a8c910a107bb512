//! The outbound request pipeline: header decoration before sending,
//! classification of the response afterwards.

pub mod request;
pub mod response;

pub use request::{HeaderDefaults, RequestInterceptor};
pub use response::{classify, Outcome, RetryState};

pub const X_DEVICE_ID: &str = "x-device-id";
pub const X_CURRENCY: &str = "x-currency";
pub const X_REFRESH_TOKEN: &str = "x-refresh-token";
pub const X_TIMEZONE: &str = "x-timezone";
pub const X_LANGUAGE: &str = "x-language";
