//! Authenticated client for the eSIM storefront REST API, shared between the binary and tests.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod interceptors;
pub mod metrics;
pub mod models;
pub mod startup;
pub mod store;
pub mod utils;

pub use client::{ApiClient, ApiRequest, ApiResponse};
pub use error::ApiError;
