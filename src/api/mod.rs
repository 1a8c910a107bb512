//! Thin wrappers over the backend endpoints this crate needs to manage a session.

pub mod auth;
pub mod user;
