//! Shared HTTP API functionality
//!
//! Only framework-independent pieces live here; the server crate wraps them
//! in axum middleware.

pub mod auth;

#[cfg(feature = "sqlx")]
pub use auth::{initialize_shared_secret, load_shared_secret};
pub use auth::{calculate_hash, sign, validate_hash, validate_timestamp, ApiAuthError};
