//! # Event Admin Common Library
//!
//! Shared code for the event-administration service:
//! - Attendee, event location and survey response models
//! - Document store abstraction (SQLite and in-memory backends)
//! - API authentication primitives
//! - Configuration loading
//! - Timestamp utilities

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
