//! HTTP API handlers for evadm-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

pub mod auth;
pub mod customers;
pub mod health;
pub mod locations;
pub mod scan;
pub mod surveys;

pub use auth::auth_middleware;
pub use customers::{delete_customer, list_customers};
pub use health::health_routes;
pub use locations::{delete_location, list_locations, update_location, upload_locations};
pub use scan::workflow_routes;
pub use surveys::{delete_survey, get_survey, list_surveys};

/// Handler error rendered as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<evadm_common::Error> for ApiError {
    fn from(e: evadm_common::Error) -> Self {
        match e {
            evadm_common::Error::NotFound(what) => ApiError::NotFound(format!("Not found: {}", what)),
            evadm_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => {
                error!("Store operation failed: {}", other);
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Body returned by delete endpoints
#[derive(Debug, serde::Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}
