//! Authentication middleware for evadm-server
//!
//! GET and DELETE requests carry `timestamp` and `hash` as query parameters;
//! the hash covers every query parameter as a JSON string except
//! `timestamp`, which is a number. POST and PUT requests carry them as
//! fields of the JSON body, and the hash covers the whole body.

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use evadm_common::api::{validate_hash, validate_timestamp, ApiAuthError};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::AppState;

/// Largest request body accepted for hashing
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct AuthFields {
    timestamp: i64,
    hash: String,
}

/// Rejects requests without a valid timestamp and hash
///
/// A shared secret of 0 disables checking.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if state.shared_secret == 0 {
        return Ok(next.run(request).await);
    }

    let method = request.method().clone();
    let request = match method {
        Method::GET | Method::DELETE => validate_query_auth(request, state.shared_secret)?,
        Method::POST | Method::PUT => validate_body_auth(request, state.shared_secret).await?,
        _ => return Err(AuthError::MethodNotAllowed),
    };

    Ok(next.run(request).await)
}

fn validate_query_auth(request: Request, shared_secret: i64) -> Result<Request, AuthError> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .map_err(|e| AuthError::ParseError(format!("Invalid query string: {}", e)))?;

    let timestamp = params
        .get("timestamp")
        .ok_or_else(|| AuthError::MissingFields("timestamp".to_string()))?
        .parse::<i64>()
        .map_err(|e| AuthError::ParseError(format!("Invalid timestamp: {}", e)))?;
    let hash = params
        .get("hash")
        .ok_or_else(|| AuthError::MissingFields("hash".to_string()))?;

    let mut signed: Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    signed.insert("timestamp".to_string(), Value::from(timestamp));

    check(timestamp, hash, &Value::Object(signed), shared_secret)?;
    Ok(request)
}

async fn validate_body_auth(request: Request, shared_secret: i64) -> Result<Request, AuthError> {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AuthError::ParseError(format!("Failed to read body: {}", e)))?;

    let json_value: Value = serde_json::from_slice(&body_bytes)
        .map_err(|e| AuthError::ParseError(format!("Invalid JSON: {}", e)))?;

    let auth_fields: AuthFields = serde_json::from_value(json_value.clone())
        .map_err(|e| AuthError::MissingFields(e.to_string()))?;

    check(auth_fields.timestamp, &auth_fields.hash, &json_value, shared_secret)?;

    // Downstream extractors need the body back
    Ok(Request::from_parts(parts, Body::from(body_bytes)))
}

fn check(timestamp: i64, hash: &str, signed: &Value, shared_secret: i64) -> Result<(), AuthError> {
    validate_timestamp(timestamp).map_err(|e| match e {
        ApiAuthError::InvalidTimestamp { reason, .. } => {
            debug!("Rejected request timestamp: {}", reason);
            AuthError::InvalidTimestamp(reason)
        }
        other => AuthError::Other(other.to_string()),
    })?;

    validate_hash(hash, signed, shared_secret).map_err(|e| match e {
        ApiAuthError::InvalidHash { provided, calculated } => {
            warn!(
                "Hash validation failed: provided={}, calculated={}",
                provided, calculated
            );
            AuthError::InvalidHash
        }
        other => AuthError::Other(other.to_string()),
    })
}

#[derive(Debug)]
pub enum AuthError {
    InvalidTimestamp(String),
    InvalidHash,
    MissingFields(String),
    ParseError(String),
    MethodNotAllowed,
    Other(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::InvalidTimestamp(reason) => {
                (StatusCode::UNAUTHORIZED, format!("Invalid timestamp: {}", reason))
            }
            AuthError::InvalidHash => (StatusCode::UNAUTHORIZED, "Invalid hash".to_string()),
            AuthError::MissingFields(msg) => {
                (StatusCode::BAD_REQUEST, format!("Missing required fields: {}", msg))
            }
            AuthError::ParseError(msg) => (StatusCode::BAD_REQUEST, format!("Parse error: {}", msg)),
            AuthError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "HTTP method not supported".to_string(),
            ),
            AuthError::Other(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Authentication error: {}", msg),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
