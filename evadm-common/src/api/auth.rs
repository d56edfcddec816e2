//! Operator API authentication via timestamp and hash
//!
//! Every protected request carries `timestamp` (Unix epoch milliseconds) and
//! `hash` (SHA-256, 64 hex chars). The hash covers the canonical JSON of the
//! request fields with `hash` replaced by 64 zeros, followed by the shared
//! secret in decimal. A shared secret of `0` disables checking.
//!
//! Pure functions and settings-table access only; the axum wrapper lives in
//! the server crate.

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

/// How far in the past a request timestamp may be
pub const MAX_PAST_MS: i64 = 1000;
/// How far in the future a request timestamp may be (clock drift only)
pub const MAX_FUTURE_MS: i64 = 1;

const DUMMY_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[cfg(feature = "sqlx")]
const SECRET_KEY: &str = "api_shared_secret";

/// Authentication failures
#[derive(Debug, Clone, Error)]
pub enum ApiAuthError {
    #[error("Invalid timestamp: {reason}")]
    InvalidTimestamp {
        timestamp: i64,
        now: i64,
        reason: String,
    },

    #[error("Invalid hash")]
    InvalidHash { provided: String, calculated: String },

    #[error("Missing timestamp field")]
    MissingTimestamp,

    #[error("Missing hash field")]
    MissingHash,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Load the shared secret from settings, generating one on first use
#[cfg(feature = "sqlx")]
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    let result: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(SECRET_KEY)
        .fetch_optional(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match result {
        Some((value,)) => value
            .parse::<i64>()
            .map_err(|e| ApiAuthError::DatabaseError(format!("Invalid i64: {}", e))),
        None => initialize_shared_secret(db).await,
    }
}

/// Generate and store a random non-zero secret
#[cfg(feature = "sqlx")]
pub async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let secret: i64 = loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            break val;
        }
    };

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(SECRET_KEY)
        .bind(secret.to_string())
        .execute(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    Ok(secret)
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Check that `timestamp` is within the accepted window around now
pub fn validate_timestamp(timestamp: i64) -> Result<(), ApiAuthError> {
    validate_timestamp_at(timestamp, now_millis())
}

fn validate_timestamp_at(timestamp: i64, now: i64) -> Result<(), ApiAuthError> {
    let diff = now - timestamp;

    if diff > MAX_PAST_MS {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!("Timestamp {}ms too old (max {}ms past)", diff, MAX_PAST_MS),
        });
    }

    if diff < -MAX_FUTURE_MS {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!(
                "Timestamp {}ms in future (max {}ms future)",
                diff.abs(),
                MAX_FUTURE_MS
            ),
        });
    }

    Ok(())
}

/// Hash of `json_value` under `shared_secret`
///
/// ```
/// use evadm_common::api::auth::calculate_hash;
/// use serde_json::json;
///
/// let body = json!({"code": "950920-08-6687", "timestamp": 1730000000000i64, "hash": ""});
/// let hash = calculate_hash(&body, 42);
/// assert_eq!(hash.len(), 64);
/// ```
pub fn calculate_hash(json_value: &Value, shared_secret: i64) -> String {
    let mut value = json_value.clone();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("hash".to_string(), Value::String(DUMMY_HASH.to_string()));
    }

    let to_hash = format!("{}{}", to_canonical_json(&value), shared_secret);

    let mut hasher = Sha256::new();
    hasher.update(to_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// JSON with object keys sorted and no whitespace
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let items: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("\"{}\":{}", k, to_canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
    }
}

pub fn validate_hash(
    provided_hash: &str,
    json_value: &Value,
    shared_secret: i64,
) -> Result<(), ApiAuthError> {
    let calculated = calculate_hash(json_value, shared_secret);

    if provided_hash != calculated {
        return Err(ApiAuthError::InvalidHash {
            provided: provided_hash.to_string(),
            calculated,
        });
    }

    Ok(())
}

/// Stamp `timestamp` and `hash` onto a JSON object request body
///
/// Client-side counterpart of [`validate_hash`]; non-object values are
/// returned unchanged.
pub fn sign(mut value: Value, shared_secret: i64) -> Value {
    if let Some(obj) = value.as_object_mut() {
        obj.insert("timestamp".to_string(), Value::from(now_millis()));
    }
    let hash = calculate_hash(&value, shared_secret);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("hash".to_string(), Value::String(hash));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamp_window() {
        let now = 1_730_000_000_000;
        assert!(validate_timestamp_at(now, now).is_ok());
        assert!(validate_timestamp_at(now - 1000, now).is_ok());
        assert!(validate_timestamp_at(now + 1, now).is_ok());

        assert!(validate_timestamp_at(now - 1001, now).is_err());
        assert!(validate_timestamp_at(now + 2, now).is_err());
    }

    #[test]
    fn test_hash_depends_on_secret() {
        let body = json!({"code": "950920086687", "timestamp": 1730000000000i64, "hash": "x"});
        let a = calculate_hash(&body, 123456789);
        let b = calculate_hash(&body, 987654321);

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_ignores_provided_hash_value() {
        let a = json!({"timestamp": 1i64, "hash": "first"});
        let b = json!({"timestamp": 1i64, "hash": "second"});
        assert_eq!(calculate_hash(&a, 7), calculate_hash(&b, 7));
    }

    #[test]
    fn test_canonical_json_sorted_and_compact() {
        let canonical = to_canonical_json(&json!({"z": [1, true], "a": {"m": null}}));
        assert_eq!(canonical, r#"{"a":{"m":null},"z":[1,true]}"#);
    }

    #[test]
    fn test_signed_body_validates() {
        let signed = sign(json!({"code": "950920-08-6687"}), 55);
        let hash = signed["hash"].as_str().unwrap().to_string();

        assert!(validate_hash(&hash, &signed, 55).is_ok());
        assert!(validate_hash(&hash, &signed, 56).is_err());
        assert!(validate_timestamp(signed["timestamp"].as_i64().unwrap()).is_ok());
    }
}
