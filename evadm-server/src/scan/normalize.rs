//! Scan code normalization
//!
//! Turns raw scanner or keyboard input into the canonical identity key
//! `NNNNNN-NN-NNNN`. Accepted shapes:
//! - `<prefix1>-<prefix2>-<identity>` (prefix from configuration)
//! - `950920-08-6687`
//! - `950920086687`

use std::fmt;

use evadm_common::config::ScanConfig;
use serde::Serialize;
use thiserror::Error;

/// Canonical attendee identity key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scan input that is not a recognisable identity code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid scan code format: {0:?}")]
pub struct InvalidFormat(pub String);

/// Parses raw scans into identity keys
#[derive(Debug, Clone)]
pub struct CodeNormalizer {
    prefix: [String; 2],
    strict_prefixed_remainder: bool,
}

impl CodeNormalizer {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            strict_prefixed_remainder: config.strict_prefixed_remainder,
        }
    }

    pub fn normalize(&self, raw: &str) -> Result<IdentityKey, InvalidFormat> {
        let trimmed = raw.trim();

        let parts: Vec<&str> = trimmed.split('-').collect();
        if parts.len() >= 3 && parts[0] == self.prefix[0] && parts[1] == self.prefix[1] {
            let remainder = parts[2..].join("-");
            return match canonicalize(&remainder) {
                Some(key) => Ok(key),
                // Lenient mode takes the remainder verbatim
                None if !self.strict_prefixed_remainder && !remainder.is_empty() => {
                    Ok(IdentityKey(remainder))
                }
                None => Err(InvalidFormat(trimmed.to_string())),
            };
        }

        canonicalize(trimmed).ok_or_else(|| InvalidFormat(trimmed.to_string()))
    }
}

impl Default for CodeNormalizer {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

/// Dashed form passes through; 12 bare digits get dashes after 6 and 8
fn canonicalize(candidate: &str) -> Option<IdentityKey> {
    if is_dashed_identity(candidate) {
        return Some(IdentityKey(candidate.to_string()));
    }

    if candidate.len() == 12 && candidate.bytes().all(|b| b.is_ascii_digit()) {
        return Some(IdentityKey(format!(
            "{}-{}-{}",
            &candidate[..6],
            &candidate[6..8],
            &candidate[8..]
        )));
    }

    None
}

/// `\d{6}-\d{2}-\d{4}`
fn is_dashed_identity(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == 14
        && bytes.iter().enumerate().all(|(i, b)| match i {
            6 | 9 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
