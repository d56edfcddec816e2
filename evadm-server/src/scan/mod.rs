//! Scan redemption core
//!
//! A scan flows through four stages:
//! 1. [`normalize`]: raw input to canonical identity key
//! 2. [`resolve`]: identity key to registration
//! 3. [`transition`]: one-way status change on the registration
//! 4. [`report`]: outcome to operator-facing message

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod normalize;
pub mod report;
pub mod resolve;
pub mod transition;

pub use normalize::{CodeNormalizer, IdentityKey, InvalidFormat};
pub use report::{ScanReport, ScanService};
pub use resolve::RecordResolver;
pub use transition::{ClearOutcome, TransitionEngine, TransitionOutcome};

/// Scan-driven workflow run against a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    #[serde(rename = "checkin")]
    CheckIn,
    Redemption,
}

impl Workflow {
    /// Noun used in operator messages
    pub fn label(&self) -> &'static str {
        match self {
            Workflow::CheckIn => "check-in",
            Workflow::Redemption => "gift redemption",
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
