//! Classification results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two outcomes a reading can be classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Valid,
    Fraud,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Valid => f.write_str("VALID"),
            Status::Fraud => f.write_str("FRAUD"),
        }
    }
}

/// The classification of a single reading.
///
/// A reason exists exactly when the reading is fraudulent, so the variant
/// carries it. On the wire this is `{"status": "VALID"}` or
/// `{"status": "FRAUD", "reason": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum Verdict {
    Valid,
    Fraud {
        /// Human-readable, deterministic for the rule that fired.
        reason: String,
    },
}

impl Verdict {
    pub fn fraud(reason: impl Into<String>) -> Self {
        Verdict::Fraud {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Verdict::Valid => Status::Valid,
            Verdict::Fraud { .. } => Status::Fraud,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Valid => None,
            Verdict::Fraud { reason } => Some(reason),
        }
    }

    pub fn is_fraud(&self) -> bool {
        matches!(self, Verdict::Fraud { .. })
    }
}
