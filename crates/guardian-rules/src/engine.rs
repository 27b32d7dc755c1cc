//! Threshold classifier implementation.
//!
//! `ThresholdClassifier` walks `Rule::ORDER` and returns the first rule's
//! reason as a FRAUD verdict. If no rule fires the reading is VALID.
//!
//! Malformed input is classified, not rejected. NaN fails every comparison,
//! so a NaN reading with no other violation comes out VALID.

use tracing::debug;

use guardian_contracts::{
    config::{GuardianConfig, Thresholds},
    reading::Reading,
    verdict::Verdict,
};
use guardian_core::traits::Classifier;

use crate::rule::Rule;

/// A `Classifier` driven by configurable electrical limits.
#[derive(Debug, Clone, Default)]
pub struct ThresholdClassifier {
    limits: Thresholds,
}

impl ThresholdClassifier {
    pub fn new(limits: Thresholds) -> Self {
        Self { limits }
    }

    pub fn from_config(config: &GuardianConfig) -> Self {
        Self::new(config.thresholds)
    }

    pub fn limits(&self) -> &Thresholds {
        &self.limits
    }
}

impl Classifier for ThresholdClassifier {
    fn evaluate(&self, reading: &Reading, previous: Option<&Reading>) -> Verdict {
        for rule in Rule::ORDER {
            if let Some(reason) = rule.check(&self.limits, reading, previous) {
                debug!(
                    rule_id = rule.id(),
                    timestamp = reading.timestamp,
                    reason = %reason,
                    "fraud rule fired"
                );
                return Verdict::fraud(reason);
            }
        }
        Verdict::Valid
    }
}
