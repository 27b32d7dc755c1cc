//! Audit records and the attestation types that patch them after the fact.
//!
//! An `AuditRecord` is created synchronously when a reading is evaluated.
//! Its identity, reading and verdict never change afterwards; only the
//! `verified` / `verification_id` pair is filled in, at most once, when the
//! matching `AttestationOutcome` is applied to the log.

use serde::{Deserialize, Serialize};

use crate::{
    reading::Reading,
    verdict::{Status, Verdict},
};

/// One entry of the audit trail, with fabricated ledger metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Unique record identifier (UUID v4).
    pub id: String,

    /// `0x`-prefixed hex hash linking this record to its predecessor.
    pub transaction_hash: String,

    /// Copied from the reading.
    pub timestamp: i64,

    /// Status and, for FRAUD, the reason.
    #[serde(flatten)]
    pub verdict: Verdict,

    /// The full reading that produced the verdict.
    pub reading: Reading,

    /// Fabricated block height.
    pub block_number: u64,

    /// Fabricated confirmation count.
    pub confirmations: u32,

    /// Set once the external attestation succeeds.
    pub verified: bool,

    /// Identifier returned by the attestation collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<String>,
}

impl AuditRecord {
    pub fn status(&self) -> Status {
        self.verdict.status()
    }

    /// Build the ticket used to route a later attestation back to this record.
    pub fn ticket(&self) -> AttestationTicket {
        AttestationTicket {
            record_id: self.id.clone(),
            transaction_hash: self.transaction_hash.clone(),
        }
    }
}

/// A pending attestation, issued alongside a freshly appended record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationTicket {
    pub record_id: String,
    pub transaction_hash: String,
}

/// What the attestation collaborator reports for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<String>,
}

impl Attestation {
    pub fn verified(verification_id: impl Into<String>) -> Self {
        Self {
            verified: true,
            verification_id: Some(verification_id.into()),
        }
    }

    /// The result every attestation error collapses into.
    pub fn unverified() -> Self {
        Self {
            verified: false,
            verification_id: None,
        }
    }
}

/// A settled attestation, ready to be applied to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationOutcome {
    pub ticket: AttestationTicket,
    pub attestation: Attestation,
}

/// Response shape of an audit query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Most-recent-first.
    pub records: Vec<AuditRecord>,
    /// Number of records currently held by the log, not just returned.
    pub total: usize,
}
