//! A record's position in the hash-linked log.

use guardian_contracts::audit::AuditRecord;

/// An audit record plus the chain metadata that stays internal to the log.
///
/// Only `record` leaves the log through queries; the sequence and
/// `prev_hash` exist so `verify_chain` can detect tampering.
#[derive(Debug, Clone)]
pub struct ChainEntry {
    /// Position since the log was created, starting at 0. Never reused.
    pub sequence: u64,

    /// Transaction hash of the previous entry, or `GENESIS_HASH`.
    pub prev_hash: String,

    pub record: AuditRecord,

    /// Whether an attestation outcome has already been applied.
    pub attested: bool,
}

impl ChainEntry {
    /// The `prev_hash` of the first entry ever written: 64 hex zeros.
    pub const GENESIS_HASH: &'static str =
        "0x0000000000000000000000000000000000000000000000000000000000000000";
}
