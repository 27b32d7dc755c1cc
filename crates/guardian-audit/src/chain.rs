//! Hash-link primitives: transaction hashes and window integrity checks.
//!
//! A record's transaction hash commits to its immutable fields and to the
//! previous record's hash. The attestation fields (`verified`,
//! `verification_id`) are excluded because they are patched in later.
//!
//! Hash input layout (bytes, in order):
//!   1. record id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes
//!   4. timestamp as 8-byte little-endian
//!   5. voltage, current, cumulative_energy as 8-byte little-endian IEEE-754
//!   6. status as one byte (0 = VALID, 1 = FRAUD)
//!   7. reason as UTF-8 bytes (nothing for VALID)

use sha2::{Digest, Sha256};

use guardian_contracts::{audit::AuditRecord, verdict::Verdict};

use crate::entry::ChainEntry;

/// Compute the transaction hash for a record at `sequence`.
///
/// Returns `0x` followed by 64 lowercase hex characters.
pub fn hash_record(record: &AuditRecord, sequence: u64, prev_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(record.timestamp.to_le_bytes());
    hasher.update(record.reading.voltage.to_le_bytes());
    hasher.update(record.reading.current.to_le_bytes());
    hasher.update(record.reading.cumulative_energy.to_le_bytes());
    match &record.verdict {
        Verdict::Valid => hasher.update([0u8]),
        Verdict::Fraud { reason } => {
            hasher.update([1u8]);
            hasher.update(reason.as_bytes());
        }
    }

    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Fabricated confirmation count in `1..=12`, derived from the hash.
pub fn confirmations_for(transaction_hash: &str) -> u32 {
    let first_byte = transaction_hash
        .get(2..4)
        .and_then(|byte| u8::from_str_radix(byte, 16).ok())
        .unwrap_or(0);
    1 + u32::from(first_byte % 12)
}

/// Verify the integrity of a retained window of the chain.
///
/// The window may start after older entries were evicted, so the first
/// entry's `prev_hash` is taken as given unless it is the very first entry
/// ever written, which must link to `GENESIS_HASH`. After that:
///
/// 1. **Prev-hash linkage**: each entry's `prev_hash` equals the
///    `transaction_hash` of the entry before it.
/// 2. **Hash correctness**: each `transaction_hash` matches the value
///    recomputed from the entry's own fields.
///
/// An empty window is valid.
pub fn verify_chain(entries: &[ChainEntry]) -> bool {
    let Some(first) = entries.first() else {
        return true;
    };
    if first.sequence == 0 && first.prev_hash != ChainEntry::GENESIS_HASH {
        return false;
    }

    let mut expected_prev = first.prev_hash.clone();
    let mut expected_sequence = first.sequence;

    for entry in entries {
        if entry.prev_hash != expected_prev || entry.sequence != expected_sequence {
            return false;
        }

        let recomputed = hash_record(&entry.record, entry.sequence, &entry.prev_hash);
        if entry.record.transaction_hash != recomputed {
            return false;
        }

        expected_prev = entry.record.transaction_hash.clone();
        expected_sequence += 1;
    }

    true
}
