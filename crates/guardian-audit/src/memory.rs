//! In-memory, bounded implementation of `AuditTrail`.
//!
//! `BoundedAuditLog` keeps the most recent `capacity` chain entries in a
//! `VecDeque` behind a `Mutex`. When full, the oldest entry is evicted before
//! the new one is pushed, so the log never holds more than `capacity`
//! records. Sequence numbers and the hash chain keep running across
//! evictions; `verify_integrity()` checks whatever window is still retained.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use uuid::Uuid;

use guardian_contracts::{
    audit::{AttestationOutcome, AuditQuery, AuditRecord},
    config::AuditConfig,
    error::{GuardianError, GuardianResult},
    reading::Reading,
    verdict::Verdict,
};
use guardian_core::traits::AuditTrail;

use crate::{
    chain::{confirmations_for, hash_record, verify_chain},
    entry::ChainEntry,
};

pub(crate) struct LogState {
    /// Retained entries, oldest at the front.
    pub(crate) entries: VecDeque<ChainEntry>,

    /// Next sequence number to assign.
    pub(crate) sequence: u64,

    /// Transaction hash of the last appended entry, evicted or not.
    pub(crate) last_hash: String,
}

/// A bounded, append-only audit log backed by a SHA-256 hash chain.
pub struct BoundedAuditLog {
    capacity: usize,
    genesis_block: u64,
    pub(crate) state: Mutex<LogState>,
}

impl BoundedAuditLog {
    /// Create an empty log holding at most `capacity` records.
    ///
    /// A zero capacity is raised to 1; config validation rejects it earlier.
    pub fn new(capacity: usize, genesis_block: u64) -> Self {
        let state = LogState {
            entries: VecDeque::with_capacity(capacity.max(1)),
            sequence: 0,
            last_hash: ChainEntry::GENESIS_HASH.to_string(),
        };
        Self {
            capacity: capacity.max(1),
            genesis_block,
            state: Mutex::new(state),
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.capacity, config.genesis_block)
    }

    /// Verify the hash chain over the retained window.
    ///
    /// Returns `true` if no entry has been altered since it was appended.
    /// Attestation fields are not covered and may change freely.
    pub fn verify_integrity(&self) -> bool {
        let mut state = self.read_state();
        verify_chain(state.entries.make_contiguous())
    }

    /// Total number of records ever appended, including evicted ones.
    pub fn appended(&self) -> u64 {
        self.read_state().sequence
    }

    /// Reads tolerate a poisoned lock; the state is only mutated in
    /// complete steps, so a panicking holder cannot leave it half-written.
    fn read_state(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BoundedAuditLog {
    fn default() -> Self {
        Self::from_config(&AuditConfig::default())
    }
}

impl AuditTrail for BoundedAuditLog {
    fn append(&self, reading: &Reading, verdict: &Verdict) -> GuardianResult<AuditRecord> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| GuardianError::AuditWriteFailed {
                reason: format!("audit log lock poisoned: {e}"),
            })?;

        let sequence = state.sequence;
        let prev_hash = state.last_hash.clone();

        let mut record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            transaction_hash: String::new(),
            timestamp: reading.timestamp,
            verdict: verdict.clone(),
            reading: *reading,
            block_number: self.genesis_block + sequence,
            confirmations: 0,
            verified: false,
            verification_id: None,
        };
        record.transaction_hash = hash_record(&record, sequence, &prev_hash);
        record.confirmations = confirmations_for(&record.transaction_hash);

        if state.entries.len() >= self.capacity {
            if let Some(evicted) = state.entries.pop_front() {
                debug!(
                    record_id = %evicted.record.id,
                    sequence = evicted.sequence,
                    "evicted oldest audit record"
                );
            }
        }

        state.entries.push_back(ChainEntry {
            sequence,
            prev_hash,
            record: record.clone(),
            attested: false,
        });
        state.sequence += 1;
        state.last_hash = record.transaction_hash.clone();

        debug!(
            record_id = %record.id,
            sequence,
            status = %record.status(),
            "audit record appended"
        );

        Ok(record)
    }

    fn resolve(&self, outcome: &AttestationOutcome) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "audit log lock poisoned, attestation dropped");
                return false;
            }
        };

        let ticket = &outcome.ticket;
        let Some(entry) = state
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.record.id == ticket.record_id)
        else {
            debug!(record_id = %ticket.record_id, "attestation for evicted record dropped");
            return false;
        };

        if entry.attested || entry.record.transaction_hash != ticket.transaction_hash {
            return false;
        }

        entry.attested = true;
        entry.record.verified = outcome.attestation.verified;
        entry.record.verification_id = outcome.attestation.verification_id.clone();
        true
    }

    fn query(&self, limit: Option<usize>) -> AuditQuery {
        let state = self.read_state();
        let total = state.entries.len();
        let records = state
            .entries
            .iter()
            .rev()
            .take(limit.unwrap_or(total))
            .map(|entry| entry.record.clone())
            .collect();
        AuditQuery { records, total }
    }

    fn len(&self) -> usize {
        self.read_state().entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
impl BoundedAuditLog {
    /// Direct mutable access to a retained entry, for tamper tests.
    pub(crate) fn with_entry_mut(&self, index: usize, f: impl FnOnce(&mut ChainEntry)) {
        let mut state = self.read_state();
        if let Some(entry) = state.entries.get_mut(index) {
            f(entry);
        }
    }
}
