//! Hand-written collaborators shared by the unit tests in this crate.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use guardian_contracts::{
    audit::{Attestation, AttestationOutcome, AuditQuery, AuditRecord},
    error::{GuardianError, GuardianResult},
    reading::Reading,
    verdict::Verdict,
};

use crate::traits::{Attestor, AuditTrail, Classifier, ReadingSource};

pub fn reading(timestamp: i64, voltage: f64, energy: f64) -> Reading {
    Reading::new(timestamp, voltage, 10.0, energy)
}

/// Flags voltage above 260 and any energy decrease; records every call as
/// `(timestamp, previous timestamp)`.
#[derive(Default)]
pub struct RecordingClassifier {
    pub calls: Arc<Mutex<Vec<(i64, Option<i64>)>>>,
}

impl Classifier for RecordingClassifier {
    fn evaluate(&self, reading: &Reading, previous: Option<&Reading>) -> Verdict {
        self.calls
            .lock()
            .unwrap()
            .push((reading.timestamp, previous.map(|p| p.timestamp)));
        if reading.voltage > 260.0 {
            return Verdict::fraud("voltage");
        }
        match previous {
            Some(prev) if reading.cumulative_energy < prev.cumulative_energy => {
                Verdict::fraud("energy")
            }
            _ => Verdict::Valid,
        }
    }
}

/// Panics on every reading, taking the driver task down with it.
pub struct PanickingClassifier;

impl Classifier for PanickingClassifier {
    fn evaluate(&self, _reading: &Reading, _previous: Option<&Reading>) -> Verdict {
        panic!("classifier blew up");
    }
}

/// Unbounded in-memory trail.
#[derive(Default)]
pub struct MockTrail {
    pub records: Mutex<Vec<AuditRecord>>,
    pub fail: bool,
}

impl AuditTrail for MockTrail {
    fn append(&self, reading: &Reading, verdict: &Verdict) -> GuardianResult<AuditRecord> {
        if self.fail {
            return Err(GuardianError::AuditWriteFailed {
                reason: "mock failure".to_string(),
            });
        }
        let mut records = self.records.lock().unwrap();
        let n = records.len();
        let record = AuditRecord {
            id: format!("rec-{}", n),
            transaction_hash: format!("0x{:064x}", n),
            timestamp: reading.timestamp,
            verdict: verdict.clone(),
            reading: *reading,
            block_number: n as u64,
            confirmations: 1,
            verified: false,
            verification_id: None,
        };
        records.push(record.clone());
        Ok(record)
    }

    fn resolve(&self, outcome: &AttestationOutcome) -> bool {
        let mut records = self.records.lock().unwrap();
        match records
            .iter_mut()
            .find(|r| r.id == outcome.ticket.record_id && r.verification_id.is_none())
        {
            Some(record) => {
                record.verified = outcome.attestation.verified;
                record.verification_id = outcome.attestation.verification_id.clone();
                true
            }
            None => false,
        }
    }

    fn query(&self, limit: Option<usize>) -> AuditQuery {
        let records = self.records.lock().unwrap();
        AuditQuery {
            records: records
                .iter()
                .rev()
                .take(limit.unwrap_or(usize::MAX))
                .cloned()
                .collect(),
            total: records.len(),
        }
    }

    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn capacity(&self) -> usize {
        usize::MAX
    }
}

/// Looping source over fixed rows; `None` rows are malformed.
pub struct ScriptedSource {
    rows: Vec<Option<Reading>>,
    index: usize,
    /// Row indexes that open a new session.
    session_starts: Vec<usize>,
    session_break: bool,
}

impl ScriptedSource {
    pub fn new(rows: Vec<Option<Reading>>) -> Self {
        Self {
            rows,
            index: 0,
            session_starts: Vec::new(),
            session_break: false,
        }
    }

    pub fn with_session_starts(mut self, starts: &[usize]) -> Self {
        self.session_starts = starts.to_vec();
        self
    }

    pub fn of(readings: &[Reading]) -> Self {
        Self::new(readings.iter().copied().map(Some).collect())
    }
}

impl ReadingSource for ScriptedSource {
    fn next_reading(&mut self) -> GuardianResult<Reading> {
        if self.rows.is_empty() {
            return Err(GuardianError::SourceUnavailable {
                reason: "no rows".to_string(),
            });
        }
        if self.index >= self.rows.len() {
            self.index = 0;
        }
        let row = self.rows[self.index];
        if self.session_starts.contains(&self.index) {
            self.session_break = true;
        }
        self.index += 1;
        row.ok_or_else(|| GuardianError::MalformedReading {
            reason: "scripted bad row".to_string(),
        })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.rows.len())
    }

    fn check_ready(&self) -> GuardianResult<()> {
        if self.rows.is_empty() {
            Err(GuardianError::SourceUnavailable {
                reason: "no rows".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn take_session_break(&mut self) -> bool {
        std::mem::take(&mut self.session_break)
    }
}

pub struct InstantAttestor;

#[async_trait]
impl Attestor for InstantAttestor {
    async fn attest(&self, record: &AuditRecord) -> GuardianResult<Attestation> {
        Ok(Attestation::verified(format!("att-{}", record.id)))
    }
}

pub struct FailingAttestor;

#[async_trait]
impl Attestor for FailingAttestor {
    async fn attest(&self, _record: &AuditRecord) -> GuardianResult<Attestation> {
        Err(GuardianError::AttestationFailed {
            reason: "service unreachable".to_string(),
        })
    }
}
