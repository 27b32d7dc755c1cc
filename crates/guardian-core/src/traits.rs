//! Seam traits between the stream driver and its collaborators.
//!
//! - `Classifier`: pure verdict function (rules live elsewhere)
//! - `AuditTrail`: bounded append-only record store
//! - `Attestor`: external, asynchronous, best-effort verifier
//! - `ReadingSource`: where the driver pulls its next reading from
//!
//! The `Engine` wires them together; none of them know about each other.

use async_trait::async_trait;

use guardian_contracts::{
    audit::{Attestation, AttestationOutcome, AuditQuery, AuditRecord},
    error::{GuardianError, GuardianResult},
    reading::Reading,
    verdict::Verdict,
};

/// Maps a reading, and optionally the reading before it, to a verdict.
///
/// Implementations must be pure and total: any numeric input, including NaN
/// or negative values, produces a verdict rather than an error.
pub trait Classifier: Send + Sync {
    /// Classify `reading`. `previous` is `None` for the first reading of a
    /// sequence, in which case stateful rules must not fire.
    fn evaluate(&self, reading: &Reading, previous: Option<&Reading>) -> Verdict;

    /// Stateless direct check over a caller-supplied window.
    ///
    /// Evaluates the last reading, using the second-to-last as `previous`
    /// when the window has one. Touches no driver state.
    fn check_window(&self, window: &[Reading]) -> GuardianResult<Verdict> {
        match window {
            [] => Err(GuardianError::EmptyWindow),
            [only] => Ok(self.evaluate(only, None)),
            [.., previous, last] => Ok(self.evaluate(last, Some(previous))),
        }
    }

    /// Verdict for a whole session: the first FRAUD found while walking the
    /// readings in order, or VALID if every reading passes.
    fn classify_session(&self, session: &[Reading]) -> GuardianResult<Verdict> {
        if session.is_empty() {
            return Err(GuardianError::EmptyWindow);
        }
        let mut previous = None;
        for reading in session {
            let verdict = self.evaluate(reading, previous);
            if verdict.is_fraud() {
                return Ok(verdict);
            }
            previous = Some(reading);
        }
        Ok(Verdict::Valid)
    }
}

/// The audit log: every evaluated reading produces exactly one record.
pub trait AuditTrail: Send + Sync {
    /// Append a record for `reading` and its `verdict`, evicting the oldest
    /// record if the log is full.
    fn append(&self, reading: &Reading, verdict: &Verdict) -> GuardianResult<AuditRecord>;

    /// Apply a settled attestation to the record named by its ticket.
    ///
    /// Returns `false` when the record has been evicted or was already
    /// resolved; neither case is an error.
    fn resolve(&self, outcome: &AttestationOutcome) -> bool;

    /// Records most-recent-first, at most `limit` of them.
    fn query(&self, limit: Option<usize>) -> AuditQuery;

    /// Records currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum records held before eviction.
    fn capacity(&self) -> usize;
}

/// External attestation of an audit record.
///
/// Errors are allowed here; the pipeline collapses them into
/// `Attestation::unverified()` so they never reach the tick path.
#[async_trait]
pub trait Attestor: Send + Sync {
    async fn attest(&self, record: &AuditRecord) -> GuardianResult<Attestation>;
}

/// A supply of readings for the stream driver.
pub trait ReadingSource: Send {
    /// Produce the next reading. `MalformedReading` skips the tick.
    fn next_reading(&mut self) -> GuardianResult<Reading>;

    /// Number of rows for bounded (replaying) sources, `None` if unbounded.
    fn size_hint(&self) -> Option<usize>;

    /// Called before the driver starts. Returns `SourceUnavailable` if the
    /// source can never produce a reading.
    fn check_ready(&self) -> GuardianResult<()>;

    /// Whether a new charging session began since the last call.
    ///
    /// Checked after each successful `next_reading`; `true` makes the
    /// driver forget its previous reading, so the first reading of a session
    /// is not compared with the last reading of another. Sources without
    /// session boundaries keep the default.
    fn take_session_break(&mut self) -> bool {
        false
    }
}
