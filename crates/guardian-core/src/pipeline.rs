//! The per-reading pipeline: classify, append, count, compose, publish.
//!
//! A `Pipeline` is shared between the engine and its driver task. Only the
//! driver task calls `process` and `apply`, which makes it the single writer
//! for the audit log and the counters. The counters lock is held across the
//! append so a snapshot always matches the record it is emitted with.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::{runtime::Handle, sync::mpsc};
use tracing::{debug, warn};

use guardian_contracts::{
    audit::{Attestation, AttestationOutcome, AuditQuery, AuditRecord},
    error::{GuardianError, GuardianResult},
    reading::Reading,
    stream::{CounterSnapshot, StreamEvent},
    verdict::Verdict,
};

use crate::{
    counters::Counters,
    registry::{Subscription, SubscriptionId, SubscriptionRegistry},
    traits::{Attestor, AuditTrail, Classifier},
};

pub struct Pipeline {
    classifier: Box<dyn Classifier>,
    audit: Arc<dyn AuditTrail>,
    attestor: Option<Arc<dyn Attestor>>,
    counters: Mutex<Counters>,
    registry: SubscriptionRegistry,
    outcomes: mpsc::UnboundedSender<AttestationOutcome>,
}

impl Pipeline {
    /// Build a pipeline and the receiver on which settled attestations arrive.
    ///
    /// The receiver belongs to whoever applies outcomes back to the log;
    /// normally the engine's driver task.
    pub fn new(
        classifier: Box<dyn Classifier>,
        audit: Arc<dyn AuditTrail>,
        attestor: Option<Arc<dyn Attestor>>,
        subscriber_buffer: usize,
    ) -> (Self, mpsc::UnboundedReceiver<AttestationOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = Self {
            classifier,
            audit,
            attestor,
            counters: Mutex::new(Counters::new()),
            registry: SubscriptionRegistry::new(subscriber_buffer),
            outcomes: tx,
        };
        (pipeline, rx)
    }

    /// Run one reading through the pipeline and return the emitted event.
    ///
    /// On error nothing was recorded, counted, or published.
    pub fn process(
        &self,
        reading: Reading,
        previous: Option<&Reading>,
    ) -> GuardianResult<StreamEvent> {
        let verdict = self.classifier.evaluate(&reading, previous);

        let (record, stats) = {
            let mut counters = self.counters.lock().map_err(|e| GuardianError::AuditWriteFailed {
                reason: format!("counter lock poisoned: {}", e),
            })?;
            let record = self.audit.append(&reading, &verdict)?;
            let stats = counters.record(verdict.status());
            (record, stats)
        };

        self.request_attestation(&record);

        let event = StreamEvent {
            reading,
            verdict,
            blockchain_record: Some(record),
            stats,
        };
        let delivered = self.registry.publish(&event);

        debug!(
            timestamp = event.reading.timestamp,
            status = %event.verdict.status(),
            total = stats.total,
            delivered,
            "reading processed"
        );

        Ok(event)
    }

    /// Fire-and-forget attestation for a fresh record.
    ///
    /// The outcome comes back over the outcomes channel instead of touching
    /// the log from the spawned task.
    fn request_attestation(&self, record: &AuditRecord) {
        let Some(attestor) = self.attestor.as_ref() else {
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            warn!(record_id = %record.id, "no async runtime; attestation skipped");
            return;
        };

        let attestor = Arc::clone(attestor);
        let outcomes = self.outcomes.clone();
        let record = record.clone();
        handle.spawn(async move {
            let attestation = match attestor.attest(&record).await {
                Ok(attestation) => attestation,
                Err(e) => {
                    warn!(record_id = %record.id, error = %e, "attestation failed");
                    Attestation::unverified()
                }
            };
            // A closed channel means the engine is gone; the outcome is abandoned.
            let _ = outcomes.send(AttestationOutcome {
                ticket: record.ticket(),
                attestation,
            });
        });
    }

    /// Apply a settled attestation to the audit log.
    pub fn apply(&self, outcome: &AttestationOutcome) -> bool {
        let applied = self.audit.resolve(outcome);
        debug!(
            record_id = %outcome.ticket.record_id,
            verified = outcome.attestation.verified,
            applied,
            "attestation settled"
        );
        applied
    }

    /// Stateless direct check; see `Classifier::check_window`.
    pub fn check(&self, window: &[Reading]) -> GuardianResult<Verdict> {
        self.classifier.check_window(window)
    }

    pub fn classify_session(&self, session: &[Reading]) -> GuardianResult<Verdict> {
        self.classifier.classify_session(session)
    }

    pub fn query(&self, limit: Option<usize>) -> AuditQuery {
        self.audit.query(limit)
    }

    pub fn stats(&self) -> CounterSnapshot {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub fn subscribe(&self) -> Subscription {
        self.registry.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    pub fn records_held(&self) -> usize {
        self.audit.len()
    }

    pub fn capacity(&self) -> usize {
        self.audit.capacity()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use guardian_contracts::{
        error::GuardianError,
        stream::CounterSnapshot,
        verdict::{Status, Verdict},
    };

    use crate::{
        feed::Feed,
        test_support::{reading, MockTrail, RecordingClassifier, ScriptedSource},
        traits::{AuditTrail, Classifier},
    };

    use super::Pipeline;

    fn pipeline_with(trail: Arc<MockTrail>) -> Pipeline {
        let (pipeline, _outcomes) =
            Pipeline::new(Box::new(RecordingClassifier::default()), trail, None, 16);
        pipeline
    }

    /// VALID/FRAUD/VALID/FRAUD/VALID yields 3 valid, 2 fraud, 5 records in order.
    #[test]
    fn test_alternating_stream_counts_and_records_in_order() {
        let trail = Arc::new(MockTrail::default());
        let pipeline = pipeline_with(Arc::clone(&trail));
        let source = ScriptedSource::of(&[
            reading(1, 230.0, 0.01),
            reading(2, 265.0, 0.02),
            reading(3, 231.0, 0.03),
            reading(4, 270.0, 0.04),
            reading(5, 232.0, 0.05),
        ]);
        let mut feed = Feed::new(Box::new(source));

        let events: Vec<_> = (0..5).filter_map(|_| feed.tick(&pipeline)).collect();
        assert_eq!(events.len(), 5);
        assert_eq!(
            events.last().unwrap().stats,
            CounterSnapshot { total: 5, valid: 3, fraud: 2 }
        );

        let expected = [
            Status::Valid,
            Status::Fraud,
            Status::Valid,
            Status::Fraud,
            Status::Valid,
        ];
        let records = trail.records.lock().unwrap();
        let statuses: Vec<Status> = records.iter().map(|r| r.status()).collect();
        assert_eq!(statuses, expected, "oldest-first insertion order must match");
    }

    /// Each event carries the record it produced and counters that include it.
    #[test]
    fn test_event_carries_matching_record_and_stats() {
        let trail = Arc::new(MockTrail::default());
        let pipeline = pipeline_with(Arc::clone(&trail));

        let event = pipeline.process(reading(9, 230.0, 0.1), None).unwrap();
        let record = event.blockchain_record.as_ref().unwrap();
        assert_eq!(record.timestamp, 9);
        assert_eq!(record.reading, event.reading);
        assert_eq!(event.stats.total, 1);
        assert_eq!(pipeline.stats(), event.stats);
    }

    /// A 3-row source looped for 4 ticks compares tick 4 with tick 3.
    #[test]
    fn test_wrap_around_uses_true_predecessor() {
        let classifier = RecordingClassifier::default();
        let calls = Arc::clone(&classifier.calls);
        let (pipeline, _rx) =
            Pipeline::new(Box::new(classifier), Arc::new(MockTrail::default()), None, 4);

        let mut feed = Feed::new(Box::new(ScriptedSource::of(&[
            reading(10, 230.0, 0.01),
            reading(20, 230.0, 0.02),
            reading(30, 230.0, 0.03),
        ])));

        let events: Vec<_> = (0..4).filter_map(|_| feed.tick(&pipeline)).collect();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], (10, None), "first reading has no previous");
        assert_eq!(calls[3], (10, Some(30)), "post-wrap reading compares against the last row");

        // The wrapped row has lower energy than its true predecessor.
        assert_eq!(events[3].verdict, Verdict::fraud("energy"));
    }

    /// A session break clears the previous reading; the next session's first
    /// reading has nothing to compare against.
    #[test]
    fn test_session_break_clears_previous() {
        let classifier = RecordingClassifier::default();
        let calls = Arc::clone(&classifier.calls);
        let (pipeline, _rx) =
            Pipeline::new(Box::new(classifier), Arc::new(MockTrail::default()), None, 4);
        let source = ScriptedSource::of(&[
            reading(1, 230.0, 0.0006),
            reading(2, 230.0, 0.0012),
            reading(3, 230.0, 0.0006),
        ])
        .with_session_starts(&[2]);
        let mut feed = Feed::new(Box::new(source));

        let events: Vec<_> = (0..3).filter_map(|_| feed.tick(&pipeline)).collect();

        assert_eq!(events[2].verdict, Verdict::Valid, "new session starts from zero energy");
        assert_eq!(calls.lock().unwrap()[2], (3, None));
        assert_eq!(feed.previous().map(|r| r.timestamp), Some(3));
    }

    /// A break carried by a malformed row still applies to the next good one.
    #[test]
    fn test_session_break_on_skipped_row_is_kept() {
        let pipeline = pipeline_with(Arc::new(MockTrail::default()));
        let source = ScriptedSource::new(vec![
            Some(reading(1, 230.0, 0.5)),
            None,
            Some(reading(3, 230.0, 0.1)),
        ])
        .with_session_starts(&[1]);
        let mut feed = Feed::new(Box::new(source));

        assert!(feed.tick(&pipeline).is_some());
        assert!(feed.tick(&pipeline).is_none());
        let third = feed.tick(&pipeline).unwrap();
        assert_eq!(third.verdict, Verdict::Valid);
    }

    /// A malformed row skips the tick without touching counters or history.
    #[test]
    fn test_malformed_row_skips_tick() {
        let trail = Arc::new(MockTrail::default());
        let pipeline = pipeline_with(Arc::clone(&trail));
        let mut feed = Feed::new(Box::new(ScriptedSource::new(vec![
            Some(reading(1, 230.0, 0.05)),
            None,
            Some(reading(3, 230.0, 0.01)),
        ])));

        assert!(feed.tick(&pipeline).is_some());
        assert!(feed.tick(&pipeline).is_none(), "malformed row must not emit");
        assert_eq!(pipeline.stats().total, 1);
        assert_eq!(feed.previous().map(|r| r.timestamp), Some(1));

        let third = feed.tick(&pipeline).unwrap();
        assert!(third.verdict.is_fraud(), "compared against the last good reading");
        assert_eq!(trail.len(), 2);
    }

    /// A failing audit append emits nothing and leaves counters alone.
    #[test]
    fn test_audit_failure_is_contained() {
        let trail = Arc::new(MockTrail {
            fail: true,
            ..MockTrail::default()
        });
        let pipeline = pipeline_with(trail);
        let mut sub = pipeline.subscribe();

        let result = pipeline.process(reading(1, 230.0, 0.0), None);
        assert!(matches!(result, Err(GuardianError::AuditWriteFailed { .. })));
        assert_eq!(pipeline.stats(), CounterSnapshot::default());
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_subscribers_receive_processed_events() {
        let pipeline = pipeline_with(Arc::new(MockTrail::default()));
        let mut sub = pipeline.subscribe();

        pipeline.process(reading(1, 230.0, 0.0), None).unwrap();
        let event = sub.try_recv().expect("event must be delivered before process returns");
        assert_eq!(event.reading.timestamp, 1);
        assert_eq!(event.stats.total, 1);
    }

    #[test]
    fn test_reset_forgets_previous_reading() {
        let pipeline = pipeline_with(Arc::new(MockTrail::default()));
        let mut feed = Feed::new(Box::new(ScriptedSource::of(&[
            reading(1, 230.0, 0.5),
            reading(2, 230.0, 0.1),
        ])));

        feed.tick(&pipeline);
        feed.reset();
        let event = feed.tick(&pipeline).unwrap();
        assert_eq!(event.verdict, Verdict::Valid, "no previous after reset");
    }

    // ── Direct check ─────────────────────────────────────────────────────────

    #[test]
    fn test_check_window_uses_second_to_last_as_previous() {
        let classifier = RecordingClassifier::default();
        let window = [
            reading(1, 230.0, 0.09),
            reading(2, 230.0, 0.02),
            reading(3, 230.0, 0.01),
        ];
        assert_eq!(classifier.check_window(&window).unwrap(), Verdict::fraud("energy"));
        assert_eq!(
            classifier.calls.lock().unwrap().as_slice(),
            &[(3, Some(2))],
            "only the last reading is evaluated"
        );

        assert_eq!(
            classifier.check_window(&window[..1]).unwrap(),
            Verdict::Valid
        );
        assert!(matches!(
            classifier.check_window(&[]),
            Err(GuardianError::EmptyWindow)
        ));
    }

    #[test]
    fn test_direct_check_leaves_pipeline_state_alone() {
        let trail = Arc::new(MockTrail::default());
        let pipeline = pipeline_with(Arc::clone(&trail));

        let verdict = pipeline.check(&[reading(1, 265.0, 0.0)]).unwrap();
        assert!(verdict.is_fraud());
        assert_eq!(pipeline.stats().total, 0);
        assert_eq!(trail.len(), 0);
    }

    #[test]
    fn test_classify_session_returns_first_fraud() {
        let classifier = RecordingClassifier::default();
        let session = [
            reading(1, 230.0, 0.01),
            reading(2, 230.0, 0.02),
            reading(3, 230.0, 0.015),
            reading(4, 270.0, 0.03),
        ];
        assert_eq!(
            classifier.classify_session(&session).unwrap(),
            Verdict::fraud("energy")
        );
        assert_eq!(
            classifier.classify_session(&session[..2]).unwrap(),
            Verdict::Valid
        );
        assert!(classifier.classify_session(&[]).is_err());
    }
}
