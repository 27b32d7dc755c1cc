//! The guardian engine: an explicitly owned stream driver instance.
//!
//! Lifecycle is `Stopped → Running → Stopped`. While running, one tokio task
//! owns the `Feed` and drives it on a fixed interval:
//!
//!   tick → Feed::tick → Pipeline::process (classify → append → count → publish)
//!
//! The same task applies settled attestations between ticks, so the audit
//! log has exactly one writer. Ticks never overlap: each runs to completion
//! inside one `select!` arm before the next arm is polled, and `stop` is
//! only observed between ticks.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::{
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{error, info};

use guardian_contracts::{
    audit::{AttestationOutcome, AuditQuery},
    config::StreamConfig,
    error::{GuardianError, GuardianResult},
    reading::Reading,
    stream::{CounterSnapshot, DriverState, EngineHealth},
    verdict::Verdict,
};

use crate::{
    feed::Feed,
    pipeline::Pipeline,
    registry::{Subscription, SubscriptionId},
    traits::{Attestor, AuditTrail, Classifier, ReadingSource},
};

/// Driver-owned state, parked here while the engine is stopped.
struct Parked {
    feed: Feed,
    outcomes: mpsc::UnboundedReceiver<AttestationOutcome>,
}

struct RunHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Parked>,
}

enum RunSlot {
    Parked(Parked),
    Running(RunHandle),
    /// The driver task panicked and took the feed with it.
    Lost,
}

pub struct Engine {
    pipeline: Arc<Pipeline>,
    interval: Duration,
    source_size: Option<usize>,
    running: Arc<AtomicBool>,
    slot: Mutex<RunSlot>,
}

impl Engine {
    /// Assemble an engine. Nothing runs until `start`.
    pub fn new(
        classifier: Box<dyn Classifier>,
        audit: Arc<dyn AuditTrail>,
        attestor: Option<Arc<dyn Attestor>>,
        source: Box<dyn ReadingSource>,
        stream: &StreamConfig,
    ) -> Self {
        let (pipeline, outcomes) =
            Pipeline::new(classifier, audit, attestor, stream.subscriber_buffer);
        let feed = Feed::new(source);
        Self {
            pipeline: Arc::new(pipeline),
            interval: Duration::from_millis(stream.interval_ms.max(1)),
            source_size: feed.size_hint(),
            running: Arc::new(AtomicBool::new(false)),
            slot: Mutex::new(RunSlot::Parked(Parked { feed, outcomes })),
        }
    }

    pub fn state(&self) -> DriverState {
        if self.running.load(Ordering::Acquire) {
            DriverState::Running
        } else {
            DriverState::Stopped
        }
    }

    /// Transition to `Running` and spawn the driver task.
    ///
    /// # Errors
    ///
    /// - `AlreadyRunning` if the driver is running.
    /// - `SourceUnavailable` if the source cannot produce readings; the
    ///   engine stays `Stopped`.
    pub async fn start(&self) -> GuardianResult<()> {
        let mut slot = self.slot.lock().await;

        let mut parked = match std::mem::replace(&mut *slot, RunSlot::Lost) {
            RunSlot::Parked(parked) => parked,
            RunSlot::Running(handle) if handle.task.is_finished() => match handle.task.await {
                Ok(parked) => parked,
                Err(e) => {
                    error!(error = %e, "stream driver task failed");
                    return Err(GuardianError::SourceUnavailable {
                        reason: "reading source was lost when the driver task failed".to_string(),
                    });
                }
            },
            running @ RunSlot::Running(_) => {
                *slot = running;
                return Err(GuardianError::AlreadyRunning);
            }
            RunSlot::Lost => {
                return Err(GuardianError::SourceUnavailable {
                    reason: "reading source was lost when the driver task failed".to_string(),
                });
            }
        };

        if let Err(e) = parked.feed.check_ready() {
            error!(error = %e, "stream driver refused to start");
            *slot = RunSlot::Parked(parked);
            return Err(e);
        }

        parked.feed.reset();

        let (shutdown, shutdown_rx) = oneshot::channel();
        self.running.store(true, Ordering::Release);
        let task = tokio::spawn(drive(
            Arc::clone(&self.pipeline),
            parked,
            self.interval,
            shutdown_rx,
            RunningFlag(Arc::clone(&self.running)),
        ));
        *slot = RunSlot::Running(RunHandle { shutdown, task });

        info!(
            interval_ms = self.interval.as_millis() as u64,
            source_size = ?self.source_size,
            "stream driver started"
        );
        Ok(())
    }

    /// Transition to `Stopped`.
    ///
    /// Waits for an in-flight tick to finish but not for pending
    /// attestations; those that settle later are applied on the next run.
    /// Stopping a stopped engine is a no-op.
    pub async fn stop(&self) {
        let mut slot = self.slot.lock().await;

        match std::mem::replace(&mut *slot, RunSlot::Lost) {
            RunSlot::Running(handle) => {
                let _ = handle.shutdown.send(());
                match handle.task.await {
                    Ok(parked) => *slot = RunSlot::Parked(parked),
                    Err(e) => error!(error = %e, "stream driver task failed"),
                }
                self.running.store(false, Ordering::Release);
                info!(stats = ?self.pipeline.stats(), "stream driver stopped");
            }
            other => *slot = other,
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.pipeline.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.pipeline.unsubscribe(id)
    }

    /// Audit query: most-recent-first records plus the number held.
    pub fn query(&self, limit: Option<usize>) -> AuditQuery {
        self.pipeline.query(limit)
    }

    pub fn stats(&self) -> CounterSnapshot {
        self.pipeline.stats()
    }

    /// Direct stateless check. Never reads or writes the driver's previous
    /// reading and never touches the audit log or counters.
    pub fn check(&self, window: &[Reading]) -> GuardianResult<Verdict> {
        self.pipeline.check(window)
    }

    /// Whole-session verdict, also stateless.
    pub fn classify_session(&self, session: &[Reading]) -> GuardianResult<Verdict> {
        self.pipeline.classify_session(session)
    }

    pub fn health(&self) -> EngineHealth {
        EngineHealth {
            state: self.state(),
            records_held: self.pipeline.records_held(),
            capacity: self.pipeline.capacity(),
            stats: self.pipeline.stats(),
            subscribers: self.pipeline.subscriber_count(),
            source_len: self.source_size,
        }
    }
}

/// Clears the engine's running flag when the driver task ends, however it ends.
struct RunningFlag(Arc<AtomicBool>);

impl Drop for RunningFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The driver loop. Returns its state when shut down so it can be restarted.
async fn drive(
    pipeline: Arc<Pipeline>,
    mut parked: Parked,
    period: Duration,
    mut shutdown: oneshot::Receiver<()>,
    _running: RunningFlag,
) -> Parked {
    let mut timer = time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            // Fires on an explicit stop and when the engine is dropped.
            _ = &mut shutdown => break,

            Some(outcome) = parked.outcomes.recv() => {
                pipeline.apply(&outcome);
            }

            _ = timer.tick() => {
                parked.feed.tick(&pipeline);
            }
        }
    }

    while let Ok(outcome) = parked.outcomes.try_recv() {
        pipeline.apply(&outcome);
    }

    parked
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use guardian_contracts::{
        config::StreamConfig,
        error::GuardianError,
        stream::DriverState,
        verdict::Verdict,
    };

    use crate::{
        test_support::{
            reading, FailingAttestor, InstantAttestor, MockTrail, PanickingClassifier,
            RecordingClassifier, ScriptedSource,
        },
        traits::{Attestor, AuditTrail},
    };

    use super::Engine;

    /// One immediate tick per run; the next would be an hour away.
    fn slow_stream() -> StreamConfig {
        StreamConfig {
            interval_ms: 3_600_000,
            subscriber_buffer: 16,
        }
    }

    fn engine(
        source: ScriptedSource,
        trail: Arc<MockTrail>,
        attestor: Option<Arc<dyn Attestor>>,
        stream: StreamConfig,
    ) -> Engine {
        Engine::new(
            Box::new(RecordingClassifier::default()),
            trail,
            attestor,
            Box::new(source),
            &stream,
        )
    }

    async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_empty_source_refuses_to_start() {
        let engine = engine(
            ScriptedSource::new(vec![]),
            Arc::new(MockTrail::default()),
            None,
            slow_stream(),
        );

        match engine.start().await {
            Err(GuardianError::SourceUnavailable { .. }) => {}
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
        assert_eq!(engine.state(), DriverState::Stopped);
        assert_eq!(engine.health().records_held, 0);
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let engine = engine(
            ScriptedSource::of(&[reading(1, 230.0, 0.01)]),
            Arc::new(MockTrail::default()),
            None,
            slow_stream(),
        );
        let mut sub = engine.subscribe();

        engine.start().await.unwrap();
        assert_eq!(engine.state(), DriverState::Running);
        assert!(matches!(engine.start().await, Err(GuardianError::AlreadyRunning)));

        let event = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("first tick fires immediately")
            .unwrap();
        assert_eq!(event.stats.total, 1);

        engine.stop().await;
        assert_eq!(engine.state(), DriverState::Stopped);
        engine.stop().await;
        assert_eq!(engine.state(), DriverState::Stopped);

        let health = engine.health();
        assert_eq!(health.records_held, 1);
        assert_eq!(health.subscribers, 1);
        assert_eq!(health.source_len, Some(1));
    }

    #[tokio::test]
    async fn test_restart_resets_previous_reading() {
        let trail = Arc::new(MockTrail::default());
        let engine = engine(
            ScriptedSource::of(&[reading(1, 230.0, 0.5), reading(2, 230.0, 0.1)]),
            Arc::clone(&trail),
            None,
            slow_stream(),
        );
        let mut sub = engine.subscribe();

        engine.start().await.unwrap();
        let first = sub.recv().await.unwrap();
        engine.stop().await;

        engine.start().await.unwrap();
        let second = sub.recv().await.unwrap();
        engine.stop().await;

        assert_eq!(first.verdict, Verdict::Valid);
        assert_eq!(
            second.verdict,
            Verdict::Valid,
            "lower energy after a restart has nothing to compare against"
        );
        assert_eq!(engine.stats().total, 2);
    }

    #[tokio::test]
    async fn test_attestation_marks_record_verified() {
        let trail = Arc::new(MockTrail::default());
        let engine = engine(
            ScriptedSource::of(&[reading(1, 230.0, 0.01)]),
            Arc::clone(&trail),
            Some(Arc::new(InstantAttestor)),
            slow_stream(),
        );
        let mut sub = engine.subscribe();

        engine.start().await.unwrap();
        let event = sub.recv().await.unwrap();
        let record = event.blockchain_record.unwrap();
        assert!(!record.verified, "attestation never blocks emission");

        let verified = wait_until(|| {
            engine
                .query(Some(1))
                .records
                .first()
                .map(|r| r.verified)
                .unwrap_or(false)
        })
        .await;
        engine.stop().await;

        assert!(verified, "attestation outcome must be applied by the driver");
        let stored = &engine.query(None).records[0];
        assert_eq!(stored.verification_id.as_deref(), Some("att-rec-0"));
    }

    #[tokio::test]
    async fn test_failed_attestation_leaves_record_unverified() {
        let trail = Arc::new(MockTrail::default());
        let engine = engine(
            ScriptedSource::of(&[reading(1, 230.0, 0.01), reading(2, 230.0, 0.02)]),
            Arc::clone(&trail),
            Some(Arc::new(FailingAttestor)),
            StreamConfig {
                interval_ms: 10,
                subscriber_buffer: 16,
            },
        );
        let mut sub = engine.subscribe();

        engine.start().await.unwrap();
        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(1), sub.recv())
                .await
                .expect("stream keeps ticking despite attestation failures")
                .unwrap();
        }
        engine.stop().await;

        let query = engine.query(None);
        assert!(query.total >= 3);
        assert!(query.records.iter().all(|r| !r.verified));
        assert_eq!(trail.len(), query.total);
    }

    #[tokio::test]
    async fn test_direct_check_bypasses_driver_state() {
        let trail = Arc::new(MockTrail::default());
        let engine = engine(
            ScriptedSource::of(&[reading(1, 230.0, 0.5)]),
            Arc::clone(&trail),
            None,
            slow_stream(),
        );
        let mut sub = engine.subscribe();

        engine.start().await.unwrap();
        sub.recv().await.unwrap();

        // Lower energy than the driver's previous reading, but checked alone.
        let verdict = engine.check(&[reading(99, 230.0, 0.1)]).unwrap();
        engine.stop().await;

        assert_eq!(verdict, Verdict::Valid);
        assert_eq!(engine.stats().total, 1, "direct checks are never counted");
        assert_eq!(trail.len(), 1);
    }

    #[tokio::test]
    async fn test_dead_driver_reports_stopped() {
        let engine = Engine::new(
            Box::new(PanickingClassifier),
            Arc::new(MockTrail::default()),
            None,
            Box::new(ScriptedSource::of(&[reading(1, 230.0, 0.01)])),
            &slow_stream(),
        );

        engine.start().await.unwrap();
        assert!(
            wait_until(|| engine.state() == DriverState::Stopped).await,
            "a panicked driver must not keep reporting Running"
        );
        assert_eq!(engine.health().state, DriverState::Stopped);

        match engine.start().await {
            Err(GuardianError::SourceUnavailable { .. }) => {}
            other => panic!("expected SourceUnavailable after driver loss, got {:?}", other),
        }
        assert_eq!(engine.state(), DriverState::Stopped);
        engine.stop().await;
    }
}
