//! Scenario 1: Alternating stream
//!
//! Streams five readings that alternate VALID and FRAUD through the full
//! per-tick pipeline:
//!   1. Threshold classifier evaluates each reading against the previous one
//!   2. Every verdict is appended to the bounded, hash-linked audit log
//!   3. Counters are updated and the event is published
//!   4. Optional attestations settle and are applied back to the log
//!   5. Audit chain integrity is verified at the end

use std::sync::Arc;

use guardian_audit::BoundedAuditLog;
use guardian_contracts::error::GuardianResult;
use guardian_core::{traits::Attestor, Feed, Pipeline};
use guardian_rules::ThresholdClassifier;

use crate::{
    mock_data::alternating_session,
    scenarios::{print_summary, run_ticks, settle_attestations, ScenarioReport},
    sources::ReplaySource,
};

const SUBSCRIBER_BUFFER: usize = 16;

/// Run Scenario 1. Pass an attestor to see records marked verified.
pub async fn run_scenario(attestor: Option<Arc<dyn Attestor>>) -> GuardianResult<ScenarioReport> {
    println!("=== Scenario 1: Alternating VALID / FRAUD stream ===");
    println!();

    let session = alternating_session();
    let log = Arc::new(BoundedAuditLog::default());
    let attesting = attestor.is_some();
    let (pipeline, mut outcomes) = Pipeline::new(
        Box::new(ThresholdClassifier::default()),
        log.clone(),
        attestor,
        SUBSCRIBER_BUFFER,
    );

    let mut feed = Feed::new(Box::new(ReplaySource::from_readings(&session)));
    feed.check_ready()?;

    let events = run_ticks(&mut feed, &pipeline, session.len());

    let attested = if attesting {
        settle_attestations(&pipeline, &mut outcomes, events.len()).await
    } else {
        0
    };

    let mut records = pipeline.query(None).records;
    records.reverse();

    let report = ScenarioReport {
        events,
        stats: pipeline.stats(),
        records,
        integrity: log.verify_integrity(),
        attested,
    };

    print_summary(&report);
    println!("  Attestations applied:   {}", report.attested);
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(report)
}
