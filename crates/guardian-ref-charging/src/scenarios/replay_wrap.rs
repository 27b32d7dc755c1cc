//! Scenario 2: Replay wrap-around
//!
//! Loops a three-row dataset for four ticks. The fourth tick replays the
//! first row, and the classifier compares it with the third row (its true
//! predecessor), so the energy drop from 0.03 to 0.01 kWh is flagged.

use std::sync::Arc;

use guardian_audit::BoundedAuditLog;
use guardian_contracts::error::GuardianResult;
use guardian_core::{Feed, Pipeline};
use guardian_rules::ThresholdClassifier;

use crate::{
    mock_data::looping_rows,
    scenarios::{print_summary, run_ticks, ScenarioReport},
    sources::ReplaySource,
};

const TICKS: usize = 4;

pub fn run_scenario() -> GuardianResult<ScenarioReport> {
    println!("=== Scenario 2: Replay wrap-around ===");
    println!();

    let log = Arc::new(BoundedAuditLog::default());
    let (pipeline, _outcomes) =
        Pipeline::new(Box::new(ThresholdClassifier::default()), log.clone(), None, 4);

    let source = ReplaySource::new(looping_rows());
    println!("  Dataset rows: {}, ticks: {}", source.len(), TICKS);
    let mut feed = Feed::new(Box::new(source));
    feed.check_ready()?;

    let events = run_ticks(&mut feed, &pipeline, TICKS);

    let mut records = pipeline.query(None).records;
    records.reverse();

    let report = ScenarioReport {
        events,
        stats: pipeline.stats(),
        records,
        integrity: log.verify_integrity(),
        attested: 0,
    };

    print_summary(&report);
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(report)
}
