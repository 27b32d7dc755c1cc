//! EV charging reference scenarios.
//!
//! Each scenario wires real guardian components (threshold classifier,
//! bounded audit log, pipeline, replay feed) to fixture data and prints what
//! happens tick by tick.

pub mod alternating_stream;
pub mod replay_wrap;

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use guardian_contracts::{
    audit::{AttestationOutcome, AuditRecord},
    stream::{CounterSnapshot, StreamEvent},
};
use guardian_core::{Feed, Pipeline};

/// How long a scenario waits for each attestation to settle.
const ATTESTATION_WAIT: Duration = Duration::from_secs(5);

/// What a scenario run produced.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Emitted events, in tick order.
    pub events: Vec<StreamEvent>,
    pub stats: CounterSnapshot,
    /// Retained audit records, oldest first.
    pub records: Vec<AuditRecord>,
    /// Result of the hash-chain check after the run.
    pub integrity: bool,
    /// Attestation outcomes applied to the log.
    pub attested: usize,
}

/// Run `ticks` ticks of `feed` through `pipeline`, printing each event.
pub(crate) fn run_ticks(feed: &mut Feed, pipeline: &Pipeline, ticks: usize) -> Vec<StreamEvent> {
    let mut events = Vec::with_capacity(ticks);
    for tick in 1..=ticks {
        match feed.tick(pipeline) {
            Some(event) => {
                print_event(tick, &event);
                events.push(event);
            }
            None => println!("  Tick {}: skipped", tick),
        }
    }
    events
}

fn print_event(tick: usize, event: &StreamEvent) {
    let r = &event.reading;
    println!(
        "  Tick {}: {:>6.1}V {:>5.1}A {:>8.4}kWh  {}{}",
        tick,
        r.voltage,
        r.current,
        r.cumulative_energy,
        event.verdict.status(),
        event
            .verdict
            .reason()
            .map(|reason| format!("  ({})", reason))
            .unwrap_or_default()
    );
}

/// Wait for up to `expected` attestation outcomes and apply them.
pub(crate) async fn settle_attestations(
    pipeline: &Pipeline,
    outcomes: &mut mpsc::UnboundedReceiver<AttestationOutcome>,
    expected: usize,
) -> usize {
    let mut applied = 0;
    for _ in 0..expected {
        match tokio::time::timeout(ATTESTATION_WAIT, outcomes.recv()).await {
            Ok(Some(outcome)) => {
                if pipeline.apply(&outcome) {
                    applied += 1;
                }
            }
            Ok(None) => break,
            Err(_) => {
                warn!(applied, expected, "timed out waiting for attestations");
                break;
            }
        }
    }
    applied
}

/// Print the counters and the audit trail summary shared by every scenario.
pub(crate) fn print_summary(report: &ScenarioReport) {
    println!();
    println!(
        "  Counters:               total={} valid={} fraud={}",
        report.stats.total, report.stats.valid, report.stats.fraud
    );
    println!("  Audit records held:     {}", report.records.len());
    for record in &report.records {
        println!(
            "    #{} {} {:<5} verified={}",
            record.block_number,
            &record.transaction_hash[..18.min(record.transaction_hash.len())],
            record.status(),
            record.verified
        );
    }
    println!(
        "  Audit chain integrity:  {}",
        if report.integrity { "VERIFIED" } else { "FAILED" }
    );
}
