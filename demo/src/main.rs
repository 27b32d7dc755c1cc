//! EV Charging Guardian demo CLI
//!
//! Streams charging telemetry through the guardian engine, or runs the
//! classifier directly against readings on disk.
//!
//! Usage:
//!   cargo run -p demo -- stream --ticks 20
//!   cargo run -p demo -- stream --ticks 50 --source synthetic --fraud-ratio 0.2
//!   cargo run -p demo -- stream --dataset data/session.jsonl --config guardian.toml
//!   cargo run -p demo -- check --file reading.json
//!   cargo run -p demo -- session --file session.json
//!   cargo run -p demo -- scenario

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use guardian_audit::BoundedAuditLog;
use guardian_contracts::{
    config::GuardianConfig,
    error::{GuardianError, GuardianResult},
    reading::Reading,
    verdict::Verdict,
};
use guardian_core::{
    traits::{Attestor, Classifier, ReadingSource},
    Engine,
};
use guardian_ref_charging::{
    attestor_from_config,
    mock_data::alternating_session,
    scenarios::{alternating_stream, replay_wrap},
    MockAttestor, ReplaySource, SyntheticSource,
};
use guardian_rules::ThresholdClassifier;

// ── CLI definition ────────────────────────────────────────────────────────────

/// EV charging guardian: streaming fraud classification with an audit trail.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "EV charging guardian demo",
    long_about = "Classifies EV charging telemetry as VALID or FRAUD, records every\n\
                  verdict in a bounded hash-linked audit log, and streams the results."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the stream driver and print each event as one JSON line.
    Stream {
        /// Number of events to print before stopping.
        #[arg(long, default_value_t = 10)]
        ticks: usize,
        #[arg(long, value_enum, default_value_t = SourceKind::Replay)]
        source: SourceKind,
        /// JSON array or JSON-lines dataset for the replay source.
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// Guardian TOML configuration.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Share of synthetic readings that carry an anomaly.
        #[arg(long, default_value_t = 0.2)]
        fraud_ratio: f64,
        /// Override `[stream] interval_ms`.
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Classify the last reading of a file, using the one before it as previous.
    Check {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Classify a whole session file: first FRAUD found, or VALID.
    Session {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the built-in reference scenarios.
    Scenario,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    Replay,
    Synthetic,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Stream {
            ticks,
            source,
            dataset,
            config,
            fraud_ratio,
            interval_ms,
        } => {
            run_stream(
                ticks,
                source,
                dataset.as_deref(),
                config.as_deref(),
                fraud_ratio,
                interval_ms,
            )
            .await
        }
        Command::Check { file, config } => run_check(&file, config.as_deref()),
        Command::Session { file, config } => run_session(&file, config.as_deref()),
        Command::Scenario => run_scenarios().await,
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> GuardianResult<GuardianConfig> {
    match path {
        Some(path) => GuardianConfig::from_file(path),
        None => Ok(GuardianConfig::default()),
    }
}

async fn run_stream(
    ticks: usize,
    kind: SourceKind,
    dataset: Option<&Path>,
    config_path: Option<&Path>,
    fraud_ratio: f64,
    interval_ms: Option<u64>,
) -> GuardianResult<()> {
    let mut config = load_config(config_path)?;
    if let Some(interval_ms) = interval_ms {
        config.stream.interval_ms = interval_ms;
        config.validate()?;
    }

    let source: Box<dyn ReadingSource> = match kind {
        SourceKind::Replay => match dataset {
            Some(path) => Box::new(ReplaySource::from_file(path)?),
            None => Box::new(ReplaySource::from_readings(&alternating_session())),
        },
        SourceKind::Synthetic => Box::new(SyntheticSource::new(
            fraud_ratio,
            config.stream.interval_ms as f64 / 1000.0,
        )),
    };

    let audit = Arc::new(BoundedAuditLog::from_config(&config.audit));
    let engine = Engine::new(
        Box::new(ThresholdClassifier::from_config(&config)),
        audit.clone(),
        attestor_from_config(&config.attestation)?,
        source,
        &config.stream,
    );

    let mut events = engine.subscribe();
    engine.start().await?;
    info!(ticks, "streaming");

    for _ in 0..ticks {
        let Some(event) = events.recv().await else {
            break;
        };
        let line = serde_json::to_string(&event).map_err(|e| GuardianError::SerializationFailed {
            reason: format!("failed to encode event: {}", e),
        })?;
        println!("{}", line);
    }

    engine.stop().await;

    let health = engine.health();
    eprintln!();
    eprintln!(
        "Audit: {} of {} record(s) held, chain {}",
        health.records_held,
        health.capacity,
        if audit.verify_integrity() { "VERIFIED" } else { "FAILED" }
    );
    eprintln!(
        "Counters: total={} valid={} fraud={}",
        health.stats.total, health.stats.valid, health.stats.fraud
    );
    Ok(())
}

/// Read a reading file: one JSON object, or an array of them.
fn read_readings(path: &Path) -> GuardianResult<Vec<Reading>> {
    let text = std::fs::read_to_string(path).map_err(|e| GuardianError::SourceUnavailable {
        reason: format!("failed to read '{}': {}", path.display(), e),
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|e| GuardianError::MalformedReading {
        reason: format!("'{}' is not valid JSON: {}", path.display(), e),
    })?;

    let now = Utc::now().timestamp_millis();
    match value {
        Value::Array(rows) => rows.iter().map(|row| Reading::from_value(row, now)).collect(),
        row => Ok(vec![Reading::from_value(&row, now)?]),
    }
}

fn print_verdict(verdict: &Verdict) -> GuardianResult<()> {
    let json = serde_json::to_string_pretty(verdict).map_err(|e| GuardianError::SerializationFailed {
        reason: format!("failed to encode verdict: {}", e),
    })?;
    println!("{}", json);
    Ok(())
}

fn run_check(file: &Path, config_path: Option<&Path>) -> GuardianResult<()> {
    let config = load_config(config_path)?;
    let classifier = ThresholdClassifier::from_config(&config);
    let window = read_readings(file)?;
    print_verdict(&classifier.check_window(&window)?)
}

fn run_session(file: &Path, config_path: Option<&Path>) -> GuardianResult<()> {
    let config = load_config(config_path)?;
    let classifier = ThresholdClassifier::from_config(&config);
    let session = read_readings(file)?;
    print_verdict(&classifier.classify_session(&session)?)
}

async fn run_scenarios() -> GuardianResult<()> {
    print_banner();
    let attestor: Arc<dyn Attestor> = Arc::new(MockAttestor::new(Duration::from_millis(20)));
    alternating_stream::run_scenario(Some(attestor)).await?;
    replay_wrap::run_scenario()?;
    println!("All scenarios completed successfully.");
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("EV Charging Guardian");
    println!("Reference Scenarios");
    println!("====================");
    println!();
    println!("Per-reading pipeline:");
    println!("  [1] Classifier checks voltage, current, then energy against the previous reading");
    println!("  [2] Verdict appended to the bounded, SHA-256 linked audit log");
    println!("  [3] Counters updated; event published to every subscriber");
    println!("  [4] Attestation requested in the background; applied when it settles");
    println!();
}
