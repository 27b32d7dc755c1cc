//! Reading sources for the stream driver.
//!
//! - `ReplaySource` loops over a bounded dataset, wrapping to the first row
//!   when it runs out.
//! - `SyntheticSource` generates an endless charging session with optional
//!   injected anomalies.

use std::path::Path;

use chrono::Utc;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::Value;
use tracing::{debug, info};

use guardian_contracts::{
    error::{GuardianError, GuardianResult},
    reading::Reading,
};
use guardian_core::traits::ReadingSource;

// ── Replay ────────────────────────────────────────────────────────────────────

/// A looping replay of dataset rows.
///
/// Rows are kept as raw JSON so a malformed row only skips its own tick.
/// Rows without a `timestamp` are stamped with wall-clock milliseconds when
/// they are served.
///
/// A change of `session_id` between consecutive served rows is reported as a
/// session break. Rows without one share a single session, so a wrap inside
/// one session still compares across the wrap.
pub struct ReplaySource {
    rows: Vec<Value>,
    cursor: usize,
    last_session: Option<Value>,
    session_break: bool,
}

impl ReplaySource {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            cursor: 0,
            last_session: None,
            session_break: false,
        }
    }

    pub fn from_readings(readings: &[Reading]) -> Self {
        let rows = readings
            .iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect();
        Self::new(rows)
    }

    /// Load a dataset file: a JSON array of rows, or one JSON row per line.
    pub fn from_file(path: &Path) -> GuardianResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GuardianError::SourceUnavailable {
            reason: format!("failed to read dataset '{}': {}", path.display(), e),
        })?;
        let rows = parse_dataset(&text)?;
        info!(path = %path.display(), rows = rows.len(), "dataset loaded");
        Ok(Self::new(rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ReadingSource for ReplaySource {
    fn next_reading(&mut self) -> GuardianResult<Reading> {
        let Some(row) = self.rows.get(self.cursor) else {
            return Err(GuardianError::SourceUnavailable {
                reason: "replay dataset is empty".to_string(),
            });
        };
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.rows.len();
        if self.cursor == 0 {
            debug!(rows = self.rows.len(), "replay dataset wrapped");
        }

        let session = row.get("session_id").cloned().unwrap_or(Value::Null);
        if self.last_session.as_ref() != Some(&session) {
            if self.last_session.is_some() {
                debug!(row = index, session = %session, "replay session changed");
                self.session_break = true;
            }
            self.last_session = Some(session);
        }

        Reading::from_value(row, Utc::now().timestamp_millis()).map_err(|e| match e {
            GuardianError::MalformedReading { reason } => GuardianError::MalformedReading {
                reason: format!("row {}: {}", index, reason),
            },
            other => other,
        })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.rows.len())
    }

    /// Ready when at least one row parses as a reading.
    fn check_ready(&self) -> GuardianResult<()> {
        let mut first_error = None;
        for row in &self.rows {
            match Reading::from_value(row, 0) {
                Ok(_) => return Ok(()),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        let reason = match first_error {
            Some(e) => format!("no usable row in replay dataset ({})", e),
            None => "replay dataset is empty".to_string(),
        };
        Err(GuardianError::SourceUnavailable { reason })
    }

    fn take_session_break(&mut self) -> bool {
        std::mem::take(&mut self.session_break)
    }
}

/// Parse dataset text as a JSON array, or as JSON lines if it is not one.
pub fn parse_dataset(text: &str) -> GuardianResult<Vec<Value>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| GuardianError::SourceUnavailable {
            reason: format!("dataset is not a valid JSON array: {}", e),
        });
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| GuardianError::SourceUnavailable {
                reason: format!("dataset line {} is not valid JSON: {}", n + 1, e),
            })
        })
        .collect()
}

// ── Synthetic ─────────────────────────────────────────────────────────────────

const NOMINAL_VOLTAGE: f64 = 230.0;
const NOMINAL_CURRENT: f64 = 10.0;
const ENERGY_DROP_KWH: f64 = 0.02;

/// Fault injected into a single synthetic reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    VoltageSpike,
    VoltageDip,
    CurrentSpike,
    EnergyDrop,
}

impl Anomaly {
    const ALL: [Anomaly; 4] = [
        Anomaly::VoltageSpike,
        Anomaly::VoltageDip,
        Anomaly::CurrentSpike,
        Anomaly::EnergyDrop,
    ];
}

/// An endless simulated charging session.
///
/// Voltage and current jitter around a per-session baseline near
/// 230 V / 10 A. Energy accumulates from power over `tick_secs`. With
/// probability `fraud_ratio` a reading carries one `Anomaly`; an energy drop
/// subtracts 0.02 kWh (floored at zero) instead of accumulating.
pub struct SyntheticSource {
    rng: StdRng,
    base_voltage: f64,
    base_current: f64,
    energy_kwh: f64,
    tick_secs: f64,
    fraud_ratio: f64,
}

impl SyntheticSource {
    pub fn new(fraud_ratio: f64, tick_secs: f64) -> Self {
        Self::with_rng(StdRng::from_entropy(), fraud_ratio, tick_secs)
    }

    /// Deterministic generator for tests and reproducible demos.
    pub fn seeded(seed: u64, fraud_ratio: f64, tick_secs: f64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), fraud_ratio, tick_secs)
    }

    fn with_rng(mut rng: StdRng, fraud_ratio: f64, tick_secs: f64) -> Self {
        let base_voltage = NOMINAL_VOLTAGE + rng.gen_range(-3.0..=3.0);
        let base_current = NOMINAL_CURRENT + rng.gen_range(-1.0..=1.0);
        Self {
            rng,
            base_voltage,
            base_current,
            energy_kwh: 0.0,
            tick_secs: tick_secs.max(0.0),
            fraud_ratio: if fraud_ratio.is_finite() {
                fraud_ratio.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    pub fn fraud_ratio(&self) -> f64 {
        self.fraud_ratio
    }

    fn pick_anomaly(&mut self) -> Option<Anomaly> {
        if self.fraud_ratio > 0.0 && self.rng.gen_bool(self.fraud_ratio) {
            Some(Anomaly::ALL[self.rng.gen_range(0..Anomaly::ALL.len())])
        } else {
            None
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl ReadingSource for SyntheticSource {
    fn next_reading(&mut self) -> GuardianResult<Reading> {
        let mut voltage = round1(self.base_voltage + self.rng.gen_range(-1.0..=1.0));
        let mut current = round1(self.base_current + self.rng.gen_range(-0.5..=0.5));

        let anomaly = self.pick_anomaly();
        match anomaly {
            Some(Anomaly::VoltageSpike) => voltage = round1(self.rng.gen_range(265.0..=290.0)),
            Some(Anomaly::VoltageDip) => voltage = round1(self.rng.gen_range(150.0..=190.0)),
            Some(Anomaly::CurrentSpike) => current = round1(self.rng.gen_range(55.0..=80.0)),
            Some(Anomaly::EnergyDrop) => {
                self.energy_kwh = (self.energy_kwh - ENERGY_DROP_KWH).max(0.0);
            }
            None => {}
        }

        if anomaly != Some(Anomaly::EnergyDrop) {
            let power_kw = voltage * current / 1000.0;
            self.energy_kwh += power_kw * self.tick_secs / 3600.0;
        }

        if let Some(anomaly) = anomaly {
            debug!(?anomaly, voltage, current, energy_kwh = self.energy_kwh, "anomaly injected");
        }

        Ok(Reading::new(
            Utc::now().timestamp_millis(),
            voltage,
            current,
            self.energy_kwh,
        ))
    }

    fn size_hint(&self) -> Option<usize> {
        None
    }

    fn check_ready(&self) -> GuardianResult<()> {
        Ok(())
    }
}
