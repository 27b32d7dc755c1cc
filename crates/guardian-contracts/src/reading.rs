//! Electrical readings produced by a charging session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GuardianError, GuardianResult};

/// One timestamped sample from a charger.
///
/// `cumulative_energy` is in kWh and never decreases under normal operation.
/// The dataset exports of the charging simulator name it `energy_kwh`, which
/// is accepted as an alias on input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Producer-defined clock value (the reference sources use Unix millis).
    pub timestamp: i64,
    /// Volts.
    pub voltage: f64,
    /// Amps.
    pub current: f64,
    /// Kilowatt-hours delivered so far in the session.
    #[serde(alias = "energy_kwh")]
    pub cumulative_energy: f64,
}

impl Reading {
    pub fn new(timestamp: i64, voltage: f64, current: f64, cumulative_energy: f64) -> Self {
        Self {
            timestamp,
            voltage,
            current,
            cumulative_energy,
        }
    }

    /// Parse a loosely-typed source row into a `Reading`.
    ///
    /// `voltage`, `current` and the energy field (`cumulativeEnergy` or
    /// `energy_kwh`) must be present and numeric. A missing or non-integer
    /// `timestamp` is replaced by `fallback_timestamp`.
    pub fn from_value(row: &Value, fallback_timestamp: i64) -> GuardianResult<Self> {
        let object = row.as_object().ok_or_else(|| GuardianError::MalformedReading {
            reason: format!("expected an object, got {}", row),
        })?;

        let number = |names: &[&str]| -> GuardianResult<f64> {
            let value = names
                .iter()
                .find_map(|name| object.get(*name))
                .ok_or_else(|| GuardianError::MalformedReading {
                    reason: format!("missing field '{}'", names[0]),
                })?;
            value.as_f64().ok_or_else(|| GuardianError::MalformedReading {
                reason: format!("field '{}' is not numeric: {}", names[0], value),
            })
        };

        let voltage = number(&["voltage"])?;
        let current = number(&["current"])?;
        let cumulative_energy = number(&["cumulativeEnergy", "energy_kwh"])?;
        let timestamp = object
            .get("timestamp")
            .and_then(Value::as_i64)
            .unwrap_or(fallback_timestamp);

        Ok(Self::new(timestamp, voltage, current, cumulative_energy))
    }
}
