//! Hardcoded charging sessions for the reference scenarios.
//!
//! Every reading is fictional. The expected verdicts below assume the
//! default thresholds (200-260 V, 0-50 A).

use serde_json::{json, Value};

use guardian_contracts::reading::Reading;

/// Base clock for the fixtures, in Unix milliseconds.
pub const SESSION_START_MS: i64 = 1_700_000_000_000;

/// Five readings that classify VALID, FRAUD, VALID, FRAUD, VALID in order.
///
/// - #2 breaches the voltage ceiling (265 V).
/// - #4 reports less energy than #3 (0.0300 -> 0.0250 kWh).
pub fn alternating_session() -> Vec<Reading> {
    vec![
        Reading::new(SESSION_START_MS, 230.0, 10.0, 0.01),
        Reading::new(SESSION_START_MS + 1_000, 265.0, 10.0, 0.02),
        Reading::new(SESSION_START_MS + 2_000, 230.0, 10.0, 0.03),
        Reading::new(SESSION_START_MS + 3_000, 230.0, 10.0, 0.025),
        Reading::new(SESSION_START_MS + 4_000, 230.0, 10.0, 0.04),
    ]
}

/// Three rows in the simulator's export format (`energy_kwh`, no timestamp).
///
/// Energy rises within one pass, so looping them makes the first row after
/// the wrap a drop from 0.03 to 0.01 kWh.
pub fn looping_rows() -> Vec<Value> {
    vec![
        json!({ "voltage": 229.8, "current": 10.1, "energy_kwh": 0.01 }),
        json!({ "voltage": 230.4, "current": 9.9, "energy_kwh": 0.02 }),
        json!({ "voltage": 230.1, "current": 10.0, "energy_kwh": 0.03 }),
    ]
}
