//! The fraud rules and the order they are evaluated in.
//!
//! Context-free threshold rules come first; the energy rule is last because
//! it is the only one that needs the previous reading. The first rule that
//! fires decides the verdict.

use guardian_contracts::{config::Thresholds, reading::Reading};

/// One fraud rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    VoltageLow,
    VoltageHigh,
    CurrentNegative,
    CurrentHigh,
    EnergyDecreased,
}

impl Rule {
    /// Evaluation order. First match wins.
    pub const ORDER: [Rule; 5] = [
        Rule::VoltageLow,
        Rule::VoltageHigh,
        Rule::CurrentNegative,
        Rule::CurrentHigh,
        Rule::EnergyDecreased,
    ];

    /// Stable identifier for logs.
    pub fn id(&self) -> &'static str {
        match self {
            Rule::VoltageLow => "voltage-low",
            Rule::VoltageHigh => "voltage-high",
            Rule::CurrentNegative => "current-negative",
            Rule::CurrentHigh => "current-high",
            Rule::EnergyDecreased => "energy-decreased",
        }
    }

    /// Return the fraud reason if this rule fires for `reading`.
    ///
    /// Comparisons are strict, so a value exactly on a limit passes, and NaN
    /// never fires a rule. Volts and amps are printed with one decimal,
    /// energy with four.
    pub fn check(
        &self,
        limits: &Thresholds,
        reading: &Reading,
        previous: Option<&Reading>,
    ) -> Option<String> {
        match self {
            Rule::VoltageLow => (reading.voltage < limits.min_voltage)
                .then(|| format!("Voltage too low: {:.1}V", reading.voltage)),
            Rule::VoltageHigh => (reading.voltage > limits.max_voltage)
                .then(|| format!("Voltage too high: {:.1}V", reading.voltage)),
            Rule::CurrentNegative => (reading.current < limits.min_current)
                .then(|| format!("Current negative: {:.1}A", reading.current)),
            Rule::CurrentHigh => (reading.current > limits.max_current)
                .then(|| format!("Current too high: {:.1}A", reading.current)),
            Rule::EnergyDecreased => previous
                .filter(|prev| reading.cumulative_energy < prev.cumulative_energy)
                .map(|prev| {
                    format!(
                        "Energy decreased: {:.4} -> {:.4}",
                        prev.cumulative_energy, reading.cumulative_energy
                    )
                }),
        }
    }
}
