//! # guardian-rules
//!
//! Threshold rules for EV charging telemetry.
//!
//! ## Rule order
//!
//! 1. voltage below `min_voltage`  → "Voltage too low: {v}V"
//! 2. voltage above `max_voltage`  → "Voltage too high: {v}V"
//! 3. current below `min_current`  → "Current negative: {a}A"
//! 4. current above `max_current`  → "Current too high: {a}A"
//! 5. cumulative energy below the previous reading's → "Energy decreased: {prev} -> {curr}"
//!
//! The first rule that fires wins. Rule 5 only runs when a previous reading
//! is supplied, so the first reading of any sequence can only trip 1–4.

pub mod engine;
pub mod rule;

pub use engine::ThresholdClassifier;
pub use rule::Rule;
