//! # guardian-ref-charging
//!
//! EV charging reference runtime for the guardian pipeline.
//!
//! Provides the collaborators the core leaves abstract:
//!
//! 1. **Reading sources**: a looping replay of charging datasets (JSON
//!    array or JSON lines, simulator `energy_kwh` exports accepted) and a
//!    synthetic session generator with injected anomalies.
//! 2. **Attestors**: a mock that fabricates verification ids and an HTTP
//!    client for a real attestation service.
//! 3. **Scenarios**: end-to-end runs over hardcoded sessions.
//!
//! All fixture data is fictional.

pub mod attestor;
pub mod mock_data;
pub mod scenarios;
pub mod sources;

pub use attestor::{attestor_from_config, HttpAttestor, MockAttestor};

/// Reference configuration shipped with the crate.
pub const REFERENCE_CONFIG: &str = include_str!("../config/guardian.toml");
pub use sources::{parse_dataset, Anomaly, ReplaySource, SyntheticSource};
