//! Error types for the guardian classification and audit pipeline.
//!
//! Nothing in the streaming path escalates these past a tick boundary; they
//! are logged by the driver and the tick is skipped. Callers of the direct
//! check and of engine lifecycle methods receive them as values.

use thiserror::Error;

/// The unified error type for the guardian crates.
#[derive(Debug, Error)]
pub enum GuardianError {
    /// The reading source is empty or misconfigured, so the driver cannot run.
    #[error("reading source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    /// A source row is missing a field or carries a non-numeric value.
    #[error("malformed reading: {reason}")]
    MalformedReading { reason: String },

    /// A direct check or session verdict was requested with no readings.
    #[error("no readings provided")]
    EmptyWindow,

    /// The audit log could not record a verdict.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// The external attestation collaborator failed or returned garbage.
    #[error("attestation failed: {reason}")]
    AttestationFailed { reason: String },

    /// A configuration value is missing, unreadable, or out of range.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A value could not be encoded for output.
    #[error("serialization failed: {reason}")]
    SerializationFailed { reason: String },

    /// `start` was called on an engine that is already running.
    #[error("stream driver is already running")]
    AlreadyRunning,
}

/// Convenience alias used throughout the guardian crates.
pub type GuardianResult<T> = Result<T, GuardianError>;
