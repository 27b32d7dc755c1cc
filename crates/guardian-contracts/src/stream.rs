//! Events emitted by the stream driver and engine status types.

use serde::{Deserialize, Serialize};

use crate::{audit::AuditRecord, reading::Reading, verdict::Verdict};

/// Running totals at the moment an event was emitted.
///
/// `total == valid + fraud` holds for every snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub total: u64,
    pub valid: u64,
    pub fraud: u64,
}

/// The unit delivered to subscribers.
///
/// Serialized flat: the reading fields and the verdict fields sit at the top
/// level next to `blockchainRecord` and `stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    #[serde(flatten)]
    pub reading: Reading,

    #[serde(flatten)]
    pub verdict: Verdict,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_record: Option<AuditRecord>,

    pub stats: CounterSnapshot,
}

/// Lifecycle state of the stream driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverState {
    Stopped,
    Running,
}

/// Point-in-time view of an engine, for health endpoints and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineHealth {
    pub state: DriverState,
    pub records_held: usize,
    pub capacity: usize,
    pub stats: CounterSnapshot,
    pub subscribers: usize,
    /// Rows in a bounded replay source; `None` for unbounded generators.
    pub source_len: Option<usize>,
}
