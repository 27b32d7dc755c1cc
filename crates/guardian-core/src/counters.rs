//! Running verdict totals.

use guardian_contracts::{stream::CounterSnapshot, verdict::Status};

/// Aggregate counters over every record ever appended.
///
/// Eviction from the audit log never decrements these.
#[derive(Debug, Default)]
pub struct Counters {
    total: u64,
    valid: u64,
    fraud: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one verdict and return the resulting totals.
    pub fn record(&mut self, status: Status) -> CounterSnapshot {
        self.total += 1;
        match status {
            Status::Valid => self.valid += 1,
            Status::Fraud => self.fraud += 1,
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total: self.total,
            valid: self.valid,
            fraud: self.fraud,
        }
    }
}
