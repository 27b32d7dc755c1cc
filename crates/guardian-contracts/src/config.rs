//! Runtime configuration, loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid configuration
//! that reproduces the stock thresholds and a 1000-record audit log.
//!
//! ```toml
//! [thresholds]
//! min_voltage = 200.0
//! max_voltage = 260.0
//!
//! [stream]
//! interval_ms = 500
//!
//! [attestation]
//! endpoint = "http://localhost:8080/attest"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GuardianError, GuardianResult};

/// Records retained by the audit log before oldest-first eviction.
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianConfig {
    pub thresholds: Thresholds,
    pub audit: AuditConfig,
    pub stream: StreamConfig,
    pub attestation: AttestationConfig,
}

/// Electrical safety limits used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_voltage: f64,
    pub max_voltage: f64,
    pub min_current: f64,
    pub max_current: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_voltage: 200.0,
            max_voltage: 260.0,
            min_current: 0.0,
            max_current: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Maximum records held; older ones are evicted first.
    pub capacity: usize,
    /// Block height assigned to the first record ever appended.
    pub genesis_block: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_AUDIT_CAPACITY,
            genesis_block: 18_500_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Tick period of the stream driver.
    pub interval_ms: u64,
    /// Per-subscriber event buffer; events beyond it are dropped for that subscriber.
    pub subscriber_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            subscriber_buffer: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationConfig {
    pub enabled: bool,
    /// HTTP endpoint of the attestation service. Without one, a mock is used.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Artificial latency of the mock attestor.
    pub mock_latency_ms: u64,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            api_key: None,
            mock_latency_ms: 250,
        }
    }
}

impl GuardianConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `GuardianError::ConfigError` if the TOML is malformed or a
    /// value is out of range.
    pub fn from_toml_str(s: &str) -> GuardianResult<Self> {
        let config: GuardianConfig = toml::from_str(s).map_err(|e| GuardianError::ConfigError {
            reason: format!("failed to parse guardian TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it with `from_toml_str`.
    pub fn from_file(path: &Path) -> GuardianResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GuardianError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> GuardianResult<()> {
        let t = &self.thresholds;
        if t.min_voltage > t.max_voltage {
            return Err(config_error(format!(
                "min_voltage {} exceeds max_voltage {}",
                t.min_voltage, t.max_voltage
            )));
        }
        if t.min_current > t.max_current {
            return Err(config_error(format!(
                "min_current {} exceeds max_current {}",
                t.min_current, t.max_current
            )));
        }
        if self.audit.capacity == 0 {
            return Err(config_error("audit capacity must be at least 1"));
        }
        if self.stream.interval_ms == 0 {
            return Err(config_error("stream interval_ms must be positive"));
        }
        if self.stream.subscriber_buffer == 0 {
            return Err(config_error("subscriber_buffer must be at least 1"));
        }
        Ok(())
    }
}

fn config_error(reason: impl Into<String>) -> GuardianError {
    GuardianError::ConfigError {
        reason: reason.into(),
    }
}
