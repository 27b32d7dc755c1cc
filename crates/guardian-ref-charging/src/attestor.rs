//! Attestation collaborators for audit records.
//!
//! `MockAttestor` fabricates a verification id after a configurable delay.
//! `HttpAttestor` POSTs the record to an attestation service and expects
//! `{"verified": bool, "verificationId": "..."}` back.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use guardian_contracts::{
    audit::{Attestation, AuditRecord},
    config::AttestationConfig,
    error::{GuardianError, GuardianResult},
};
use guardian_core::traits::Attestor;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the attestor described by `config`, or `None` when disabled.
///
/// An endpoint selects `HttpAttestor`; otherwise the mock is used.
pub fn attestor_from_config(config: &AttestationConfig) -> GuardianResult<Option<Arc<dyn Attestor>>> {
    if !config.enabled {
        return Ok(None);
    }
    let attestor: Arc<dyn Attestor> = match &config.endpoint {
        Some(endpoint) => Arc::new(HttpAttestor::new(endpoint.clone(), config.api_key.clone())?),
        None => Arc::new(MockAttestor::new(Duration::from_millis(config.mock_latency_ms))),
    };
    Ok(Some(attestor))
}

// ── Mock ──────────────────────────────────────────────────────────────────────

/// Always verifies, after `latency`.
#[derive(Debug, Default)]
pub struct MockAttestor {
    latency: Duration,
    issued: AtomicU64,
}

impl MockAttestor {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            issued: AtomicU64::new(0),
        }
    }

    /// Number of attestations handed out so far.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Attestor for MockAttestor {
    async fn attest(&self, record: &AuditRecord) -> GuardianResult<Attestation> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        let short_hash = record.transaction_hash.get(2..10).unwrap_or_default();
        Ok(Attestation::verified(format!("mock-{:06}-{}", n, short_hash)))
    }
}

// ── HTTP ──────────────────────────────────────────────────────────────────────

/// Attestor backed by an HTTP service.
pub struct HttpAttestor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAttestor {
    pub fn new(endpoint: String, api_key: Option<String>) -> GuardianResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| GuardianError::ConfigError {
                reason: format!("failed to build attestation HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn attestation_failed(reason: impl Into<String>) -> GuardianError {
    GuardianError::AttestationFailed {
        reason: reason.into(),
    }
}

#[async_trait]
impl Attestor for HttpAttestor {
    async fn attest(&self, record: &AuditRecord) -> GuardianResult<Attestation> {
        let mut req = self.client.post(&self.endpoint).json(record);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req
            .send()
            .await
            .map_err(|e| attestation_failed(e.to_string()))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| attestation_failed(e.to_string()))?;
        if !status.is_success() {
            return Err(attestation_failed(format!(
                "attestation service error {}: {}",
                status, body
            )));
        }

        let attestation: Attestation = serde_json::from_str(&body)
            .map_err(|e| attestation_failed(format!("unexpected attestation response: {}", e)))?;
        debug!(
            record_id = %record.id,
            verified = attestation.verified,
            "attestation service answered"
        );
        Ok(attestation)
    }
}
