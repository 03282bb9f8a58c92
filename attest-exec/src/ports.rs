//! Execution layer port definitions.
//!
//! Ports define the interfaces for external collaborators (aggregator,
//! ledger, metrics). Adapters implement these ports for specific services
//! (XRPL JSON-RPC, HTTP aggregator, stub, etc.).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use attest_domain::{AttestationDescriptor, IssuedCurrency, PriceSample, WalletCredentials};

use crate::error::{ExecError, LedgerError};

// =============================================================================
// Aggregator Port
// =============================================================================

/// How the aggregator should sample its sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Samples taken per source
    pub source_count: u32,
    /// Delay between successive samples
    pub inter_sample_delay: Duration,
    /// Include slower, more exhaustive sources
    pub exhaustive: bool,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            source_count: 3,
            inter_sample_delay: Duration::from_millis(1600),
            exhaustive: true,
        }
    }
}

/// One round's aggregated price data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Filtered consensus price
    pub consensus_price: Decimal,
    /// Raw samples per exchange
    pub samples: Vec<PriceSample>,
}

/// Port for the multi-exchange price aggregator.
///
/// Implementations:
/// - `StubAggregator` - For testing (scripted results)
/// - `HttpAggregator` - Aggregator service over HTTP
#[async_trait]
pub trait AggregatorPort: Send + Sync {
    /// Sample all sources and return the consensus price plus raw samples.
    ///
    /// Any fan-out and sampling delay happens inside the implementation.
    async fn sample(&self, params: &SamplingParams) -> Result<AggregateResult, ExecError>;
}

// =============================================================================
// Ledger Port
// =============================================================================

/// A signed attestation ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttestation {
    /// Serialized signed transaction (hex)
    pub tx_blob: String,
    /// Transaction hash
    pub tx_hash: String,
    /// Last ledger the transaction may be included in
    pub expiry_ledger_index: u32,
}

/// Outcome reported by reliable submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    /// Transaction landed with a success code
    pub success: bool,
    /// Backend result code (e.g. "tesSUCCESS", "terQUEUED")
    pub result_code: String,
    /// Human-readable message accompanying the code
    pub result_message: Option<String>,
    /// Ledger close time of the validating ledger
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl SubmissionResult {
    /// A confirmed success.
    pub fn success(confirmed_at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            result_code: "tesSUCCESS".to_string(),
            result_message: None,
            confirmed_at: Some(confirmed_at),
        }
    }

    /// A failure with the given backend code.
    pub fn failure(result_code: impl Into<String>) -> Self {
        Self {
            success: false,
            result_code: result_code.into(),
            result_message: None,
            confirmed_at: None,
        }
    }
}

/// Port for ledger operations.
///
/// Implementations:
/// - `StubLedger` - For testing (scripted submission results)
/// - `XrplRpcClient` - XRPL JSON-RPC node
#[async_trait]
pub trait LedgerPort: Send + Sync {
    /// Current fee quote in drops.
    async fn current_fee(&self) -> Result<u64, LedgerError>;

    /// Index of the latest validated ledger.
    async fn current_validated_ledger_index(&self) -> Result<u32, LedgerError>;

    /// Next usable sequence number for an account.
    async fn next_account_sequence(&self, account_id: &str) -> Result<u32, LedgerError>;

    /// Sign an attestation with the account credentials.
    async fn sign(
        &self,
        descriptor: &AttestationDescriptor,
        credentials: &WalletCredentials,
    ) -> Result<SignedAttestation, LedgerError>;

    /// Submit and block until the backend reports a definitive result.
    async fn submit_reliable(&self, signed: &SignedAttestation) -> Result<SubmissionResult, LedgerError>;
}

// =============================================================================
// Metrics Port
// =============================================================================

/// Sink for the attested price gauge.
///
/// Fire-and-forget: implementations must not block and must swallow their
/// own failures.
pub trait MetricsSink: Send + Sync {
    /// Record the price attested under a currency/issuer pair.
    fn record_price(&self, currency: &IssuedCurrency, price: Decimal);
}

/// Metrics sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_price(&self, _currency: &IssuedCurrency, _price: Decimal) {}
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_submission_result_serialization() {
        let result = SubmissionResult::success(Utc::now());

        let json = serde_json::to_string(&result).unwrap();
        let parsed: SubmissionResult = serde_json::from_str(&json).unwrap();

        assert!(parsed.success);
        assert_eq!(parsed.result_code, "tesSUCCESS");
        assert!(parsed.confirmed_at.is_some());
    }

    #[test]
    fn test_aggregate_result_serialization() {
        let result = AggregateResult {
            consensus_price: dec!(0.52341),
            samples: vec![PriceSample::new("bitstamp", vec![dec!(0.5233), dec!(0.5235)])],
        };

        let json = serde_json::to_string(&result).unwrap();
        let parsed: AggregateResult = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, result);
    }

    #[test]
    fn test_default_sampling_params() {
        let params = SamplingParams::default();

        assert_eq!(params.source_count, 3);
        assert_eq!(params.inter_sample_delay, Duration::from_millis(1600));
        assert!(params.exhaustive);
    }
}
