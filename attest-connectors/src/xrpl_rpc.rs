//! XRPL JSON-RPC ledger client
//!
//! Implements [`LedgerPort`] against a rippled/clio JSON-RPC endpoint:
//! - Fee, validated ledger and account sequence lookups
//! - Server-side signing (`sign` method; keys never leave the node). The
//!   wallet secret travels in the request, so the endpoint must be a
//!   trusted, signing-enabled node; public nodes reject `sign`.
//! - Reliable submission: `submit`, then poll `tx` until validated or the
//!   transaction's `LastLedgerSequence` has passed
//!
//! # Request shape
//!
//! ```text
//! POST {url}  {"method": "<name>", "params": [{...}]}
//! ```

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use attest_domain::{AttestationDescriptor, WalletCredentials};
use attest_exec::{LedgerError, LedgerPort, SignedAttestation, SubmissionResult};

use crate::xrpl_tx::{ripple_time_to_utc, trust_set_tx_json};

// =============================================================================
// Constants
// =============================================================================

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Interval between `tx` polls in milliseconds
const POLL_INTERVAL_MS: u64 = 1000;

/// Default fee ceiling in drops (2 XRP)
pub const DEFAULT_MAX_FEE_DROPS: u64 = 2_000_000;

/// Preliminary result that allows waiting for validation
const TES_SUCCESS: &str = "tesSUCCESS";

/// `tx` error for a hash the node has not seen (yet)
const TXN_NOT_FOUND: &str = "txnNotFound";

/// Reported when the transaction expired without being validated
pub const EXPIRED_CODE: &str = "tefMAX_LEDGER";

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the XRPL JSON-RPC client.
#[derive(Debug, Clone, Error)]
pub enum XrplRpcError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Node returned a non-success HTTP status
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Node returned an RPC error
    #[error("RPC error: {error} - {message}")]
    Rpc { error: String, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

impl From<XrplRpcError> for LedgerError {
    fn from(err: XrplRpcError) -> Self {
        match err {
            XrplRpcError::ParseError(msg) => LedgerError::MalformedResponse(msg),
            other => LedgerError::Transport(other.to_string()),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// XRPL JSON-RPC client.
pub struct XrplRpcClient {
    /// HTTP client
    client: Client,
    /// JSON-RPC endpoint
    url: String,
    /// Fee ceiling in drops
    max_fee_drops: u64,
    /// Per-request timeout
    request_timeout: Duration,
    /// Delay between validation polls
    poll_interval: Duration,
}

impl XrplRpcClient {
    /// Create a client for a JSON-RPC endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            max_fee_drops: DEFAULT_MAX_FEE_DROPS,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }

    /// Cap fee quotes at `drops`.
    pub fn with_max_fee(mut self, drops: u64) -> Self {
        self.max_fee_drops = drops;
        self
    }

    /// Override the delay between validation polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Endpoint this client talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the endpoint is loopback or TLS.
    ///
    /// `sign` sends the wallet secret to the node, so anything else exposes
    /// it on the wire.
    pub fn is_trusted_endpoint(&self) -> bool {
        let Ok(url) = Url::parse(&self.url) else {
            return false;
        };
        if url.scheme() == "https" {
            return true;
        }

        match url.host_str() {
            Some("localhost") => true,
            Some(host) => host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .map(|ip| ip.is_loopback())
                .unwrap_or(false),
            None => false,
        }
    }

    /// Look up a transaction; `None` until it is in a validated ledger.
    async fn validated_result(&self, tx_hash: &str) -> Result<Option<SubmissionResult>, LedgerError> {
        let tx = match self.request::<TxResult>("tx", json!({ "transaction": tx_hash })).await {
            Ok(tx) if tx.validated => tx,
            Ok(_) => return Ok(None),
            Err(XrplRpcError::Rpc { error, .. }) if error == TXN_NOT_FOUND => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let result_code = tx
            .meta
            .map(|m| m.transaction_result)
            .ok_or_else(|| LedgerError::MalformedResponse("validated tx without meta".to_string()))?;

        Ok(Some(SubmissionResult {
            success: result_code == TES_SUCCESS,
            result_code,
            result_message: None,
            confirmed_at: tx.date.and_then(ripple_time_to_utc),
        }))
    }

    /// Send one JSON-RPC request and decode its `result`.
    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, XrplRpcError> {
        let body = json!({ "method": method, "params": [params] });

        let response = timeout(self.request_timeout, self.client.post(&self.url).json(&body).send())
            .await
            .map_err(|_| XrplRpcError::Timeout)?
            .map_err(|e| XrplRpcError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = timeout(self.request_timeout, response.text())
            .await
            .map_err(|_| XrplRpcError::Timeout)?
            .map_err(|e| XrplRpcError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(XrplRpcError::HttpStatus { status: status.as_u16(), body: text });
        }

        decode_result(&text)
    }
}

/// Extract and decode the `result` object of a JSON-RPC response body.
fn decode_result<T: DeserializeOwned>(text: &str) -> Result<T, XrplRpcError> {
    let envelope: RpcEnvelope =
        serde_json::from_str(text).map_err(|e| XrplRpcError::ParseError(e.to_string()))?;

    if envelope.result.get("status").and_then(Value::as_str) == Some("error") {
        let error = envelope
            .result
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let message = envelope
            .result
            .get("error_message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(XrplRpcError::Rpc { error, message });
    }

    serde_json::from_value(envelope.result).map_err(|e| XrplRpcError::ParseError(e.to_string()))
}

#[async_trait]
impl LedgerPort for XrplRpcClient {
    async fn current_fee(&self) -> Result<u64, LedgerError> {
        let result: FeeResult = self.request("fee", json!({})).await?;

        let open_ledger_fee = result.drops.open_ledger_fee.parse::<u64>().map_err(|e| {
            LedgerError::MalformedResponse(format!(
                "open_ledger_fee {:?}: {}",
                result.drops.open_ledger_fee, e
            ))
        })?;

        if open_ledger_fee > self.max_fee_drops {
            warn!(open_ledger_fee, max = self.max_fee_drops, "Fee quote capped");
        }
        Ok(open_ledger_fee.min(self.max_fee_drops))
    }

    async fn current_validated_ledger_index(&self) -> Result<u32, LedgerError> {
        let result: LedgerResult =
            self.request("ledger", json!({ "ledger_index": "validated" })).await?;
        Ok(result.ledger_index)
    }

    async fn next_account_sequence(&self, account_id: &str) -> Result<u32, LedgerError> {
        let result: AccountInfoResult = self
            .request("account_info", json!({ "account": account_id, "ledger_index": "current" }))
            .await?;
        Ok(result.account_data.sequence)
    }

    async fn sign(
        &self,
        descriptor: &AttestationDescriptor,
        credentials: &WalletCredentials,
    ) -> Result<SignedAttestation, LedgerError> {
        let params = json!({
            "tx_json": trust_set_tx_json(descriptor),
            "secret": credentials.expose_secret(),
        });

        let result: SignResult = self.request("sign", params).await?;

        Ok(SignedAttestation {
            tx_blob: result.tx_blob,
            tx_hash: result.tx_json.hash,
            expiry_ledger_index: descriptor.expiry_ledger_index,
        })
    }

    async fn submit_reliable(&self, signed: &SignedAttestation) -> Result<SubmissionResult, LedgerError> {
        let submitted: SubmitResult =
            self.request("submit", json!({ "tx_blob": signed.tx_blob })).await?;

        debug!(
            tx_hash = %signed.tx_hash,
            engine_result = %submitted.engine_result,
            "Preliminary submission result"
        );

        if submitted.engine_result != TES_SUCCESS {
            return Ok(SubmissionResult {
                success: false,
                result_code: submitted.engine_result,
                result_message: submitted.engine_result_message,
                confirmed_at: None,
            });
        }

        loop {
            sleep(self.poll_interval).await;

            if let Some(result) = self.validated_result(&signed.tx_hash).await? {
                return Ok(result);
            }

            let validated = self.current_validated_ledger_index().await?;
            if validated > signed.expiry_ledger_index {
                // Every ledger that could hold the transaction is now validated,
                // so this lookup is final.
                if let Some(result) = self.validated_result(&signed.tx_hash).await? {
                    return Ok(result);
                }

                return Ok(SubmissionResult {
                    success: false,
                    result_code: EXPIRED_CODE.to_string(),
                    result_message: Some(format!(
                        "validated ledger {} passed LastLedgerSequence {}",
                        validated, signed.expiry_ledger_index
                    )),
                    confirmed_at: None,
                });
            }
        }
    }
}

// =============================================================================
// XRPL Types (from RPC responses)
// =============================================================================

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Value,
}

#[derive(Debug, Deserialize)]
struct FeeResult {
    drops: FeeDrops,
}

#[derive(Debug, Deserialize)]
struct FeeDrops {
    open_ledger_fee: String,
}

#[derive(Debug, Deserialize)]
struct LedgerResult {
    ledger_index: u32,
}

#[derive(Debug, Deserialize)]
struct AccountInfoResult {
    account_data: AccountData,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    #[serde(rename = "Sequence")]
    sequence: u32,
}

#[derive(Debug, Deserialize)]
struct TxHash {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct SignResult {
    tx_blob: String,
    tx_json: TxHash,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    engine_result: String,
    engine_result_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    validated: bool,
    meta: Option<TxMeta>,
    date: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TxMeta {
    #[serde(rename = "TransactionResult")]
    transaction_result: String,
}

// =============================================================================
// Tests
// =============================================================================
