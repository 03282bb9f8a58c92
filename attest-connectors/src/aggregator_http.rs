//! HTTP adapter for the multi-exchange price aggregator.
//!
//! ```text
//! GET {url}?count=3&delay_ms=1600&exhaustive=true
//! → {"consensus_price": 0.52341, "per_exchange_samples": {"bitstamp": [0.5233, ...]}}
//! ```
//!
//! Prices may arrive as JSON numbers or strings. Either form is converted
//! to `Decimal` without a float round-trip.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use attest_domain::{DomainError, PriceSample};
use attest_exec::{AggregateResult, AggregatorPort, ExecError, SamplingParams};

/// Base request timeout in seconds, on top of the sampling window
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur talking to the aggregator service.
#[derive(Debug, Error)]
pub enum AggregatorHttpError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Service returned a non-success HTTP status
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Body is not the expected JSON shape
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// A price in the body is not a usable decimal
    #[error(transparent)]
    InvalidPrice(#[from] DomainError),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

impl From<AggregatorHttpError> for ExecError {
    fn from(err: AggregatorHttpError) -> Self {
        match err {
            AggregatorHttpError::InvalidPrice(e) => ExecError::Domain(e),
            other => ExecError::Aggregator(other.to_string()),
        }
    }
}

/// Aggregator reached over HTTP.
pub struct HttpAggregator {
    client: Client,
    url: String,
}

impl HttpAggregator {
    /// Create an adapter for the aggregator at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: Client::new(), url: url.into() }
    }

    async fn fetch(&self, params: &SamplingParams) -> Result<AggregateResult, AggregatorHttpError> {
        let delay_ms = params.inter_sample_delay.as_millis().to_string();
        let query = [
            ("count", params.source_count.to_string()),
            ("delay_ms", delay_ms),
            ("exhaustive", params.exhaustive.to_string()),
        ];

        let budget = request_budget(params);

        let response = timeout(budget, self.client.get(&self.url).query(&query).send())
            .await
            .map_err(|_| AggregatorHttpError::Timeout)?
            .map_err(|e| AggregatorHttpError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = timeout(budget, response.text())
            .await
            .map_err(|_| AggregatorHttpError::Timeout)?
            .map_err(|e| AggregatorHttpError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(AggregatorHttpError::HttpStatus { status: status.as_u16(), body: text });
        }

        parse_aggregate(&text)
    }
}

/// Request timeout covering the service's whole sampling window.
fn request_budget(params: &SamplingParams) -> Duration {
    let window = params
        .inter_sample_delay
        .checked_mul(params.source_count)
        .unwrap_or(Duration::MAX);
    Duration::from_secs(REQUEST_TIMEOUT_SECS).saturating_add(window)
}

#[async_trait]
impl AggregatorPort for HttpAggregator {
    async fn sample(&self, params: &SamplingParams) -> Result<AggregateResult, ExecError> {
        let result = self.fetch(params).await?;
        debug!(
            consensus_price = %result.consensus_price,
            exchanges = result.samples.len(),
            "Aggregator sampled"
        );
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct AggregateBody {
    consensus_price: Value,
    #[serde(default)]
    per_exchange_samples: Map<String, Value>,
}

/// Parse an aggregator response body.
pub fn parse_aggregate(text: &str) -> Result<AggregateResult, AggregatorHttpError> {
    let body: AggregateBody =
        serde_json::from_str(text).map_err(|e| AggregatorHttpError::ParseError(e.to_string()))?;

    let consensus_price = decimal_from_json(&body.consensus_price)?;

    let mut samples = Vec::with_capacity(body.per_exchange_samples.len());
    for (exchange, values) in &body.per_exchange_samples {
        let values = values.as_array().ok_or_else(|| {
            AggregatorHttpError::ParseError(format!("samples for {} are not a list", exchange))
        })?;
        let values = values.iter().map(decimal_from_json).collect::<Result<Vec<_>, _>>()?;
        samples.push(PriceSample::new(exchange.clone(), values));
    }

    Ok(AggregateResult { consensus_price, samples })
}

/// Convert a JSON number or numeric string to a decimal.
fn decimal_from_json(value: &Value) -> Result<Decimal, AggregatorHttpError> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => {
            return Err(DomainError::InvalidValue(format!("Not a number: {}", other)).into());
        },
    };

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| DomainError::InvalidValue(format!("Not a finite decimal: {}", raw)).into())
}
