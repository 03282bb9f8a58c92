//! Execution layer error types.

use thiserror::Error;

/// Faults raised by a ledger client call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Network, timeout, HTTP status or RPC-level error
    #[error("Ledger transport error: {0}")]
    Transport(String),

    /// Response could not be decoded as the expected structure
    #[error("Malformed ledger response: {0}")]
    MalformedResponse(String),
}

/// Errors that can occur during execution operations.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Ledger client error
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Aggregator could not produce a result
    #[error("Aggregator error: {0}")]
    Aggregator(String),

    /// Domain error (bad input data)
    #[error("Domain error: {0}")]
    Domain(#[from] attest_domain::DomainError),
}

impl ExecError {
    /// Whether re-running the round could succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecError::Ledger(_) | ExecError::Aggregator(_) => true,
            ExecError::Domain(_) => false,
        }
    }
}
