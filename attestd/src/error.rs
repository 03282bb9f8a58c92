//! Daemon error types.

use attest_domain::DomainError;
use attest_exec::SchedulerSignal;
use thiserror::Error;

/// Daemon-level errors.
///
/// Raised only while setting up a round, before any network call.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DaemonError {
    /// Signal for a process that could not start its round.
    ///
    /// Setup errors come from the environment, so re-running the same
    /// invocation cannot succeed.
    pub fn scheduler_signal(&self) -> SchedulerSignal {
        SchedulerSignal::Fatal
    }
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
