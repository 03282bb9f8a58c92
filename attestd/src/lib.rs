//! Price Attestation Daemon Library
//!
//! Runs one price-attestation round per invocation.
//!
//! # Architecture
//!
//! ```text
//! Scheduler → attestd → RoundController → Aggregator
//!                              ↓
//!                    EvidenceBuilder → AttestationAssembler
//!                              ↓
//!                    SubmissionEngine → Ledger
//!                              ↓
//!                    Disposition → exit code
//! ```
//!
//! # Components
//!
//! - **Round Controller**: Orchestrates one round and maps its outcome to a scheduler signal
//! - **Metrics**: Prometheus gauge of the attested price, optionally pushed
//! - **Config**: Environment-based configuration

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod round;

// Re-exports for convenience
pub use config::{AggregatorConfig, Config, LedgerConfig};
pub use error::{DaemonError, DaemonResult};
pub use metrics::PrometheusSink;
pub use round::{RoundController, RoundOutcome, RoundReport, RoundSettings};
