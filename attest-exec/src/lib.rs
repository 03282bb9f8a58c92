//! Price Attestation Execution Layer
//!
//! Resilient submission of price attestations with a round journal.
//!
//! # Architecture
//!
//! ```text
//! Descriptor → SubmissionEngine → Ledger (sign, submit) → Classification → Disposition
//!                     ↓
//!              ExecutionJournal
//! ```
//!
//! # Components
//!
//! - **Ports**: Traits defining interfaces for aggregator, ledger and metrics
//! - **Classification**: Ordered prefix table from backend codes to outcomes
//! - **Execution Journal**: In-process record of recent rounds (diagnostics only)
//! - **Submission Engine**: Sign → submit → classify state machine
//! - **Stub**: Test implementations for development
//!
//! # Example
//!
//! ```rust,ignore
//! use attest_exec::{ExecutionJournal, StubLedger, SubmissionEngine};
//! use std::sync::Arc;
//!
//! let ledger = Arc::new(StubLedger::new());
//! let journal = Arc::new(ExecutionJournal::new());
//! let engine = SubmissionEngine::new(ledger, journal, credentials);
//!
//! let report = engine.submit(&descriptor, price).await;
//! if report.disposition().is_completed() { /* done */ }
//! ```

#![warn(clippy::all)]

pub mod classify;
pub mod engine;
pub mod error;
pub mod journal;
pub mod ports;
pub mod stub;

// Re-exports for convenience
pub use classify::{BackendCode, Disposition, SchedulerSignal, SubmissionOutcome};
pub use engine::{SubmissionEngine, SubmissionReport, SubmissionStage};
pub use error::{ExecError, LedgerError};
pub use journal::{ExecutionJournal, JournalEntry, RoundHandle};
pub use ports::{
    AggregateResult, AggregatorPort, LedgerPort, MetricsSink, NoopMetrics, SamplingParams,
    SignedAttestation, SubmissionResult,
};
pub use stub::{RecordingMetrics, StubAggregator, StubLedger};
