//! Submission engine: signs, submits and classifies one attestation.
//!
//! # Flow
//!
//! ```text
//! Built → Signed → Submitted → {Success | SilentRetryDeferred | RetryRequested}
//! ```
//!
//! The journal entry is opened before signing and resolved after
//! classification with `completed = disposition.is_completed()`.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use attest_domain::{AttestationDescriptor, WalletCredentials};
use rust_decimal::Decimal;

use crate::classify::{Disposition, SubmissionOutcome};
use crate::journal::{ExecutionJournal, RoundHandle};
use crate::ports::LedgerPort;

// =============================================================================
// Stages and Reports
// =============================================================================

/// Last stage a submission reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    /// Descriptor assembled, not yet signed
    Built,
    /// Signed blob obtained
    Signed,
    /// Handed to reliable submission
    Submitted,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStage::Built => write!(f, "built"),
            SubmissionStage::Signed => write!(f, "signed"),
            SubmissionStage::Submitted => write!(f, "submitted"),
        }
    }
}

/// Everything the caller needs to report a submission.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    /// Journal handle of this round
    pub round: RoundHandle,
    /// Furthest stage reached
    pub stage: SubmissionStage,
    /// Classified outcome
    pub outcome: SubmissionOutcome,
    /// Raw backend code, when the backend returned one
    pub backend_code: Option<String>,
    /// Transaction hash, once signed
    pub tx_hash: Option<String>,
}

impl SubmissionReport {
    /// Disposition implied by the outcome.
    pub fn disposition(&self) -> Disposition {
        self.outcome.disposition()
    }
}

// =============================================================================
// Submission Engine
// =============================================================================

/// Drives one assembled attestation to a terminal disposition.
pub struct SubmissionEngine<L: LedgerPort> {
    /// Ledger client
    ledger: Arc<L>,
    /// Round journal (diagnostics only)
    journal: Arc<ExecutionJournal>,
    /// Signing credentials
    credentials: WalletCredentials,
}

impl<L: LedgerPort> SubmissionEngine<L> {
    /// Create a new engine.
    pub fn new(ledger: Arc<L>, journal: Arc<ExecutionJournal>, credentials: WalletCredentials) -> Self {
        Self { ledger, journal, credentials }
    }

    /// Sign, submit and classify an attestation of `price`.
    ///
    /// Never returns an error: every fault is folded into the outcome so
    /// the caller decides on re-invocation from one value.
    pub async fn submit(&self, descriptor: &AttestationDescriptor, price: Decimal) -> SubmissionReport {
        let round = self.journal.begin_round(price);
        debug!(
            %round,
            %price,
            sequence = descriptor.account_sequence,
            expiry = descriptor.expiry_ledger_index,
            fee_drops = descriptor.fee_drops,
            "Attestation built"
        );

        // Built → Signed
        let signed = match self.ledger.sign(descriptor, &self.credentials).await {
            Ok(signed) => signed,
            Err(e) => {
                let outcome = SubmissionOutcome::classify(&Err(e));
                warn!(%round, %outcome, "Signing failed");
                return self.finish(round, SubmissionStage::Built, outcome, None, None);
            },
        };
        debug!(%round, tx_hash = %signed.tx_hash, "Attestation signed");

        // Signed → Submitted
        info!(
            %round,
            tx_hash = %signed.tx_hash,
            %price,
            sequence = descriptor.account_sequence,
            "Submitting attestation"
        );
        let result = self.ledger.submit_reliable(&signed).await;
        let backend_code = result.as_ref().ok().map(|r| r.result_code.clone());
        let outcome = SubmissionOutcome::classify(&result);

        match &outcome {
            SubmissionOutcome::Success { confirmed_at } => {
                info!(%round, tx_hash = %signed.tx_hash, ?confirmed_at, "Attestation confirmed");
            },
            SubmissionOutcome::Queued => {
                info!(%round, tx_hash = %signed.tx_hash, "Attestation queued, not resubmitting");
            },
            SubmissionOutcome::FeeTooLow | SubmissionOutcome::PastDeadline => {
                warn!(
                    %round,
                    tx_hash = %signed.tx_hash,
                    code = ?backend_code,
                    outcome = outcome.as_str(),
                    "Attestation rejected, retry with fresh snapshot"
                );
            },
            SubmissionOutcome::MalformedResponse(detail) | SubmissionOutcome::Transport(detail) => {
                warn!(%round, tx_hash = %signed.tx_hash, %detail, outcome = outcome.as_str(), "Submission fault");
            },
            SubmissionOutcome::UnknownFailure(detail) => {
                error!(
                    %round,
                    tx_hash = %signed.tx_hash,
                    %detail,
                    result = ?result,
                    "Unexpected submission failure"
                );
            },
        }

        self.finish(round, SubmissionStage::Submitted, outcome, backend_code, Some(signed.tx_hash))
    }

    fn finish(
        &self,
        round: RoundHandle,
        stage: SubmissionStage,
        outcome: SubmissionOutcome,
        backend_code: Option<String>,
        tx_hash: Option<String>,
    ) -> SubmissionReport {
        let completed = outcome.disposition().is_completed();
        self.journal.complete_round(round, completed);

        SubmissionReport { round, stage, outcome, backend_code, tx_hash }
    }

    /// Get the journal (for inspection).
    pub fn journal(&self) -> &ExecutionJournal {
        &self.journal
    }
}

// =============================================================================
// Tests
// =============================================================================
