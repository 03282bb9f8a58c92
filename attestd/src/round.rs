//! Round controller: one invocation end to end.
//!
//! # Flow
//!
//! ```text
//! Aggregator.sample → validate price → EvidenceBuilder → ledger snapshot
//!     → AttestationAssembler → SubmissionEngine → Disposition
//! ```
//!
//! The price is validated before any ledger call. The ledger snapshot is
//! fetched fresh each round with the account sequence last, right before
//! signing.

use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use attest_domain::{
    evidence_digest, validate_price, AttestationAssembler, DomainError, EvidenceBuilder,
    IssuedCurrency, LedgerSnapshot, Network, WalletCredentials,
};
use attest_exec::{
    AggregatorPort, Disposition, ExecError, ExecutionJournal, LedgerError, LedgerPort, MetricsSink,
    NoopMetrics, SamplingParams, SchedulerSignal, SubmissionEngine, SubmissionReport,
};

// =============================================================================
// Round Outcome
// =============================================================================

/// How a round ended.
#[derive(Debug)]
pub enum RoundOutcome {
    /// The attestation reached the submission engine
    Submitted(SubmissionReport),
    /// Bad input data (price or evidence); retrying will not help
    InputError(DomainError),
    /// The aggregator could not produce a result
    AggregatorFault(ExecError),
    /// Ledger snapshot fetch failed
    TransportFault(LedgerError),
}

impl RoundOutcome {
    /// Disposition of this outcome.
    pub fn disposition(&self) -> Disposition {
        match self {
            RoundOutcome::Submitted(report) => report.disposition(),
            RoundOutcome::InputError(_) => Disposition::Fatal,
            RoundOutcome::AggregatorFault(e) if e.is_retryable() => Disposition::RetryRequested,
            RoundOutcome::AggregatorFault(_) => Disposition::Fatal,
            RoundOutcome::TransportFault(_) => Disposition::RetryRequested,
        }
    }
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundOutcome::Submitted(report) => write!(f, "{}", report.outcome),
            RoundOutcome::InputError(e) => write!(f, "input error: {}", e),
            RoundOutcome::AggregatorFault(e) => write!(f, "aggregator fault: {}", e),
            RoundOutcome::TransportFault(e) => write!(f, "transport fault: {}", e),
        }
    }
}

/// Summary of one round, for the caller and the audit log.
#[derive(Debug)]
pub struct RoundReport {
    /// Consensus price, once sampled
    pub price: Option<Decimal>,
    /// SHA-256 of the evidence records, once built
    pub evidence_digest: Option<String>,
    /// Terminal outcome
    pub outcome: RoundOutcome,
}

impl RoundReport {
    /// Disposition of the round.
    pub fn disposition(&self) -> Disposition {
        self.outcome.disposition()
    }

    /// Signal surfaced to the scheduler.
    pub fn signal(&self) -> SchedulerSignal {
        self.disposition().scheduler_signal()
    }

    /// Backend result code, when the ledger returned one.
    pub fn backend_code(&self) -> Option<&str> {
        match &self.outcome {
            RoundOutcome::Submitted(report) => report.backend_code.as_deref(),
            _ => None,
        }
    }
}

// =============================================================================
// Round Controller
// =============================================================================

/// Per-round settings.
#[derive(Debug, Clone)]
pub struct RoundSettings {
    /// Network the price is attested on
    pub network: Network,
    /// Build identifier embedded in evidence
    pub build_id: String,
    /// Aggregator sampling parameters
    pub sampling: SamplingParams,
}

/// Runs one attestation round against the configured collaborators.
pub struct RoundController<A: AggregatorPort, L: LedgerPort> {
    aggregator: Arc<A>,
    ledger: Arc<L>,
    engine: SubmissionEngine<L>,
    metrics: Arc<dyn MetricsSink>,
    account_id: String,
    currency: IssuedCurrency,
    build_id: String,
    sampling: SamplingParams,
}

impl<A: AggregatorPort, L: LedgerPort> RoundController<A, L> {
    /// Create a controller. Metrics default to a no-op sink.
    pub fn new(
        aggregator: Arc<A>,
        ledger: Arc<L>,
        journal: Arc<ExecutionJournal>,
        credentials: WalletCredentials,
        settings: RoundSettings,
    ) -> Self {
        let account_id = credentials.account_id.clone();
        let engine = SubmissionEngine::new(ledger.clone(), journal, credentials);

        Self {
            aggregator,
            ledger,
            engine,
            metrics: Arc::new(NoopMetrics),
            account_id,
            currency: settings.network.issued_currency(),
            build_id: settings.build_id,
            sampling: settings.sampling,
        }
    }

    /// Record attested prices to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get the journal (for inspection).
    pub fn journal(&self) -> &ExecutionJournal {
        self.engine.journal()
    }

    /// Run one round to a terminal outcome.
    pub async fn run_round(&self) -> RoundReport {
        if let Some(last) = self.journal().read_last() {
            if last.is_unresolved() {
                warn!(
                    round = %last.round,
                    price = %last.price,
                    written_at = %last.written_at,
                    "Previous round never resolved, process may have been killed mid-submission"
                );
            }
        }

        let aggregate = match self.aggregator.sample(&self.sampling).await {
            Ok(aggregate) => aggregate,
            Err(ExecError::Domain(e)) => return self.conclude(None, None, RoundOutcome::InputError(e)),
            Err(e) => return self.conclude(None, None, RoundOutcome::AggregatorFault(e)),
        };
        let price = aggregate.consensus_price;

        if let Err(e) = validate_price(price) {
            return self.conclude(Some(price), None, RoundOutcome::InputError(e));
        }

        let evidence = match EvidenceBuilder::build(&aggregate.samples, &self.build_id) {
            Ok(evidence) => evidence,
            Err(e) => return self.conclude(Some(price), None, RoundOutcome::InputError(e)),
        };
        let digest = evidence_digest(&evidence);

        let snapshot = match self.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => return self.conclude(Some(price), Some(digest), RoundOutcome::TransportFault(e)),
        };

        let descriptor = match AttestationAssembler::assemble(price, evidence, &snapshot) {
            Ok(descriptor) => descriptor,
            Err(e) => return self.conclude(Some(price), Some(digest), RoundOutcome::InputError(e)),
        };

        let report = self.engine.submit(&descriptor, price).await;
        if report.disposition().is_completed() {
            self.metrics.record_price(&self.currency, price);
        }

        self.conclude(Some(price), Some(digest), RoundOutcome::Submitted(report))
    }

    async fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let fee_drops = self.ledger.current_fee().await?;
        let validated_ledger_index = self.ledger.current_validated_ledger_index().await?;
        let account_sequence = self.ledger.next_account_sequence(&self.account_id).await?;

        Ok(LedgerSnapshot {
            account_id: self.account_id.clone(),
            fee_drops,
            validated_ledger_index,
            account_sequence,
            currency: self.currency.clone(),
        })
    }

    fn conclude(&self, price: Option<Decimal>, digest: Option<String>, outcome: RoundOutcome) -> RoundReport {
        let report = RoundReport { price, evidence_digest: digest, outcome };
        let disposition = report.disposition();
        let signal = report.signal();
        let price = report.price.map(|p| p.to_string()).unwrap_or_default();
        let digest = report.evidence_digest.as_deref().unwrap_or_default();
        let code = report.backend_code().unwrap_or_default();

        match disposition {
            Disposition::Success | Disposition::SilentRetryDeferred => {
                info!(%price, digest, code, outcome = %report.outcome, %signal, "Round finished");
            },
            Disposition::RetryRequested => {
                warn!(%price, digest, code, outcome = %report.outcome, %signal, "Round failed, retry expected");
            },
            Disposition::Fatal => {
                error!(
                    %price,
                    digest,
                    code,
                    outcome = %report.outcome,
                    %signal,
                    "Round failed, operator attention required"
                );
            },
        }

        report
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use attest_domain::PriceSample;
    use attest_exec::{RecordingMetrics, StubAggregator, StubLedger, SubmissionResult};
    use rust_decimal_macros::dec;

    fn controller(
        aggregator: Arc<StubAggregator>,
        ledger: Arc<StubLedger>,
    ) -> RoundController<StubAggregator, StubLedger> {
        let credentials = WalletCredentials::new("rTest", "sTest").unwrap();
        let settings = RoundSettings {
            network: Network::Testnet,
            build_id: "abc123".to_string(),
            sampling: SamplingParams::default(),
        };
        RoundController::new(aggregator, ledger, Arc::new(ExecutionJournal::new()), credentials, settings)
    }

    fn samples() -> Vec<PriceSample> {
        vec![PriceSample::new("bitstamp", vec![dec!(0.5233), dec!(0.5235)])]
    }

    #[tokio::test]
    async fn test_snapshot_feeds_descriptor() {
        let aggregator = Arc::new(StubAggregator::new(dec!(0.52341), samples()));
        let ledger = Arc::new(StubLedger::new());
        ledger.set_fee(15);
        ledger.set_validated_ledger_index(2000);
        ledger.set_next_sequence(42);

        let report = controller(aggregator, ledger.clone()).run_round().await;

        assert_eq!(report.signal(), SchedulerSignal::Succeeded);
        let signed = ledger.signed_descriptors();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].fee_drops, 15);
        assert_eq!(signed[0].expiry_ledger_index, 2004);
        assert_eq!(signed[0].account_sequence, 42);
        assert_eq!(signed[0].account_id, "rTest");
        assert_eq!(signed[0].currency_code, "FOO");
    }

    #[tokio::test]
    async fn test_aggregator_fault_retries() {
        let aggregator = Arc::new(StubAggregator::new(dec!(0.5), samples()));
        aggregator.set_fail_next(true);
        let ledger = Arc::new(StubLedger::new());

        let report = controller(aggregator, ledger.clone()).run_round().await;

        assert!(matches!(report.outcome, RoundOutcome::AggregatorFault(_)));
        assert_eq!(report.signal(), SchedulerSignal::RetryMe);
        assert!(report.price.is_none());
        assert_eq!(ledger.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_fault_retries_without_journal_entry() {
        let aggregator = Arc::new(StubAggregator::new(dec!(0.5), samples()));
        let ledger = Arc::new(StubLedger::new());
        ledger.fail_next_snapshot(LedgerError::Transport("connection refused".into()));
        let controller = controller(aggregator, ledger.clone());

        let report = controller.run_round().await;

        assert!(matches!(report.outcome, RoundOutcome::TransportFault(_)));
        assert_eq!(report.disposition(), Disposition::RetryRequested);
        assert!(report.evidence_digest.is_some());
        assert_eq!(ledger.sign_calls(), 0);
        assert!(controller.journal().read_last().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_source_tag_is_fatal() {
        let samples = vec![
            PriceSample::new("kraken", vec![dec!(0.5)]),
            PriceSample::new("Kraken", vec![dec!(0.5)]),
        ];
        let aggregator = Arc::new(StubAggregator::new(dec!(0.5), samples));
        let ledger = Arc::new(StubLedger::new());

        let report = controller(aggregator, ledger.clone()).run_round().await;

        assert!(matches!(report.outcome, RoundOutcome::InputError(DomainError::DuplicateSourceTag(_))));
        assert_eq!(report.signal(), SchedulerSignal::Fatal);
        assert_eq!(ledger.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_metrics_only_on_completed() {
        let aggregator = Arc::new(StubAggregator::new(dec!(0.5), samples()));
        let ledger = Arc::new(StubLedger::new());
        ledger.push_submit_result(Ok(SubmissionResult::failure("tefPAST_SEQ")));
        let metrics = Arc::new(RecordingMetrics::new());
        let controller = controller(aggregator, ledger).with_metrics(metrics.clone());

        let first = controller.run_round().await;
        assert_eq!(first.signal(), SchedulerSignal::RetryMe);
        assert!(metrics.recorded().is_empty());

        let second = controller.run_round().await;
        assert_eq!(second.signal(), SchedulerSignal::Succeeded);
        assert_eq!(metrics.recorded(), vec![(Network::Testnet.issued_currency(), dec!(0.5))]);
    }

    #[tokio::test]
    async fn test_rounds_keep_separate_journal_entries() {
        let aggregator = Arc::new(StubAggregator::new(dec!(0.5), samples()));
        let ledger = Arc::new(StubLedger::new());
        ledger.push_submit_result(Ok(SubmissionResult::failure("telINSUF_FEE_P")));
        let controller = controller(aggregator, ledger);

        controller.run_round().await;
        controller.run_round().await;

        let history = controller.journal().history();
        assert_eq!(history.len(), 2);
        assert!(!history[0].completed);
        assert!(history[1].completed);
    }
}
