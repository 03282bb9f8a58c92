//! End-to-end round scenarios against stub collaborators.

use std::sync::Arc;

use attest_domain::{
    evidence_digest, EvidenceBuilder, EvidenceRecord, Network, PriceSample, WalletCredentials,
};
use attest_exec::{
    Disposition, ExecutionJournal, LedgerError, RecordingMetrics, SamplingParams, SchedulerSignal,
    StubAggregator, StubLedger, SubmissionOutcome, SubmissionResult,
};
use attestd::{RoundController, RoundOutcome, RoundSettings};
use rust_decimal_macros::dec;

struct Harness {
    aggregator: Arc<StubAggregator>,
    ledger: Arc<StubLedger>,
    metrics: Arc<RecordingMetrics>,
    controller: RoundController<StubAggregator, StubLedger>,
}

fn harness(aggregator: StubAggregator) -> Harness {
    let aggregator = Arc::new(aggregator);
    let ledger = Arc::new(StubLedger::new());
    let metrics = Arc::new(RecordingMetrics::new());
    let credentials = WalletCredentials::new("rOracleAccount", "sOracleSecret").unwrap();
    let settings = RoundSettings {
        network: Network::Mainnet,
        build_id: "abc123".to_string(),
        sampling: SamplingParams::default(),
    };

    let controller = RoundController::new(
        aggregator.clone(),
        ledger.clone(),
        Arc::new(ExecutionJournal::new()),
        credentials,
        settings,
    )
    .with_metrics(metrics.clone());

    Harness { aggregator, ledger, metrics, controller }
}

fn bitstamp_aggregator() -> StubAggregator {
    StubAggregator::new(
        dec!(0.52341),
        vec![PriceSample::new("bitstamp", vec![dec!(0.5233), dec!(0.5235)])],
    )
}

fn expected_evidence() -> Vec<EvidenceRecord> {
    vec![
        EvidenceRecord::new("rates:BITSTAMP", "0.52330;0.52350", "text/csv"),
        EvidenceRecord::new("oracle:GITSHA", "abc123", "text/plain"),
    ]
}

#[tokio::test]
async fn scenario_a_success_completes_round() {
    let h = harness(bitstamp_aggregator());

    let report = h.controller.run_round().await;

    assert_eq!(report.disposition(), Disposition::Success);
    assert_eq!(report.signal(), SchedulerSignal::Succeeded);
    assert_eq!(report.signal().exit_code(), 0);
    assert_eq!(report.price, Some(dec!(0.52341)));
    assert_eq!(report.backend_code(), Some("tesSUCCESS"));

    let entry = h.controller.journal().read_last().unwrap();
    assert!(entry.completed);
    assert_eq!(entry.price, dec!(0.52341));

    let signed = h.ledger.signed_descriptors();
    assert_eq!(signed.len(), 1);
    assert_eq!(signed[0].evidence, expected_evidence());
    assert_eq!(signed[0].value, "0.52341");
    assert_eq!(signed[0].currency_code, "USD");
    assert_eq!(signed[0].issuer_id, "r9PfV3sQpKLWxccdg3HL2FXKxGW2orAcLE");
    assert_eq!(report.evidence_digest, Some(evidence_digest(&expected_evidence())));

    assert_eq!(h.aggregator.calls(), vec![SamplingParams::default()]);
    assert_eq!(h.metrics.recorded(), vec![(Network::Mainnet.issued_currency(), dec!(0.52341))]);
}

#[tokio::test]
async fn scenario_b_fee_too_low_requests_retry() {
    let h = harness(bitstamp_aggregator());
    h.ledger.push_submit_result(Ok(SubmissionResult::failure("telINSUF_FEE_P")));

    let report = h.controller.run_round().await;

    match &report.outcome {
        RoundOutcome::Submitted(submission) => assert_eq!(submission.outcome, SubmissionOutcome::FeeTooLow),
        other => panic!("Expected submitted round, got {:?}", other),
    }
    assert_eq!(report.disposition(), Disposition::RetryRequested);
    assert_eq!(report.signal(), SchedulerSignal::RetryMe);
    assert_eq!(report.signal().exit_code(), 1);

    let entry = h.controller.journal().read_last().unwrap();
    assert!(!entry.completed);
    assert!(h.metrics.recorded().is_empty());
}

#[tokio::test]
async fn scenario_c_queued_is_not_resubmitted() {
    let h = harness(bitstamp_aggregator());
    h.ledger.push_submit_result(Ok(SubmissionResult::failure("terQUEUED")));

    let report = h.controller.run_round().await;

    assert_eq!(report.disposition(), Disposition::SilentRetryDeferred);
    assert_eq!(report.signal(), SchedulerSignal::Succeeded);
    assert!(h.controller.journal().read_last().unwrap().completed);
    assert_eq!(h.ledger.submit_calls(), 1);
    assert_eq!(h.metrics.recorded().len(), 1);
}

#[tokio::test]
async fn scenario_d_negative_price_is_fatal_before_network() {
    let h = harness(StubAggregator::new(
        dec!(-1),
        vec![PriceSample::new("bitstamp", vec![dec!(0.5233)])],
    ));

    let report = h.controller.run_round().await;

    assert!(matches!(report.outcome, RoundOutcome::InputError(_)));
    assert_eq!(report.disposition(), Disposition::Fatal);
    assert_eq!(report.signal().exit_code(), 2);
    assert_eq!(h.ledger.total_calls(), 0);
    assert!(h.controller.journal().read_last().is_none());
    assert!(h.metrics.recorded().is_empty());
}

#[tokio::test]
async fn zero_price_is_fatal() {
    let h = harness(StubAggregator::new(dec!(0), vec![]));

    let report = h.controller.run_round().await;

    assert_eq!(report.signal(), SchedulerSignal::Fatal);
    assert_eq!(h.ledger.total_calls(), 0);
}

#[tokio::test]
async fn past_sequence_rebuilds_with_fresh_snapshot() {
    let h = harness(bitstamp_aggregator());
    h.ledger.push_submit_result(Ok(SubmissionResult::failure("tefPAST_SEQ")));
    h.ledger.set_next_sequence(10);
    h.ledger.set_validated_ledger_index(500);

    let first = h.controller.run_round().await;
    assert_eq!(first.signal(), SchedulerSignal::RetryMe);

    h.ledger.set_next_sequence(11);
    h.ledger.set_validated_ledger_index(510);
    let second = h.controller.run_round().await;
    assert_eq!(second.signal(), SchedulerSignal::Succeeded);

    let signed = h.ledger.signed_descriptors();
    assert_eq!(signed.len(), 2);
    assert_eq!((signed[0].account_sequence, signed[0].expiry_ledger_index), (10, 504));
    assert_eq!((signed[1].account_sequence, signed[1].expiry_ledger_index), (11, 514));
}

#[tokio::test]
async fn unknown_code_requests_retry() {
    let h = harness(bitstamp_aggregator());
    h.ledger.push_submit_result(Ok(SubmissionResult::failure("tecFOOBAR")));

    let report = h.controller.run_round().await;

    assert_eq!(report.signal(), SchedulerSignal::RetryMe);
    assert_eq!(report.backend_code(), Some("tecFOOBAR"));
}

#[tokio::test]
async fn submit_transport_fault_requests_retry() {
    let h = harness(bitstamp_aggregator());
    h.ledger.push_submit_result(Err(LedgerError::Transport("connection reset".into())));

    let report = h.controller.run_round().await;

    assert_eq!(report.signal(), SchedulerSignal::RetryMe);
    assert!(report.backend_code().is_none());
    assert!(!h.controller.journal().read_last().unwrap().completed);
}

#[tokio::test]
async fn evidence_is_deterministic_across_sample_order() {
    let forward = vec![
        PriceSample::new("kraken", vec![dec!(0.5236)]),
        PriceSample::new("bitstamp", vec![dec!(0.5233)]),
    ];
    let reversed: Vec<_> = forward.iter().rev().cloned().collect();

    let a = harness(StubAggregator::new(dec!(0.5234), forward));
    let b = harness(StubAggregator::new(dec!(0.5234), reversed));
    let report_a = a.controller.run_round().await;
    let report_b = b.controller.run_round().await;

    assert_eq!(report_a.evidence_digest, report_b.evidence_digest);
    assert_eq!(a.ledger.signed_descriptors()[0].evidence, b.ledger.signed_descriptors()[0].evidence);
    let expected = EvidenceBuilder::build(
        &[
            PriceSample::new("bitstamp", vec![dec!(0.5233)]),
            PriceSample::new("kraken", vec![dec!(0.5236)]),
        ],
        "abc123",
    )
    .unwrap();
    assert_eq!(a.ledger.signed_descriptors()[0].evidence, expected);
    assert_eq!(expected[0].source_tag, "rates:BITSTAMP");
    assert_eq!(expected[1].source_tag, "rates:KRAKEN");
}
