//! Stub implementations for testing.
//!
//! These implementations simulate the aggregator, ledger and metrics sink
//! without making real network calls.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use attest_domain::{AttestationDescriptor, IssuedCurrency, PriceSample, WalletCredentials};

use crate::error::{ExecError, LedgerError};
use crate::ports::{
    AggregateResult, AggregatorPort, LedgerPort, MetricsSink, SamplingParams, SignedAttestation,
    SubmissionResult,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Stub Aggregator
// =============================================================================

/// Stub aggregator returning a configured result.
pub struct StubAggregator {
    /// Result returned by `sample`
    result: Mutex<AggregateResult>,
    /// Whether to simulate an aggregator failure
    fail_next: Mutex<bool>,
    /// Sampling params of every call
    calls: Mutex<Vec<SamplingParams>>,
}

impl StubAggregator {
    /// Create a stub that always returns `consensus_price` and `samples`.
    pub fn new(consensus_price: Decimal, samples: Vec<PriceSample>) -> Self {
        Self {
            result: Mutex::new(AggregateResult { consensus_price, samples }),
            fail_next: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replace the configured result.
    pub fn set_result(&self, result: AggregateResult) {
        *lock(&self.result) = result;
    }

    /// Configure the next call to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *lock(&self.fail_next) = fail;
    }

    /// Params passed to each call so far.
    pub fn calls(&self) -> Vec<SamplingParams> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl AggregatorPort for StubAggregator {
    async fn sample(&self, params: &SamplingParams) -> Result<AggregateResult, ExecError> {
        lock(&self.calls).push(params.clone());

        let fail = std::mem::replace(&mut *lock(&self.fail_next), false);
        if fail {
            return Err(ExecError::Aggregator("Simulated aggregator failure".to_string()));
        }

        Ok(lock(&self.result).clone())
    }
}

// =============================================================================
// Stub Ledger
// =============================================================================

#[derive(Default)]
struct LedgerCounters {
    fee: u32,
    ledger_index: u32,
    sequence: u32,
    sign: u32,
    submit: u32,
}

/// Stub ledger for testing.
///
/// Snapshot calls return configured values; submissions pop scripted
/// results and default to a confirmed success once the script runs out.
pub struct StubLedger {
    fee_drops: Mutex<u64>,
    validated_ledger_index: Mutex<u32>,
    next_sequence: Mutex<u32>,
    submit_script: Mutex<VecDeque<Result<SubmissionResult, LedgerError>>>,
    snapshot_failure: Mutex<Option<LedgerError>>,
    sign_failure: Mutex<Option<LedgerError>>,
    signed: Mutex<Vec<AttestationDescriptor>>,
    counters: Mutex<LedgerCounters>,
}

impl StubLedger {
    /// Create a stub with fee 12 drops, validated ledger 1000, sequence 1.
    pub fn new() -> Self {
        Self {
            fee_drops: Mutex::new(12),
            validated_ledger_index: Mutex::new(1000),
            next_sequence: Mutex::new(1),
            submit_script: Mutex::new(VecDeque::new()),
            snapshot_failure: Mutex::new(None),
            sign_failure: Mutex::new(None),
            signed: Mutex::new(Vec::new()),
            counters: Mutex::new(LedgerCounters::default()),
        }
    }

    /// Set the fee quote.
    pub fn set_fee(&self, drops: u64) {
        *lock(&self.fee_drops) = drops;
    }

    /// Set the validated ledger index.
    pub fn set_validated_ledger_index(&self, index: u32) {
        *lock(&self.validated_ledger_index) = index;
    }

    /// Set the next account sequence.
    pub fn set_next_sequence(&self, sequence: u32) {
        *lock(&self.next_sequence) = sequence;
    }

    /// Queue a result for the next unscripted submission.
    pub fn push_submit_result(&self, result: Result<SubmissionResult, LedgerError>) {
        lock(&self.submit_script).push_back(result);
    }

    /// Make the next snapshot call fail.
    pub fn fail_next_snapshot(&self, error: LedgerError) {
        *lock(&self.snapshot_failure) = Some(error);
    }

    /// Make the next sign call fail.
    pub fn fail_next_sign(&self, error: LedgerError) {
        *lock(&self.sign_failure) = Some(error);
    }

    /// Descriptors signed so far.
    pub fn signed_descriptors(&self) -> Vec<AttestationDescriptor> {
        lock(&self.signed).clone()
    }

    /// Number of submissions.
    pub fn submit_calls(&self) -> u32 {
        lock(&self.counters).submit
    }

    /// Number of sign requests.
    pub fn sign_calls(&self) -> u32 {
        lock(&self.counters).sign
    }

    /// Total number of calls of any kind.
    pub fn total_calls(&self) -> u32 {
        let c = lock(&self.counters);
        c.fee + c.ledger_index + c.sequence + c.sign + c.submit
    }

    fn take_snapshot_failure(&self) -> Result<(), LedgerError> {
        match lock(&self.snapshot_failure).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for StubLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerPort for StubLedger {
    async fn current_fee(&self) -> Result<u64, LedgerError> {
        lock(&self.counters).fee += 1;
        self.take_snapshot_failure()?;
        Ok(*lock(&self.fee_drops))
    }

    async fn current_validated_ledger_index(&self) -> Result<u32, LedgerError> {
        lock(&self.counters).ledger_index += 1;
        self.take_snapshot_failure()?;
        Ok(*lock(&self.validated_ledger_index))
    }

    async fn next_account_sequence(&self, _account_id: &str) -> Result<u32, LedgerError> {
        lock(&self.counters).sequence += 1;
        self.take_snapshot_failure()?;
        Ok(*lock(&self.next_sequence))
    }

    async fn sign(
        &self,
        descriptor: &AttestationDescriptor,
        _credentials: &WalletCredentials,
    ) -> Result<SignedAttestation, LedgerError> {
        let n = {
            let mut counters = lock(&self.counters);
            counters.sign += 1;
            counters.sign
        };

        if let Some(error) = lock(&self.sign_failure).take() {
            return Err(error);
        }

        lock(&self.signed).push(descriptor.clone());

        Ok(SignedAttestation {
            tx_blob: format!("STUB-BLOB-{}-{}", descriptor.account_sequence, n),
            tx_hash: format!("STUB-HASH-{}", n),
            expiry_ledger_index: descriptor.expiry_ledger_index,
        })
    }

    async fn submit_reliable(&self, _signed: &SignedAttestation) -> Result<SubmissionResult, LedgerError> {
        lock(&self.counters).submit += 1;

        lock(&self.submit_script)
            .pop_front()
            .unwrap_or_else(|| Ok(SubmissionResult::success(Utc::now())))
    }
}

// =============================================================================
// Recording Metrics
// =============================================================================

/// Metrics sink that remembers every recorded price.
#[derive(Default)]
pub struct RecordingMetrics {
    recorded: Mutex<Vec<(IssuedCurrency, Decimal)>>,
}

impl RecordingMetrics {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prices recorded so far.
    pub fn recorded(&self) -> Vec<(IssuedCurrency, Decimal)> {
        lock(&self.recorded).clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record_price(&self, currency: &IssuedCurrency, price: Decimal) {
        lock(&self.recorded).push((currency.clone(), price));
    }
}

// =============================================================================
// Tests
// =============================================================================
