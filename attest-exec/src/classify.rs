//! Submission outcome classification.
//!
//! Backend failure codes are matched by prefix against a fixed, ordered
//! table. The first matching row wins, so more specific prefixes must come
//! before broader ones. Anything unmatched falls through to
//! [`BackendCode::Other`].
//!
//! | prefix           | outcome        | disposition          |
//! |------------------|----------------|----------------------|
//! | (success flag)   | `Success`      | `Success`            |
//! | `telINSUF_FEE_P` | `FeeTooLow`    | `RetryRequested`     |
//! | `tefPAST_SEQ`    | `PastDeadline` | `RetryRequested`     |
//! | `terQUEUED`      | `Queued`       | `SilentRetryDeferred`|
//! | anything else    | `UnknownFailure` | `RetryRequested`   |
//! | undecodable body | `MalformedResponse` | `RetryRequested`|

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LedgerError;
use crate::ports::SubmissionResult;

// =============================================================================
// Backend Codes
// =============================================================================

/// Backend failure codes the retry policy distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCode {
    /// Fee below the open-ledger requirement
    InsufficientFee,
    /// Sequence already consumed or transaction past its window
    PastSequence,
    /// Accepted into the node's queue
    Queued,
    /// Anything not listed above
    Other(String),
}

/// Evaluated top to bottom.
const PREFIX_TABLE: [(&str, BackendCode); 3] = [
    ("telINSUF_FEE_P", BackendCode::InsufficientFee),
    ("tefPAST_SEQ", BackendCode::PastSequence),
    ("terQUEUED", BackendCode::Queued),
];

impl BackendCode {
    /// Classify a raw result code by prefix.
    pub fn parse(code: &str) -> Self {
        for (prefix, known) in &PREFIX_TABLE {
            if code.starts_with(prefix) {
                return known.clone();
            }
        }
        BackendCode::Other(code.to_string())
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Classified result of the submit step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    /// Effect landed on the ledger
    Success {
        /// Close time of the validating ledger, when reported
        confirmed_at: Option<DateTime<Utc>>,
    },
    /// Backend queued the transaction; resubmitting would double-submit
    Queued,
    /// Missed the expiry window; rebuild with fresh sequence and expiry
    PastDeadline,
    /// Fee market moved; rebuild with a fresh fee quote
    FeeTooLow,
    /// Backend response could not be decoded
    MalformedResponse(String),
    /// Network or RPC fault during the submit step
    Transport(String),
    /// Unanticipated backend code
    UnknownFailure(String),
}

impl SubmissionOutcome {
    /// Classify what the ledger client returned.
    pub fn classify(result: &Result<SubmissionResult, LedgerError>) -> Self {
        match result {
            Ok(res) if res.success => SubmissionOutcome::Success { confirmed_at: res.confirmed_at },
            Ok(res) => match BackendCode::parse(&res.result_code) {
                BackendCode::InsufficientFee => SubmissionOutcome::FeeTooLow,
                BackendCode::PastSequence => SubmissionOutcome::PastDeadline,
                BackendCode::Queued => SubmissionOutcome::Queued,
                BackendCode::Other(code) => SubmissionOutcome::UnknownFailure(match &res.result_message {
                    Some(message) => format!("{}: {}", code, message),
                    None => code,
                }),
            },
            Err(LedgerError::MalformedResponse(detail)) => {
                SubmissionOutcome::MalformedResponse(detail.clone())
            },
            Err(LedgerError::Transport(detail)) => SubmissionOutcome::Transport(detail.clone()),
        }
    }

    /// What the caller should do next.
    ///
    /// The classification table never yields `Fatal`; that is reserved for
    /// input errors found before submission.
    pub fn disposition(&self) -> Disposition {
        match self {
            SubmissionOutcome::Success { .. } => Disposition::Success,
            SubmissionOutcome::Queued => Disposition::SilentRetryDeferred,
            SubmissionOutcome::PastDeadline
            | SubmissionOutcome::FeeTooLow
            | SubmissionOutcome::MalformedResponse(_)
            | SubmissionOutcome::Transport(_)
            | SubmissionOutcome::UnknownFailure(_) => Disposition::RetryRequested,
        }
    }

    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionOutcome::Success { .. } => "success",
            SubmissionOutcome::Queued => "queued",
            SubmissionOutcome::PastDeadline => "past_deadline",
            SubmissionOutcome::FeeTooLow => "fee_too_low",
            SubmissionOutcome::MalformedResponse(_) => "malformed_response",
            SubmissionOutcome::Transport(_) => "transport",
            SubmissionOutcome::UnknownFailure(_) => "unknown_failure",
        }
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionOutcome::MalformedResponse(detail)
            | SubmissionOutcome::Transport(detail)
            | SubmissionOutcome::UnknownFailure(detail) => write!(f, "{}: {}", self.as_str(), detail),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

// =============================================================================
// Disposition
// =============================================================================

/// Terminal state of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// Attestation landed
    Success,
    /// Attestation in flight; do not resubmit
    SilentRetryDeferred,
    /// Transient failure; re-invoking is expected and safe
    RetryRequested,
    /// Input error; re-invoking will not help
    Fatal,
}

impl Disposition {
    /// Nothing further is needed this round.
    pub fn is_completed(&self) -> bool {
        matches!(self, Disposition::Success | Disposition::SilentRetryDeferred)
    }

    /// Signal surfaced to the scheduler.
    pub fn scheduler_signal(&self) -> SchedulerSignal {
        match self {
            Disposition::Success | Disposition::SilentRetryDeferred => SchedulerSignal::Succeeded,
            Disposition::RetryRequested => SchedulerSignal::RetryMe,
            Disposition::Fatal => SchedulerSignal::Fatal,
        }
    }
}

/// What the scheduler sees for an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerSignal {
    /// Invocation succeeded, do not re-invoke
    Succeeded,
    /// Invocation failed, re-invoke is expected and safe
    RetryMe,
    /// Invocation failed, needs operator intervention
    Fatal,
}

impl SchedulerSignal {
    /// Process exit code for one-shot invocations.
    pub fn exit_code(&self) -> i32 {
        match self {
            SchedulerSignal::Succeeded => 0,
            SchedulerSignal::RetryMe => 1,
            SchedulerSignal::Fatal => 2,
        }
    }

    /// Whether the scheduler sees a failure.
    pub fn is_failure(&self) -> bool {
        !matches!(self, SchedulerSignal::Succeeded)
    }
}

impl fmt::Display for SchedulerSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerSignal::Succeeded => write!(f, "succeeded"),
            SchedulerSignal::RetryMe => write!(f, "retry-me"),
            SchedulerSignal::Fatal => write!(f, "fatal"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_code(code: &str) -> SubmissionOutcome {
        SubmissionOutcome::classify(&Ok(SubmissionResult::failure(code)))
    }

    #[test]
    fn test_prefix_match_not_exact() {
        assert_eq!(classify_code("telINSUF_FEE_P123"), SubmissionOutcome::FeeTooLow);
        assert_eq!(classify_code("telINSUF_FEE_P"), SubmissionOutcome::FeeTooLow);
    }

    #[test]
    fn test_backend_code_parse() {
        assert_eq!(BackendCode::parse("telINSUF_FEE_P"), BackendCode::InsufficientFee);
        assert_eq!(BackendCode::parse("tefPAST_SEQ"), BackendCode::PastSequence);
        assert_eq!(BackendCode::parse("terQUEUED"), BackendCode::Queued);
        assert_eq!(BackendCode::parse("tecNO_LINE"), BackendCode::Other("tecNO_LINE".to_string()));
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(classify_code("tefPAST_SEQ"), SubmissionOutcome::PastDeadline);
        assert_eq!(classify_code("terQUEUED"), SubmissionOutcome::Queued);
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(
            classify_code("tecFOOBAR"),
            SubmissionOutcome::UnknownFailure("tecFOOBAR".to_string())
        );
        // Near miss of a known prefix is not a match
        assert!(matches!(classify_code("telINSUF_FEE"), SubmissionOutcome::UnknownFailure(_)));
        assert!(matches!(classify_code(""), SubmissionOutcome::UnknownFailure(_)));
    }

    #[test]
    fn test_unknown_code_keeps_message() {
        let mut result = SubmissionResult::failure("tecNO_LINE");
        result.result_message = Some("No such line.".to_string());

        assert_eq!(
            SubmissionOutcome::classify(&Ok(result)),
            SubmissionOutcome::UnknownFailure("tecNO_LINE: No such line.".to_string())
        );
    }

    #[test]
    fn test_success_flag_wins_over_code() {
        let now = Utc::now();
        let mut result = SubmissionResult::success(now);
        result.result_code = "terQUEUED".to_string();

        assert_eq!(
            SubmissionOutcome::classify(&Ok(result)),
            SubmissionOutcome::Success { confirmed_at: Some(now) }
        );
    }

    #[test]
    fn test_ledger_errors() {
        assert_eq!(
            SubmissionOutcome::classify(&Err(LedgerError::MalformedResponse("eof".into()))),
            SubmissionOutcome::MalformedResponse("eof".to_string())
        );
        assert_eq!(
            SubmissionOutcome::classify(&Err(LedgerError::Transport("timeout".into()))),
            SubmissionOutcome::Transport("timeout".to_string())
        );
    }

    #[test]
    fn test_dispositions() {
        assert_eq!(
            SubmissionOutcome::Success { confirmed_at: None }.disposition(),
            Disposition::Success
        );
        assert_eq!(SubmissionOutcome::Queued.disposition(), Disposition::SilentRetryDeferred);
        assert_eq!(SubmissionOutcome::FeeTooLow.disposition(), Disposition::RetryRequested);
        assert_eq!(SubmissionOutcome::PastDeadline.disposition(), Disposition::RetryRequested);
        assert_eq!(
            SubmissionOutcome::MalformedResponse(String::new()).disposition(),
            Disposition::RetryRequested
        );
        assert_eq!(
            SubmissionOutcome::UnknownFailure(String::new()).disposition(),
            Disposition::RetryRequested
        );
    }

    #[test]
    fn test_scheduler_signals() {
        assert_eq!(Disposition::Success.scheduler_signal(), SchedulerSignal::Succeeded);
        assert_eq!(Disposition::SilentRetryDeferred.scheduler_signal(), SchedulerSignal::Succeeded);
        assert_eq!(Disposition::RetryRequested.scheduler_signal(), SchedulerSignal::RetryMe);
        assert_eq!(Disposition::Fatal.scheduler_signal(), SchedulerSignal::Fatal);

        assert_eq!(SchedulerSignal::Succeeded.exit_code(), 0);
        assert_eq!(SchedulerSignal::RetryMe.exit_code(), 1);
        assert_eq!(SchedulerSignal::Fatal.exit_code(), 2);
        assert!(SchedulerSignal::Fatal.is_failure());
        assert_eq!(SchedulerSignal::RetryMe.to_string(), "retry-me");
    }
}
