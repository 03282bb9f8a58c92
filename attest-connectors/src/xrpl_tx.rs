//! XRPL transaction JSON for attestations.
//!
//! An attestation is a `TrustSet` whose `LimitAmount.value` carries the
//! price. Evidence records travel as memos, every field hex encoded.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use attest_domain::{AttestationDescriptor, EvidenceRecord};

/// `tfSetNoRipple` flag of `TrustSet`.
pub const TF_SET_NO_RIPPLE: u32 = 0x0002_0000;

/// Seconds between the Unix epoch and the ripple epoch (2000-01-01).
pub const RIPPLE_EPOCH_OFFSET: i64 = 946_684_800;

/// Build the unsigned `tx_json` for an attestation.
pub fn trust_set_tx_json(descriptor: &AttestationDescriptor) -> Value {
    json!({
        "TransactionType": "TrustSet",
        "Account": descriptor.account_id,
        "Fee": descriptor.fee_drops.to_string(),
        "Flags": TF_SET_NO_RIPPLE,
        "Sequence": descriptor.account_sequence,
        "LastLedgerSequence": descriptor.expiry_ledger_index,
        "LimitAmount": {
            "currency": descriptor.currency_code,
            "issuer": descriptor.issuer_id,
            "value": descriptor.value,
        },
        "Memos": descriptor.evidence.iter().map(memo_json).collect::<Vec<_>>(),
    })
}

fn memo_json(record: &EvidenceRecord) -> Value {
    json!({
        "Memo": {
            "MemoType": hex::encode_upper(record.source_tag.as_bytes()),
            "MemoData": hex::encode_upper(&record.encoded_payload),
            "MemoFormat": hex::encode_upper(record.format.as_bytes()),
        }
    })
}

/// Convert a ripple-epoch timestamp to UTC.
pub fn ripple_time_to_utc(ripple_seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ripple_seconds + RIPPLE_EPOCH_OFFSET, 0)
}
