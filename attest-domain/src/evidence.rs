//! Evidence records attached to each attestation.
//!
//! Evidence is the public audit trail: third parties replay the per-exchange
//! samples to verify the attested price, so the encoding must be byte-stable
//! for a given input.
//!
//! # Encoding
//!
//! | source tag             | payload                               | format       |
//! |------------------------|---------------------------------------|--------------|
//! | `rates:<EXCHANGE>`     | samples joined by `;`, 5 fraction digits | `text/csv` |
//! | `oracle:GITSHA`        | build identifier verbatim             | `text/plain` |

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::value_objects::DomainError;

/// Prefix of every per-exchange source tag.
pub const RATES_TAG_PREFIX: &str = "rates:";
/// Reserved source tag of the trailing build-identifier record.
pub const BUILD_ID_TAG: &str = "oracle:GITSHA";
/// Format tag of per-exchange records.
pub const CSV_FORMAT: &str = "text/csv";
/// Format tag of the build-identifier record.
pub const TEXT_FORMAT: &str = "text/plain";
/// Separator between encoded samples.
pub const SAMPLE_DELIMITER: &str = ";";
/// Fractional digits of each encoded sample.
pub const SAMPLE_SCALE: u32 = 5;

// =============================================================================
// Types
// =============================================================================

/// Raw samples one exchange contributed to a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Exchange name as reported by the aggregator (e.g. "bitstamp")
    pub exchange_name: String,
    /// Samples in collection order
    pub values: Vec<Decimal>,
}

impl PriceSample {
    /// Create a new sample set.
    pub fn new(exchange_name: impl Into<String>, values: Vec<Decimal>) -> Self {
        Self { exchange_name: exchange_name.into(), values }
    }
}

/// An auditable annotation attached to the attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Unique within a round
    pub source_tag: String,
    /// UTF-8 text payload
    pub encoded_payload: Vec<u8>,
    /// MIME-like format tag
    pub format: String,
}

impl EvidenceRecord {
    /// Create a record from text parts.
    pub fn new(
        source_tag: impl Into<String>,
        payload: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            source_tag: source_tag.into(),
            encoded_payload: payload.into().into_bytes(),
            format: format.into(),
        }
    }
}

// =============================================================================
// Evidence Builder
// =============================================================================

/// Turns aggregator samples plus a build identifier into evidence records.
pub struct EvidenceBuilder;

impl EvidenceBuilder {
    /// Build the evidence sequence for a round.
    ///
    /// One record per exchange, ordered by source tag, followed by exactly
    /// one build-identifier record.
    ///
    /// # Errors
    /// Returns `DomainError::DuplicateSourceTag` when two exchange names
    /// collide after uppercasing.
    pub fn build(samples: &[PriceSample], build_id: &str) -> Result<Vec<EvidenceRecord>, DomainError> {
        let mut by_tag: BTreeMap<String, &PriceSample> = BTreeMap::new();

        for sample in samples {
            let tag = source_tag_for(&sample.exchange_name);
            if by_tag.insert(tag.clone(), sample).is_some() {
                return Err(DomainError::DuplicateSourceTag(tag));
            }
        }

        let mut records = Vec::with_capacity(by_tag.len() + 1);
        for (tag, sample) in by_tag {
            records.push(EvidenceRecord::new(tag, encode_samples(&sample.values), CSV_FORMAT));
        }
        records.push(EvidenceRecord::new(BUILD_ID_TAG, build_id, TEXT_FORMAT));

        Ok(records)
    }
}

/// Source tag for an exchange, e.g. `rates:BITSTAMP`.
pub fn source_tag_for(exchange_name: &str) -> String {
    format!("{}{}", RATES_TAG_PREFIX, exchange_name.to_uppercase())
}

/// Encode samples as `;`-joined fixed-point text.
pub fn encode_samples(values: &[Decimal]) -> String {
    values.iter().map(|v| format_sample(*v)).collect::<Vec<_>>().join(SAMPLE_DELIMITER)
}

fn format_sample(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(SAMPLE_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(SAMPLE_SCALE);
    rounded.to_string()
}

/// SHA-256 over the evidence sequence, hex encoded.
///
/// Used in logs to tie a round's outcome to its exact evidence.
pub fn evidence_digest(records: &[EvidenceRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.source_tag.as_bytes());
        hasher.update([0u8]);
        hasher.update(&record.encoded_payload);
        hasher.update([0u8]);
        hasher.update(record.format.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

// =============================================================================
// Tests
// =============================================================================
