//! Attestation descriptor and its assembler.
//!
//! The descriptor is everything the ledger needs to record one round's
//! price, before signing. It is built fresh each round and consumed once.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::evidence::EvidenceRecord;
use crate::value_objects::{AttestedPrice, DomainError};

/// Ledgers after the current validated ledger in which the attestation may
/// still be included.
pub const EXPIRY_LOOKAHEAD: u32 = 4;

// =============================================================================
// Network
// =============================================================================

/// Ledger network the attestation is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    /// Production ledger
    Mainnet,
    /// Public test ledger
    Testnet,
}

impl Network {
    /// Currency/issuer pair the price is attested under on this network.
    pub fn issued_currency(&self) -> IssuedCurrency {
        match self {
            Network::Mainnet => IssuedCurrency {
                currency: "USD".to_string(),
                issuer: "r9PfV3sQpKLWxccdg3HL2FXKxGW2orAcLE".to_string(),
            },
            Network::Testnet => IssuedCurrency {
                currency: "FOO".to_string(),
                issuer: "rPWkTSpLJ2bumVKngjaeznSUUp4wj6tGuK".to_string(),
            },
        }
    }
}

impl FromStr for Network {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(DomainError::InvalidNetwork(format!(
                "{}. Expected: Mainnet, Testnet",
                other
            ))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "Mainnet"),
            Network::Testnet => write!(f, "Testnet"),
        }
    }
}

/// Currency code plus issuing account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssuedCurrency {
    /// Three-letter currency code
    pub currency: String,
    /// Issuer classic address
    pub issuer: String,
}

// =============================================================================
// Ledger Snapshot
// =============================================================================

/// Account and ledger state fetched immediately before assembly.
///
/// Never cached across rounds: a stale sequence or ledger index turns into
/// `tefPAST_SEQ` or an expired transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Attesting account
    pub account_id: String,
    /// Fee quote in drops
    pub fee_drops: u64,
    /// Latest validated ledger index
    pub validated_ledger_index: u32,
    /// Next usable account sequence
    pub account_sequence: u32,
    /// Network-selected currency/issuer
    pub currency: IssuedCurrency,
}

// =============================================================================
// Attestation Descriptor
// =============================================================================

/// Unsigned attestation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationDescriptor {
    /// Attesting account
    pub account_id: String,
    /// Currency code of the attested pair
    pub currency_code: String,
    /// Issuer of the attested pair
    pub issuer_id: String,
    /// Price in ledger string form
    pub value: String,
    /// Fee in drops
    pub fee_drops: u64,
    /// Last ledger in which the transaction may be included
    pub expiry_ledger_index: u32,
    /// Account sequence consumed by this transaction
    pub account_sequence: u32,
    /// Evidence records, build-identifier record last
    pub evidence: Vec<EvidenceRecord>,
}

/// Builds [`AttestationDescriptor`]s. Pure construction, no I/O.
pub struct AttestationAssembler;

impl AttestationAssembler {
    /// Assemble an unsigned attestation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidValue` if the price is not attestable.
    pub fn assemble(
        price: Decimal,
        evidence: Vec<EvidenceRecord>,
        snapshot: &LedgerSnapshot,
    ) -> Result<AttestationDescriptor, DomainError> {
        let price = AttestedPrice::new(price)?;

        let expiry_ledger_index = snapshot
            .validated_ledger_index
            .checked_add(EXPIRY_LOOKAHEAD)
            .ok_or_else(|| {
                DomainError::InvalidValue(format!(
                    "Ledger index {} too large for expiry",
                    snapshot.validated_ledger_index
                ))
            })?;

        Ok(AttestationDescriptor {
            account_id: snapshot.account_id.clone(),
            currency_code: snapshot.currency.currency.clone(),
            issuer_id: snapshot.currency.issuer.clone(),
            value: price.to_ledger_string(),
            fee_drops: snapshot.fee_drops,
            expiry_ledger_index,
            account_sequence: snapshot.account_sequence,
            evidence,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
