//! Value Objects for the attestation domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum significant digits of an issued-currency value on the ledger.
pub const MAX_SIGNIFICANT_DIGITS: u32 = 15;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price is non-finite, non-positive, or not representable on the ledger
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Two evidence records would carry the same source tag
    #[error("Duplicate evidence source tag: {0}")]
    DuplicateSourceTag(String),

    /// Unknown ledger network name
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// Missing or malformed signing credentials
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

// =============================================================================
// AttestedPrice
// =============================================================================

/// A consensus price that is safe to attest.
///
/// # Invariants
/// - Must be > 0
/// - At most [`MAX_SIGNIFICANT_DIGITS`] significant digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttestedPrice(Decimal);

impl AttestedPrice {
    /// Create a new AttestedPrice with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidValue` if value <= 0 or carries more
    /// precision than the ledger accepts
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        validate_price(value)?;
        Ok(Self(value.normalize()))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Ledger string form (no trailing zeros, no exponent).
    pub fn to_ledger_string(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for AttestedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that a consensus price can be attested.
///
/// Split out from [`AttestedPrice::new`] so callers can reject a bad
/// aggregator value before doing any network work.
pub fn validate_price(value: Decimal) -> Result<(), DomainError> {
    if value <= Decimal::ZERO {
        return Err(DomainError::InvalidValue(format!("Price must be positive, got {}", value)));
    }

    let digits = significant_digits(value);
    if digits > MAX_SIGNIFICANT_DIGITS {
        return Err(DomainError::InvalidValue(format!(
            "Price {} has {} significant digits, ledger allows {}",
            value, digits, MAX_SIGNIFICANT_DIGITS
        )));
    }

    Ok(())
}

fn significant_digits(value: Decimal) -> u32 {
    let mut mantissa = value.normalize().mantissa().unsigned_abs();
    let mut digits = 0;
    while mantissa > 0 {
        mantissa /= 10;
        digits += 1;
    }
    digits
}

// =============================================================================
// Tests
// =============================================================================
