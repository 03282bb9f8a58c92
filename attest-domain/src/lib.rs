//! Price Attestation Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains value objects, evidence encoding, and attestation assembly.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod attestation;
pub mod credentials;
pub mod evidence;
pub mod value_objects;

// Re-export commonly used types
pub use attestation::{
    AttestationAssembler, AttestationDescriptor, IssuedCurrency, LedgerSnapshot, Network,
    EXPIRY_LOOKAHEAD,
};
pub use credentials::WalletCredentials;
pub use evidence::{
    evidence_digest, EvidenceBuilder, EvidenceRecord, PriceSample, BUILD_ID_TAG, CSV_FORMAT,
    TEXT_FORMAT,
};
pub use value_objects::{validate_price, AttestedPrice, DomainError};
