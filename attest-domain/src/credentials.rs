//! Signing credentials for the attesting account.
//!
//! The secret is held in memory only and must:
//! - Never be logged
//! - Never be serialized
//! - Be zeroized when dropped

use std::fmt;
use zeroize::{Zeroize, Zeroizing};

use crate::value_objects::DomainError;

/// Account address plus the secret the ledger node signs with.
#[derive(Clone)]
pub struct WalletCredentials {
    /// Classic address of the attesting account
    pub account_id: String,
    /// Signing secret (seed)
    secret: Zeroizing<String>,
}

impl WalletCredentials {
    /// Create credentials, rejecting empty parts.
    pub fn new(account_id: impl Into<String>, secret: impl Into<String>) -> Result<Self, DomainError> {
        let account_id = account_id.into();
        let secret = Zeroizing::new(secret.into());

        if account_id.trim().is_empty() {
            return Err(DomainError::InvalidCredentials("Account id is empty".to_string()));
        }
        if secret.trim().is_empty() {
            return Err(DomainError::InvalidCredentials("Secret is empty".to_string()));
        }

        Ok(Self { account_id, secret })
    }

    /// Expose the secret for a signing request.
    pub fn expose_secret(&self) -> &str {
        self.secret.as_str()
    }
}

impl fmt::Debug for WalletCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCredentials")
            .field("account_id", &self.account_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Zeroize for WalletCredentials {
    fn zeroize(&mut self) {
        self.secret.zeroize();
    }
}
