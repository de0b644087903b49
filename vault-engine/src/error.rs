//! The closed error taxonomy. Every fallible operation in the engine
//! returns one of these variants; only a programmer-level invariant
//! violation is allowed to unwind instead.

use std::fmt;
use std::time::Duration;

/// The sub-classes of `CryptoFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoFailure {
    AuthFailed,
    Malformed,
    KeyLength,
    KdfFailed,
}

impl fmt::Display for CryptoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthFailed => write!(f, "auth-tag verification failed"),
            Self::Malformed => write!(f, "malformed ciphertext or envelope"),
            Self::KeyLength => write!(f, "key has the wrong length"),
            Self::KdfFailed => write!(f, "key derivation failed"),
        }
    }
}

impl From<vault_envelope::EnvelopeError> for CryptoFailure {
    fn from(e: vault_envelope::EnvelopeError) -> Self {
        match e {
            vault_envelope::EnvelopeError::BadInput(_) => CryptoFailure::KeyLength,
            vault_envelope::EnvelopeError::Malformed(_) => CryptoFailure::Malformed,
            vault_envelope::EnvelopeError::AuthFailed(_) => CryptoFailure::AuthFailed,
            vault_envelope::EnvelopeError::KdfFailed(_) => CryptoFailure::KdfFailed,
        }
    }
}

/// Closed taxonomy returned by every vault operation.
#[derive(Debug)]
pub enum VaultError {
    BadInput(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Denied(String),
    RateLimited { retry_after: Duration },
    CryptoFailed(CryptoFailure),
    StorageUnavailable(String),
    OracleUnavailable(String),
    Timeout,
    Inconsistent(String),
    Internal(String),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadInput(m) => write!(f, "bad input: {}", m),
            Self::Unauthorized(m) => write!(f, "unauthorized: {}", m),
            Self::NotFound(m) => write!(f, "not found: {}", m),
            Self::Conflict(m) => write!(f, "conflict: {}", m),
            Self::Denied(m) => write!(f, "denied: {}", m),
            Self::RateLimited { retry_after } => {
                write!(f, "rate limited, retry after {:?}", retry_after)
            }
            Self::CryptoFailed(c) => write!(f, "crypto failed: {}", c),
            Self::StorageUnavailable(m) => write!(f, "storage unavailable: {}", m),
            Self::OracleUnavailable(m) => write!(f, "oracle unavailable: {}", m),
            Self::Timeout => write!(f, "operation timed out"),
            Self::Inconsistent(m) => write!(f, "inconsistent state: {}", m),
            Self::Internal(m) => write!(f, "internal error: {}", m),
        }
    }
}

impl std::error::Error for VaultError {}

impl From<vault_envelope::EnvelopeError> for VaultError {
    fn from(e: vault_envelope::EnvelopeError) -> Self {
        Self::CryptoFailed(e.into())
    }
}

/// Result of an idempotent `revoke` against an actor not present in
/// `wrapped_keys`: not an error, a distinct successful outcome.
#[derive(Debug)]
pub enum RevokeOutcome {
    Rotated {
        new_cid: String,
        new_cid_hash: String,
        epoch: u64,
    },
    NoOp,
}
