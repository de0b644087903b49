//! Error types for the envelope crate.
//!
//! Kept intentionally narrow: this crate only ever fails in the ways a
//! cryptographic primitive can fail. Callers that need the full closed
//! taxonomy (BadInput, Unauthorized, ...) map these at the boundary.

use core::fmt;

/// Something about an input was structurally wrong before any crypto ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadInputError(pub &'static str);

impl fmt::Display for BadInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad input: {}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BadInputError {}

/// A package or envelope was too short or failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodingError;

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed envelope or package")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodingError {}

/// AEAD tag verification failed, or key material was rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecryptionError;

impl fmt::Display for DecryptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decryption failed")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecryptionError {}

impl From<EncodingError> for DecryptionError {
    fn from(_: EncodingError) -> Self {
        DecryptionError
    }
}

/// HKDF expand rejected the requested output length. HKDF-SHA256 expanding
/// to 32 bytes never actually hits this, but the call is fallible by
/// construction so we propagate a typed error rather than unwrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KdfError;

impl fmt::Display for KdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key derivation failed")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for KdfError {}

/// Closed set of ways an envelope operation can fail, mirroring the
/// `CryptoFailed.*` branch of the engine's error taxonomy.
#[derive(Debug)]
pub enum EnvelopeError {
    BadInput(BadInputError),
    Malformed(EncodingError),
    AuthFailed(DecryptionError),
    KdfFailed(KdfError),
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadInput(e) => e.fmt(f),
            Self::Malformed(e) => e.fmt(f),
            Self::AuthFailed(e) => e.fmt(f),
            Self::KdfFailed(e) => e.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EnvelopeError {}

impl From<BadInputError> for EnvelopeError {
    fn from(e: BadInputError) -> Self {
        Self::BadInput(e)
    }
}
impl From<EncodingError> for EnvelopeError {
    fn from(e: EncodingError) -> Self {
        Self::Malformed(e)
    }
}
impl From<DecryptionError> for EnvelopeError {
    fn from(e: DecryptionError) -> Self {
        Self::AuthFailed(e)
    }
}
impl From<KdfError> for EnvelopeError {
    fn from(e: KdfError) -> Self {
        Self::KdfFailed(e)
    }
}
