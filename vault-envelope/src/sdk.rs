//! Public API surface — frozen.
//!
//! # API Stability Promise
//!
//! These exports are stable across minor versions:
//! - `VaultCrypto` — the envelope cryptography engine (C1)
//! - `WrappedKey` — tagged per-recipient key envelope
//! - `EnvelopeError` — uniform error type
//!
//! Internal modules (`wire`, `kdf`, `aead`, `x25519_wrap`, `rsa_wrap`) are not
//! part of the public API and may change without notice.

use core::fmt;

pub use crate::envelope::WrappedKey;
pub use crate::error::EnvelopeError;

use crate::envelope;
use crate::wire::{CEK_BYTES, MIN_PACKAGE_BYTES};

/// Envelope cryptography engine: CEK generation, content AEAD, and the two
/// key-wrap primitives (X25519 + HKDF-SHA256 + AES-256-GCM, or RSA-OAEP).
///
/// # Example
///
/// ```ignore
/// use vault_envelope::VaultCrypto;
///
/// let crypto = VaultCrypto::new();
/// let cek = crypto.generate_cek()?;
/// let package = crypto.encrypt(b"patient record bytes", &cek)?;
/// let plaintext = crypto.decrypt(&package, &cek)?;
/// assert_eq!(plaintext, b"patient record bytes");
/// ```
#[derive(Default)]
pub struct VaultCrypto;

impl VaultCrypto {
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh 32-byte content-encryption key.
    pub fn generate_cek(&self) -> Result<[u8; CEK_BYTES], EnvelopeError> {
        envelope::generate_cek()
    }

    /// Authenticated-encrypt `plaintext` under `cek`. Layout: `IV || Tag || Ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8], cek: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        envelope::encrypt(plaintext, cek)
    }

    /// Authenticated-decrypt a package produced by [`Self::encrypt`].
    pub fn decrypt(&self, package: &[u8], cek: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        envelope::decrypt(package, cek)
    }

    /// Wrap a CEK for a recipient's X25519 static public key.
    pub fn wrap_x25519(&self, cek: &[u8], recipient_pub: &[u8; 32]) -> Result<WrappedKey, EnvelopeError> {
        WrappedKey::wrap_x25519(cek, recipient_pub)
    }

    /// Unwrap an X25519-tagged envelope using the recipient's static secret.
    pub fn unwrap_x25519(&self, wrapped: &WrappedKey, recipient_secret: &[u8; 32]) -> Result<[u8; CEK_BYTES], EnvelopeError> {
        wrapped.unwrap_x25519(recipient_secret)
    }

    /// Wrap a CEK under an RSA-OAEP-SHA256 public key (legacy path).
    pub fn wrap_rsa(&self, cek: &[u8], recipient_pub: &rsa::RsaPublicKey) -> Result<WrappedKey, EnvelopeError> {
        WrappedKey::wrap_rsa(cek, recipient_pub)
    }

    /// Unwrap an RSA-tagged envelope using the recipient's private key.
    pub fn unwrap_rsa(&self, wrapped: &WrappedKey, recipient_secret: &rsa::RsaPrivateKey) -> Result<[u8; CEK_BYTES], EnvelopeError> {
        wrapped.unwrap_rsa(recipient_secret)
    }

    /// Lowercase hex SHA-256 digest, used for CID binding.
    pub fn sha256_hex(&self, bytes: &[u8]) -> String {
        envelope::sha256_hex(bytes)
    }
}

/// Package metadata derivable without decryption (for logging/ops).
#[derive(Debug, Clone, Copy)]
pub struct PackageInfo {
    pub total_bytes: usize,
    pub plaintext_bytes: usize,
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "package: {} bytes ({} plaintext)", self.total_bytes, self.plaintext_bytes)
    }
}

/// Inspect a package's size without decrypting it. Never reveals plaintext.
pub fn inspect(package: &[u8]) -> Result<PackageInfo, EnvelopeError> {
    if package.len() < MIN_PACKAGE_BYTES {
        return Err(crate::error::EncodingError.into());
    }
    Ok(PackageInfo {
        total_bytes: package.len(),
        plaintext_bytes: package.len() - MIN_PACKAGE_BYTES,
    })
}

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum package size in bytes (IV + tag, empty plaintext).
pub const MIN_PACKAGE_BYTES_CONST: usize = crate::wire::MIN_PACKAGE_BYTES;
