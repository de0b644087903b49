//! Envelope facade: CEK generation, content encryption, and the tagged
//! wrapped-key envelope that lets a decryptor pick the right unwrap path
//! without guessing from shape or length.

use sha2::{Digest, Sha256};

use crate::aead::{aead_open, aead_seal, nonce};
use crate::error::{BadInputError, EncodingError, EnvelopeError};
use crate::rsa_wrap;
use crate::wire::{join_package, split_package, CEK_BYTES};
use crate::x25519_wrap::{self, X25519Wrapped};

/// Generate a fresh 32-byte content-encryption key from a CSPRNG.
pub fn generate_cek() -> Result<[u8; CEK_BYTES], EnvelopeError> {
    let mut cek = [0u8; CEK_BYTES];
    getrandom::getrandom(&mut cek).map_err(|_| EncodingError)?;
    Ok(cek)
}

/// Authenticated-encrypt `plaintext` under `cek`. Returns `IV(12) || Tag(16) || Ciphertext`.
pub fn encrypt(plaintext: &[u8], cek: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    if cek.len() != CEK_BYTES {
        return Err(BadInputError("CEK must be 32 bytes").into());
    }
    let key: [u8; CEK_BYTES] = cek.try_into().unwrap();
    let iv = nonce()?;
    let ct = aead_seal(&key, &iv, plaintext, &[])?;
    Ok(join_package(&iv, &ct))
}

/// Authenticated-decrypt a package produced by [`encrypt`].
pub fn decrypt(package: &[u8], cek: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    if cek.len() != CEK_BYTES {
        return Err(BadInputError("CEK must be 32 bytes").into());
    }
    let key: [u8; CEK_BYTES] = cek.try_into().unwrap();
    let (iv, tag_and_ct) = split_package(package)?;
    let pt = aead_open(&key, iv, tag_and_ct, &[])?;
    Ok(pt)
}

/// Lowercase hex SHA-256 digest of arbitrary bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// A wrapped copy of a CEK for one recipient, tagged by which primitive
/// produced it. The tag travels with the envelope; it is never inferred.
#[derive(Clone, Debug)]
pub enum WrappedKey {
    X25519 {
        ephemeral_public_key: [u8; 32],
        ciphertext: Vec<u8>,
    },
    Rsa {
        ciphertext: Vec<u8>,
    },
}

impl WrappedKey {
    pub fn wrap_x25519(cek: &[u8], recipient_pub: &[u8; 32]) -> Result<Self, EnvelopeError> {
        let wrapped = x25519_wrap::wrap(cek, recipient_pub)?;
        Ok(Self::X25519 {
            ephemeral_public_key: wrapped.ephemeral_public_key,
            ciphertext: wrapped.ciphertext,
        })
    }

    pub fn wrap_rsa(cek: &[u8], recipient_pub: &rsa::RsaPublicKey) -> Result<Self, EnvelopeError> {
        let ciphertext = rsa_wrap::wrap(cek, recipient_pub)?;
        Ok(Self::Rsa { ciphertext })
    }

    pub fn unwrap_x25519(&self, recipient_secret: &[u8; 32]) -> Result<[u8; CEK_BYTES], EnvelopeError> {
        match self {
            Self::X25519 {
                ephemeral_public_key,
                ciphertext,
            } => x25519_wrap::unwrap(
                &X25519Wrapped {
                    ephemeral_public_key: *ephemeral_public_key,
                    ciphertext: ciphertext.clone(),
                },
                recipient_secret,
            ),
            Self::Rsa { .. } => Err(BadInputError("envelope is RSA-tagged, not X25519").into()),
        }
    }

    pub fn unwrap_rsa(&self, recipient_secret: &rsa::RsaPrivateKey) -> Result<[u8; CEK_BYTES], EnvelopeError> {
        match self {
            Self::Rsa { ciphertext } => rsa_wrap::unwrap(ciphertext, recipient_secret),
            Self::X25519 { .. } => Err(BadInputError("envelope is X25519-tagged, not RSA").into()),
        }
    }
}
