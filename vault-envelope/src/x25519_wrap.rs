//! X25519 key-wrap path.
//!
//! `wrap`: generate an ephemeral X25519 key pair, ECDH against the
//! recipient's static public key, derive a KEK via HKDF-SHA256, then
//! AES-256-GCM-wrap the CEK under a fresh 12-byte IV.
//!
//! `unwrap`: rederive the same KEK from the recipient's static secret and
//! the sender's ephemeral public key, then open the wrap.

use rand_core::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::aead::{aead_open, aead_seal, nonce};
use crate::error::{BadInputError, EnvelopeError};
use crate::kdf::derive_kek;
use crate::wire::{CEK_BYTES, IV_BYTES, X25519_KEY_BYTES, X25519_WRAP_CT_BYTES};

/// An X25519 wrapped-key envelope: the ephemeral public key used for the
/// ECDH, plus the AES-GCM-wrapped CEK (`iv || tag || ciphertext`).
#[derive(Clone, Debug)]
pub struct X25519Wrapped {
    pub ephemeral_public_key: [u8; X25519_KEY_BYTES],
    pub ciphertext: Vec<u8>,
}

/// Wrap a 32-byte CEK for `recipient_pub`.
pub fn wrap(cek: &[u8], recipient_pub: &[u8; X25519_KEY_BYTES]) -> Result<X25519Wrapped, EnvelopeError> {
    if cek.len() != CEK_BYTES {
        return Err(BadInputError("CEK must be 32 bytes").into());
    }

    let eph_secret = EphemeralSecret::random_from_rng(OsRng);
    let eph_public = X25519PublicKey::from(&eph_secret);
    let recipient = X25519PublicKey::from(*recipient_pub);
    let shared = Zeroizing::new(eph_secret.diffie_hellman(&recipient));

    let kek = Zeroizing::new(derive_kek(shared.as_bytes())?);
    let iv = nonce()?;
    let ct = aead_seal(&kek, &iv, cek, &[])?;

    let mut ciphertext = Vec::with_capacity(IV_BYTES + ct.len());
    ciphertext.extend_from_slice(&iv);
    ciphertext.extend_from_slice(&ct);

    Ok(X25519Wrapped {
        ephemeral_public_key: eph_public.to_bytes(),
        ciphertext,
    })
}

/// Unwrap an X25519 envelope back into the 32-byte CEK.
pub fn unwrap(
    wrapped: &X25519Wrapped,
    recipient_secret: &[u8; X25519_KEY_BYTES],
) -> Result<[u8; CEK_BYTES], EnvelopeError> {
    if wrapped.ciphertext.len() < X25519_WRAP_CT_BYTES {
        return Err(crate::error::EncodingError.into());
    }

    let secret = StaticSecret::from(*recipient_secret);
    let eph_public = X25519PublicKey::from(wrapped.ephemeral_public_key);
    let shared = Zeroizing::new(secret.diffie_hellman(&eph_public));

    let kek = Zeroizing::new(derive_kek(shared.as_bytes())?);

    let iv: [u8; IV_BYTES] = wrapped.ciphertext[..IV_BYTES]
        .try_into()
        .map_err(|_| crate::error::EncodingError)?;
    let tag_and_ct = &wrapped.ciphertext[IV_BYTES..];

    let cek = aead_open(&kek, &iv, tag_and_ct, &[])?;
    if cek.len() != CEK_BYTES {
        return Err(crate::error::DecryptionError.into());
    }

    let mut out = [0u8; CEK_BYTES];
    out.copy_from_slice(&cek);
    Ok(out)
}

/// Generate a fresh X25519 static key pair (`(public, secret)`), each 32 bytes.
pub fn generate_keypair() -> ([u8; X25519_KEY_BYTES], [u8; X25519_KEY_BYTES]) {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = X25519PublicKey::from(&secret);
    (public.to_bytes(), secret.to_bytes())
}
