//! KEK derivation (v1, locked).
//!
//! `KEK = HKDF-SHA256(shared_secret, salt = empty, info = KEK_INFO, length = 32)`
//!
//! The info string is part of the public wire format; changing it silently
//! breaks every envelope already wrapped under the old derivation.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::KdfError;

/// Domain-separation string for the KEK derivation. Stable, do not change.
pub const KEK_INFO: &[u8] = b"cardano-healthcare-vault-kek-v1";

/// Derive a 32-byte KEK from an X25519 shared secret.
pub fn derive_kek(shared_secret: &[u8]) -> Result<[u8; 32], KdfError> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut out = [0u8; 32];
    hk.expand(KEK_INFO, &mut out).map_err(|_| KdfError)?;
    Ok(out)
}
