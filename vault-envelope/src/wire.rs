//! Wire layouts (v1, locked).
//!
//! Encrypted package: `IV(12) || AuthTag(16) || Ciphertext(n)`. Deterministic,
//! no external framing — a package is exactly its bytes, nothing else.
//!
//! X25519 wrapped-key envelope: `ephemeral_pk(32) || IV(12) || AuthTag(16) || CEK_ct(32)`.
//! RSA-OAEP wrapped-key envelope: raw RSA ciphertext, length equal to the
//! recipient modulus size.
//!
//! The two variants are distinguished by an explicit tag stored alongside
//! the envelope (see `crate::envelope::WrappedKey`), never inferred from
//! length alone.

use crate::error::EncodingError;

pub const IV_BYTES: usize = 12;
pub const TAG_BYTES: usize = 16;
pub const CEK_BYTES: usize = 32;
pub const X25519_KEY_BYTES: usize = 32;

/// Minimum size of a valid encrypted package: IV + tag, ciphertext may be empty.
pub const MIN_PACKAGE_BYTES: usize = IV_BYTES + TAG_BYTES;

/// Minimum size of a valid X25519 wrap ciphertext portion (IV + tag + 32-byte CEK).
pub const X25519_WRAP_CT_BYTES: usize = IV_BYTES + TAG_BYTES + CEK_BYTES;

/// Split a package into `(iv, tag_and_ciphertext)`.
pub fn split_package(data: &[u8]) -> Result<(&[u8; IV_BYTES], &[u8]), EncodingError> {
    if data.len() < MIN_PACKAGE_BYTES {
        return Err(EncodingError);
    }
    let iv: &[u8; IV_BYTES] = data[..IV_BYTES].try_into().map_err(|_| EncodingError)?;
    Ok((iv, &data[IV_BYTES..]))
}

/// Assemble a package from its parts: `iv || aead_ciphertext_with_tag`.
pub fn join_package(iv: &[u8; IV_BYTES], aead_ct: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(IV_BYTES + aead_ct.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(aead_ct);
    out
}
