//! RSA-OAEP key-wrap path (legacy).
//!
//! Kept for recipients who only hold RSA key material. OAEP with SHA-256
//! as both the hash and the MGF1 mask. The engine must accept records that
//! mix X25519 and RSA wraps but must never silently downgrade a recipient
//! who holds an X25519 key to the RSA path.

use rand_core::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::{BadInputError, EnvelopeError};
use crate::wire::CEK_BYTES;

/// Wrap a 32-byte CEK under an RSA-OAEP-SHA256 public key.
pub fn wrap(cek: &[u8], recipient_pub: &RsaPublicKey) -> Result<Vec<u8>, EnvelopeError> {
    if cek.len() != CEK_BYTES {
        return Err(BadInputError("CEK must be 32 bytes").into());
    }
    let padding = Oaep::new::<Sha256>();
    recipient_pub
        .encrypt(&mut OsRng, padding, cek)
        .map_err(|_| crate::error::EncodingError.into())
}

/// Unwrap an RSA-OAEP-SHA256 ciphertext back into the 32-byte CEK.
pub fn unwrap(ciphertext: &[u8], recipient_secret: &RsaPrivateKey) -> Result<[u8; CEK_BYTES], EnvelopeError> {
    let padding = Oaep::new::<Sha256>();
    let cek = recipient_secret
        .decrypt(padding, ciphertext)
        .map_err(|_| crate::error::DecryptionError)?;
    if cek.len() != CEK_BYTES {
        return Err(crate::error::DecryptionError.into());
    }
    let mut out = [0u8; CEK_BYTES];
    out.copy_from_slice(&cek);
    Ok(out)
}

/// Parse a PEM-encoded PKCS#1/PKCS#8 RSA public key.
pub fn parse_public_pem(pem: &str) -> Result<RsaPublicKey, EnvelopeError> {
    use rsa::pkcs8::DecodePublicKey;
    RsaPublicKey::from_public_key_pem(pem).map_err(|_| crate::error::EncodingError.into())
}

/// Parse a PEM-encoded PKCS#1/PKCS#8 RSA private key.
pub fn parse_private_pem(pem: &str) -> Result<RsaPrivateKey, EnvelopeError> {
    use rsa::pkcs8::DecodePrivateKey;
    RsaPrivateKey::from_pkcs8_pem(pem).map_err(|_| crate::error::EncodingError.into())
}
