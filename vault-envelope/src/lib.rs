//! # vault-envelope
//!
//! Envelope cryptography for the encrypted-record vault: per-record content
//! encryption (AES-256-GCM) plus per-recipient key wrapping, either via
//! X25519 ECDH + HKDF-SHA256 + AES-256-GCM, or via RSA-OAEP-SHA256 for
//! recipients who only hold RSA key material.
//!
//! ## Quick Start
//!
//! ```ignore
//! use vault_envelope::VaultCrypto;
//!
//! let crypto = VaultCrypto::new();
//! let cek = crypto.generate_cek().unwrap();
//! let package = crypto.encrypt(b"patient record bytes", &cek).unwrap();
//! let plaintext = crypto.decrypt(&package, &cek).unwrap();
//! assert_eq!(plaintext, b"patient record bytes");
//! ```
//!
//! ## Security Properties
//!
//! - **Uniform AEAD errors**: tag failure and malformed input are both opaque.
//! - **No plaintext key transport**: wrapping never falls back to sending a
//!   CEK in the clear, under any error path.
//! - **Locked KDF info string**: `cardano-healthcare-vault-kek-v1` is part of
//!   the wire format; changing it breaks every previously-wrapped key.
//!
//! ## What's NOT Provided
//!
//! - Key storage or lifecycle (see the `vault-engine` crate).
//! - Permission evaluation.
//! - Network transport.

#![deny(unsafe_code)]

mod aead;
mod envelope;
mod error;
mod kdf;
mod rsa_wrap;
mod sdk;
mod wire;
mod x25519_wrap;

pub use envelope::WrappedKey;
pub use error::{BadInputError, DecryptionError, EncodingError, EnvelopeError, KdfError};
pub use sdk::{inspect, PackageInfo, VaultCrypto, VERSION};
pub use wire::{CEK_BYTES, IV_BYTES, MIN_PACKAGE_BYTES, TAG_BYTES, X25519_KEY_BYTES};
pub use x25519_wrap::generate_keypair as generate_x25519_keypair;

pub use rsa_wrap::{parse_private_pem as parse_rsa_private_pem, parse_public_pem as parse_rsa_public_pem};
