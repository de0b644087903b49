//! Known-answer and wire-layout tests for the envelope primitives.

use rsa::RsaPrivateKey;
use vault_envelope::{VaultCrypto, CEK_BYTES, IV_BYTES, MIN_PACKAGE_BYTES, TAG_BYTES};

#[test]
fn wire_constants_are_bit_exact() {
    assert_eq!(CEK_BYTES, 32);
    assert_eq!(IV_BYTES, 12);
    assert_eq!(TAG_BYTES, 16);
    assert_eq!(MIN_PACKAGE_BYTES, IV_BYTES + TAG_BYTES);
}

#[test]
fn package_layout_is_iv_tag_ciphertext() {
    let crypto = VaultCrypto::new();
    let cek = crypto.generate_cek().unwrap();
    let package = crypto.encrypt(b"", &cek).unwrap();
    assert_eq!(package.len(), MIN_PACKAGE_BYTES);

    let package = crypto.encrypt(b"abc", &cek).unwrap();
    assert_eq!(package.len(), MIN_PACKAGE_BYTES + 3);
}

#[test]
fn cek_is_32_bytes_from_csprng() {
    let crypto = VaultCrypto::new();
    let a = crypto.generate_cek().unwrap();
    let b = crypto.generate_cek().unwrap();
    assert_eq!(a.len(), CEK_BYTES);
    assert_ne!(a, b, "two independently generated CEKs must not collide");
}

#[test]
fn rsa_wrap_roundtrip() {
    let crypto = VaultCrypto::new();
    let cek = crypto.generate_cek().unwrap();

    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let public = rsa::RsaPublicKey::from(&private);

    let wrapped = crypto.wrap_rsa(&cek, &public).unwrap();
    let unwrapped = crypto.unwrap_rsa(&wrapped, &private).unwrap();
    assert_eq!(unwrapped, cek);
}

#[test]
fn rsa_and_x25519_envelopes_are_not_interchangeable() {
    let crypto = VaultCrypto::new();
    let cek = crypto.generate_cek().unwrap();

    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let public = rsa::RsaPublicKey::from(&private);
    let rsa_wrapped = crypto.wrap_rsa(&cek, &public).unwrap();

    let (x_pub, _x_secret) = vault_envelope::generate_x25519_keypair();
    let x_wrapped = crypto.wrap_x25519(&cek, &x_pub).unwrap();

    // an RSA envelope cannot be unwrapped on the X25519 path and vice versa
    assert!(rsa_wrapped.unwrap_x25519(&[0u8; 32]).is_err());
    assert!(x_wrapped.unwrap_rsa(&private).is_err());
}

#[test]
fn self_consistency_over_many_messages() {
    let crypto = VaultCrypto::new();
    let cek = crypto.generate_cek().unwrap();

    for i in 0..10 {
        let plaintext = format!("msg {}", i).into_bytes();
        let package = crypto.encrypt(&plaintext, &cek).unwrap();
        let out = crypto.decrypt(&package, &cek).unwrap();
        assert_eq!(out, plaintext);
    }
}
