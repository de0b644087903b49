//! Rate & Signature Gate (C8): stacked per-IP / per-wallet-address token
//! buckets plus a wallet-signature predicate over a canonical JSON payload.
//!
//! Wallet signature *verification* is an external collaborator the core
//! only consumes through a boolean predicate; `Ed25519WalletVerifier` is the
//! reference implementation, not a mandated algorithm choice.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::VaultError;

// ---------------------------------------------------------------------------
// Token bucket
// ---------------------------------------------------------------------------

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

struct Limiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    rps: f64,
    burst: u32,
}

impl Limiter {
    fn new(rps: f64, burst: u32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rps,
            burst,
        }
    }

    async fn check(&self, key: &str) -> Result<(), VaultError> {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let bucket = buckets.entry(key.to_string()).or_insert_with(|| TokenBucket {
            tokens: self.burst as f64,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.burst as f64);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - bucket.tokens;
            let retry_after = Duration::from_secs_f64(deficit / self.rps);
            Err(VaultError::RateLimited { retry_after })
        }
    }

    async fn evict_stale(&self, older_than: Duration) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_refill) < older_than);
    }
}

/// The three IP-keyed buckets, plus the wallet-address sensitive-operation
/// limiter.
pub enum BucketClass {
    General,
    Auth,
    Sensitive,
}

pub struct RateGate {
    general: Limiter,
    auth: Limiter,
    sensitive: Limiter,
    wallet_sensitive: Limiter,
}

impl RateGate {
    pub fn new() -> Self {
        Self {
            general: Limiter::new(10.0, 20),
            auth: Limiter::new(2.0, 5),
            sensitive: Limiter::new(1.0, 3),
            wallet_sensitive: Limiter::new(10.0 / 60.0, 10),
        }
    }

    pub async fn check_ip(&self, ip: IpAddr, class: BucketClass) -> Result<(), VaultError> {
        let limiter = match class {
            BucketClass::General => &self.general,
            BucketClass::Auth => &self.auth,
            BucketClass::Sensitive => &self.sensitive,
        };
        limiter.check(&ip.to_string()).await
    }

    /// 10 req/min for sensitive operations, keyed by wallet address.
    pub async fn check_wallet(&self, wallet_address: &str) -> Result<(), VaultError> {
        self.wallet_sensitive.check(wallet_address).await
    }

    pub async fn evict_stale(&self) {
        let window = Duration::from_secs(300);
        self.general.evict_stale(window).await;
        self.auth.evict_stale(window).await;
        self.sensitive.evict_stale(window).await;
        self.wallet_sensitive.evict_stale(window).await;
    }
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Signature predicate
// ---------------------------------------------------------------------------

/// Canonical signing payload (stable field order). `op_specific` is appended
/// as already-canonicalized JSON fragments by the caller, since its shape
/// varies per operation.
#[derive(Serialize)]
pub struct SigningPayload<'a> {
    pub operation: &'a str,
    pub record_id: &'a str,
    pub timestamp: i64,
    pub network: &'a str,
}

impl<'a> SigningPayload<'a> {
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, VaultError> {
        serde_json::to_vec(self).map_err(|e| VaultError::Internal(format!("canonicalize payload: {}", e)))
    }
}

pub trait SignaturePredicate: Send + Sync {
    /// Returns `true` iff `signature` is a valid signature by `wallet_public_key`
    /// over `payload`. Any symmetric (HMAC-style) signature must be rejected in
    /// production mode rather than silently accepted.
    fn verify(&self, wallet_public_key: &[u8], payload: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 verification over the raw 32-byte wallet public key.
pub struct Ed25519WalletVerifier;

impl SignaturePredicate for Ed25519WalletVerifier {
    fn verify(&self, wallet_public_key: &[u8], payload: &[u8], signature: &[u8]) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(wallet_public_key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);
        verifying_key.verify(payload, &signature).is_ok()
    }
}

/// Always rejects — used in tests that exercise the `SIGNATURE_VERIFICATION_FAILED`
/// path without constructing real key material.
pub struct RejectAllVerifier;

impl SignaturePredicate for RejectAllVerifier {
    fn verify(&self, _wallet_public_key: &[u8], _payload: &[u8], _signature: &[u8]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    #[tokio::test]
    async fn nth_plus_one_request_is_rate_limited() {
        let gate = RateGate::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..3 {
            gate.check_ip(ip, BucketClass::Sensitive).await.unwrap();
        }
        let err = gate.check_ip(ip, BucketClass::Sensitive).await.unwrap_err();
        assert!(matches!(err, VaultError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn distinct_ips_have_independent_buckets() {
        let gate = RateGate::new();
        let ip_a: IpAddr = "10.0.0.1".parse().unwrap();
        let ip_b: IpAddr = "10.0.0.2".parse().unwrap();
        for _ in 0..3 {
            gate.check_ip(ip_a, BucketClass::Sensitive).await.unwrap();
        }
        gate.check_ip(ip_b, BucketClass::Sensitive).await.unwrap();
    }

    #[test]
    fn ed25519_verifier_accepts_genuine_signature() {
        let signing_key = SigningKey::generate(&mut rand_core_08::OsRng);
        let payload = b"hello";
        let signature = signing_key.sign(payload);
        let verifier = Ed25519WalletVerifier;
        assert!(verifier.verify(
            signing_key.verifying_key().as_bytes(),
            payload,
            &signature.to_bytes(),
        ));
    }

    #[test]
    fn ed25519_verifier_rejects_tampered_payload() {
        let signing_key = SigningKey::generate(&mut rand_core_08::OsRng);
        let signature = signing_key.sign(b"hello");
        let verifier = Ed25519WalletVerifier;
        assert!(!verifier.verify(
            signing_key.verifying_key().as_bytes(),
            b"goodbye",
            &signature.to_bytes(),
        ));
    }

    mod rand_core_08 {
        pub use ed25519_dalek::rand_core::OsRng;
    }
}
