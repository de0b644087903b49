//! Object Store Adapter (C2): upload/fetch opaque bytes against a
//! content-addressed backend, with bounded retries and a deterministic
//! mock mode for local testing.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::error::VaultError;

/// Retry policy for transport-level operations.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            per_attempt_timeout: Duration::from_secs(10),
            backoff_base: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt` (1-indexed), proportional to attempt index.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bytes: &[u8]) -> Result<String, VaultError>;
    async fn download(&self, cid: &str) -> Result<Vec<u8>, VaultError>;

    /// Administrative, idempotent. `AlreadyUnpinned` is not surfaced as an error.
    async fn unpin(&self, cid: &str) -> Result<(), VaultError>;
}

/// Deterministic local-testing backend: CID is `sha256Hex(bytes)`.
/// `download` always fails — no blob is ever actually stored remotely in
/// mock mode, only its address is computed.
pub struct MockObjectStore {
    pins: RwLock<HashMap<String, ()>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            pins: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockObjectStore {
    async fn upload(&self, bytes: &[u8]) -> Result<String, VaultError> {
        let cid = vault_envelope::VaultCrypto::new().sha256_hex(bytes);
        self.pins.write().unwrap().insert(cid.clone(), ());
        Ok(cid)
    }

    async fn download(&self, _cid: &str) -> Result<Vec<u8>, VaultError> {
        Err(VaultError::StorageUnavailable("mock store holds no payload".into()))
    }

    async fn unpin(&self, cid: &str) -> Result<(), VaultError> {
        // Idempotent: removing an absent pin is success, not an error.
        self.pins.write().unwrap().remove(cid);
        Ok(())
    }
}

/// Retrying backend-local store that actually keeps bytes in memory,
/// for integration tests that need a real upload/download round trip.
pub struct InMemoryObjectStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    retry: RetryPolicy,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(retry: RetryPolicy) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            retry,
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(&self, bytes: &[u8]) -> Result<String, VaultError> {
        let cid = vault_envelope::VaultCrypto::new().sha256_hex(bytes);
        self.blobs.write().unwrap().insert(cid.clone(), bytes.to_vec());
        Ok(cid)
    }

    async fn download(&self, cid: &str) -> Result<Vec<u8>, VaultError> {
        let mut last_err = VaultError::StorageUnavailable("unreachable".into());
        for attempt in 1..=self.retry.max_attempts {
            match self.blobs.read().unwrap().get(cid).cloned() {
                Some(bytes) => return Ok(bytes),
                None => {
                    last_err = VaultError::NotFound(format!("cid {}", cid));
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.backoff_for(attempt)).await;
                    }
                }
            }
        }
        Err(last_err)
    }

    async fn unpin(&self, cid: &str) -> Result<(), VaultError> {
        self.blobs.write().unwrap().remove(cid);
        Ok(())
    }
}
