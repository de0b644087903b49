//! # Vault Engine
//!
//! The encrypted-record lifecycle engine: content-addressed object storage
//! plus an envelope cryptography scheme plus a tiered permission oracle.
//!
//! Built on top of `vault-envelope` for AES-256-GCM content encryption and
//! X25519/RSA key wrapping.
//!
//! ## Quick Start
//!
//! ```ignore
//! use vault_engine::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let objects = Arc::new(InMemoryObjectStore::new());
//! let records = Arc::new(InMemoryRecordStore::new());
//! let custody = Arc::new(CekCustody::new());
//! let oracle = Arc::new(PermissionOracle::new(vec![Box::new(L2ReplicaTier::new())]));
//! let actors = Arc::new(ActorDirectory::new());
//! let audit = Arc::new(InMemoryAuditSink::new());
//! let gate = Arc::new(RateGate::default());
//! let verifier = Arc::new(Ed25519WalletVerifier);
//!
//! let engine = VaultEngine::new(objects, records, custody, oracle, actors, audit, gate, verifier);
//! let auth = RequestAuth {
//!     remote_ip: "127.0.0.1".parse().unwrap(),
//!     wallet_address: "owner_wallet".into(),
//!     wallet_public_key: vec![],
//!     signature: vec![],
//!     timestamp: 0,
//!     network: "mainnet".into(),
//! };
//! let (record_id, cid, cid_hash) = engine.ingest(b"plaintext", "owner", None, None, &auth).await.unwrap();
//! # });
//! ```

pub mod actor;
pub mod audit;
pub mod custody;
pub mod engine;
pub mod error;
pub mod gate;
pub mod object_store;
pub mod oracle;
pub mod record_store;
pub mod types;

pub use actor::{ActorDirectory, ActorLookup};
pub use audit::{
    AuditEvent, AuditKind, AuditSinkSync, FileAuditSink, InMemoryAuditSink, IntegrityChainSink,
    TracingAuditSink,
};
pub use custody::CekCustody;
pub use engine::{OwnerSecret, RequestAuth, VaultEngine};
pub use error::{CryptoFailure, RevokeOutcome, VaultError};
pub use gate::{BucketClass, Ed25519WalletVerifier, RateGate, RejectAllVerifier, SignaturePredicate, SigningPayload};
pub use object_store::{InMemoryObjectStore, MockObjectStore, ObjectStore, RetryPolicy};
pub use oracle::{
    ChainScanTier, ChainTxMeta, L1ValidatorTier, L2RecordEntry, L2ReplicaTier, L2Snapshot,
    PermissionOracle, PermissionTier, ValidatorDatum, ZkProofTier,
};
pub use record_store::{FileRecordStore, InMemoryRecordStore, RecordStore};
pub use types::{
    Actor, ActorId, ActorPublicKeys, ActorRole, ActorStatus, OracleDecision, PermissionSource,
    Record, RecordId, RecordMetadata, RecordStatus, StoredWrappedKey,
};
