//! Core domain types: identifiers, the record lifecycle state machine,
//! actors, and the tagged wrapped-key envelope as it is stored at rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable opaque record identifier (UUID-like, hex-encoded random bytes).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand_core::OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

use rand_core::RngCore;

/// Actor handle. The canonical roster used in tests is the two-character
/// decimal string `"01"`..`"04"`, but the engine never assumes a closed
/// enumeration — any UTF-8 string is a valid actor id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Record lifecycle state machine
// ---------------------------------------------------------------------------

/// Lifecycle state of a record.
///
/// ```text
/// (init) ──ingest──▶ draft ──pin──▶ pending_anchor ──wrap──▶ anchored
///                                                 │
///                                       ╭─revoke──┤
///                                       ▼         │
///                                   rotating ─────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Draft,
    PendingAnchor,
    Anchored,
    Revoked,
    Rotating,
    Uploaded,
}

impl RecordStatus {
    /// Valid transitions from this state.
    pub fn valid_transitions(&self) -> &[RecordStatus] {
        match self {
            RecordStatus::Draft => &[RecordStatus::PendingAnchor, RecordStatus::Uploaded],
            RecordStatus::PendingAnchor => &[RecordStatus::Anchored],
            RecordStatus::Anchored => &[RecordStatus::Rotating, RecordStatus::Revoked],
            RecordStatus::Rotating => &[RecordStatus::Anchored],
            RecordStatus::Revoked => &[],
            RecordStatus::Uploaded => &[RecordStatus::PendingAnchor],
        }
    }

    pub fn can_transition_to(&self, target: RecordStatus) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStatus::Draft => "draft",
            RecordStatus::PendingAnchor => "pending_anchor",
            RecordStatus::Anchored => "anchored",
            RecordStatus::Revoked => "revoked",
            RecordStatus::Rotating => "rotating",
            RecordStatus::Uploaded => "uploaded",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Wrapped-key envelope, as stored at rest (serde-friendly mirror of
// `vault_envelope::WrappedKey`)
// ---------------------------------------------------------------------------

/// The tagged wrapped-key envelope persisted in a record's `wrapped_keys`
/// map. The tag decides which unwrap primitive a recipient runs; it is
/// never inferred from shape or length.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "scheme")]
pub enum StoredWrappedKey {
    #[serde(rename = "x25519")]
    X25519 {
        ephemeral_public_key: String, // hex, 32 bytes
        ciphertext: String,           // hex, IV || Tag || CEK_ct
    },
    #[serde(rename = "rsa")]
    Rsa {
        ciphertext: String, // hex
    },
}

impl StoredWrappedKey {
    pub fn from_wrapped(wrapped: &vault_envelope::WrappedKey) -> Self {
        match wrapped {
            vault_envelope::WrappedKey::X25519 {
                ephemeral_public_key,
                ciphertext,
            } => Self::X25519 {
                ephemeral_public_key: hex::encode(ephemeral_public_key),
                ciphertext: hex::encode(ciphertext),
            },
            vault_envelope::WrappedKey::Rsa { ciphertext } => Self::Rsa {
                ciphertext: hex::encode(ciphertext),
            },
        }
    }

    pub fn to_wrapped(&self) -> Result<vault_envelope::WrappedKey, hex::FromHexError> {
        match self {
            Self::X25519 {
                ephemeral_public_key,
                ciphertext,
            } => {
                let eph = hex::decode(ephemeral_public_key)?;
                let ct = hex::decode(ciphertext)?;
                let mut eph_arr = [0u8; 32];
                if eph.len() == 32 {
                    eph_arr.copy_from_slice(&eph);
                }
                Ok(vault_envelope::WrappedKey::X25519 {
                    ephemeral_public_key: eph_arr,
                    ciphertext: ct,
                })
            }
            Self::Rsa { ciphertext } => Ok(vault_envelope::WrappedKey::Rsa {
                ciphertext: hex::decode(ciphertext)?,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Non-sensitive record metadata (original filename, mime, sizes, upload time).
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RecordMetadata {
    pub original_name: Option<String>,
    pub mime: Option<String>,
    pub original_size: u64,
    pub encrypted_size: u64,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// A single encrypted-record's durable state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub owner: String,
    pub cid: Option<String>,
    pub cid_hash: Option<String>,
    pub wrapped_keys: HashMap<ActorId, StoredWrappedKey>,
    pub status: RecordStatus,
    pub epoch: u64,
    pub metadata: RecordMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(id: RecordId, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner: owner.into(),
            cid: None,
            cid_hash: None,
            wrapped_keys: HashMap::new(),
            status: RecordStatus::Draft,
            epoch: 0,
            metadata: RecordMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Patient,
    Doctor,
    Hospital,
    Insurance,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    Active,
    Inactive,
}

/// Public key material an actor has registered. At least one of the two
/// should be present for the actor to be a usable `wrap` recipient.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActorPublicKeys {
    /// 32-byte X25519 static public key, hex-encoded.
    pub x25519_hex: Option<String>,
    /// PEM-encoded RSA public key.
    pub rsa_pem: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Actor {
    pub actor_id: ActorId,
    pub role: ActorRole,
    pub wallet_address: String,
    pub public_keys: ActorPublicKeys,
    pub status: ActorStatus,
}

impl Actor {
    pub fn is_active(&self) -> bool {
        matches!(self.status, ActorStatus::Active)
    }
}

// ---------------------------------------------------------------------------
// Permission oracle result shape
// ---------------------------------------------------------------------------

/// Which tier produced a permission answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionSource {
    L2,
    L1,
    Zk,
    Chain,
}

impl fmt::Display for PermissionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionSource::L2 => "L2",
            PermissionSource::L1 => "L1",
            PermissionSource::Zk => "ZK",
            PermissionSource::Chain => "Chain",
        };
        write!(f, "{}", s)
    }
}

/// Uniform result shape for a permission check, regardless of which tier answered.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleDecision {
    pub granted: bool,
    pub source: PermissionSource,
    pub evidence: Option<Vec<u8>>,
}
