//! Record Store (C4): durable metadata indexed by `recordId`, with a
//! secondary index on `owner` and per-record write serialization.
//!
//! Implement [`RecordStore`] for your infrastructure:
//! - `InMemoryRecordStore` (testing)
//! - `FileRecordStore` (development)
//! - your database (production)

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex as AsyncMutex;

use crate::error::VaultError;
use crate::types::{ActorId, Record, RecordId, StoredWrappedKey};

pub trait RecordStore: Send + Sync {
    fn get_by_id(&self, id: &RecordId) -> Result<Option<Record>, VaultError>;
    fn upsert(&self, record: &Record) -> Result<(), VaultError>;
    fn list(&self, owner: Option<&str>) -> Result<Vec<Record>, VaultError>;

    /// Replace the entire wrapped-keys map in one write. Does not touch
    /// `status`/`cid`/`epoch` — callers compose this with `upsert` as needed.
    fn patch_wrapped_keys(
        &self,
        id: &RecordId,
        wrapped_keys: HashMap<ActorId, StoredWrappedKey>,
    ) -> Result<(), VaultError>;

    /// A per-record async mutex, acquired for the duration of any writer
    /// operation (`wrap`, `revoke`, rotation) on that record. Readers never
    /// take this lock; they always read a fresh row via `get_by_id`.
    fn record_lock(&self, id: &RecordId) -> Arc<AsyncMutex<()>>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordId, Record>>,
    locks: RwLock<HashMap<RecordId, Arc<AsyncMutex<()>>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            locks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get_by_id(&self, id: &RecordId) -> Result<Option<Record>, VaultError> {
        let records = self.records.read().unwrap();
        Ok(records.get(id).cloned())
    }

    fn upsert(&self, record: &Record) -> Result<(), VaultError> {
        let mut records = self.records.write().unwrap();
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn list(&self, owner: Option<&str>) -> Result<Vec<Record>, VaultError> {
        let records = self.records.read().unwrap();
        Ok(records
            .values()
            .filter(|r| owner.map(|o| r.owner == o).unwrap_or(true))
            .cloned()
            .collect())
    }

    fn patch_wrapped_keys(
        &self,
        id: &RecordId,
        wrapped_keys: HashMap<ActorId, StoredWrappedKey>,
    ) -> Result<(), VaultError> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| VaultError::NotFound(format!("record {}", id)))?;
        record.wrapped_keys = wrapped_keys;
        record.updated_at = chrono::Utc::now();
        Ok(())
    }

    fn record_lock(&self, id: &RecordId) -> Arc<AsyncMutex<()>> {
        if let Some(lock) = self.locks.read().unwrap().get(id) {
            return lock.clone();
        }
        let mut locks = self.locks.write().unwrap();
        locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// File-based storage (one JSON file per record). Per-record locks are
/// process-local; this backend is meant for single-node development, not
/// clustered deployment.
pub struct FileRecordStore {
    dir: PathBuf,
    locks: RwLock<HashMap<RecordId, Arc<AsyncMutex<()>>>>,
}

impl FileRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| VaultError::StorageUnavailable(format!("create dir: {}", e)))?;
        Ok(Self {
            dir,
            locks: RwLock::new(HashMap::new()),
        })
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }

    fn read_record_file(&self, path: &Path) -> Result<Record, VaultError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| VaultError::StorageUnavailable(format!("read: {}", e)))?;
        serde_json::from_str(&data)
            .map_err(|e| VaultError::Internal(format!("parse record: {}", e)))
    }
}

impl RecordStore for FileRecordStore {
    fn get_by_id(&self, id: &RecordId) -> Result<Option<Record>, VaultError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        self.read_record_file(&path).map(Some)
    }

    fn upsert(&self, record: &Record) -> Result<(), VaultError> {
        let path = self.record_path(&record.id);
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| VaultError::Internal(format!("serialize record: {}", e)))?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| VaultError::StorageUnavailable(format!("write: {}", e)))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| VaultError::StorageUnavailable(format!("rename: {}", e)))?;
        Ok(())
    }

    fn list(&self, owner: Option<&str>) -> Result<Vec<Record>, VaultError> {
        let mut out = Vec::new();
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| VaultError::StorageUnavailable(format!("readdir: {}", e)))?;
        for entry in entries {
            let entry = entry.map_err(|e| VaultError::StorageUnavailable(format!("entry: {}", e)))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                let record = self.read_record_file(&path)?;
                if owner.map(|o| record.owner == o).unwrap_or(true) {
                    out.push(record);
                }
            }
        }
        Ok(out)
    }

    fn patch_wrapped_keys(
        &self,
        id: &RecordId,
        wrapped_keys: HashMap<ActorId, StoredWrappedKey>,
    ) -> Result<(), VaultError> {
        let mut record = self
            .get_by_id(id)?
            .ok_or_else(|| VaultError::NotFound(format!("record {}", id)))?;
        record.wrapped_keys = wrapped_keys;
        record.updated_at = chrono::Utc::now();
        self.upsert(&record)
    }

    fn record_lock(&self, id: &RecordId) -> Arc<AsyncMutex<()>> {
        if let Some(lock) = self.locks.read().unwrap().get(id) {
            return lock.clone();
        }
        let mut locks = self.locks.write().unwrap();
        locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FileRecordStore {
        let dir = tempfile::tempdir().unwrap();
        FileRecordStore::new(dir.into_path()).unwrap()
    }

    fn sample_record(owner: &str) -> Record {
        let mut record = Record::new(RecordId::generate(), owner);
        record.cid = Some("bafy-example".into());
        record.cid_hash = Some("deadbeef".into());
        record
    }

    #[test]
    fn round_trips_through_get_by_id() {
        let store = store();
        let record = sample_record("alice");

        assert!(store.get_by_id(&record.id).unwrap().is_none());
        store.upsert(&record).unwrap();

        let loaded = store.get_by_id(&record.id).unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.owner, record.owner);
        assert_eq!(loaded.cid, record.cid);
    }

    #[test]
    fn upsert_overwrites_existing_record() {
        let store = store();
        let mut record = sample_record("alice");
        store.upsert(&record).unwrap();

        record.status = RecordStatus::Anchored;
        record.epoch = 3;
        store.upsert(&record).unwrap();

        let loaded = store.get_by_id(&record.id).unwrap().unwrap();
        assert_eq!(loaded.status, RecordStatus::Anchored);
        assert_eq!(loaded.epoch, 3);
    }

    #[test]
    fn list_filters_by_owner() {
        let store = store();
        let alice_record = sample_record("alice");
        let bob_record = sample_record("bob");
        store.upsert(&alice_record).unwrap();
        store.upsert(&bob_record).unwrap();

        let all = store.list(None).unwrap();
        assert_eq!(all.len(), 2);

        let alice_only = store.list(Some("alice")).unwrap();
        assert_eq!(alice_only.len(), 1);
        assert_eq!(alice_only[0].id, alice_record.id);
    }

    #[test]
    fn patch_wrapped_keys_replaces_map_without_touching_other_fields() {
        let store = store();
        let mut record = sample_record("alice");
        record.status = RecordStatus::Anchored;
        store.upsert(&record).unwrap();

        let mut wrapped_keys = HashMap::new();
        wrapped_keys.insert(
            ActorId::new("doctor"),
            StoredWrappedKey::X25519 {
                ephemeral_public_key: "00".repeat(32),
                ciphertext: "11".repeat(48),
            },
        );
        store.patch_wrapped_keys(&record.id, wrapped_keys.clone()).unwrap();

        let loaded = store.get_by_id(&record.id).unwrap().unwrap();
        assert_eq!(loaded.wrapped_keys.len(), 1);
        assert!(loaded.wrapped_keys.contains_key(&ActorId::new("doctor")));
        assert_eq!(loaded.status, RecordStatus::Anchored);
        assert_eq!(loaded.cid, record.cid);
    }

    #[test]
    fn patch_wrapped_keys_on_missing_record_is_not_found() {
        let store = store();
        let missing_id = RecordId::generate();
        let err = store.patch_wrapped_keys(&missing_id, HashMap::new()).unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }

    #[test]
    fn record_lock_returns_same_instance_for_same_id() {
        let store = store();
        let id = RecordId::generate();
        let a = store.record_lock(&id);
        let b = store.record_lock(&id);
        assert!(Arc::ptr_eq(&a, &b));

        let other_id = RecordId::generate();
        let c = store.record_lock(&other_id);
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
