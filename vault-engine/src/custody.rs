//! CEK Custody (C3): a short-TTL keyed store for CEKs in flight between
//! `ingest` and `wrap`. The only place outside an encryption call where a
//! plaintext CEK may live, and only for the configured TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use zeroize::Zeroize;

use crate::types::RecordId;

const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct Entry {
    cek: [u8; 32],
    expires_at: Instant,
}

impl Drop for Entry {
    fn drop(&mut self) {
        self.cek.zeroize();
    }
}

/// Process-local ephemeral store. Under no condition does a CEK touch
/// durable storage — this type never implements `Serialize`.
pub struct CekCustody {
    ttl: Duration,
    entries: Mutex<HashMap<RecordId, Entry>>,
}

impl CekCustody {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Park a CEK for `record_id`. A second `put` for the same record
    /// replaces the prior value; readers only ever observe the latest write.
    pub fn put(&self, record_id: &RecordId, cek: [u8; 32]) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            record_id.clone(),
            Entry {
                cek,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Read the CEK for `record_id`, if present and not yet expired.
    /// Silently drops (and returns `None` for) expired entries.
    pub fn get(&self, record_id: &RecordId) -> Option<[u8; 32]> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(record_id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.cek),
            Some(_) => {
                entries.remove(record_id);
                None
            }
            None => None,
        }
    }

    /// Evict a record's CEK immediately, normally called right after a
    /// successful `wrap`.
    pub fn evict(&self, record_id: &RecordId) {
        self.entries.lock().unwrap().remove(record_id);
    }
}

impl Default for CekCustody {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_returns_same_cek() {
        let custody = CekCustody::new();
        let id = RecordId::new("r1");
        let cek = [7u8; 32];
        custody.put(&id, cek);
        assert_eq!(custody.get(&id), Some(cek));
    }

    #[test]
    fn evict_removes_entry() {
        let custody = CekCustody::new();
        let id = RecordId::new("r1");
        custody.put(&id, [1u8; 32]);
        custody.evict(&id);
        assert_eq!(custody.get(&id), None);
    }

    #[test]
    fn second_put_replaces_first() {
        let custody = CekCustody::new();
        let id = RecordId::new("r1");
        custody.put(&id, [1u8; 32]);
        custody.put(&id, [2u8; 32]);
        assert_eq!(custody.get(&id), Some([2u8; 32]));
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let custody = CekCustody::with_ttl(Duration::from_millis(10));
        let id = RecordId::new("r1");
        custody.put(&id, [3u8; 32]);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(custody.get(&id), None);
    }
}
