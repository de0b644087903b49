//! Permission Oracle (C5): a tiered lookup across an L2 replica, an L1
//! on-chain validator, a ZK membership proof, and a last-resort chain scan.
//!
//! Sources are consulted in a fixed priority order. A source either returns
//! a definitive answer (`granted` or `denied`) or "falls through" (record not
//! present in that source's universe) to the next. Only exhaustion of every
//! source surfaces `OracleUnavailable`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::error::VaultError;
use crate::types::{ActorId, OracleDecision, PermissionSource, RecordId};

const CACHE_TTL: Duration = Duration::from_secs(3600);

/// A source's verdict: `Some` is definitive (fed straight back to the
/// caller), `None` means "this record is outside my universe, ask the next
/// source".
pub type SourceVerdict = Result<Option<OracleDecision>, VaultError>;

#[async_trait::async_trait]
pub trait PermissionTier: Send + Sync {
    fn source(&self) -> PermissionSource;
    async fn check(&self, record_id: &RecordId, actor_id: &ActorId) -> SourceVerdict;
}

#[async_trait::async_trait]
impl<T: PermissionTier + ?Sized> PermissionTier for Arc<T> {
    fn source(&self) -> PermissionSource {
        (**self).source()
    }

    async fn check(&self, record_id: &RecordId, actor_id: &ActorId) -> SourceVerdict {
        (**self).check(record_id, actor_id).await
    }
}

// ---------------------------------------------------------------------------
// L2 replica
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct L2RecordEntry {
    pub cid_hash: String,
    pub permitted_actors: Vec<ActorId>,
}

#[derive(Clone, Debug)]
pub struct L2Snapshot {
    pub head_id: String,
    pub snapshot_id: String,
    pub epoch: u64,
    pub records: HashMap<RecordId, L2RecordEntry>,
}

/// Queries the latest accepted snapshot. Immutable once constructed; a
/// fresh snapshot is a fresh `L2ReplicaTier`.
pub struct L2ReplicaTier {
    snapshot: RwLock<Option<L2Snapshot>>,
}

impl L2ReplicaTier {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(None),
        }
    }

    pub fn accept_snapshot(&self, snapshot: L2Snapshot) {
        *self.snapshot.write().unwrap() = Some(snapshot);
    }
}

impl Default for L2ReplicaTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PermissionTier for L2ReplicaTier {
    fn source(&self) -> PermissionSource {
        PermissionSource::L2
    }

    async fn check(&self, record_id: &RecordId, actor_id: &ActorId) -> SourceVerdict {
        let snapshot = self.snapshot.read().unwrap();
        let snapshot = match snapshot.as_ref() {
            Some(s) => s,
            None => return Ok(None),
        };
        let entry = match snapshot.records.get(record_id) {
            Some(e) => e,
            None => return Ok(None),
        };
        let granted = entry.permitted_actors.contains(actor_id);
        Ok(Some(OracleDecision {
            granted,
            source: PermissionSource::L2,
            evidence: None,
        }))
    }
}

// ---------------------------------------------------------------------------
// L1 on-chain validator
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct ValidatorDatum {
    pub record_id: RecordId,
    pub permitted_actors: Vec<ActorId>,
    /// Unix seconds. `0` means no expiry.
    pub expires_at: i64,
    pub owner: String,
    pub nft_ref: Option<String>,
}

/// Scans unspent outputs at the script address for a datum bound to
/// `record_id`. Membership is checked against the first matching, unexpired
/// datum; exhaustion with no binding match falls through.
pub struct L1ValidatorTier {
    utxos: RwLock<Vec<ValidatorDatum>>,
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl L1ValidatorTier {
    pub fn new() -> Self {
        Self {
            utxos: RwLock::new(Vec::new()),
            now_fn: Box::new(|| chrono::Utc::now().timestamp()),
        }
    }

    pub fn set_utxos(&self, utxos: Vec<ValidatorDatum>) {
        *self.utxos.write().unwrap() = utxos;
    }
}

impl Default for L1ValidatorTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PermissionTier for L1ValidatorTier {
    fn source(&self) -> PermissionSource {
        PermissionSource::L1
    }

    async fn check(&self, record_id: &RecordId, actor_id: &ActorId) -> SourceVerdict {
        let now = (self.now_fn)();
        let utxos = self.utxos.read().unwrap();
        for datum in utxos.iter() {
            if &datum.record_id != record_id {
                continue;
            }
            if datum.expires_at != 0 && now >= datum.expires_at {
                continue;
            }
            if datum.permitted_actors.contains(actor_id) {
                return Ok(Some(OracleDecision {
                    granted: true,
                    source: PermissionSource::L1,
                    evidence: None,
                }));
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// ZK membership proof
// ---------------------------------------------------------------------------

/// A commitment to a permitted-actor set, plus a mocked prover/verifier.
/// Evidence returned to callers is only ever the membership witness for the
/// queried actor, never the full committed set.
pub struct ZkProofTier {
    commitments: RwLock<HashMap<RecordId, Vec<ActorId>>>,
}

impl ZkProofTier {
    pub fn new() -> Self {
        Self {
            commitments: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_commitment(&self, record_id: RecordId, permitted_actors: Vec<ActorId>) {
        self.commitments.write().unwrap().insert(record_id, permitted_actors);
    }
}

impl Default for ZkProofTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PermissionTier for ZkProofTier {
    fn source(&self) -> PermissionSource {
        PermissionSource::Zk
    }

    async fn check(&self, record_id: &RecordId, actor_id: &ActorId) -> SourceVerdict {
        let commitments = self.commitments.read().unwrap();
        let permitted_actors = match commitments.get(record_id) {
            Some(set) => set,
            None => return Ok(None),
        };
        let granted = permitted_actors.contains(actor_id);
        // Mock proof: the witness names only the queried actor, never the
        // rest of the committed set.
        let evidence = format!("zk-membership-witness:{}:{}", record_id, actor_id).into_bytes();
        Ok(Some(OracleDecision {
            granted,
            source: PermissionSource::Zk,
            evidence: Some(evidence),
        }))
    }
}

// ---------------------------------------------------------------------------
// Chain scan (last resort)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct ChainTxMeta {
    pub record_id: RecordId,
    pub permitted_actors: Vec<ActorId>,
    /// The cid this tx metadata entry commits to.
    pub cid: String,
    /// Must equal `sha256Hex(cid)` for the entry to be trusted.
    pub cid_hash: String,
    /// Unix seconds. `0` means no expiry.
    pub expires_at: i64,
}

/// Scans raw transaction metadata under a fixed label. Slowest and last
/// consulted; a production deployment would page through a node's history.
pub struct ChainScanTier {
    entries: RwLock<Vec<ChainTxMeta>>,
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl ChainScanTier {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            now_fn: Box::new(|| chrono::Utc::now().timestamp()),
        }
    }

    pub fn set_entries(&self, entries: Vec<ChainTxMeta>) {
        *self.entries.write().unwrap() = entries;
    }
}

impl Default for ChainScanTier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PermissionTier for ChainScanTier {
    fn source(&self) -> PermissionSource {
        PermissionSource::Chain
    }

    async fn check(&self, record_id: &RecordId, actor_id: &ActorId) -> SourceVerdict {
        let now = (self.now_fn)();
        let entries = self.entries.read().unwrap();
        for entry in entries.iter() {
            if &entry.record_id != record_id {
                continue;
            }
            if entry.expires_at != 0 && now >= entry.expires_at {
                continue;
            }
            let computed_hash = {
                use sha2::{Digest, Sha256};
                hex::encode(Sha256::digest(entry.cid.as_bytes()))
            };
            if computed_hash != entry.cid_hash {
                continue;
            }
            return Ok(Some(OracleDecision {
                granted: entry.permitted_actors.contains(actor_id),
                source: PermissionSource::Chain,
                evidence: None,
            }));
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Oracle: fixed priority chain + response cache
// ---------------------------------------------------------------------------

struct CacheEntry {
    decision: OracleDecision,
    expires_at: Instant,
}

/// Consults tiers in priority order: L2, L1, ZK, Chain. A source failure is
/// non-fatal and advances to the next; only exhaustion of every source
/// surfaces `OracleUnavailable`.
pub struct PermissionOracle {
    tiers: Vec<Box<dyn PermissionTier>>,
    cache: RwLock<HashMap<(RecordId, ActorId), CacheEntry>>,
}

impl PermissionOracle {
    pub fn new(tiers: Vec<Box<dyn PermissionTier>>) -> Self {
        Self {
            tiers,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn check(
        &self,
        record_id: &RecordId,
        actor_id: &ActorId,
    ) -> Result<OracleDecision, VaultError> {
        let key = (record_id.clone(), actor_id.clone());
        if let Some(entry) = self.cache.read().unwrap().get(&key) {
            if entry.expires_at > Instant::now() {
                return Ok(entry.decision.clone());
            }
        }

        let mut last_source_error: Option<VaultError> = None;
        for tier in &self.tiers {
            match tier.check(record_id, actor_id).await {
                Ok(Some(decision)) => {
                    self.cache.write().unwrap().insert(
                        key,
                        CacheEntry {
                            decision: decision.clone(),
                            expires_at: Instant::now() + CACHE_TTL,
                        },
                    );
                    return Ok(decision);
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(source = %tier.source(), error = %e, "permission source failed, trying next");
                    last_source_error = Some(e);
                    continue;
                }
            }
        }

        match last_source_error {
            Some(e) => Err(VaultError::OracleUnavailable(e.to_string())),
            None => Err(VaultError::OracleUnavailable(
                "no permission source recognized this record".into(),
            )),
        }
    }

    /// Drop any cached decision for `(record_id, actor_id)`, or for every
    /// actor on `record_id` when `actor_id` is `None`. Called on revoke.
    pub fn invalidate(&self, record_id: &RecordId, actor_id: Option<&ActorId>) {
        let mut cache = self.cache.write().unwrap();
        cache.retain(|(r, a), _| {
            !(r == record_id && actor_id.map(|wanted| wanted == a).unwrap_or(true))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle_with(tiers: Vec<Box<dyn PermissionTier>>) -> PermissionOracle {
        PermissionOracle::new(tiers)
    }

    fn chain_tx(record_id: RecordId, permitted_actors: Vec<ActorId>, cid: &str, expires_at: i64) -> ChainTxMeta {
        use sha2::{Digest, Sha256};
        ChainTxMeta {
            record_id,
            permitted_actors,
            cid: cid.into(),
            cid_hash: hex::encode(Sha256::digest(cid.as_bytes())),
            expires_at,
        }
    }

    #[tokio::test]
    async fn l2_definitive_denial_short_circuits_later_sources() {
        let l2 = L2ReplicaTier::new();
        l2.accept_snapshot(L2Snapshot {
            head_id: "h1".into(),
            snapshot_id: "s1".into(),
            epoch: 1,
            records: HashMap::from([(
                RecordId::new("r1"),
                L2RecordEntry {
                    cid_hash: "abc".into(),
                    permitted_actors: vec![ActorId::new("02")],
                },
            )]),
        });
        let chain = ChainScanTier::new();
        chain.set_entries(vec![chain_tx(RecordId::new("r1"), vec![ActorId::new("04")], "cid1", 0)]);

        let oracle = oracle_with(vec![Box::new(l2), Box::new(chain)]);
        let decision = oracle
            .check(&RecordId::new("r1"), &ActorId::new("04"))
            .await
            .unwrap();
        assert!(!decision.granted);
        assert_eq!(decision.source, PermissionSource::L2);
    }

    #[tokio::test]
    async fn absence_from_l2_falls_through_to_l1() {
        let l2 = L2ReplicaTier::new();
        let l1 = L1ValidatorTier::new();
        l1.set_utxos(vec![ValidatorDatum {
            record_id: RecordId::new("r1"),
            permitted_actors: vec![ActorId::new("02")],
            expires_at: 0,
            owner: "owner".into(),
            nft_ref: None,
        }]);
        let oracle = oracle_with(vec![Box::new(l2), Box::new(l1)]);
        let decision = oracle
            .check(&RecordId::new("r1"), &ActorId::new("02"))
            .await
            .unwrap();
        assert!(decision.granted);
        assert_eq!(decision.source, PermissionSource::L1);
    }

    #[tokio::test]
    async fn falls_through_to_chain_when_l1_utxo_removed() {
        let l1 = L1ValidatorTier::new();
        let chain = ChainScanTier::new();
        chain.set_entries(vec![chain_tx(
            RecordId::new("r1"),
            vec![ActorId::new("02"), ActorId::new("03")],
            "cid1",
            0,
        )]);
        let oracle = oracle_with(vec![Box::new(l1), Box::new(chain)]);
        let decision = oracle
            .check(&RecordId::new("r1"), &ActorId::new("02"))
            .await
            .unwrap();
        assert!(decision.granted);
        assert_eq!(decision.source, PermissionSource::Chain);
    }

    #[tokio::test]
    async fn chain_scan_falls_through_on_expired_entry() {
        let chain = ChainScanTier::new();
        chain.set_entries(vec![chain_tx(RecordId::new("r1"), vec![ActorId::new("02")], "cid1", 1)]);
        let oracle = oracle_with(vec![Box::new(chain)]);
        let err = oracle
            .check(&RecordId::new("r1"), &ActorId::new("02"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::OracleUnavailable(_)));
    }

    #[tokio::test]
    async fn chain_scan_falls_through_on_cid_hash_mismatch() {
        let chain = ChainScanTier::new();
        let mut entry = chain_tx(RecordId::new("r1"), vec![ActorId::new("02")], "cid1", 0);
        entry.cid_hash = "deadbeef".into();
        chain.set_entries(vec![entry]);
        let oracle = oracle_with(vec![Box::new(chain)]);
        let err = oracle
            .check(&RecordId::new("r1"), &ActorId::new("02"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::OracleUnavailable(_)));
    }

    #[tokio::test]
    async fn exhaustion_surfaces_oracle_unavailable() {
        let l2 = L2ReplicaTier::new();
        let oracle = oracle_with(vec![Box::new(l2)]);
        let err = oracle
            .check(&RecordId::new("missing"), &ActorId::new("02"))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::OracleUnavailable(_)));
    }

    #[tokio::test]
    async fn determinism_given_fixed_snapshot() {
        let l2 = L2ReplicaTier::new();
        l2.accept_snapshot(L2Snapshot {
            head_id: "h1".into(),
            snapshot_id: "s1".into(),
            epoch: 1,
            records: HashMap::from([(
                RecordId::new("r1"),
                L2RecordEntry {
                    cid_hash: "abc".into(),
                    permitted_actors: vec![ActorId::new("02")],
                },
            )]),
        });
        let oracle = oracle_with(vec![Box::new(l2)]);
        let first = oracle
            .check(&RecordId::new("r1"), &ActorId::new("02"))
            .await
            .unwrap();
        let second = oracle
            .check(&RecordId::new("r1"), &ActorId::new("02"))
            .await
            .unwrap();
        assert_eq!(first.granted, second.granted);
        assert_eq!(first.source, second.source);
    }

    #[tokio::test]
    async fn invalidate_clears_cached_decision() {
        let l2 = L2ReplicaTier::new();
        l2.accept_snapshot(L2Snapshot {
            head_id: "h1".into(),
            snapshot_id: "s1".into(),
            epoch: 1,
            records: HashMap::from([(
                RecordId::new("r1"),
                L2RecordEntry {
                    cid_hash: "abc".into(),
                    permitted_actors: vec![ActorId::new("02")],
                },
            )]),
        });
        let oracle = oracle_with(vec![Box::new(l2)]);
        let record_id = RecordId::new("r1");
        let actor_id = ActorId::new("02");
        oracle.check(&record_id, &actor_id).await.unwrap();
        assert!(oracle.cache.read().unwrap().contains_key(&(record_id.clone(), actor_id.clone())));
        oracle.invalidate(&record_id, Some(&actor_id));
        assert!(!oracle.cache.read().unwrap().contains_key(&(record_id, actor_id)));
    }
}
