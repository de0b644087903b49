//! Lifecycle Engine (C6): orchestrates ingest, wrap, accessKey, revoke, and
//! getMetadata over the record state machine, composing every other module.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use crate::actor::ActorLookup;
use crate::audit::{AuditEvent, AuditKind, AuditSinkSync};
use crate::custody::CekCustody;
use crate::error::{RevokeOutcome, VaultError};
use crate::gate::{BucketClass, RateGate, SignaturePredicate, SigningPayload};
use crate::object_store::ObjectStore;
use crate::oracle::PermissionOracle;
use crate::record_store::RecordStore;
use crate::types::{
    ActorId, PermissionSource, Record, RecordId, RecordMetadata, RecordStatus, StoredWrappedKey,
};

/// Owner-held private key material, supplied by the caller only for the
/// duration of a single `revoke` call, to recover the CEK of a record whose
/// custody entry has already expired. Never stored by the engine; the path
/// it enables must be disabled in production builds (SPEC_FULL.md §4.6).
pub enum OwnerSecret {
    X25519([u8; 32]),
    Rsa(Box<rsa::RsaPrivateKey>),
}

/// Request-scoped authentication material for the C8 gate: the wallet that
/// is signing this call, the canonical payload's signature, and the IP the
/// request arrived from. One shape serves every operation — the signer is
/// the owner for `ingest`/`wrap`/`revoke` and the requesting actor for
/// `access_key`.
pub struct RequestAuth {
    pub remote_ip: IpAddr,
    pub wallet_address: String,
    pub wallet_public_key: Vec<u8>,
    pub signature: Vec<u8>,
    pub timestamp: i64,
    pub network: String,
}

pub struct VaultEngine {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    custody: Arc<CekCustody>,
    oracle: Arc<PermissionOracle>,
    actors: Arc<dyn ActorLookup>,
    audit: Arc<dyn AuditSinkSync>,
    gate: Arc<RateGate>,
    verifier: Arc<dyn SignaturePredicate>,
    crypto: vault_envelope::VaultCrypto,
}

impl VaultEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        custody: Arc<CekCustody>,
        oracle: Arc<PermissionOracle>,
        actors: Arc<dyn ActorLookup>,
        audit: Arc<dyn AuditSinkSync>,
        gate: Arc<RateGate>,
        verifier: Arc<dyn SignaturePredicate>,
    ) -> Self {
        Self {
            objects,
            records,
            custody,
            oracle,
            actors,
            audit,
            gate,
            verifier,
            crypto: vault_envelope::VaultCrypto::new(),
        }
    }

    /// Rate-limit by IP (and, when `wallet_limited`, by wallet address too)
    /// then verify `auth`'s signature over the canonical payload for
    /// `operation`/`payload_record_id`. Emits the matching audit event and
    /// returns the gate's error on either failure.
    async fn gate_request(
        &self,
        operation: &str,
        payload_record_id: &str,
        audit_record_id: Option<&RecordId>,
        auth: &RequestAuth,
        ip_class: BucketClass,
        wallet_limited: bool,
    ) -> Result<(), VaultError> {
        if let Err(e) = self.gate.check_ip(auth.remote_ip, ip_class).await {
            self.emit_gate_failure(audit_record_id, AuditKind::RateLimitExceeded, &auth.wallet_address);
            return Err(e);
        }
        if wallet_limited {
            if let Err(e) = self.gate.check_wallet(&auth.wallet_address).await {
                self.emit_gate_failure(audit_record_id, AuditKind::RateLimitExceeded, &auth.wallet_address);
                return Err(e);
            }
        }

        let payload = SigningPayload {
            operation,
            record_id: payload_record_id,
            timestamp: auth.timestamp,
            network: &auth.network,
        };
        let bytes = payload.canonical_bytes()?;
        if !self.verifier.verify(&auth.wallet_public_key, &bytes, &auth.signature) {
            self.emit_gate_failure(audit_record_id, AuditKind::SignatureVerificationFailed, &auth.wallet_address);
            return Err(VaultError::Unauthorized("signature verification failed".into()));
        }
        Ok(())
    }

    fn emit_gate_failure(&self, record_id: Option<&RecordId>, kind: AuditKind, actor: &str) {
        let event = match record_id {
            Some(id) => AuditEvent::record_event(id, kind),
            None => AuditEvent::system_event(kind),
        };
        self.audit.record(event.with_actor(actor).with_failure());
    }

    /// Recover the CEK that encrypted a record's *current* package. Tries
    /// custody first (the common case, shortly after `ingest`); once custody
    /// has evicted the entry, falls back to unwrapping the owner's own
    /// stored envelope using a caller-supplied secret.
    async fn recover_old_cek(
        &self,
        record_id: &RecordId,
        record: &Record,
        owner_secret: Option<&OwnerSecret>,
    ) -> Result<[u8; 32], VaultError> {
        if let Some(cek) = self.custody.get(record_id) {
            return Ok(cek);
        }

        let owner_actor_id = ActorId::new(record.owner.clone());
        let owner_envelope = record.wrapped_keys.get(&owner_actor_id).ok_or_else(|| {
            VaultError::Inconsistent(format!(
                "no parked CEK and no owner envelope for record {}",
                record_id
            ))
        })?;
        let wrapped = owner_envelope
            .to_wrapped()
            .map_err(|_| VaultError::Inconsistent("malformed stored owner envelope".into()))?;

        match (owner_secret, &wrapped) {
            (Some(OwnerSecret::X25519(secret)), vault_envelope::WrappedKey::X25519 { .. }) => {
                Ok(self.crypto.unwrap_x25519(&wrapped, secret)?)
            }
            (Some(OwnerSecret::Rsa(secret)), vault_envelope::WrappedKey::Rsa { .. }) => {
                Ok(self.crypto.unwrap_rsa(&wrapped, secret)?)
            }
            (Some(_), _) => Err(VaultError::BadInput(
                "owner secret scheme does not match the stored owner envelope".into(),
            )),
            (None, _) => Err(VaultError::Unauthorized(
                "CEK not in custody; an owner secret is required to recover it".into(),
            )),
        }
    }

    /// Encrypt `bytes` under a fresh CEK, upload the package, create the
    /// record in `pending_anchor`, and park the CEK for the subsequent `wrap`.
    pub async fn ingest(
        &self,
        bytes: &[u8],
        owner: &str,
        original_name: Option<String>,
        mime: Option<String>,
        auth: &RequestAuth,
    ) -> Result<(RecordId, String, String), VaultError> {
        // No record exists yet; the payload binds to the operation and
        // timestamp only, not to a record id.
        self.gate_request("ingest", "", None, auth, BucketClass::Auth, false).await?;

        let cek = self.crypto.generate_cek()?;
        let package = self.crypto.encrypt(bytes, &cek)?;
        let cid = self.objects.upload(&package).await?;
        let cid_hash = self.crypto.sha256_hex(cid.as_bytes());

        let record_id = RecordId::generate();
        let mut record = Record::new(record_id.clone(), owner);
        record.cid = Some(cid.clone());
        record.cid_hash = Some(cid_hash.clone());
        if !record.status.can_transition_to(RecordStatus::PendingAnchor) {
            return Err(VaultError::Internal("new record cannot reach pending_anchor".into()));
        }
        record.status = RecordStatus::PendingAnchor;
        record.metadata = RecordMetadata {
            original_name,
            mime,
            original_size: bytes.len() as u64,
            encrypted_size: package.len() as u64,
            uploaded_at: Some(chrono::Utc::now()),
        };
        self.records.upsert(&record)?;
        self.custody.put(&record_id, cek);

        self.audit.record(
            AuditEvent::record_event(&record_id, AuditKind::FileUploaded { cid_hash: cid_hash.clone() })
                .with_actor(owner),
        );

        Ok((record_id, cid, cid_hash))
    }

    /// Wrap the parked CEK for each requested actor, commit the map, and
    /// transition the record to `anchored`.
    pub async fn wrap(
        &self,
        record_id: &RecordId,
        actor_ids: &[ActorId],
        auth: &RequestAuth,
    ) -> Result<HashMap<ActorId, StoredWrappedKey>, VaultError> {
        self.gate_request("wrap", record_id.as_str(), Some(record_id), auth, BucketClass::Sensitive, true)
            .await?;

        let lock = self.records.record_lock(record_id);
        let _guard = lock.lock().await;

        let mut record = self
            .records
            .get_by_id(record_id)?
            .ok_or_else(|| VaultError::NotFound(format!("record {}", record_id)))?;

        if record.status != RecordStatus::Anchored && !record.status.can_transition_to(RecordStatus::Anchored) {
            return Err(VaultError::Conflict(format!(
                "record {} cannot be wrapped from status {}",
                record_id, record.status
            )));
        }

        let cek = self
            .custody
            .get(record_id)
            .ok_or_else(|| VaultError::Conflict("no CEK parked for this record".into()))?;

        let mut wrapped = HashMap::new();
        for actor_id in actor_ids {
            let actor = self
                .actors
                .get(actor_id)?
                .ok_or_else(|| VaultError::BadInput(format!("unknown actor {}", actor_id)))?;

            let wrapped_key = if let Some(x25519_hex) = &actor.public_keys.x25519_hex {
                let mut recipient_pk = [0u8; 32];
                let decoded = hex::decode(x25519_hex)
                    .map_err(|_| VaultError::BadInput("malformed x25519 public key".into()))?;
                if decoded.len() != 32 {
                    return Err(VaultError::BadInput("x25519 public key must be 32 bytes".into()));
                }
                recipient_pk.copy_from_slice(&decoded);
                self.crypto.wrap_x25519(&cek, &recipient_pk)?
            } else if let Some(rsa_pem) = &actor.public_keys.rsa_pem {
                let public_key = vault_envelope::parse_rsa_public_pem(rsa_pem)
                    .map_err(|_| VaultError::BadInput("malformed RSA public key".into()))?;
                self.crypto.wrap_rsa(&cek, &public_key)?
            } else {
                return Err(VaultError::BadInput(format!(
                    "actor {} has no usable public key",
                    actor_id
                )));
            };

            wrapped.insert(actor_id.clone(), StoredWrappedKey::from_wrapped(&wrapped_key));
            self.audit.record(
                AuditEvent::record_event(record_id, AuditKind::CekWrapped { actor_id: actor_id.clone() })
                    .with_actor_id(actor_id.clone()),
            );
        }

        record.status = RecordStatus::Anchored;
        record.updated_at = chrono::Utc::now();
        self.records.upsert(&record)?;
        self.records.patch_wrapped_keys(record_id, wrapped.clone())?;
        self.custody.evict(record_id);

        Ok(wrapped)
    }

    /// Gate via C5, then return the stored envelope for `actor_id` without
    /// ever unwrapping it server-side.
    pub async fn access_key(
        &self,
        record_id: &RecordId,
        actor_id: &ActorId,
        auth: &RequestAuth,
    ) -> Result<(StoredWrappedKey, PermissionSource), VaultError> {
        self.gate_request("access_key", record_id.as_str(), Some(record_id), auth, BucketClass::General, false)
            .await?;

        let decision = self.oracle.check(record_id, actor_id).await?;

        self.audit.record(
            AuditEvent::record_event(
                record_id,
                AuditKind::PermissionCheck { method: decision.source, granted: decision.granted },
            )
            .with_actor_id(actor_id.clone()),
        );

        if !decision.granted {
            self.audit.record(
                AuditEvent::record_event(record_id, AuditKind::AccessDenied { method: decision.source })
                    .with_actor_id(actor_id.clone()),
            );
            return Err(VaultError::Denied(format!("actor {} not permitted", actor_id)));
        }

        let record = self
            .records
            .get_by_id(record_id)?
            .ok_or_else(|| VaultError::NotFound(format!("record {}", record_id)))?;

        let envelope = record.wrapped_keys.get(actor_id).cloned().ok_or_else(|| {
            VaultError::Inconsistent(format!(
                "oracle granted {} for {} but no stored envelope exists",
                actor_id, record_id
            ))
        })?;

        self.audit.record(
            AuditEvent::record_event(record_id, AuditKind::AccessGranted { method: decision.source })
                .with_actor_id(actor_id.clone()),
        );

        Ok((envelope, decision.source))
    }

    /// Revoke `actor_id`'s access: recover the CEK that produced the current
    /// package, decrypt it, rotate to a fresh CEK, re-encrypt, re-wrap
    /// surviving actors, and commit atomically at step 5. Idempotent.
    pub async fn revoke(
        &self,
        record_id: &RecordId,
        actor_id: &ActorId,
        owner_secret: Option<&OwnerSecret>,
        auth: &RequestAuth,
    ) -> Result<RevokeOutcome, VaultError> {
        self.gate_request("revoke", record_id.as_str(), Some(record_id), auth, BucketClass::Sensitive, true)
            .await?;

        let lock = self.records.record_lock(record_id);
        let _guard = lock.lock().await;

        let mut record = self
            .records
            .get_by_id(record_id)?
            .ok_or_else(|| VaultError::NotFound(format!("record {}", record_id)))?;

        if !record.wrapped_keys.contains_key(actor_id) {
            return Ok(RevokeOutcome::NoOp);
        }

        let old_cid = record
            .cid
            .clone()
            .ok_or_else(|| VaultError::Inconsistent("anchored record has no cid".into()))?;

        if !record.status.can_transition_to(RecordStatus::Rotating) {
            return Err(VaultError::Conflict(format!(
                "record {} cannot be revoked from status {}",
                record_id, record.status
            )));
        }

        let old_cek = self.recover_old_cek(record_id, &record, owner_secret).await?;

        record.status = RecordStatus::Rotating;
        self.records.upsert(&record)?;

        // Steps 1-4: no externally visible change yet.
        let downloaded = self.objects.download(&old_cid).await?;
        let plaintext = self.crypto.decrypt(&downloaded, &old_cek)?;

        let new_cek = self.crypto.generate_cek()?;
        let new_package = self.crypto.encrypt(&plaintext, &new_cek)?;
        let new_cid = self.objects.upload(&new_package).await?;
        let new_cid_hash = self.crypto.sha256_hex(new_cid.as_bytes());

        let mut new_wrapped_keys = HashMap::new();
        for (other_actor_id, _old_envelope) in record.wrapped_keys.iter() {
            if other_actor_id == actor_id {
                continue;
            }
            let actor = self
                .actors
                .get(other_actor_id)?
                .ok_or_else(|| VaultError::Inconsistent(format!("actor {} vanished", other_actor_id)))?;

            let wrapped_key = if let Some(x25519_hex) = &actor.public_keys.x25519_hex {
                let mut recipient_pk = [0u8; 32];
                let decoded = hex::decode(x25519_hex)
                    .map_err(|_| VaultError::Inconsistent("malformed stored x25519 key".into()))?;
                recipient_pk.copy_from_slice(&decoded);
                self.crypto.wrap_x25519(&new_cek, &recipient_pk)?
            } else if let Some(rsa_pem) = &actor.public_keys.rsa_pem {
                let public_key = vault_envelope::parse_rsa_public_pem(rsa_pem)
                    .map_err(|_| VaultError::Inconsistent("malformed stored RSA key".into()))?;
                self.crypto.wrap_rsa(&new_cek, &public_key)?
            } else {
                return Err(VaultError::Inconsistent(format!(
                    "actor {} lost all public key material",
                    other_actor_id
                )));
            };
            new_wrapped_keys.insert(other_actor_id.clone(), StoredWrappedKey::from_wrapped(&wrapped_key));
        }

        if !RecordStatus::Rotating.can_transition_to(RecordStatus::Anchored) {
            return Err(VaultError::Internal("rotating record cannot commit to anchored".into()));
        }

        // Step 5: the commit point. Everything above this line is discardable.
        record.cid = Some(new_cid.clone());
        record.cid_hash = Some(new_cid_hash.clone());
        record.epoch += 1;
        record.status = RecordStatus::Anchored;
        record.updated_at = chrono::Utc::now();
        self.records.upsert(&record)?;
        self.records.patch_wrapped_keys(record_id, new_wrapped_keys)?;

        self.oracle.invalidate(record_id, None);

        if let Err(e) = self.objects.unpin(&old_cid).await {
            tracing::warn!(record_id = %record_id, old_cid = %old_cid, error = %e, "best-effort unpin of old CID failed");
        }

        self.audit.record(
            AuditEvent::record_event(record_id, AuditKind::Revocation { revoked_actor: Some(actor_id.clone()) })
                .with_actor_id(actor_id.clone())
                .with_detail(format!("old_cid={} new_cid={}", old_cid, new_cid)),
        );
        self.audit.record(AuditEvent::record_event(
            record_id,
            AuditKind::CekRotated { new_epoch: record.epoch },
        ));

        Ok(RevokeOutcome::Rotated {
            new_cid,
            new_cid_hash,
            epoch: record.epoch,
        })
    }

    pub fn get_metadata(&self, record_id: &RecordId) -> Result<Record, VaultError> {
        self.records
            .get_by_id(record_id)?
            .ok_or_else(|| VaultError::NotFound(format!("record {}", record_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorDirectory;
    use crate::audit::InMemoryAuditSink;
    use crate::gate::{Ed25519WalletVerifier, SignaturePredicate};
    use crate::object_store::InMemoryObjectStore;
    use crate::oracle::{L2ReplicaTier, L2Snapshot, PermissionOracle};
    use crate::record_store::InMemoryRecordStore;
    use crate::types::{ActorPublicKeys, ActorRole};
    use ed25519_dalek::{Signer, SigningKey};

    mod rand_core_08 {
        pub use ed25519_dalek::rand_core::OsRng;
    }

    fn doctor_keys() -> ActorPublicKeys {
        let (public, _secret) = vault_envelope::generate_x25519_keypair();
        ActorPublicKeys {
            x25519_hex: Some(hex::encode(public)),
            rsa_pem: None,
        }
    }

    fn signed_auth(signing_key: &SigningKey, wallet_address: &str, operation: &str, record_id: &str) -> RequestAuth {
        let payload = SigningPayload {
            operation,
            record_id,
            timestamp: 0,
            network: "testnet",
        };
        let bytes = payload.canonical_bytes().unwrap();
        let signature = signing_key.sign(&bytes);
        RequestAuth {
            remote_ip: "127.0.0.1".parse().unwrap(),
            wallet_address: wallet_address.to_string(),
            wallet_public_key: signing_key.verifying_key().to_bytes().to_vec(),
            signature: signature.to_bytes().to_vec(),
            timestamp: 0,
            network: "testnet".into(),
        }
    }

    fn verifier() -> Arc<dyn SignaturePredicate> {
        Arc::new(Ed25519WalletVerifier)
    }

    #[tokio::test]
    async fn ingest_then_wrap_then_access_key_full_lifecycle() {
        use crate::oracle::L2RecordEntry;

        let objects = Arc::new(InMemoryObjectStore::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let custody = Arc::new(CekCustody::new());
        let actors = Arc::new(ActorDirectory::new());
        let doctor_id = ActorId::new("02");
        actors.register(doctor_id.clone(), ActorRole::Doctor, "addr_doctor", doctor_keys());

        let l2_tier = Arc::new(L2ReplicaTier::new());
        let oracle = Arc::new(PermissionOracle::new(vec![Box::new(l2_tier.clone())]));
        let audit = Arc::new(InMemoryAuditSink::new());
        let gate = Arc::new(RateGate::new());
        let signing_key = SigningKey::generate(&mut rand_core_08::OsRng);
        let engine = VaultEngine::new(
            objects.clone(),
            records.clone(),
            custody,
            oracle,
            actors.clone(),
            audit.clone(),
            gate,
            verifier(),
        );

        let (record_id, _cid, _cid_hash) = engine
            .ingest(
                b"plaintext medical record",
                "owner_wallet",
                Some("chart.pdf".into()),
                None,
                &signed_auth(&signing_key, "owner_wallet", "ingest", ""),
            )
            .await
            .unwrap();

        let wrapped = engine
            .wrap(
                &record_id,
                &[doctor_id.clone()],
                &signed_auth(&signing_key, "owner_wallet", "wrap", record_id.as_str()),
            )
            .await
            .unwrap();
        assert!(wrapped.contains_key(&doctor_id));

        let record = engine.get_metadata(&record_id).unwrap();
        assert_eq!(record.status, RecordStatus::Anchored);

        l2_tier.accept_snapshot(L2Snapshot {
            head_id: "h1".into(),
            snapshot_id: "s1".into(),
            epoch: 1,
            records: HashMap::from([(
                record_id.clone(),
                L2RecordEntry {
                    cid_hash: record.cid_hash.clone().unwrap(),
                    permitted_actors: vec![doctor_id.clone()],
                },
            )]),
        });

        let (envelope, source) = engine
            .access_key(
                &record_id,
                &doctor_id,
                &signed_auth(&signing_key, "addr_doctor", "access_key", record_id.as_str()),
            )
            .await
            .unwrap();
        assert_eq!(source, PermissionSource::L2);
        match envelope {
            StoredWrappedKey::X25519 { .. } => {}
            StoredWrappedKey::Rsa { .. } => panic!("expected x25519 wrap"),
        }
    }

    #[tokio::test]
    async fn access_key_for_unauthorized_actor_is_denied_by_l2() {
        use crate::oracle::L2RecordEntry;

        let objects = Arc::new(InMemoryObjectStore::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let custody = Arc::new(CekCustody::new());
        let actors = Arc::new(ActorDirectory::new());
        let doctor_id = ActorId::new("02");
        let insurance_id = ActorId::new("04");
        actors.register(doctor_id.clone(), ActorRole::Doctor, "addr_doctor", doctor_keys());

        let l2_tier = Arc::new(L2ReplicaTier::new());
        let oracle = Arc::new(PermissionOracle::new(vec![Box::new(l2_tier.clone())]));
        let audit = Arc::new(InMemoryAuditSink::new());
        let gate = Arc::new(RateGate::new());
        let signing_key = SigningKey::generate(&mut rand_core_08::OsRng);
        let engine = VaultEngine::new(objects, records, custody, oracle, actors, audit, gate, verifier());

        let (record_id, _cid, _cid_hash) = engine
            .ingest(
                b"plaintext",
                "owner_wallet",
                None,
                None,
                &signed_auth(&signing_key, "owner_wallet", "ingest", ""),
            )
            .await
            .unwrap();
        engine
            .wrap(
                &record_id,
                &[doctor_id.clone()],
                &signed_auth(&signing_key, "owner_wallet", "wrap", record_id.as_str()),
            )
            .await
            .unwrap();

        // The L2 replica now catches up with a snapshot naming only the
        // doctor as permitted.
        l2_tier.accept_snapshot(L2Snapshot {
            head_id: "h1".into(),
            snapshot_id: "s1".into(),
            epoch: 1,
            records: HashMap::from([(
                record_id.clone(),
                L2RecordEntry {
                    cid_hash: "irrelevant".into(),
                    permitted_actors: vec![doctor_id.clone()],
                },
            )]),
        });

        let err = engine
            .access_key(
                &record_id,
                &insurance_id,
                &signed_auth(&signing_key, "addr_insurance", "access_key", record_id.as_str()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Denied(_)));
    }

    #[tokio::test]
    async fn revoking_unknown_actor_is_noop() {
        let objects = Arc::new(InMemoryObjectStore::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let custody = Arc::new(CekCustody::new());
        let actors = Arc::new(ActorDirectory::new());
        let oracle = Arc::new(PermissionOracle::new(vec![Box::new(L2ReplicaTier::new())]));
        let audit = Arc::new(InMemoryAuditSink::new());
        let gate = Arc::new(RateGate::new());
        let signing_key = SigningKey::generate(&mut rand_core_08::OsRng);
        let engine = VaultEngine::new(objects, records, custody, oracle, actors, audit, gate, verifier());

        let (record_id, _cid, _cid_hash) = engine
            .ingest(
                b"plaintext",
                "owner_wallet",
                None,
                None,
                &signed_auth(&signing_key, "owner_wallet", "ingest", ""),
            )
            .await
            .unwrap();

        let outcome = engine
            .revoke(
                &record_id,
                &ActorId::new("absent"),
                None,
                &signed_auth(&signing_key, "owner_wallet", "revoke", record_id.as_str()),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, RevokeOutcome::NoOp));
    }

    #[tokio::test]
    async fn revoke_rotates_epoch_and_rewraps_survivors() {
        let objects = Arc::new(InMemoryObjectStore::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let custody = Arc::new(CekCustody::new());
        let actors = Arc::new(ActorDirectory::new());
        let doctor_id = ActorId::new("02");
        let hospital_id = ActorId::new("03");
        let owner_id = ActorId::new("owner_wallet");
        actors.register(doctor_id.clone(), ActorRole::Doctor, "addr_doctor", doctor_keys());

        let (hospital_public, hospital_secret) = vault_envelope::generate_x25519_keypair();
        actors.register(
            hospital_id.clone(),
            ActorRole::Hospital,
            "addr_hospital",
            ActorPublicKeys {
                x25519_hex: Some(hex::encode(hospital_public)),
                rsa_pem: None,
            },
        );

        let (owner_public, owner_secret) = vault_envelope::generate_x25519_keypair();
        actors.register(
            owner_id.clone(),
            ActorRole::Patient,
            "owner_wallet",
            ActorPublicKeys {
                x25519_hex: Some(hex::encode(owner_public)),
                rsa_pem: None,
            },
        );

        let oracle = Arc::new(PermissionOracle::new(vec![Box::new(L2ReplicaTier::new())]));
        let audit = Arc::new(InMemoryAuditSink::new());
        let gate = Arc::new(RateGate::new());
        let signing_key = SigningKey::generate(&mut rand_core_08::OsRng);
        let engine = VaultEngine::new(
            objects.clone(),
            records,
            custody,
            oracle,
            actors,
            audit,
            gate,
            verifier(),
        );

        let plaintext: &[u8] = b"plaintext medical record";
        let (record_id, _cid, _cid_hash) = engine
            .ingest(
                plaintext,
                "owner_wallet",
                None,
                None,
                &signed_auth(&signing_key, "owner_wallet", "ingest", ""),
            )
            .await
            .unwrap();
        engine
            .wrap(
                &record_id,
                &[doctor_id.clone(), hospital_id.clone(), owner_id.clone()],
                &signed_auth(&signing_key, "owner_wallet", "wrap", record_id.as_str()),
            )
            .await
            .unwrap();

        let before = engine.get_metadata(&record_id).unwrap();
        assert_eq!(before.epoch, 0);

        // Custody has already evicted the CEK (wrap did that); revoke must
        // recover it via the owner's own stored envelope.
        let owner_secret_material = OwnerSecret::X25519(owner_secret);
        let outcome = engine
            .revoke(
                &record_id,
                &doctor_id,
                Some(&owner_secret_material),
                &signed_auth(&signing_key, "owner_wallet", "revoke", record_id.as_str()),
            )
            .await
            .unwrap();
        let new_cid = match outcome {
            RevokeOutcome::Rotated { epoch, new_cid, .. } => {
                assert_eq!(epoch, 1);
                new_cid
            }
            RevokeOutcome::NoOp => panic!("expected rotation"),
        };

        let after = engine.get_metadata(&record_id).unwrap();
        assert_eq!(after.epoch, 1);
        assert!(!after.wrapped_keys.contains_key(&doctor_id));
        assert!(after.wrapped_keys.contains_key(&hospital_id));
        assert!(after.wrapped_keys.contains_key(&owner_id));

        // The rotated package must decrypt back to the *original* plaintext,
        // not to the previous ciphertext package.
        let crypto = vault_envelope::VaultCrypto::new();
        let hospital_envelope = after.wrapped_keys.get(&hospital_id).unwrap().to_wrapped().unwrap();
        let new_cek = crypto.unwrap_x25519(&hospital_envelope, &hospital_secret).unwrap();
        let downloaded = objects.download(&new_cid).await.unwrap();
        let recovered_plaintext = crypto.decrypt(&downloaded, &new_cek).unwrap();
        assert_eq!(recovered_plaintext, plaintext);
    }
}
