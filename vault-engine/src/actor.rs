//! Actor directory: the minimal actor lookup the engine needs to resolve
//! public keys for `wrap`/`revoke`. Full actor CRUD (registration forms,
//! wallet-address verification, role management UI) is an external
//! collaborator; this module only holds what C6 must read.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::audit::{AuditEvent, AuditKind, AuditSinkSync};
use crate::error::VaultError;
use crate::types::{Actor, ActorId, ActorPublicKeys, ActorRole, ActorStatus};
use std::sync::Arc;

pub trait ActorLookup: Send + Sync {
    fn get(&self, actor_id: &ActorId) -> Result<Option<Actor>, VaultError>;
}

/// In-memory actor roster. The canonical test roster is the two-character
/// decimal handles `"01"`..`"04"`, but any string is accepted.
pub struct ActorDirectory {
    actors: RwLock<HashMap<ActorId, Actor>>,
    audit: Option<Arc<dyn AuditSinkSync>>,
}

impl ActorDirectory {
    pub fn new() -> Self {
        Self {
            actors: RwLock::new(HashMap::new()),
            audit: None,
        }
    }

    pub fn with_audit(audit: Arc<dyn AuditSinkSync>) -> Self {
        Self {
            actors: RwLock::new(HashMap::new()),
            audit: Some(audit),
        }
    }

    pub fn register(
        &self,
        actor_id: ActorId,
        role: ActorRole,
        wallet_address: impl Into<String>,
        public_keys: ActorPublicKeys,
    ) {
        let actor = Actor {
            actor_id: actor_id.clone(),
            role,
            wallet_address: wallet_address.into(),
            public_keys,
            status: ActorStatus::Active,
        };
        self.actors.write().unwrap().insert(actor_id.clone(), actor);
        if let Some(audit) = &self.audit {
            audit.record(AuditEvent::system_event(AuditKind::ActorRegistered { actor_id }));
        }
    }

    pub fn deactivate(&self, actor_id: &ActorId) -> Result<(), VaultError> {
        let mut actors = self.actors.write().unwrap();
        let actor = actors
            .get_mut(actor_id)
            .ok_or_else(|| VaultError::NotFound(format!("actor {}", actor_id)))?;
        actor.status = ActorStatus::Inactive;
        if let Some(audit) = &self.audit {
            audit.record(AuditEvent::system_event(AuditKind::ActorDeactivated {
                actor_id: actor_id.clone(),
            }));
        }
        Ok(())
    }
}

impl Default for ActorDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorLookup for ActorDirectory {
    fn get(&self, actor_id: &ActorId) -> Result<Option<Actor>, VaultError> {
        Ok(self.actors.read().unwrap().get(actor_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_get_roundtrips() {
        let directory = ActorDirectory::new();
        let id = ActorId::new("02");
        directory.register(
            id.clone(),
            ActorRole::Doctor,
            "addr_doctor",
            ActorPublicKeys {
                x25519_hex: Some("00".repeat(32)),
                rsa_pem: None,
            },
        );
        let actor = directory.get(&id).unwrap().unwrap();
        assert!(actor.is_active());
        assert_eq!(actor.wallet_address, "addr_doctor");
    }

    #[test]
    fn deactivate_unknown_actor_is_not_found() {
        let directory = ActorDirectory::new();
        let err = directory.deactivate(&ActorId::new("nope")).unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }
}
