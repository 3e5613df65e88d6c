//! Capability grants, action tokens and a fixed identity.

use super::{AccessControl, IdentityProvider};
use crate::restore::RestoreScope;
use crate::types::ActorId;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Access control backed by a capability table and secret-keyed tokens.
///
/// Tokens are `hex(sha256(secret || 0x00 || action))`, where `action` is
/// [`RestoreScope::action`]. A token therefore verifies only for the exact
/// record and revision it was issued for.
pub struct TokenAuthority {
    secret: Vec<u8>,
    grants: RwLock<HashMap<ActorId, HashSet<String>>>,
}

impl TokenAuthority {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            grants: RwLock::new(HashMap::new()),
        }
    }

    /// Grant a capability to an actor.
    pub fn grant(&self, actor: ActorId, capability: &str) {
        self.grants
            .write()
            .entry(actor)
            .or_default()
            .insert(capability.to_string());
    }

    /// Revoke a capability. Returns true if it was held.
    pub fn revoke(&self, actor: ActorId, capability: &str) -> bool {
        self.grants
            .write()
            .get_mut(&actor)
            .map_or(false, |caps| caps.remove(capability))
    }

    /// Issue a token for a restore scope.
    pub fn issue(&self, scope: &RestoreScope) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update([0u8]);
        hasher.update(scope.action().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Byte comparison that does not short-circuit on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl AccessControl for TokenAuthority {
    fn has_capability(&self, actor: ActorId, capability: &str) -> bool {
        self.grants
            .read()
            .get(&actor)
            .map_or(false, |caps| caps.contains(capability))
    }

    fn verify_action_token(&self, token: &str, scope: &RestoreScope) -> bool {
        let expected = self.issue(scope);
        constant_time_eq(expected.as_bytes(), token.trim().to_ascii_lowercase().as_bytes())
    }
}

/// Identity provider that always reports the same actor.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticIdentity(pub ActorId);

impl IdentityProvider for StaticIdentity {
    fn current_actor(&self) -> ActorId {
        self.0
    }
}
