// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-memory identity directory.

use governance_kernel::identity::IdentitySource;
use governance_kernel::types::{Identity, IdentityId};
use rustc_hash::FxHashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    identities: RwLock<FxHashMap<IdentityId, Identity>>,
}

impl InMemoryDirectory {
    pub fn new(identities: impl IntoIterator<Item = Identity>) -> Self {
        let map: FxHashMap<_, _> = identities.into_iter().map(|i| (i.id.clone(), i)).collect();
        Self { identities: RwLock::new(map) }
    }

    pub fn register(&self, identity: Identity) {
        self.identities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.id.clone(), identity);
    }

    /// Flip the revocation flag. Returns false for an unknown identity.
    ///
    /// Held in memory only. A restart reloads the registry file, so a
    /// revocation that must survive has to be written there as well.
    pub fn revoke(&self, id: &IdentityId) -> bool {
        let mut map = self.identities.write().unwrap_or_else(PoisonError::into_inner);
        match map.get_mut(id) {
            Some(identity) => {
                identity.revoked = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.identities.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IdentitySource for InMemoryDirectory {
    fn identity(&self, id: &IdentityId) -> Option<Identity> {
        self.identities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}
