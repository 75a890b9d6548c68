// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Resource Ledger
//!
//! Per-identity quota state behind an arena of independently lockable
//! shards. Each account carries its own transaction mutex, so transactions
//! on one identity serialize while other identities proceed in parallel.
//!
//! # Invariants
//! - tentative ≠ committed: readers only ever see committed state
//! - `version` grows by exactly one per commit
//! - a lock is released on every exit path (the handle's guard drops)

use governance_kernel::types::{IdentityId, ResourceDelta, ResourceState, Shortfall};
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("no resource account for {0}")]
    UnknownAccount(IdentityId),

    #[error("lock not acquired before the deadline")]
    LockTimeout,

    #[error("quota exceeded: {0:?}")]
    QuotaExceeded(Shortfall),

    #[error("tentative state is stale: committed version {committed}, tentative built on {base}")]
    StaleTentative { committed: u64, base: u64 },

    #[error("tentative state belongs to {0}")]
    WrongIdentity(IdentityId),
}

struct AccountSlot {
    txn: Arc<Mutex<()>>,
    committed: RwLock<ResourceState>,
}

impl AccountSlot {
    fn new(state: ResourceState) -> Self {
        Self { txn: Arc::new(Mutex::new(())), committed: RwLock::new(state) }
    }

    fn read(&self) -> ResourceState {
        self.committed.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Prospective state computed under a lock. Never visible to readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TentativeState {
    state: ResourceState,
    base_version: u64,
}

impl TentativeState {
    pub fn state(&self) -> &ResourceState {
        &self.state
    }

    pub fn into_state(self) -> ResourceState {
        self.state
    }
}

/// Exclusive hold on one identity's account.
pub struct LockHandle {
    slot: Arc<AccountSlot>,
    identity_id: IdentityId,
    pending: Option<ResourceState>,
    _guard: OwnedMutexGuard<()>,
}

impl LockHandle {
    pub fn identity_id(&self) -> &IdentityId {
        &self.identity_id
    }

    /// Committed state as of now; stable while the handle is held.
    pub fn snapshot(&self) -> ResourceState {
        self.slot.read()
    }

    pub fn tentative_apply(&mut self, delta: &ResourceDelta) -> Result<TentativeState, ResourceError> {
        let base = self.snapshot();
        let next = base.apply(delta).map_err(ResourceError::QuotaExceeded)?;
        self.pending = Some(next.clone());
        Ok(TentativeState { state: next, base_version: base.version })
    }

    /// Publish `tentative` as the committed state.
    pub fn commit(&mut self, tentative: TentativeState) -> Result<ResourceState, ResourceError> {
        if tentative.state.identity_id != self.identity_id {
            return Err(ResourceError::WrongIdentity(tentative.state.identity_id));
        }
        let mut committed = self.slot.committed.write().unwrap_or_else(PoisonError::into_inner);
        if committed.version != tentative.base_version {
            return Err(ResourceError::StaleTentative {
                committed: committed.version,
                base: tentative.base_version,
            });
        }
        *committed = tentative.state.clone();
        self.pending = None;
        Ok(tentative.state)
    }

    /// Discard any tentative state. Committed state is untouched.
    pub fn rollback(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Release the lock. Dropping the handle does the same.
    pub fn release(self) {}
}

pub struct ResourceLedger {
    shards: Vec<RwLock<FxHashMap<IdentityId, Arc<AccountSlot>>>>,
}

impl ResourceLedger {
    pub fn new(shards: usize) -> Self {
        let n = shards.max(1);
        Self { shards: (0..n).map(|_| RwLock::new(FxHashMap::default())).collect() }
    }

    fn shard(&self, id: &IdentityId) -> &RwLock<FxHashMap<IdentityId, Arc<AccountSlot>>> {
        let mut h = FxHasher::default();
        id.hash(&mut h);
        &self.shards[(h.finish() as usize) % self.shards.len()]
    }

    fn slot(&self, id: &IdentityId) -> Option<Arc<AccountSlot>> {
        self.shard(id)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Install or replace an account's committed state.
    ///
    /// Only for startup seeding and recovery, before any transaction runs.
    pub fn provision(&self, state: ResourceState) {
        let id = state.identity_id.clone();
        let mut shard = self.shard(&id).write().unwrap_or_else(PoisonError::into_inner);
        match shard.get(&id) {
            Some(slot) => *slot.committed.write().unwrap_or_else(PoisonError::into_inner) = state,
            None => {
                shard.insert(id, Arc::new(AccountSlot::new(state)));
            }
        }
    }

    pub fn contains(&self, id: &IdentityId) -> bool {
        self.slot(id).is_some()
    }

    /// Point read of committed state.
    pub fn get(&self, id: &IdentityId) -> Option<ResourceState> {
        self.slot(id).map(|s| s.read())
    }

    pub async fn lock(&self, id: &IdentityId) -> Result<LockHandle, ResourceError> {
        let slot = self.slot(id).ok_or_else(|| ResourceError::UnknownAccount(id.clone()))?;
        let guard = slot.txn.clone().lock_owned().await;
        Ok(LockHandle { slot, identity_id: id.clone(), pending: None, _guard: guard })
    }

    /// Like [`Self::lock`], giving up at `deadline`. A deadline already
    /// passed times out even when the lock is free.
    pub async fn lock_until(&self, id: &IdentityId, deadline: Instant) -> Result<LockHandle, ResourceError> {
        let slot = self.slot(id).ok_or_else(|| ResourceError::UnknownAccount(id.clone()))?;
        if Instant::now() >= deadline {
            return Err(ResourceError::LockTimeout);
        }
        let guard = tokio::time::timeout_at(deadline, slot.txn.clone().lock_owned())
            .await
            .map_err(|_| ResourceError::LockTimeout)?;
        Ok(LockHandle { slot, identity_id: id.clone(), pending: None, _guard: guard })
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
