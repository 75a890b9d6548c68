// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Per-identity resource accounting.

use crate::fxp::Amount;
use crate::types::id::IdentityId;
use serde::{Deserialize, Serialize};

/// Hard per-resource ceilings for one identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCeilings {
    /// Millicores.
    pub cpu: u64,
    /// MiB.
    pub memory: u64,
}

/// Amount charged to a [`ResourceState`] by one allowed action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDelta {
    pub budget: Amount,
    pub cpu: u64,
    pub memory: u64,
}

impl ResourceDelta {
    pub const ZERO: ResourceDelta = ResourceDelta { budget: Amount::ZERO, cpu: 0, memory: 0 };

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// What a delta is missing to fit into a state. Zero fields fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub budget: Amount,
    pub cpu: u64,
    pub memory: u64,
}

/// Live quota state of one identity.
///
/// Only the resource ledger mutates it, under the identity's exclusive lock.
/// `version` increments on every committed mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    pub identity_id: IdentityId,
    pub budget_remaining: Amount,
    pub cpu_used: u64,
    pub memory_used: u64,
    pub quota_ceiling: ResourceCeilings,
    pub version: u64,
}

impl ResourceState {
    pub fn new(identity_id: IdentityId, budget: Amount, quota_ceiling: ResourceCeilings) -> Self {
        Self {
            identity_id,
            budget_remaining: budget,
            cpu_used: 0,
            memory_used: 0,
            quota_ceiling,
            version: 0,
        }
    }

    /// `None` if `delta` fits within the remaining budget and every ceiling.
    pub fn shortfall(&self, delta: &ResourceDelta) -> Option<Shortfall> {
        let budget = if self.budget_remaining < delta.budget {
            delta.budget.checked_sub(self.budget_remaining).unwrap_or(delta.budget)
        } else {
            Amount::ZERO
        };
        // measured against headroom so a ceiling near u64::MAX cannot wrap
        let cpu = delta
            .cpu
            .saturating_sub(self.quota_ceiling.cpu.saturating_sub(self.cpu_used));
        let memory = delta
            .memory
            .saturating_sub(self.quota_ceiling.memory.saturating_sub(self.memory_used));

        let s = Shortfall { budget, cpu, memory };
        if s == Shortfall::default() {
            None
        } else {
            Some(s)
        }
    }

    /// Prospective state after charging `delta`, with `version + 1`.
    ///
    /// Returns `Err(shortfall)` if the delta does not fit. Pure: `self` is
    /// untouched.
    pub fn apply(&self, delta: &ResourceDelta) -> Result<ResourceState, Shortfall> {
        if let Some(s) = self.shortfall(delta) {
            return Err(s);
        }
        let budget_remaining = self
            .budget_remaining
            .checked_sub(delta.budget)
            .map_err(|_| Shortfall { budget: delta.budget, cpu: 0, memory: 0 })?;
        let cpu_used = self
            .cpu_used
            .checked_add(delta.cpu)
            .ok_or(Shortfall { budget: Amount::ZERO, cpu: delta.cpu, memory: 0 })?;
        let memory_used = self
            .memory_used
            .checked_add(delta.memory)
            .ok_or(Shortfall { budget: Amount::ZERO, cpu: 0, memory: delta.memory })?;
        Ok(ResourceState {
            identity_id: self.identity_id.clone(),
            budget_remaining,
            cpu_used,
            memory_used,
            quota_ceiling: self.quota_ceiling,
            version: self.version + 1,
        })
    }
}
