// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Action requests submitted by agents.

use crate::error::{KernelError, KernelResult};
use crate::fxp::Amount;
use crate::hash::{canonical_bytes, hash_bytes};
use crate::types::digest::{Digest, SignatureBytes};
use crate::types::id::{ActionKind, IdentityId, MessageId, Namespace};
use crate::types::resource::ResourceDelta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Non-budget resources an action expects to consume.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// CPU in millicores.
    #[serde(default)]
    pub cpu: u64,
    /// Memory in MiB.
    #[serde(default)]
    pub memory: u64,
}

/// A single request for permission. Consumed once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub message_id: MessageId,
    /// Unix epoch milliseconds, stamped by the caller.
    pub timestamp: u64,
    pub identity_id: IdentityId,
    pub namespace: Namespace,
    pub destination: String,
    pub action_kind: ActionKind,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    pub estimated_cost: Amount,
    #[serde(default)]
    pub resources: ResourceUsage,
    #[serde(default)]
    pub idempotent: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl ActionRequest {
    /// Bytes covered by the requester's signature.
    pub fn signing_bytes(&self) -> KernelResult<Vec<u8>> {
        canonical_bytes(self)
    }

    pub fn digest(&self) -> KernelResult<Digest> {
        Ok(hash_bytes(&self.signing_bytes()?))
    }

    /// Cost this request would charge if allowed.
    pub fn cost_delta(&self) -> ResourceDelta {
        ResourceDelta {
            budget: self.estimated_cost,
            cpu: self.resources.cpu,
            memory: self.resources.memory,
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Structural checks that do not depend on identity or policy.
    pub fn validate(&self) -> KernelResult<()> {
        if self.message_id.0.trim().is_empty() {
            return Err(KernelError::InvalidRequest("message_id is empty".into()));
        }
        if self.identity_id.0.trim().is_empty() {
            return Err(KernelError::InvalidRequest("identity_id is empty".into()));
        }
        if self.action_kind.0.trim().is_empty() {
            return Err(KernelError::InvalidRequest("action_kind is empty".into()));
        }
        if self.estimated_cost.is_negative() {
            return Err(KernelError::InvalidRequest(format!(
                "estimated_cost {} is negative",
                self.estimated_cost
            )));
        }
        Ok(())
    }
}

/// Request plus the requester's Ed25519 signature over
/// [`ActionRequest::signing_bytes`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    pub request: ActionRequest,
    pub signature: SignatureBytes,
}
