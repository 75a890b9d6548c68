// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Agent identity as issued by the external identity authority.

use crate::types::digest::PublicKey;
use crate::types::id::{ActionKind, IdentityId, Namespace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Issued identity. The kernel only reads it; revocation is a flag flip at
/// the issuing directory and is checked on every verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub namespace: Namespace,
    pub public_key: PublicKey,
    #[serde(default)]
    pub permitted_actions: BTreeSet<ActionKind>,
    #[serde(default)]
    pub revoked: bool,
}

impl Identity {
    pub fn permits(&self, action: &ActionKind) -> bool {
        self.permitted_actions.contains(action)
    }
}
