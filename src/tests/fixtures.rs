// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shared builders for kernel tests.

use crate::event::{DecisionRecord, LedgerRecord};
use crate::fxp::Amount;
use crate::identity::{IdentityVerifier, VerifiedIdentity};
use crate::types::digest::{PublicKey, SignatureBytes};
use crate::types::identity::Identity;
use crate::types::request::{ActionRequest, ResourceUsage, SignedRequest};
use crate::types::resource::{ResourceCeilings, ResourceState};
use crate::policy::PolicyEvaluator;
use ed25519_dalek::{Signer, SigningKey};
use std::collections::{BTreeMap, BTreeSet};

pub const NOW: u64 = 1_700_000_000_000;

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn identity_with_key(key: &SigningKey, id: &str, namespace: &str) -> Identity {
    let permitted: BTreeSet<_> = ["deploy_service", "scale_deployment"]
        .into_iter()
        .map(Into::into)
        .collect();
    Identity {
        id: id.into(),
        namespace: namespace.into(),
        public_key: PublicKey(key.verifying_key().to_bytes()),
        permitted_actions: permitted,
        revoked: false,
    }
}

/// A `deploy_service` request costing 10 units.
pub fn request(identity: &str, namespace: &str, message_id: &str, timestamp: u64) -> ActionRequest {
    ActionRequest {
        message_id: message_id.into(),
        timestamp,
        identity_id: identity.into(),
        namespace: namespace.into(),
        destination: format!("{}/service", namespace),
        action_kind: "deploy_service".into(),
        params: BTreeMap::new(),
        estimated_cost: Amount::from_units(10).unwrap(),
        resources: ResourceUsage::default(),
        idempotent: false,
        dry_run: false,
    }
}

pub fn signed(key: &SigningKey, request: ActionRequest) -> SignedRequest {
    let bytes = request.signing_bytes().unwrap();
    let signature = SignatureBytes(key.sign(&bytes).to_bytes());
    SignedRequest { request, signature }
}

pub fn verified(identity: &Identity, key: &SigningKey, request: ActionRequest) -> VerifiedIdentity {
    let now = request.timestamp;
    IdentityVerifier::default()
        .verify(identity, false, &signed(key, request), now)
        .unwrap()
}

pub fn account(identity: &str, budget: i64) -> ResourceState {
    ResourceState::new(
        identity.into(),
        Amount::from_units(budget).unwrap(),
        ResourceCeilings { cpu: 4_000, memory: 8_192 },
    )
}

/// Decision record for `message_id`, evaluated against `snapshot`.
pub fn decision_record(evaluator: &PolicyEvaluator, message_id: &str, snapshot: &ResourceState) -> LedgerRecord {
    let key = signing_key(1);
    let identity = identity_with_key(&key, snapshot.identity_id.as_str(), "payments");
    let req = request(snapshot.identity_id.as_str(), "payments", message_id, NOW);
    let who = verified(&identity, &key, req.clone());
    let decision = evaluator.evaluate(&req, &who, snapshot);
    let resulting_state = if decision.resource_delta.is_zero() {
        snapshot.clone()
    } else {
        snapshot.apply(&decision.resource_delta).unwrap()
    };
    LedgerRecord::Decision(DecisionRecord { request: req, decision, resulting_state })
}
