// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use ed25519_dalek::{Signer, SigningKey};
use governance_kernel::fxp::Amount;
use governance_kernel::types::{
    ActionRequest, Identity, PublicKey, ResourceCeilings, ResourceState, ResourceUsage, SignatureBytes,
    SignedRequest,
};
use governance_node::clock::ManualClock;
use governance_node::config::NodeConfig;
use governance_node::engine::Engine;
use governance_node::events::{LedgerStorage, MemoryStorage};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub const NOW: u64 = 1_700_000_000_000;

pub struct Harness {
    pub engine: Arc<Engine>,
    pub clock: Arc<ManualClock>,
}

pub fn key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn identity(key: &SigningKey, id: &str, namespace: &str) -> Identity {
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

pub fn account(id: &str, budget: i64) -> ResourceState {
    ResourceState::new(
        id.into(),
        Amount::from_units(budget).unwrap(),
        ResourceCeilings { cpu: 4_000, memory: 8_192 },
    )
}

/// `action` in `namespace` costing `cost` units, stamped at `NOW`.
pub fn request(id: &str, message_id: &str, action: &str, cost: i64) -> ActionRequest {
    ActionRequest {
        message_id: message_id.into(),
        timestamp: NOW,
        identity_id: id.into(),
        namespace: "payments".into(),
        destination: "payments/service".into(),
        action_kind: action.into(),
        params: BTreeMap::new(),
        estimated_cost: Amount::from_units(cost).unwrap(),
        resources: ResourceUsage::default(),
        idempotent: false,
        dry_run: false,
    }
}

pub fn sign(key: &SigningKey, request: ActionRequest) -> SignedRequest {
    let bytes = request.signing_bytes().unwrap();
    SignedRequest { request, signature: SignatureBytes(key.sign(&bytes).to_bytes()) }
}

pub fn test_config() -> NodeConfig {
    NodeConfig { signing_seed: Some([42; 32]), ..Default::default() }
}

pub fn harness(storage: Box<dyn LedgerStorage>, cfg: &NodeConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(NOW));
    let engine = Engine::with_storage(cfg, storage, clock.clone()).unwrap();
    Harness { engine: Arc::new(engine), clock }
}

/// In-memory node with agent "agent-a" (key seed 1) holding `budget`.
pub fn single_agent(budget: i64) -> (Harness, SigningKey) {
    let h = harness(Box::new(MemoryStorage::new()), &test_config());
    let k = key(1);
    enroll(&h, &k, "agent-a", budget);
    (h, k)
}

pub fn enroll(h: &Harness, key: &SigningKey, id: &str, budget: i64) {
    h.engine.directory.register(identity(key, id, "payments"));
    h.engine.resources().provision(account(id, budget));
}

pub fn budget_of(h: &Harness, id: &str) -> Amount {
    h.engine.resources().get(&id.into()).unwrap().budget_remaining
}
