// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use common::*;
use governance_kernel::fxp::Amount;
use governance_kernel::identity::IdentityError;
use governance_kernel::types::{Outcome, RuleTag, Tier};
use governance_node::errors::GovernanceError;
use std::time::Duration;

#[tokio::test]
async fn test_permitted_action_within_budget_is_allowed() {
    let (h, k) = single_agent(50);
    let auth = h
        .engine
        .coordinator
        .authorize(sign(&k, request("agent-a", "m-1", "deploy_service", 10)))
        .await
        .unwrap();

    assert_eq!(auth.decision.outcome, Outcome::Allow);
    assert_eq!(auth.decision.tier, Tier::AuditedApprove);
    assert_eq!(auth.decision.rule, RuleTag::PermittedAction);
    assert_eq!(auth.sequence_id, 0);
    assert!(!auth.replayed);
    assert_eq!(budget_of(&h, "agent-a"), Amount::from_units(40).unwrap());

    let ledger = h.engine.ledger();
    assert_eq!(ledger.height(), 1);
    let entry = ledger.entry(0).unwrap();
    assert_eq!(entry.entry_hash, auth.entry_hash);
    let record = entry.decision_record().unwrap();
    assert_eq!(record.decision, auth.decision);
    assert_eq!(record.resulting_state.budget_remaining, Amount::from_units(40).unwrap());
}

#[tokio::test]
async fn test_prohibited_action_is_denied_and_recorded() {
    let (h, k) = single_agent(50);
    let auth = h
        .engine
        .coordinator
        .authorize(sign(&k, request("agent-a", "m-1", "audit_log_deletion", 0)))
        .await
        .unwrap();

    assert_eq!(auth.decision.outcome, Outcome::Deny);
    assert_eq!(auth.decision.tier, Tier::AlwaysDeny);
    assert!(auth.decision.resource_delta.is_zero());
    assert_eq!(budget_of(&h, "agent-a"), Amount::from_units(50).unwrap());
    assert_eq!(h.engine.ledger().height(), 1);
}

#[tokio::test]
async fn test_over_budget_escalates_without_charging() {
    let (h, k) = single_agent(5);
    h.engine.start_escalation_worker();

    let auth = h
        .engine
        .coordinator
        .authorize(sign(&k, request("agent-a", "m-1", "deploy_service", 10)))
        .await
        .unwrap();

    assert_eq!(auth.decision.outcome, Outcome::EscalateHuman);
    assert_eq!(auth.decision.tier, Tier::HumanRequired);
    assert_eq!(auth.decision.rule, RuleTag::BudgetCheck);
    assert_eq!(auth.decision.shortfall.unwrap().budget, Amount::from_units(5).unwrap());
    assert_eq!(budget_of(&h, "agent-a"), Amount::from_units(5).unwrap());

    let mut pending = Vec::new();
    for _ in 0..100 {
        pending = h.engine.escalations.pending();
        if !pending.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].decision_id, auth.decision.decision_id);
    assert_eq!(pending[0].sequence_id, auth.sequence_id);
}

#[tokio::test]
async fn test_identical_resubmission_returns_recorded_decision() {
    let (h, k) = single_agent(50);
    let signed = sign(&k, request("agent-a", "m-1", "deploy_service", 10));

    let first = h.engine.coordinator.authorize(signed.clone()).await.unwrap();
    let second = h.engine.coordinator.authorize(signed).await.unwrap();

    assert!(second.replayed);
    assert_eq!(second.decision, first.decision);
    assert_eq!(second.sequence_id, first.sequence_id);
    assert_eq!(h.engine.ledger().height(), 1);
    assert_eq!(budget_of(&h, "agent-a"), Amount::from_units(40).unwrap());
}

#[tokio::test]
async fn test_reused_message_id_with_different_request_is_refused() {
    let (h, k) = single_agent(50);
    h.engine
        .coordinator
        .authorize(sign(&k, request("agent-a", "m-1", "deploy_service", 10)))
        .await
        .unwrap();

    let err = h
        .engine
        .coordinator
        .authorize(sign(&k, request("agent-a", "m-1", "deploy_service", 20)))
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::ReplayedMessage { .. }));
    assert_eq!(h.engine.ledger().height(), 1);
    assert_eq!(budget_of(&h, "agent-a"), Amount::from_units(40).unwrap());
}

#[tokio::test]
async fn test_revoked_identity_is_rejected_before_the_ledger() {
    let (h, k) = single_agent(50);
    assert!(h.engine.directory.revoke(&"agent-a".into()));

    let err = h
        .engine
        .coordinator
        .authorize(sign(&k, request("agent-a", "m-1", "deploy_service", 10)))
        .await
        .unwrap_err();
    assert_eq!(err, GovernanceError::Identity(IdentityError::Revoked("agent-a".into())));
    assert_eq!(h.engine.ledger().height(), 0);
    assert_eq!(h.engine.coordinator.rejections(), 1);
}

#[tokio::test]
async fn test_wrong_key_and_stale_timestamp_are_rejected() {
    let (h, _k) = single_agent(50);
    let imposter = key(9);
    let err = h
        .engine
        .coordinator
        .authorize(sign(&imposter, request("agent-a", "m-1", "deploy_service", 10)))
        .await
        .unwrap_err();
    assert_eq!(err, GovernanceError::Identity(IdentityError::InvalidSignature));

    h.clock.advance(10 * 60 * 1000);
    let err = h
        .engine
        .coordinator
        .authorize(sign(&key(1), request("agent-a", "m-2", "deploy_service", 10)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "expired");
    assert_eq!(h.engine.ledger().height(), 0);
}

#[tokio::test]
async fn test_identity_without_account_is_rejected() {
    let h = harness(Box::new(governance_node::events::MemoryStorage::new()), &test_config());
    let k = key(3);
    h.engine.directory.register(identity(&k, "agent-b", "payments"));

    let err = h
        .engine
        .coordinator
        .authorize(sign(&k, request("agent-b", "m-1", "deploy_service", 1)))
        .await
        .unwrap_err();
    assert_eq!(err, GovernanceError::UnknownAccount("agent-b".into()));
}

#[tokio::test]
async fn test_invalid_request_is_rejected() {
    let (h, k) = single_agent(50);
    let err = h
        .engine
        .coordinator
        .authorize(sign(&k, request("agent-a", "", "deploy_service", 10)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_request");
}

#[tokio::test]
async fn test_lock_deadline_bounds_the_wait() {
    let (h, k) = single_agent(50);
    let held = h.engine.resources().lock(&"agent-a".into()).await.unwrap();

    let err = h
        .engine
        .coordinator
        .authorize_within(
            sign(&k, request("agent-a", "m-1", "deploy_service", 10)),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
    assert_eq!(err, GovernanceError::LockTimeout);
    assert_eq!(h.engine.ledger().height(), 0);

    held.release();
    let auth = h
        .engine
        .coordinator
        .authorize(sign(&k, request("agent-a", "m-1", "deploy_service", 10)))
        .await
        .unwrap();
    assert_eq!(auth.decision.outcome, Outcome::Allow);
}

#[tokio::test]
async fn test_zero_deadline_times_out_without_charging() {
    let (h, k) = single_agent(50);

    let err = h
        .engine
        .coordinator
        .authorize_within(sign(&k, request("agent-a", "m-1", "deploy_service", 10)), Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, GovernanceError::LockTimeout);
    assert_eq!(h.engine.ledger().height(), 0);
    assert_eq!(budget_of(&h, "agent-a"), Amount::from_units(50).unwrap());
}
