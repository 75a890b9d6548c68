// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::fxp::Amount;
use crate::policy::{PolicyError, PolicyEvaluator, PolicySet, Rule};
use crate::tests::fixtures::{account, identity_with_key, request, signing_key, verified, NOW};
use crate::types::decision::{Decision, Outcome, RuleTag, Tier};
use crate::types::digest::Digest;
use crate::types::request::ActionRequest;
use crate::types::resource::{ResourceDelta, ResourceState};

fn evaluator() -> PolicyEvaluator {
    PolicyEvaluator::trusting(PolicySet::baseline()).unwrap()
}

fn decide_with(ev: &PolicyEvaluator, req: ActionRequest, snapshot: &ResourceState) -> Decision {
    let key = signing_key(1);
    let identity = identity_with_key(&key, req.identity_id.as_str(), req.namespace.as_str());
    let who = verified(&identity, &key, req.clone());
    ev.evaluate(&req, &who, snapshot)
}

fn decide(req: ActionRequest, budget: i64) -> Decision {
    let snapshot = account(req.identity_id.as_str(), budget);
    decide_with(&evaluator(), req, &snapshot)
}

#[test]
fn test_permitted_action_within_budget_is_audited_allow() {
    let d = decide(request("agent-a", "payments", "m-1", NOW), 50);
    assert_eq!(d.outcome, Outcome::Allow);
    assert_eq!(d.tier, Tier::AuditedApprove);
    assert_eq!(d.rule, RuleTag::PermittedAction);
    assert_eq!(d.resource_delta.budget, Amount::from_units(10).unwrap());
    assert!(d.permits());
}

#[test]
fn test_prohibited_action_denied_at_tier_three() {
    let mut req = request("agent-a", "payments", "m-1", NOW);
    req.action_kind = "audit_log_deletion".into();
    let d = decide(req, 1_000);
    assert_eq!(d.outcome, Outcome::Deny);
    assert_eq!(d.tier.level(), 3);
    assert_eq!(d.rule, RuleTag::Prohibited);
    assert_eq!(d.resource_delta, ResourceDelta::ZERO);
}

#[test]
fn test_budget_shortfall_escalates_with_amount() {
    let d = decide(request("agent-a", "payments", "m-1", NOW), 4);
    assert_eq!(d.outcome, Outcome::EscalateHuman);
    assert_eq!(d.tier, Tier::HumanRequired);
    assert_eq!(d.rule, RuleTag::BudgetCheck);
    assert_eq!(d.shortfall.unwrap().budget, Amount::from_units(6).unwrap());
    assert!(d.reason.contains("budget short by 6.0000"));
    assert_eq!(d.resource_delta, ResourceDelta::ZERO);
}

#[test]
fn test_foreign_destination_is_scope_violation() {
    let mut policy = PolicySet::baseline();
    policy.destination_owners.insert("infra/".into(), "infra".into());
    let ev = PolicyEvaluator::trusting(policy).unwrap();

    let mut req = request("agent-a", "payments", "m-1", NOW);
    req.destination = "infra/cluster-1".into();
    let d = decide_with(&ev, req, &account("agent-a", 100));
    assert_eq!(d.outcome, Outcome::EscalateHuman);
    assert_eq!(d.rule, RuleTag::ScopeViolation);
}

#[test]
fn test_prohibited_outranks_scope_and_budget() {
    let mut policy = PolicySet::baseline();
    policy.destination_owners.insert("infra/".into(), "infra".into());
    let ev = PolicyEvaluator::trusting(policy).unwrap();

    let mut req = request("agent-a", "payments", "m-1", NOW);
    req.destination = "infra/cluster-1".into();
    req.action_kind = "credential_export".into();
    let d = decide_with(&ev, req, &account("agent-a", 0));
    assert_eq!(d.rule, RuleTag::Prohibited);
    assert_eq!(d.outcome, Outcome::Deny);
}

#[test]
fn test_destructive_gate() {
    let mut req = request("agent-a", "payments", "m-1", NOW);
    req.action_kind = "delete_database".into();

    let no_evidence = decide(req.clone(), 100);
    assert_eq!(no_evidence.outcome, Outcome::Deny);
    assert_eq!(no_evidence.tier, Tier::AlwaysDeny);
    assert_eq!(no_evidence.rule, RuleTag::DestructiveGate);

    req.params.insert("backup_verified".into(), "true".into());
    let no_plan = decide(req.clone(), 100);
    assert_eq!(no_plan.outcome, Outcome::EscalateHuman);
    assert_eq!(no_plan.rule, RuleTag::DestructiveGate);

    // evidence and plan pass the gate; nothing else classifies it
    req.params.insert("rollback_plan".into(), "restore snapshot s-1".into());
    let gated = decide(req, 100);
    assert_eq!(gated.outcome, Outcome::EscalateHuman);
    assert_eq!(gated.rule, RuleTag::Unclassified);
}

#[test]
fn test_read_only_and_idempotent_safe_are_tier_zero() {
    let mut read = request("agent-a", "payments", "m-1", NOW);
    read.action_kind = "read_metrics".into();
    let d = decide(read, 100);
    assert_eq!((d.outcome, d.tier, d.rule), (Outcome::Allow, Tier::AutoApprove, RuleTag::ReadOnly));

    let mut restart = request("agent-a", "payments", "m-2", NOW);
    restart.action_kind = "restart_pod".into();
    restart.idempotent = true;
    assert_eq!(decide(restart.clone(), 100).tier, Tier::AutoApprove);

    restart.idempotent = false;
    let d = decide(restart, 100);
    assert_eq!(d.outcome, Outcome::EscalateHuman);
    assert_eq!(d.rule, RuleTag::Unclassified);
}

#[test]
fn test_risk_rule_escalates_irreversible_action() {
    let mut policy = PolicySet::baseline();
    policy.rules = Rule::standard_with_risk();
    let ev = PolicyEvaluator::trusting(policy).unwrap();

    let req = request("agent-a", "payments", "m-1", NOW);
    let d = decide_with(&ev, req.clone(), &account("agent-a", 100));
    assert_eq!(d.rule, RuleTag::RiskThreshold);
    assert_eq!(d.tier, Tier::HumanRequired);

    let mut planned = req;
    planned.params.insert("rollback_plan".into(), "helm rollback".into());
    let d = decide_with(&ev, planned, &account("agent-a", 100));
    assert_eq!(d.rule, RuleTag::PermittedAction);
}

#[test]
fn test_evaluation_is_deterministic() {
    let req = request("agent-a", "payments", "m-1", NOW);
    let a = decide(req.clone(), 50);
    let b = decide(req, 50);
    assert_eq!(a, b);
    assert_eq!(a.policy_hash, PolicySet::baseline().policy_hash().unwrap());
}

#[test]
fn test_hash_mismatch_refuses_policy() {
    let err = PolicyEvaluator::new(PolicySet::baseline(), Digest([7; 32])).unwrap_err();
    assert!(matches!(err, PolicyError::HashMismatch { .. }));
}
