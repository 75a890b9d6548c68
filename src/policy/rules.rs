// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Tiering rules.
//!
//! Each rule is a pure predicate over the evaluation context that either
//! produces a verdict or passes. The evaluator walks the policy's rule list
//! in order and stops at the first verdict.

use crate::config::DEFAULT_RISK_THRESHOLD;
use crate::identity::VerifiedIdentity;
use crate::policy::risk::{has_rollback_plan, risk_score};
use crate::policy::set::PolicySet;
use crate::types::decision::{Outcome, RuleTag, Tier};
use crate::types::request::ActionRequest;
use crate::types::resource::{ResourceState, Shortfall};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Action in the prohibited set: deny, tier 3.
    Prohibited,
    /// Namespace or destination ownership mismatch: escalate, tier 2.
    ScopeViolation,
    /// Budget or a per-resource ceiling would be exceeded: escalate, tier 2.
    BudgetCheck,
    /// Destructive action without evidence: deny, tier 3; with evidence but
    /// no rollback plan: escalate, tier 2.
    DestructiveGate,
    /// Action in the identity's permitted set: allow, tier 1.
    PermittedAction,
    /// Read-only or idempotent-safe action: allow, tier 0.
    ReadOnly,
    /// Weighted risk score at or above `threshold`: escalate, tier 2.
    RiskThreshold { threshold: u32 },
}

/// Inputs every rule sees.
pub struct EvalContext<'a> {
    pub request: &'a ActionRequest,
    pub identity: &'a VerifiedIdentity,
    pub snapshot: &'a ResourceState,
    pub policy: &'a PolicySet,
}

/// What a matching rule decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub tier: Tier,
    pub reason: String,
    pub shortfall: Option<Shortfall>,
}

impl Verdict {
    fn new(outcome: Outcome, tier: Tier, reason: String) -> Self {
        Self { outcome, tier, reason, shortfall: None }
    }
}

impl Rule {
    /// Standard priority order.
    pub fn standard() -> Vec<Rule> {
        vec![
            Rule::Prohibited,
            Rule::ScopeViolation,
            Rule::BudgetCheck,
            Rule::DestructiveGate,
            Rule::PermittedAction,
            Rule::ReadOnly,
        ]
    }

    /// Standard order with the risk rule ahead of the auto-approve rules.
    pub fn standard_with_risk() -> Vec<Rule> {
        let mut rules = Self::standard();
        let at = rules
            .iter()
            .position(|r| *r == Rule::PermittedAction)
            .unwrap_or(rules.len());
        rules.insert(at, Rule::RiskThreshold { threshold: DEFAULT_RISK_THRESHOLD });
        rules
    }

    pub fn tag(&self) -> RuleTag {
        match self {
            Rule::Prohibited => RuleTag::Prohibited,
            Rule::ScopeViolation => RuleTag::ScopeViolation,
            Rule::BudgetCheck => RuleTag::BudgetCheck,
            Rule::DestructiveGate => RuleTag::DestructiveGate,
            Rule::PermittedAction => RuleTag::PermittedAction,
            Rule::ReadOnly => RuleTag::ReadOnly,
            Rule::RiskThreshold { .. } => RuleTag::RiskThreshold,
        }
    }

    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Option<Verdict> {
        let request = ctx.request;
        let action = &request.action_kind;
        match self {
            Rule::Prohibited => ctx.policy.is_prohibited(action).then(|| {
                Verdict::new(
                    Outcome::Deny,
                    Tier::AlwaysDeny,
                    format!("action '{}' is prohibited", action),
                )
            }),

            Rule::ScopeViolation => {
                if request.namespace != *ctx.identity.namespace() {
                    return Some(Verdict::new(
                        Outcome::EscalateHuman,
                        Tier::HumanRequired,
                        format!(
                            "request namespace '{}' differs from identity namespace '{}'",
                            request.namespace,
                            ctx.identity.namespace()
                        ),
                    ));
                }
                match ctx.policy.owner_of(&request.destination) {
                    Some(owner) if *owner != request.namespace => Some(Verdict::new(
                        Outcome::EscalateHuman,
                        Tier::HumanRequired,
                        format!(
                            "destination '{}' is owned by namespace '{}', not '{}'",
                            request.destination, owner, request.namespace
                        ),
                    )),
                    _ => None,
                }
            }

            Rule::BudgetCheck => {
                let shortfall = ctx.snapshot.shortfall(&request.cost_delta())?;
                let mut parts = Vec::new();
                if shortfall.budget.raw() > 0 {
                    parts.push(format!(
                        "budget short by {} (remaining {}, requested {})",
                        shortfall.budget, ctx.snapshot.budget_remaining, request.estimated_cost
                    ));
                }
                if shortfall.cpu > 0 {
                    parts.push(format!("cpu ceiling exceeded by {}m", shortfall.cpu));
                }
                if shortfall.memory > 0 {
                    parts.push(format!("memory ceiling exceeded by {}MiB", shortfall.memory));
                }
                Some(Verdict {
                    outcome: Outcome::EscalateHuman,
                    tier: Tier::HumanRequired,
                    reason: format!("quota exceeded: {}", parts.join("; ")),
                    shortfall: Some(shortfall),
                })
            }

            Rule::DestructiveGate => {
                if !ctx.policy.is_destructive(action) {
                    return None;
                }
                if !has_safety_evidence(request) {
                    return Some(Verdict::new(
                        Outcome::Deny,
                        Tier::AlwaysDeny,
                        format!("destructive action '{}' lacks dry-run or backup evidence", action),
                    ));
                }
                if !has_rollback_plan(request) {
                    return Some(Verdict::new(
                        Outcome::EscalateHuman,
                        Tier::HumanRequired,
                        format!("destructive action '{}' has no rollback plan", action),
                    ));
                }
                None
            }

            Rule::PermittedAction => ctx.identity.identity().permits(action).then(|| {
                Verdict::new(
                    Outcome::Allow,
                    Tier::AuditedApprove,
                    format!("action '{}' is permitted for identity '{}'", action, ctx.identity.id()),
                )
            }),

            Rule::ReadOnly => {
                let safe = ctx.policy.is_read_only(action)
                    || (request.idempotent && ctx.policy.is_idempotent_safe(action));
                safe.then(|| {
                    Verdict::new(
                        Outcome::Allow,
                        Tier::AutoApprove,
                        format!("action '{}' is read-only or idempotent-safe", action),
                    )
                })
            }

            Rule::RiskThreshold { threshold } => {
                let score = risk_score(request);
                (score >= *threshold).then(|| {
                    Verdict::new(
                        Outcome::EscalateHuman,
                        Tier::HumanRequired,
                        format!("risk score {} at or above threshold {}", score, threshold),
                    )
                })
            }
        }
    }
}

/// Dry-run evidence or a verified backup.
pub fn has_safety_evidence(request: &ActionRequest) -> bool {
    request.dry_run || request.param("backup_verified").map(|v| v == "true").unwrap_or(false)
}
