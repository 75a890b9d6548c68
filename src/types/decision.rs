// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Authorization decisions.

use crate::types::digest::Digest;
use crate::types::id::{DecisionId, PolicyId};
use crate::types::resource::{ResourceDelta, Shortfall};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allow,
    Deny,
    EscalateHuman,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Allow => "allow",
            Outcome::Deny => "deny",
            Outcome::EscalateHuman => "escalate_human",
        }
    }
}

/// Required oversight level: 0/1 auto-approve, 2 human, 3 always deny.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Tier {
    AutoApprove = 0,
    AuditedApprove = 1,
    HumanRequired = 2,
    AlwaysDeny = 3,
}

impl Tier {
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Which policy rule produced a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTag {
    Prohibited,
    ScopeViolation,
    BudgetCheck,
    DestructiveGate,
    PermittedAction,
    ReadOnly,
    RiskThreshold,
    /// No rule matched.
    Unclassified,
}

impl RuleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTag::Prohibited => "prohibited",
            RuleTag::ScopeViolation => "scope_violation",
            RuleTag::BudgetCheck => "budget_check",
            RuleTag::DestructiveGate => "destructive_gate",
            RuleTag::PermittedAction => "permitted_action",
            RuleTag::ReadOnly => "read_only",
            RuleTag::RiskThreshold => "risk_threshold",
            RuleTag::Unclassified => "unclassified",
        }
    }
}

/// Immutable result of policy evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub decision_id: DecisionId,
    pub outcome: Outcome,
    pub tier: Tier,
    pub reason: String,
    pub rule: RuleTag,
    /// Charged to the identity's resource state; zero unless `Allow`.
    pub resource_delta: ResourceDelta,
    /// Set when a quota check failed.
    pub shortfall: Option<Shortfall>,
    pub policy_id: PolicyId,
    pub policy_hash: Digest,
}

impl Decision {
    /// Whether the caller may proceed with the real-world action.
    pub fn permits(&self) -> bool {
        self.outcome == Outcome::Allow
    }
}
