// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Policy Evaluator.
//!
//! A pure function of `(request, verified identity, resource snapshot)` under
//! a pinned policy. Same inputs and same policy hash give the same decision.

pub mod risk;
pub mod rules;
pub mod set;

pub use rules::{EvalContext, Rule, Verdict};
pub use set::PolicySet;

use crate::identity::VerifiedIdentity;
use crate::types::decision::{Decision, Outcome, RuleTag, Tier};
use crate::types::digest::Digest;
use crate::types::id::DecisionId;
use crate::types::request::ActionRequest;
use crate::types::resource::{ResourceDelta, ResourceState};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy hash mismatch: expected {expected}, loaded {actual}")]
    HashMismatch { expected: Digest, actual: Digest },

    #[error("policy encoding failed: {0}")]
    Encoding(String),
}

/// A policy pinned to its hash.
#[derive(Clone, Debug)]
pub struct PolicyEvaluator {
    policy: PolicySet,
    policy_hash: Digest,
}

impl PolicyEvaluator {
    /// Pin `policy`, refusing it unless it hashes to `expected_hash`.
    pub fn new(policy: PolicySet, expected_hash: Digest) -> Result<Self, PolicyError> {
        let actual = policy
            .policy_hash()
            .map_err(|e| PolicyError::Encoding(e.to_string()))?;
        if actual != expected_hash {
            return Err(PolicyError::HashMismatch { expected: expected_hash, actual });
        }
        Ok(Self { policy, policy_hash: actual })
    }

    /// Pin `policy` at whatever it hashes to.
    pub fn trusting(policy: PolicySet) -> Result<Self, PolicyError> {
        let hash = policy
            .policy_hash()
            .map_err(|e| PolicyError::Encoding(e.to_string()))?;
        Self::new(policy, hash)
    }

    pub fn policy(&self) -> &PolicySet {
        &self.policy
    }

    pub fn policy_hash(&self) -> Digest {
        self.policy_hash
    }

    pub fn evaluate(
        &self,
        request: &ActionRequest,
        identity: &VerifiedIdentity,
        snapshot: &ResourceState,
    ) -> Decision {
        let ctx = EvalContext { request, identity, snapshot, policy: &self.policy };

        let (verdict, rule) = self
            .policy
            .rules
            .iter()
            .find_map(|rule| rule.evaluate(&ctx).map(|v| (v, rule.tag())))
            .unwrap_or_else(|| {
                (
                    Verdict {
                        outcome: Outcome::EscalateHuman,
                        tier: Tier::HumanRequired,
                        reason: format!("no rule classifies action '{}'", request.action_kind),
                        shortfall: None,
                    },
                    RuleTag::Unclassified,
                )
            });

        let resource_delta = if verdict.outcome == Outcome::Allow {
            request.cost_delta()
        } else {
            ResourceDelta::ZERO
        };

        Decision {
            decision_id: DecisionId::derive(&request.identity_id, &request.message_id),
            outcome: verdict.outcome,
            tier: verdict.tier,
            reason: verdict.reason,
            rule,
            resource_delta,
            shortfall: verdict.shortfall,
            policy_id: self.policy.policy_id.clone(),
            policy_hash: self.policy_hash,
        }
    }
}
