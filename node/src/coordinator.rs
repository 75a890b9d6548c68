// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Transaction Coordinator - the Atomic Governance Transaction
//!
//! # Protocol
//! ```text
//! SignedRequest
//! ↓
//! 1. Validate + verify identity       (no lock; failure = rejection)
//! ↓
//! 2. Replay fast path                 (no lock)
//! ↓
//! 3. Lock identity (bounded by the caller deadline)
//! ↓
//! 4. Replay re-check, snapshot, evaluate
//! ↓
//! 5. Tentative apply (Allow only)
//! ↓
//! 6. Append to the decision ledger (durable)
//! ↓
//! 7. Commit tentative state, release, return decision
//! ```
//!
//! A failed append at step 6 rolls back, releases and returns
//! `GovernanceUnavailable`. Steps 3-7 run in a spawned task, so dropping the
//! caller's future never cancels a transaction midway.

use crate::clock::Clock;
use crate::errors::GovernanceError;
use crate::escalation::{EscalationRecord, EscalationSender};
use crate::events::decision_ledger::DecisionLedger;
use crate::state::resource_ledger::{ResourceError, ResourceLedger};
use governance_kernel::event::{DecisionRecord, LedgerRecord};
use governance_kernel::identity::{IdentitySource, IdentityVerifier, VerifiedIdentity};
use governance_kernel::policy::PolicyEvaluator;
use governance_kernel::types::{
    ActionRequest, Decision, Digest, Outcome, ResourceDelta, RuleTag, SignedRequest, Tier,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A decision together with where it sits in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub decision: Decision,
    pub sequence_id: u64,
    pub entry_hash: Digest,
    /// Answered from an earlier identical submission.
    pub replayed: bool,
}

pub struct CoordinatorParts {
    pub verifier: IdentityVerifier,
    pub identities: Arc<dyn IdentitySource>,
    pub evaluator: PolicyEvaluator,
    pub resources: Arc<ResourceLedger>,
    pub ledger: Arc<DecisionLedger>,
    pub escalations: Option<EscalationSender>,
    pub clock: Arc<dyn Clock>,
    pub default_deadline: Duration,
    pub escalation_sla: Duration,
}

struct Inner {
    parts: CoordinatorParts,
    rejections: AtomicU64,
}

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn new(parts: CoordinatorParts) -> Self {
        Self { inner: Arc::new(Inner { parts, rejections: AtomicU64::new(0) }) }
    }

    pub fn resources(&self) -> &Arc<ResourceLedger> {
        &self.inner.parts.resources
    }

    pub fn ledger(&self) -> &Arc<DecisionLedger> {
        &self.inner.parts.ledger
    }

    pub fn evaluator(&self) -> &PolicyEvaluator {
        &self.inner.parts.evaluator
    }

    /// Requests turned away before the critical section.
    pub fn rejections(&self) -> u64 {
        self.inner.rejections.load(Ordering::Relaxed)
    }

    pub async fn authorize(&self, signed: SignedRequest) -> Result<Authorization, GovernanceError> {
        self.authorize_within(signed, self.inner.parts.default_deadline).await
    }

    /// Authorize with a caller deadline for reaching the critical section.
    pub async fn authorize_within(
        &self,
        signed: SignedRequest,
        deadline: Duration,
    ) -> Result<Authorization, GovernanceError> {
        let deadline = Instant::now() + deadline;
        let inner = &self.inner;

        let verified = match inner.admit(&signed) {
            Ok(v) => v,
            Err(e) => return Err(inner.reject(e)),
        };

        if let Some(found) = inner.check_replay(&signed.request).map_err(|e| inner.reject(e))? {
            return Ok(found);
        }

        let task_inner = inner.clone();
        let request = signed.request;
        tokio::spawn(async move { task_inner.transact(request, verified, deadline).await })
            .await
            .map_err(|e| GovernanceError::GovernanceUnavailable(format!("transaction task failed: {}", e)))?
    }
}

impl Inner {
    fn reject(&self, e: GovernanceError) -> GovernanceError {
        self.rejections.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("governance_rejections_total", 1, "reason" => e.kind());
        tracing::debug!("Request rejected: {}", e);
        e
    }

    fn admit(&self, signed: &SignedRequest) -> Result<VerifiedIdentity, GovernanceError> {
        signed.request.validate()?;
        let now = self.parts.clock.now_ms();
        let verified = self
            .parts
            .verifier
            .verify_with(self.parts.identities.as_ref(), signed, now)?;
        if !self.parts.resources.contains(verified.id()) {
            return Err(GovernanceError::UnknownAccount(verified.id().clone()));
        }
        Ok(verified)
    }

    /// Earlier decision for this message id, if any.
    ///
    /// An identical request gets the recorded decision back; a different
    /// request reusing the id is refused.
    fn check_replay(&self, request: &ActionRequest) -> Result<Option<Authorization>, GovernanceError> {
        let Some(entry) = self.parts.ledger.by_message(&request.identity_id, &request.message_id) else {
            return Ok(None);
        };
        let Some(record) = entry.decision_record() else {
            return Ok(None);
        };
        if record.request != *request {
            return Err(GovernanceError::ReplayedMessage { message_id: request.message_id.clone() });
        }
        metrics::counter!("governance_replays_total", 1);
        tracing::debug!("Replay of {} answered from entry {}", request.message_id, entry.sequence_id);
        Ok(Some(Authorization {
            decision: record.decision.clone(),
            sequence_id: entry.sequence_id,
            entry_hash: entry.entry_hash,
            replayed: true,
        }))
    }

    async fn transact(
        &self,
        request: ActionRequest,
        identity: VerifiedIdentity,
        deadline: Instant,
    ) -> Result<Authorization, GovernanceError> {
        let mut handle = match self.parts.resources.lock_until(identity.id(), deadline).await {
            Ok(h) => h,
            Err(ResourceError::LockTimeout) => return Err(self.reject(GovernanceError::LockTimeout)),
            Err(ResourceError::UnknownAccount(id)) => return Err(self.reject(GovernanceError::UnknownAccount(id))),
            Err(e) => return Err(GovernanceError::GovernanceUnavailable(e.to_string())),
        };

        // Authoritative replay check, now serialized with other writers for
        // this identity.
        if let Some(found) = self.check_replay(&request).map_err(|e| self.reject(e))? {
            return Ok(found);
        }

        let snapshot = handle.snapshot();
        let mut decision = self.parts.evaluator.evaluate(&request, &identity, &snapshot);

        let tentative = if decision.outcome == Outcome::Allow {
            match handle.tentative_apply(&decision.resource_delta) {
                Ok(t) => Some(t),
                Err(ResourceError::QuotaExceeded(shortfall)) => {
                    decision.outcome = Outcome::EscalateHuman;
                    decision.tier = Tier::HumanRequired;
                    decision.rule = RuleTag::BudgetCheck;
                    decision.reason = format!("quota exceeded at commit: {:?}", shortfall);
                    decision.shortfall = Some(shortfall);
                    decision.resource_delta = ResourceDelta::ZERO;
                    None
                }
                Err(e) => return Err(GovernanceError::GovernanceUnavailable(e.to_string())),
            }
        } else {
            None
        };

        let resulting_state = tentative
            .as_ref()
            .map(|t| t.state().clone())
            .unwrap_or_else(|| snapshot.clone());
        let record = LedgerRecord::Decision(DecisionRecord {
            request: request.clone(),
            decision: decision.clone(),
            resulting_state,
        });

        let appended = match self.parts.ledger.append(record).await {
            Ok(a) => a,
            Err(e) => {
                handle.rollback();
                handle.release();
                metrics::counter!("governance_rollbacks_total", 1);
                tracing::error!("Decision for {} rolled back: {}", request.message_id, e);
                return Err(GovernanceError::GovernanceUnavailable(e.to_string()));
            }
        };

        if let Some(t) = tentative {
            if let Err(e) = handle.commit(t) {
                tracing::error!(
                    "CRITICAL: entry {} is durable but its state commit failed: {}",
                    appended.sequence_id,
                    e
                );
                return Err(GovernanceError::GovernanceUnavailable(e.to_string()));
            }
        }
        handle.release();

        metrics::counter!(
            "governance_decisions_total", 1,
            "outcome" => decision.outcome.as_str(),
            "tier" => decision.tier.level().to_string()
        );
        tracing::debug!(
            "Decision {} for {}/{}: {} tier {} ({})",
            appended.sequence_id,
            request.identity_id,
            request.message_id,
            decision.outcome.as_str(),
            decision.tier.level(),
            decision.rule.as_str()
        );

        if decision.outcome == Outcome::EscalateHuman {
            self.escalate(&request, &decision, appended.sequence_id);
        }

        Ok(Authorization {
            decision,
            sequence_id: appended.sequence_id,
            entry_hash: appended.entry_hash,
            replayed: false,
        })
    }

    fn escalate(&self, request: &ActionRequest, decision: &Decision, sequence_id: u64) {
        let Some(sender) = &self.parts.escalations else { return };
        let now = self.parts.clock.now_ms();
        sender.emit(EscalationRecord {
            decision_id: decision.decision_id.clone(),
            sequence_id,
            identity_id: request.identity_id.clone(),
            message_id: request.message_id.clone(),
            tier: decision.tier,
            reason: decision.reason.clone(),
            raised_at_ms: now,
            deadline_ms: now.saturating_add(self.parts.escalation_sla.as_millis() as u64),
        });
    }
}
