// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Escalation Handler
//!
//! Consumes `EscalateHuman` records from a bounded channel and tracks them
//! until a human answers or the SLA deadline passes. The coordinator only
//! ever `try_send`s into the channel; nothing here is awaited inside a
//! transaction, and resolutions never touch either ledger.

use crate::clock::Clock;
use crate::config::TimeoutResolution;
use governance_kernel::types::{DecisionId, IdentityId, MessageId, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Resolved escalations kept for reads.
const RESOLVED_HISTORY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub decision_id: DecisionId,
    pub sequence_id: u64,
    pub identity_id: IdentityId,
    pub message_id: MessageId,
    pub tier: Tier,
    pub reason: String,
    pub raised_at_ms: u64,
    pub deadline_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Approved,
    Denied,
    TimedOutApproved,
    TimedOutDenied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEscalation {
    pub record: EscalationRecord,
    pub resolution: Resolution,
    pub resolved_at_ms: u64,
    pub resolver: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscalationError {
    #[error("no pending escalation {0}")]
    NotPending(DecisionId),
}

/// Producer side, held by the coordinator.
#[derive(Clone)]
pub struct EscalationSender {
    tx: mpsc::Sender<EscalationRecord>,
}

impl EscalationSender {
    /// Never waits. A full or closed channel drops the record.
    pub fn emit(&self, record: EscalationRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => {
                metrics::counter!("governance_escalations_total", 1);
                true
            }
            Err(e) => {
                let record = match e {
                    mpsc::error::TrySendError::Full(r) | mpsc::error::TrySendError::Closed(r) => r,
                };
                tracing::warn!("Escalation for decision {} dropped: channel unavailable", record.decision_id);
                metrics::counter!("governance_escalations_dropped_total", 1);
                false
            }
        }
    }
}

pub fn channel(capacity: usize) -> (EscalationSender, mpsc::Receiver<EscalationRecord>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EscalationSender { tx }, rx)
}

pub struct EscalationHandler {
    pending: Mutex<BTreeMap<DecisionId, EscalationRecord>>,
    resolved: Mutex<VecDeque<ResolvedEscalation>>,
    on_timeout: TimeoutResolution,
    clock: Arc<dyn Clock>,
}

impl EscalationHandler {
    pub fn new(on_timeout: TimeoutResolution, clock: Arc<dyn Clock>) -> Self {
        Self {
            pending: Mutex::new(BTreeMap::new()),
            resolved: Mutex::new(VecDeque::new()),
            on_timeout,
            clock,
        }
    }

    pub fn accept(&self, record: EscalationRecord) {
        tracing::info!(
            "Escalation pending: decision {} for {} until {}",
            record.decision_id,
            record.identity_id,
            record.deadline_ms
        );
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.decision_id.clone(), record);
    }

    pub fn pending(&self) -> Vec<EscalationRecord> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn resolved(&self) -> Vec<ResolvedEscalation> {
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn finish(&self, record: EscalationRecord, resolution: Resolution, resolver: Option<String>) -> ResolvedEscalation {
        let done = ResolvedEscalation {
            record,
            resolution,
            resolved_at_ms: self.clock.now_ms(),
            resolver,
        };
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        if resolved.len() == RESOLVED_HISTORY {
            resolved.pop_front();
        }
        resolved.push_back(done.clone());
        done
    }

    /// Record a human answer.
    pub fn resolve(
        &self,
        decision_id: &DecisionId,
        approve: bool,
        resolver: Option<String>,
    ) -> Result<ResolvedEscalation, EscalationError> {
        let record = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(decision_id)
            .ok_or_else(|| EscalationError::NotPending(decision_id.clone()))?;
        let resolution = if approve { Resolution::Approved } else { Resolution::Denied };
        Ok(self.finish(record, resolution, resolver))
    }

    /// Apply the timeout default to every escalation past its deadline.
    pub fn sweep(&self) -> Vec<ResolvedEscalation> {
        let now = self.clock.now_ms();
        let expired: Vec<EscalationRecord> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            let ids: Vec<DecisionId> = pending
                .values()
                .filter(|r| r.deadline_ms <= now)
                .map(|r| r.decision_id.clone())
                .collect();
            ids.iter().filter_map(|id| pending.remove(id)).collect()
        };
        let resolution = match self.on_timeout {
            TimeoutResolution::Deny => Resolution::TimedOutDenied,
            TimeoutResolution::Allow => Resolution::TimedOutApproved,
        };
        expired
            .into_iter()
            .map(|r| {
                tracing::warn!("Escalation {} timed out: {:?}", r.decision_id, resolution);
                self.finish(r, resolution, None)
            })
            .collect()
    }

    /// Drain the channel and sweep periodically until every sender is gone.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<EscalationRecord>, sweep_every: Duration) {
        let mut ticker = tokio::time::interval(sweep_every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(record) => self.accept(record),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.sweep();
                }
            }
        }
        tracing::debug!("Escalation channel closed");
    }
}
