// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger records as primary truth.
//!
//! Every state transition the node makes is expressed as a `LedgerRecord`.
//! Replaying the records of a ledger from genesis reproduces every
//! identity's resource state.
//!
//! # Determinism Guarantees
//! - No wall-clock reads (the request timestamp is caller data)
//! - No hash-ordered collections
//! - Same record sequence => same resource states on any architecture

use crate::types::decision::Decision;
use crate::types::request::ActionRequest;
use crate::types::resource::ResourceState;
use serde::{Deserialize, Serialize};

/// One authorization decision together with what it was decided on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub request: ActionRequest,
    pub decision: Decision,
    /// Resource state after the decision; equals the snapshot when nothing
    /// was charged.
    pub resulting_state: ResourceState,
}

/// Cancels a decision entry whose append landed after its transaction had
/// already been abandoned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidMarker {
    pub voided_sequence: u64,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerRecord {
    Decision(DecisionRecord),
    Void(VoidMarker),
}

impl LedgerRecord {
    pub fn record_type(&self) -> &'static str {
        match self {
            LedgerRecord::Decision(_) => "Decision",
            LedgerRecord::Void(_) => "Void",
        }
    }

    pub fn as_decision(&self) -> Option<&DecisionRecord> {
        match self {
            LedgerRecord::Decision(d) => Some(d),
            LedgerRecord::Void(_) => None,
        }
    }
}
