// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Crash Recovery
//!
//! The decision ledger is canonical truth. Each identity's resource state is
//! the `resulting_state` of its latest non-voided decision entry; seeds from
//! the registry only cover identities the ledger has never seen.

use crate::events::decision_ledger::DecisionLedger;
use crate::state::resource_ledger::ResourceLedger;
use governance_kernel::event::LedgerRecord;
use governance_kernel::ledger::LedgerEntry;
use governance_kernel::types::{IdentityId, ResourceState};
use rustc_hash::{FxHashMap, FxHashSet};
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub entries: u64,
    pub decisions: u64,
    pub voided: u64,
    pub accounts_restored: u64,
}

/// Latest committed state per identity, from ledger entries alone.
pub fn replay_states(entries: &[LedgerEntry]) -> (FxHashMap<IdentityId, ResourceState>, RecoveryReport) {
    let voided: FxHashSet<u64> = entries
        .iter()
        .filter_map(|e| match &e.payload {
            LedgerRecord::Void(v) => Some(v.voided_sequence),
            LedgerRecord::Decision(_) => None,
        })
        .collect();

    let mut report = RecoveryReport {
        entries: entries.len() as u64,
        voided: voided.len() as u64,
        ..Default::default()
    };
    let mut states: FxHashMap<IdentityId, ResourceState> = FxHashMap::default();
    for entry in entries {
        let Some(record) = entry.decision_record() else { continue };
        if voided.contains(&entry.sequence_id) {
            continue;
        }
        report.decisions += 1;
        states.insert(record.request.identity_id.clone(), record.resulting_state.clone());
    }
    report.accounts_restored = states.len() as u64;
    (states, report)
}

/// Overwrite resource states with what the ledger says.
pub fn restore_resource_states(ledger: &DecisionLedger, resources: &ResourceLedger) -> RecoveryReport {
    let start = Instant::now();
    let (states, report) = ledger.with_entries(replay_states);
    for (_, state) in states {
        resources.provision(state);
    }
    tracing::info!(
        "Recovered {} accounts from {} entries ({} decisions, {} voided) in {:?}",
        report.accounts_restored,
        report.entries,
        report.decisions,
        report.voided,
        start.elapsed()
    );
    report
}
