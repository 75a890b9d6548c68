// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Hash-chain verification.
//!
//! Recomputes `entry_hash` over a range using only `prev_hash` and the
//! payload, checks each link against the predecessor's stored hash and,
//! when a key is supplied, the node signature. Stops at the first mismatch.

use crate::event::LedgerRecord;
use crate::ledger::entry::{genesis_hash, LedgerEntry};
use crate::types::digest::{Digest, PublicKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ChainFault {
    #[error("sequence gap")]
    SequenceGap,
    #[error("prev_hash does not match predecessor")]
    BrokenLink,
    #[error("stored entry_hash does not match recomputation")]
    HashMismatch,
    #[error("bad node signature")]
    BadSignature,
    #[error("void marker does not reference an earlier decision")]
    DanglingVoid,
    #[error("payload cannot be encoded")]
    Unencodable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub sequence_id: u64,
    pub fault: ChainFault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub from: u64,
    /// Inclusive; `None` when the range was empty.
    pub to: Option<u64>,
    pub checked: u64,
    /// Hash of the last entry that verified.
    pub head_hash: Digest,
    pub first_mismatch: Option<Mismatch>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.first_mismatch.is_none()
    }
}

fn check_entry(
    entries: &[LedgerEntry],
    index: usize,
    prev: &Digest,
    key: Option<&PublicKey>,
) -> Result<(), ChainFault> {
    let entry = &entries[index];
    if entry.sequence_id != index as u64 {
        return Err(ChainFault::SequenceGap);
    }
    if entry.prev_hash != *prev {
        return Err(ChainFault::BrokenLink);
    }
    let recomputed = entry.recompute_hash().map_err(|_| ChainFault::Unencodable)?;
    if recomputed != entry.entry_hash {
        return Err(ChainFault::HashMismatch);
    }
    if let Some(key) = key {
        if !entry.verify_signature(key) {
            return Err(ChainFault::BadSignature);
        }
    }
    if let LedgerRecord::Void(marker) = &entry.payload {
        let target = entries.get(marker.voided_sequence as usize);
        let valid = marker.voided_sequence < entry.sequence_id
            && matches!(target.map(|t| &t.payload), Some(LedgerRecord::Decision(_)));
        if !valid {
            return Err(ChainFault::DanglingVoid);
        }
    }
    Ok(())
}

/// Verify `entries[from..=to]`, where `entries` is the ledger from sequence 0.
///
/// `to` is clamped to the last entry. The link of `from` is checked against
/// the stored hash of `from - 1` (genesis for 0).
pub fn verify_chain(entries: &[LedgerEntry], from: u64, to: Option<u64>, key: Option<&PublicKey>) -> ChainReport {
    let last = entries.len() as u64;
    let end = to.map(|t| t.saturating_add(1).min(last)).unwrap_or(last);
    let start_prev = match from {
        0 => genesis_hash(),
        n => entries
            .get((n - 1) as usize)
            .map(|e| e.entry_hash)
            .unwrap_or_else(genesis_hash),
    };

    let mut report = ChainReport {
        from,
        to: (end > from).then(|| end - 1),
        checked: 0,
        head_hash: start_prev,
        first_mismatch: None,
    };

    for seq in from..end {
        if let Err(fault) = check_entry(entries, seq as usize, &report.head_hash, key) {
            report.first_mismatch = Some(Mismatch { sequence_id: seq, fault });
            break;
        }
        report.head_hash = entries[seq as usize].entry_hash;
        report.checked += 1;
    }
    report
}
