// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger proofs.

use crate::ledger::entry::{genesis_hash, LedgerEntry};
use crate::types::digest::Digest;
use serde::{Deserialize, Serialize};

/// A receipt of ledger history: a node and an offline verifier that agree on
/// it agree on every decision ever made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainProof {
    pub ledger_version: u32,

    /// Number of entries.
    pub height: u64,

    /// `entry_hash` of the last entry, genesis hash when empty.
    pub head_hash: Digest,

    /// BLAKE3 of the ledger file image, when read from a file.
    pub ledger_file_hash: Option<Digest>,
}

impl ChainProof {
    pub fn from_entries(entries: &[LedgerEntry]) -> Self {
        Self {
            ledger_version: crate::config::LEDGER_FORMAT_VERSION,
            height: entries.len() as u64,
            head_hash: entries.last().map(|e| e.entry_hash).unwrap_or_else(genesis_hash),
            ledger_file_hash: None,
        }
    }

    pub fn with_file_hash(mut self, file_bytes: &[u8]) -> Self {
        self.ledger_file_hash = Some(crate::hash::hash_bytes(file_bytes));
        self
    }

    /// Height and head hash agree. File hashes are compared only when both
    /// sides carry one.
    pub fn matches(&self, other: &ChainProof) -> bool {
        let files_agree = match (self.ledger_file_hash, other.ledger_file_hash) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        self.ledger_version == other.ledger_version
            && self.height == other.height
            && self.head_hash == other.head_hash
            && files_agree
    }
}
