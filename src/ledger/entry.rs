// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Hash-chained, signed ledger entries.

use crate::config::GENESIS_HASH;
use crate::error::KernelResult;
use crate::event::{DecisionRecord, LedgerRecord};
use crate::hash::canonical_bytes;
use crate::types::digest::{Digest, PublicKey, SignatureBytes};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence_id: u64,
    pub prev_hash: Digest,
    /// `BLAKE3(prev_hash ‖ canonical(payload))`.
    pub entry_hash: Digest,
    pub payload: LedgerRecord,
    /// Node key signature over `entry_hash`.
    pub signature: SignatureBytes,
}

/// `BLAKE3(prev_hash ‖ canonical(payload))`.
pub fn entry_hash(prev_hash: &Digest, payload: &LedgerRecord) -> KernelResult<Digest> {
    let body = canonical_bytes(payload)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(&body);
    Ok(Digest(*hasher.finalize().as_bytes()))
}

pub fn genesis_hash() -> Digest {
    Digest(GENESIS_HASH)
}

impl LedgerEntry {
    /// Recompute the entry hash from `prev_hash` and the payload alone.
    pub fn recompute_hash(&self) -> KernelResult<Digest> {
        entry_hash(&self.prev_hash, &self.payload)
    }

    pub fn verify_signature(&self, key: &PublicKey) -> bool {
        let Ok(vk) = VerifyingKey::from_bytes(key.as_bytes()) else {
            return false;
        };
        let sig = Signature::from_bytes(self.signature.as_bytes());
        vk.verify_strict(self.entry_hash.as_bytes(), &sig).is_ok()
    }

    pub fn decision_record(&self) -> Option<&DecisionRecord> {
        self.payload.as_decision()
    }
}

/// Seals payloads into signed entries with the node ledger key.
pub struct LedgerSigner {
    key: SigningKey,
}

impl LedgerSigner {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self { key: SigningKey::from_bytes(&seed) }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.key.verifying_key().to_bytes())
    }

    pub fn seal(&self, sequence_id: u64, prev_hash: Digest, payload: LedgerRecord) -> KernelResult<LedgerEntry> {
        let entry_hash = entry_hash(&prev_hash, &payload)?;
        let signature = SignatureBytes(self.key.sign(entry_hash.as_bytes()).to_bytes());
        Ok(LedgerEntry { sequence_id, prev_hash, entry_hash, payload, signature })
    }
}

impl core::fmt::Debug for LedgerSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedgerSigner")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
