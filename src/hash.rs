// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical encoding and BLAKE3 hashing.
//!
//! Every hash the kernel publishes (policy hashes, entry hashes, decision
//! ids, request digests) is BLAKE3 over the bincode `standard()` encoding of
//! the value. Collections in hashed types are `BTreeMap`/`BTreeSet` so the
//! encoding is independent of insertion order.

use crate::error::{KernelError, KernelResult};
use crate::types::digest::Digest;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Canonical byte encoding of a value.
pub fn canonical_bytes<T: Serialize>(value: &T) -> KernelResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| KernelError::Encoding(e.to_string()))
}

/// Decode a value from its canonical encoding, returning bytes consumed.
pub fn decode_canonical<T: DeserializeOwned>(bytes: &[u8]) -> KernelResult<(T, usize)> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| KernelError::Encoding(e.to_string()))
}

/// BLAKE3 of a byte slice.
pub fn hash_bytes(data: &[u8]) -> Digest {
    Digest(*blake3::hash(data).as_bytes())
}

/// BLAKE3 of the canonical encoding of a value.
pub fn hash_canonical<T: Serialize>(value: &T) -> KernelResult<Digest> {
    Ok(hash_bytes(&canonical_bytes(value)?))
}
