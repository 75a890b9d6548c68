// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Decision ledger format: hash-chained entries and their file framing.

pub mod codec;
pub mod entry;

pub use codec::{decode_ledger, encode_frame, encode_header, CodecError, DecodedLedger};
pub use entry::{entry_hash, genesis_hash, LedgerEntry, LedgerSigner};
