// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger file framing.
//!
//! # File Format
//! ```text
//! [Header: 16 bytes][Frame][Frame][Frame]...
//! ```
//!
//! Header:
//! - magic: u32 ("GOVL")
//! - version: u32 (1)
//! - reserved: u64 (0)
//!
//! Frame:
//! - sequence_id: u64
//! - payload_len: u32
//! - checksum: u64 (CRC-64 over sequence_id ‖ payload_len ‖ payload)
//! - payload: bincode(LedgerEntry)
//!
//! All integers little-endian. A frame cut short at the end of the file is a
//! torn tail from an interrupted append and is reported so it can be
//! truncated. A complete frame with a bad checksum is corruption.
//!
//! A short final frame only counts as torn when it could be one: its length
//! is within [`MAX_FRAME_PAYLOAD`], it carries the next sequence id, and the
//! bytes present do not already hold a complete entry. Anything else is a
//! damaged frame header and is reported as corruption, never truncated.

use crate::config::{LEDGER_FORMAT_VERSION, LEDGER_MAGIC, MAX_FRAME_PAYLOAD};
use crate::hash::{canonical_bytes, decode_canonical};
use crate::ledger::entry::LedgerEntry;
use crc64fast::Digest as Crc64;
use thiserror::Error;

pub const HEADER_SIZE: usize = 16;
pub const FRAME_HEADER_SIZE: usize = 8 + 4 + 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid ledger header")]
    InvalidHeader,

    #[error("unsupported ledger version {0}")]
    UnsupportedVersion(u32),

    #[error("checksum mismatch at offset {offset}: expected {expected:#018x}, found {found:#018x}")]
    ChecksumMismatch { offset: usize, expected: u64, found: u64 },

    #[error("frame at offset {offset} is labelled sequence {frame} but holds entry {entry}")]
    SequenceLabel { offset: usize, frame: u64, entry: u64 },

    #[error("undecodable entry at offset {offset}: {reason}")]
    Decode { offset: usize, reason: String },

    #[error("corrupt frame at offset {offset}: {reason}")]
    Corrupt { offset: usize, reason: String },

    #[error("entry encoding failed: {0}")]
    Encode(String),
}

pub fn encode_header() -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    buf[0..4].copy_from_slice(&LEDGER_MAGIC.to_le_bytes());
    buf[4..8].copy_from_slice(&LEDGER_FORMAT_VERSION.to_le_bytes());
    buf
}

fn checksum(sequence_id: u64, payload: &[u8]) -> u64 {
    let mut digest = Crc64::new();
    digest.write(&sequence_id.to_le_bytes());
    digest.write(&(payload.len() as u32).to_le_bytes());
    digest.write(payload);
    digest.sum64()
}

/// One framed entry, ready to append.
pub fn encode_frame(entry: &LedgerEntry) -> Result<Vec<u8>, CodecError> {
    let payload = canonical_bytes(entry).map_err(|e| CodecError::Encode(e.to_string()))?;
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(CodecError::Encode(format!(
            "entry of {} bytes exceeds the {} byte frame limit",
            payload.len(),
            MAX_FRAME_PAYLOAD
        )));
    }
    let len = u32::try_from(payload.len()).map_err(|_| CodecError::Encode("entry too large".into()))?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&entry.sequence_id.to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&checksum(entry.sequence_id, &payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLedger {
    pub entries: Vec<LedgerEntry>,
    /// Bytes up to the end of the last complete frame (header included).
    pub valid_len: usize,
    /// Trailing bytes after `valid_len` form an incomplete frame.
    pub torn_tail: bool,
}

/// Reject a short final frame that cannot be the remains of an interrupted
/// append.
fn check_torn_frame(offset: usize, sequence_id: u64, expected_seq: u64, available: &[u8]) -> Result<(), CodecError> {
    if sequence_id != expected_seq {
        return Err(CodecError::Corrupt {
            offset,
            reason: format!("short frame labelled sequence {}, expected {}", sequence_id, expected_seq),
        });
    }
    if decode_canonical::<LedgerEntry>(available).is_ok() {
        return Err(CodecError::Corrupt {
            offset,
            reason: "frame length overruns the file but a complete entry follows the header".into(),
        });
    }
    Ok(())
}

fn read_u32(b: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&b[..4]);
    u32::from_le_bytes(raw)
}

fn read_u64(b: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&b[..8]);
    u64::from_le_bytes(raw)
}

/// Decode a whole ledger file image.
///
/// An empty image is an empty ledger with no header yet. A header cut short
/// counts as a torn tail at offset 0.
pub fn decode_ledger(bytes: &[u8]) -> Result<DecodedLedger, CodecError> {
    if bytes.is_empty() {
        return Ok(DecodedLedger { entries: Vec::new(), valid_len: 0, torn_tail: false });
    }
    if bytes.len() < HEADER_SIZE {
        return Ok(DecodedLedger { entries: Vec::new(), valid_len: 0, torn_tail: true });
    }
    if read_u32(&bytes[0..4]) != LEDGER_MAGIC {
        return Err(CodecError::InvalidHeader);
    }
    let version = read_u32(&bytes[4..8]);
    if version != LEDGER_FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let mut entries = Vec::new();
    let mut offset = HEADER_SIZE;
    loop {
        let rest = &bytes[offset..];
        if rest.is_empty() {
            return Ok(DecodedLedger { entries, valid_len: offset, torn_tail: false });
        }
        if rest.len() < FRAME_HEADER_SIZE {
            break;
        }
        let sequence_id = read_u64(&rest[0..8]);
        let len = read_u32(&rest[8..12]) as usize;
        let expected = read_u64(&rest[12..20]);
        if len > MAX_FRAME_PAYLOAD {
            return Err(CodecError::Corrupt {
                offset,
                reason: format!("payload length {} exceeds the {} byte limit", len, MAX_FRAME_PAYLOAD),
            });
        }
        let Some(payload) = rest.get(FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + len) else {
            check_torn_frame(offset, sequence_id, entries.len() as u64, &rest[FRAME_HEADER_SIZE..])?;
            break;
        };

        let found = checksum(sequence_id, payload);
        if found != expected {
            return Err(CodecError::ChecksumMismatch { offset, expected, found });
        }
        let (entry, _): (LedgerEntry, usize) = decode_canonical(payload)
            .map_err(|e| CodecError::Decode { offset, reason: e.to_string() })?;
        if entry.sequence_id != sequence_id {
            return Err(CodecError::SequenceLabel { offset, frame: sequence_id, entry: entry.sequence_id });
        }
        entries.push(entry);
        offset += FRAME_HEADER_SIZE + len;
    }

    Ok(DecodedLedger { entries, valid_len: offset, torn_tail: true })
}
