// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

/// Number of fractional decimal digits carried by [`crate::fxp::Amount`].
pub const AMOUNT_FRACTION_DIGITS: u32 = 4;

/// Scaling factor for fixed-point amounts (10^AMOUNT_FRACTION_DIGITS).
pub const AMOUNT_SCALE: i64 = 10_000;

/// Default freshness / replay window (5 minutes).
pub const DEFAULT_REPLAY_WINDOW_MS: u64 = 5 * 60 * 1000;

/// Tolerated clock skew for requests stamped in the future.
pub const DEFAULT_CLOCK_SKEW_MS: u64 = 30 * 1000;

/// `prev_hash` of the entry at sequence 0.
pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

/// Ledger file magic ("GOVL").
pub const LEDGER_MAGIC: u32 = 0x474F_564C;

/// Ledger file format version.
pub const LEDGER_FORMAT_VERSION: u32 = 1;

/// Largest payload a ledger frame may carry (1 MiB).
pub const MAX_FRAME_PAYLOAD: usize = 1 << 20;

/// `BLAKE3(canonical(PolicySet::baseline()))`. Any edit to the built-in
/// policy must update this pin.
pub const BASELINE_POLICY_HASH: [u8; 32] = [
    0x43, 0x51, 0xa3, 0x95, 0x9e, 0x8e, 0xea, 0x44,
    0xe0, 0x87, 0x4d, 0x5c, 0x53, 0x13, 0xde, 0xc7,
    0x60, 0xbe, 0xae, 0x15, 0x03, 0x85, 0xbd, 0x22,
    0x43, 0x92, 0x92, 0x88, 0x05, 0x04, 0x3f, 0xab,
];

/// Risk score at or above which the optional risk rule escalates.
pub const DEFAULT_RISK_THRESHOLD: u32 = 30;
