// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Signed fixed-point amount with four decimal places.
//!
//! Budgets never touch floating point. Parsing rejects more precision than
//! the format carries instead of rounding, and every arithmetic operation is
//! checked so an overflow surfaces as [`KernelError::Overflow`].

use crate::config::{AMOUNT_FRACTION_DIGITS, AMOUNT_SCALE};
use crate::error::{KernelError, KernelResult};
use core::fmt;
use core::str::FromStr;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Build from the raw scaled representation.
    pub const fn from_raw(raw: i64) -> Self {
        Amount(raw)
    }

    /// Build from whole units.
    pub fn from_units(units: i64) -> KernelResult<Self> {
        units
            .checked_mul(AMOUNT_SCALE)
            .map(Amount)
            .ok_or(KernelError::Overflow)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Amount) -> KernelResult<Amount> {
        self.0.checked_add(rhs.0).map(Amount).ok_or(KernelError::Overflow)
    }

    pub fn checked_sub(self, rhs: Amount) -> KernelResult<Amount> {
        self.0.checked_sub(rhs.0).map(Amount).ok_or(KernelError::Overflow)
    }

    /// Whole-unit part, truncated toward zero.
    pub const fn whole_units(self) -> i64 {
        self.0 / AMOUNT_SCALE
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = AMOUNT_SCALE as u64;
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            abs / scale,
            abs % scale,
            width = AMOUNT_FRACTION_DIGITS as usize
        )
    }
}

impl FromStr for Amount {
    type Err = KernelError;

    fn from_str(s: &str) -> KernelResult<Self> {
        let invalid = || KernelError::InvalidAmount(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > AMOUNT_FRACTION_DIGITS as usize {
            return Err(invalid());
        }

        let whole_val: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut frac_val: i64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| invalid())?
        };
        for _ in frac.len()..AMOUNT_FRACTION_DIGITS as usize {
            frac_val *= 10;
        }

        let raw = whole_val
            .checked_mul(AMOUNT_SCALE)
            .and_then(|v| v.checked_add(frac_val))
            .ok_or(KernelError::Overflow)?;
        Ok(Amount(if negative { -raw } else { raw }))
    }
}

// Decimal string for humans (JSON), raw i64 on the ledger.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_i64(self.0)
        }
    }
}

struct AmountVisitor {
    human: bool,
}

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal string or an integer amount")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        if self.human {
            Amount::from_units(v).map_err(E::custom)
        } else {
            Ok(Amount(v))
        }
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        let v = i64::try_from(v).map_err(|_| E::custom(KernelError::Overflow))?;
        self.visit_i64(v)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(AmountVisitor { human: true })
        } else {
            deserializer.deserialize_i64(AmountVisitor { human: false })
        }
    }
}
