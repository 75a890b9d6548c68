// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Checked arithmetic left the representable range.
    #[error("arithmetic overflow")]
    Overflow,
    /// Malformed decimal amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// Canonical encoding failed.
    #[error("canonical encoding failed: {0}")]
    Encoding(String),
    /// Request failed structural validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
