// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! governance-kernel: the deterministic core of the Governance Kernel.
//!
//! Pure building blocks for the Atomic Governance Transaction: the data
//! model, fixed-point amounts, identity verification, tiered policy
//! evaluation, and the hash-chained decision ledger format. Nothing in this
//! crate performs IO or holds mutable shared state; the node crate owns the
//! ledgers and the coordinator.

pub mod config;
pub mod error;
pub mod fxp;
pub mod hash;
pub mod types;
pub mod identity;
pub mod policy;
pub mod event;
pub mod ledger;
pub mod verify;
pub mod proof;

#[cfg(test)]
pub mod tests;
