// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Fixed-point decimal arithmetic for budgets and costs.

pub mod amount;

pub use amount::Amount;
