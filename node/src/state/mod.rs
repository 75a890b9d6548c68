// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod resource_ledger;

pub use resource_ledger::{LockHandle, ResourceError, ResourceLedger, TentativeState};
