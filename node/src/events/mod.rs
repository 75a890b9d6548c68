// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod decision_ledger;
pub mod ledger_storage;

pub use decision_ledger::{AppendResult, DecisionLedger, LedgerError};
pub use ledger_storage::{FileStorage, LedgerStorage, MemoryStorage, StorageError};
