// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable backends for the decision ledger.
//!
//! `append` returns only after the backend acknowledges durability. A failed
//! append leaves nothing of the entry behind; if that cannot be guaranteed
//! the backend reports `Poisoned` and the ledger fences itself.

use governance_kernel::ledger::codec::{decode_ledger, encode_frame, encode_header, HEADER_SIZE};
use governance_kernel::ledger::LedgerEntry;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("ledger file is corrupt: {0}")]
    Corrupt(String),

    #[error("storage left in an unknown state: {0}")]
    Poisoned(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

pub trait LedgerStorage: Send {
    /// Every durable entry, in order.
    fn load(&mut self) -> Result<Vec<LedgerEntry>, StorageError>;

    /// Durably append one entry.
    fn append(&mut self, entry: &LedgerEntry) -> Result<(), StorageError>;

    /// Backing file, if any.
    fn file_path(&self) -> Option<&Path> {
        None
    }
}

/// Volatile backend for development and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Vec<LedgerEntry>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        Self { entries }
    }
}

impl LedgerStorage for MemoryStorage {
    fn load(&mut self) -> Result<Vec<LedgerEntry>, StorageError> {
        Ok(self.entries.clone())
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<(), StorageError> {
        self.entries.push(entry.clone());
        Ok(())
    }
}

/// Append-only ledger file.
///
/// # Safety Guarantees
/// - write + fsync before `append` returns
/// - a failed write is truncated back to the last complete frame
/// - a torn tail left by a crash is truncated on open
pub struct FileStorage {
    path: PathBuf,
    file: File,
    len: u64,
}

impl FileStorage {
    /// Open or create a ledger file, repairing a torn tail.
    ///
    /// A corrupt image is refused before anything is written, so the file
    /// is left exactly as found.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let decoded = decode_ledger(&bytes).map_err(|e| StorageError::Corrupt(e.to_string()))?;

        if decoded.torn_tail {
            tracing::warn!(
                "Torn tail in {:?}: truncating {} bytes",
                path,
                bytes.len() - decoded.valid_len
            );
            file.set_len(decoded.valid_len as u64)?;
            file.sync_all()?;
        }

        let mut len = decoded.valid_len as u64;
        if len < HEADER_SIZE as u64 {
            file.write_all(&encode_header())?;
            file.sync_all()?;
            len = HEADER_SIZE as u64;
        }

        Ok(Self { path, file, len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of the file known to be complete.
    pub fn durable_len(&self) -> u64 {
        self.len
    }
}

impl LedgerStorage for FileStorage {
    fn load(&mut self) -> Result<Vec<LedgerEntry>, StorageError> {
        let mut bytes = Vec::with_capacity(self.len as usize);
        self.file.seek(SeekFrom::Start(0))?;
        (&mut self.file).take(self.len).read_to_end(&mut bytes)?;
        let decoded = decode_ledger(&bytes).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        Ok(decoded.entries)
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<(), StorageError> {
        let frame = encode_frame(entry).map_err(|e| StorageError::Io(e.to_string()))?;

        let written = self
            .file
            .write_all(&frame)
            .and_then(|_| self.file.sync_data());

        match written {
            Ok(()) => {
                self.len += frame.len() as u64;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Ledger write failed at {}: {}. Truncating.", self.len, e);
                self.file
                    .set_len(self.len)
                    .and_then(|_| self.file.sync_all())
                    .map_err(|t| StorageError::Poisoned(format!("{} (truncate failed: {})", e, t)))?;
                Err(StorageError::Io(e.to_string()))
            }
        }
    }

    fn file_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
