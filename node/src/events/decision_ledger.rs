// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Decision Ledger - The Safety Wall
//!
//! Append-only, hash-chained record of every decision. An append returns
//! only after the backend acknowledges durability, bounded by the write
//! timeout:
//! 1. Entry sealed (hash + signature) against the current head
//! 2. Entry written and fsync'd by the backend
//! 3. Entry published to readers
//!
//! If the deadline passes first, the in-flight write is abandoned with a
//! compare-and-set. A write that lands after abandonment is cancelled by a
//! `Void` entry written in the same writer critical section. If that void
//! cannot be written the ledger fences itself and refuses every later
//! append.
//!
//! # Invariants
//! - one global total order via `sequence_id`
//! - an entry is readable only once durable
//! - a voided decision is never indexed by message id

use crate::events::ledger_storage::{LedgerStorage, StorageError};
use governance_kernel::event::{LedgerRecord, VoidMarker};
use governance_kernel::ledger::{genesis_hash, LedgerEntry, LedgerSigner};
use governance_kernel::proof::ChainProof;
use governance_kernel::types::{Digest, IdentityId, MessageId, PublicKey};
use governance_kernel::verify::{verify_chain, ChainReport, Mismatch};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger write exceeded {0:?}")]
    WriteTimeout(Duration),

    #[error("ledger storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("ledger is fenced after an unrecoverable write failure")]
    Fenced,

    #[error("ledger chain broken at sequence {}: {}", .0.sequence_id, .0.fault)]
    Corrupt(Mismatch),

    #[error("entry encoding failed: {0}")]
    Encoding(String),
}

impl From<StorageError> for LedgerError {
    fn from(e: StorageError) -> Self {
        LedgerError::StorageUnavailable(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendResult {
    pub sequence_id: u64,
    pub entry_hash: Digest,
}

const PENDING: u8 = 0;
const DONE: u8 = 1;
const ABANDONED: u8 = 2;

struct WriterCore {
    storage: Box<dyn LedgerStorage>,
    next_seq: u64,
    head: Digest,
}

#[derive(Default)]
struct LedgerView {
    entries: Vec<LedgerEntry>,
    by_message: FxHashMap<(IdentityId, MessageId), u64>,
    voided: FxHashSet<u64>,
}

impl LedgerView {
    fn publish(&mut self, entry: LedgerEntry) {
        match &entry.payload {
            LedgerRecord::Decision(d) => {
                let key = (d.request.identity_id.clone(), d.request.message_id.clone());
                self.by_message.insert(key, entry.sequence_id);
            }
            LedgerRecord::Void(v) => {
                self.voided.insert(v.voided_sequence);
                if let Some(LedgerRecord::Decision(d)) =
                    self.entries.get(v.voided_sequence as usize).map(|e| &e.payload)
                {
                    let key = (d.request.identity_id.clone(), d.request.message_id.clone());
                    if self.by_message.get(&key) == Some(&v.voided_sequence) {
                        self.by_message.remove(&key);
                    }
                }
            }
        }
        self.entries.push(entry);
    }
}

struct Shared {
    core: Mutex<WriterCore>,
    view: RwLock<LedgerView>,
    fenced: AtomicBool,
    signer: LedgerSigner,
}

impl Shared {
    fn fence(&self, why: &str) {
        if !self.fenced.swap(true, Ordering::SeqCst) {
            tracing::error!("Decision ledger fenced: {}", why);
        }
    }

    /// Runs on the blocking pool. Holds the writer core for the whole
    /// append, including any void for a late landing.
    fn write(&self, payload: LedgerRecord, state: &AtomicU8) -> Result<AppendResult, LedgerError> {
        let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
        if self.fenced.load(Ordering::SeqCst) {
            return Err(LedgerError::Fenced);
        }
        if state.load(Ordering::SeqCst) == ABANDONED {
            return Err(LedgerError::WriteTimeout(Duration::ZERO));
        }

        let entry = self
            .signer
            .seal(core.next_seq, core.head, payload)
            .map_err(|e| LedgerError::Encoding(e.to_string()))?;

        if let Err(e) = core.storage.append(&entry) {
            if matches!(e, StorageError::Poisoned(_)) {
                self.fence(&e.to_string());
            }
            return Err(e.into());
        }
        let result = AppendResult { sequence_id: entry.sequence_id, entry_hash: entry.entry_hash };
        core.next_seq += 1;
        core.head = entry.entry_hash;

        if state.compare_exchange(PENDING, DONE, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            self.view.write().unwrap_or_else(PoisonError::into_inner).publish(entry);
            return Ok(result);
        }

        // Abandoned by the caller while the write was in flight.
        tracing::warn!("Ledger entry {} landed after its deadline; voiding", entry.sequence_id);
        let void = LedgerRecord::Void(VoidMarker {
            voided_sequence: entry.sequence_id,
            reason: "append completed after the transaction was abandoned".into(),
        });
        let sealed = self.signer.seal(core.next_seq, core.head, void);
        let void_written = sealed
            .map_err(|e| StorageError::Io(e.to_string()))
            .and_then(|v| core.storage.append(&v).map(|_| v));

        let mut view = self.view.write().unwrap_or_else(PoisonError::into_inner);
        view.publish(entry);
        match void_written {
            Ok(v) => {
                core.next_seq += 1;
                core.head = v.entry_hash;
                view.publish(v);
            }
            Err(e) => self.fence(&format!("void for sequence {} not written: {}", result.sequence_id, e)),
        }
        Err(LedgerError::WriteTimeout(Duration::ZERO))
    }
}

pub struct DecisionLedger {
    shared: Arc<Shared>,
    write_timeout: Duration,
    path: Option<PathBuf>,
}

impl DecisionLedger {
    /// Load `storage`, verify the full chain, and take over as its writer.
    ///
    /// Any chain mismatch refuses to open.
    pub fn open(
        mut storage: Box<dyn LedgerStorage>,
        signer: LedgerSigner,
        write_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let entries = storage.load()?;
        let key = signer.public_key();
        let report = verify_chain(&entries, 0, None, Some(&key));
        if let Some(m) = report.first_mismatch {
            tracing::error!("Ledger verification failed at {}: {}", m.sequence_id, m.fault);
            return Err(LedgerError::Corrupt(m));
        }

        let path = storage.file_path().map(|p| p.to_path_buf());
        let mut view = LedgerView::default();
        for e in entries {
            view.publish(e);
        }
        let core = WriterCore {
            storage,
            next_seq: view.entries.len() as u64,
            head: report.head_hash,
        };
        metrics::gauge!("governance_ledger_height", view.entries.len() as f64);

        Ok(Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                view: RwLock::new(view),
                fenced: AtomicBool::new(false),
                signer,
            }),
            write_timeout,
            path,
        })
    }

    /// Durably append `payload`, waiting at most the write timeout.
    pub async fn append(&self, payload: LedgerRecord) -> Result<AppendResult, LedgerError> {
        if self.is_fenced() {
            return Err(LedgerError::Fenced);
        }
        let start = Instant::now();
        let state = Arc::new(AtomicU8::new(PENDING));

        let shared = self.shared.clone();
        let task_state = state.clone();
        let mut task = tokio::task::spawn_blocking(move || shared.write(payload, &task_state));

        let result = match tokio::time::timeout(self.write_timeout, &mut task).await {
            Ok(joined) => joined.map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?,
            Err(_) => {
                if state
                    .compare_exchange(PENDING, ABANDONED, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    tracing::warn!("Ledger append abandoned after {:?}", self.write_timeout);
                    return Err(LedgerError::WriteTimeout(self.write_timeout));
                }
                // Landed right at the deadline: it is durable, take it.
                task.await.map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?
            }
        };

        let result = result.map_err(|e| match e {
            LedgerError::WriteTimeout(_) => LedgerError::WriteTimeout(self.write_timeout),
            other => other,
        })?;

        metrics::histogram!("governance_ledger_append_duration_seconds", start.elapsed().as_secs_f64());
        metrics::gauge!("governance_ledger_height", (result.sequence_id + 1) as f64);
        Ok(result)
    }

    fn view(&self) -> std::sync::RwLockReadGuard<'_, LedgerView> {
        self.shared.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entry(&self, sequence_id: u64) -> Option<LedgerEntry> {
        self.view().entries.get(sequence_id as usize).cloned()
    }

    /// Entries `from..=to`, clamped to the current height.
    pub fn range(&self, from: u64, to: Option<u64>) -> Vec<LedgerEntry> {
        let view = self.view();
        let len = view.entries.len() as u64;
        let end = to.map(|t| t.saturating_add(1).min(len)).unwrap_or(len);
        if from >= end {
            return Vec::new();
        }
        view.entries[from as usize..end as usize].to_vec()
    }

    /// The live (non-voided) decision for `message_id`.
    pub fn by_message(&self, identity: &IdentityId, message_id: &MessageId) -> Option<LedgerEntry> {
        let view = self.view();
        let seq = *view.by_message.get(&(identity.clone(), message_id.clone()))?;
        view.entries.get(seq as usize).cloned()
    }

    pub fn is_voided(&self, sequence_id: u64) -> bool {
        self.view().voided.contains(&sequence_id)
    }

    pub fn height(&self) -> u64 {
        self.view().entries.len() as u64
    }

    pub fn head(&self) -> Digest {
        self.view().entries.last().map(|e| e.entry_hash).unwrap_or_else(genesis_hash)
    }

    pub fn verify(&self, from: u64, to: Option<u64>) -> ChainReport {
        let key = self.public_key();
        verify_chain(&self.view().entries, from, to, Some(&key))
    }

    /// Proof over the published entries, with the file hash when file-backed.
    ///
    /// Appends publish while holding the writer core, so holding it here
    /// keeps the entry snapshot and the file image in step.
    pub fn proof(&self) -> ChainProof {
        let _core = self.shared.core.lock().unwrap_or_else(PoisonError::into_inner);
        let proof = ChainProof::from_entries(&self.view().entries);
        match self.path.as_ref().map(std::fs::read) {
            Some(Ok(bytes)) => proof.with_file_hash(&bytes),
            _ => proof,
        }
    }

    /// Visit every published entry in order.
    pub fn with_entries<R>(&self, f: impl FnOnce(&[LedgerEntry]) -> R) -> R {
        f(&self.view().entries)
    }

    pub fn public_key(&self) -> PublicKey {
        self.shared.signer.public_key()
    }

    pub fn is_fenced(&self) -> bool {
        self.shared.fenced.load(Ordering::SeqCst)
    }

    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }
}
