//! # LSM Storage Engine
//!
//! This module implements the **synchronous**, **crash-safe** core of the
//! store: the write path, the layered read path, memtable rotation, the
//! background flush worker, and manifest-driven recovery.
//!
//! ## Design Overview
//!
//! Data lives in three layers, queried newest-first:
//!
//! 1. **Active memtable** — an ordered in-memory map backed by a
//!    write-ahead log.
//! 2. **Immutable memtables** — frozen predecessors of the active
//!    memtable, queued oldest-first and awaiting flush.
//! 3. **SSTs** — immutable, block-structured on-disk tables, kept in
//!    creation order.
//!
//! A `put` appends a WAL record, then inserts into the active memtable.
//! When the incoming record would push the memtable past
//! [`StorageOptions::mem_table_size`], the memtable is frozen, pushed onto
//! the immutable queue, and replaced by a fresh memtable with a fresh WAL
//! (the new WAL is recorded in the manifest). A zero-length value is a
//! tombstone: it shadows older versions in every layer and is reported to
//! callers as absent.
//!
//! ## Background flushing
//!
//! A dedicated worker thread wakes every 50 ms and drains the oldest
//! immutable memtables into SSTs — up to
//! [`StorageOptions::max_number_of_memtable`] per run, the whole queue on
//! `flush_run(true)`. The commit step (manifest edit, SST list append,
//! queue removal) is a single exclusive-locked operation, so readers
//! crossing a flush see a consistent view either way. Flush I/O errors are
//! retried on the next tick and never abort the engine.
//!
//! ## Concurrency Model
//!
//! One engine-level `RwLock` protects the active memtable pointer, the
//! immutable queue, the SST list, the active WAL, the manifest, and the id
//! counter. `get` takes the shared mode; `put`, rotation, and the
//! commit/close paths take the exclusive mode. Each memtable additionally
//! carries its own lock (see [`crate::memtable`]).
//!
//! ## Lifecycle
//!
//! `Running → Stopping → Stopped`. `put`/`get`/`remove` reject with
//! [`EngineError::EngineStopped`] once `close` begins. `close` is
//! idempotent: it joins the worker, freezes the active memtable, and
//! drains every memtable to disk. Dropping the last handle without
//! `close` stops the worker and flushes file buffers but deliberately
//! does **not** drain memtables — recovery then comes from the WAL.

pub(crate) mod recovery;

#[cfg(test)]
mod tests;

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::manifest::{Manifest, ManifestError, VersionEdit};
use crate::memtable::{Memtable, MemtableError};
use crate::sstable::{Sst, SstError};
use crate::wal::{Wal, WalError, WalRecord};

/// Fixed wake-up interval of the background flush worker.
pub const FLUSH_TICK: Duration = Duration::from_millis(50);

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine has been closed; no further operations are accepted.
    #[error("engine stopped")]
    EngineStopped,

    /// Error originating from the memtable subsystem.
    #[error("Memtable error: {0}")]
    Memtable(#[from] MemtableError),

    /// Error originating from the WAL subsystem.
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    /// Error originating from the SST subsystem.
    #[error("SST error: {0}")]
    Sst(#[from] SstError),

    /// Error originating from the manifest subsystem.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal invariant violation (poisoned lock, unexpected state).
    #[error("Internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Options
// ------------------------------------------------------------------------------------------------

/// When WAL records are forced to stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncOption {
    /// Buffer WAL appends; drain and sync when the engine closes.
    SyncOnClose,

    /// Fsync after every appended record.
    SyncOnWrite,
}

/// Configuration for a [`Storage`] instance.
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Byte cap of the active memtable before rotation.
    pub mem_table_size: usize,

    /// Maximum number of immutable memtables drained per flush run.
    pub max_number_of_memtable: usize,

    /// Byte cap of one SST block.
    pub max_sst_block_size: usize,

    /// Directory holding `sst_{id}` files.
    pub sst_directory: PathBuf,

    /// Path of the manifest file.
    pub manifest_path: PathBuf,

    /// Directory holding `{id}.wal` files.
    pub wal_directory: PathBuf,

    /// WAL durability policy.
    pub wal_sync: WalSyncOption,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            mem_table_size: 4096,
            max_number_of_memtable: 2,
            max_sst_block_size: 1024,
            sst_directory: PathBuf::from("./sst"),
            manifest_path: PathBuf::from("./manifest.json"),
            wal_directory: PathBuf::from("./wal"),
            wal_sync: WalSyncOption::SyncOnClose,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Engine state
// ------------------------------------------------------------------------------------------------

const STATE_RUNNING: u8 = 0;
const STATE_STOPPING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Mutable engine state, guarded by the engine-level lock.
pub(crate) struct StorageInner {
    /// The one mutable memtable.
    pub(crate) active: Arc<Memtable>,

    /// Frozen memtables in insertion order (oldest first).
    pub(crate) immutables: Vec<Arc<Memtable>>,

    /// On-disk tables in creation order (oldest first).
    pub(crate) sstables: Vec<Arc<Sst>>,

    /// WAL of the active memtable; same id as the memtable.
    pub(crate) wal: Wal,

    /// Append-only version-edit log.
    pub(crate) manifest: Manifest,

    /// Highest table id handed out so far.
    pub(crate) latest_table_id: u64,
}

/// Shared body of the engine: state, options, worker plumbing.
pub(crate) struct StorageCore {
    pub(crate) inner: RwLock<StorageInner>,
    pub(crate) options: StorageOptions,

    /// Lifecycle: `Running → Stopping → Stopped`.
    state: AtomicU8,

    /// Worker exit condition; set with release, observed with acquire.
    stopped: AtomicBool,

    /// Serializes flush runs so the snapshot/commit prefix arithmetic
    /// cannot interleave between two callers.
    flush_lock: Mutex<()>,

    worker: Mutex<Option<JoinHandle<()>>>,
    stop_tx: Mutex<Option<Sender<()>>>,
}

/// The main storage engine handle.
///
/// Cheap to clone — all clones share the same engine through an internal
/// `Arc`.
pub struct Storage {
    core: Arc<StorageCore>,
}

impl Clone for Storage {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl Storage {
    /// Opens (or creates) an engine over the directories named in
    /// `options`.
    ///
    /// On a fresh directory the SST and WAL directories and the manifest
    /// are created. On an existing directory the manifest is replayed:
    /// live SSTs are opened in ascending id order and live WALs are
    /// replayed into frozen memtables (skipping WAL ids already covered by
    /// a level-0 SST of the same id). A fresh active memtable and WAL are
    /// then opened and recorded, and the background flush worker starts.
    pub fn open(options: StorageOptions) -> Result<Self, EngineError> {
        fs::create_dir_all(&options.sst_directory)?;
        fs::create_dir_all(&options.wal_directory)?;

        let (mut manifest, edits) = Manifest::recover(&options.manifest_path)?;
        let recovered = recovery::replay(&edits, &options)?;

        let mut latest_table_id = recovered.latest_table_id;

        // Fresh active memtable + WAL, recorded in the manifest.
        let (active, wal) = allocate_active(&mut manifest, &mut latest_table_id, &options)?;

        info!(
            sstables = recovered.sstables.len(),
            immutables = recovered.immutables.len(),
            active_id = active.id(),
            "storage opened"
        );

        let core = Arc::new(StorageCore {
            inner: RwLock::new(StorageInner {
                active,
                immutables: recovered.immutables,
                sstables: recovered.sstables,
                wal,
                manifest,
                latest_table_id,
            }),
            options,
            state: AtomicU8::new(STATE_RUNNING),
            stopped: AtomicBool::new(false),
            flush_lock: Mutex::new(()),
            worker: Mutex::new(None),
            stop_tx: Mutex::new(None),
        });

        let (tx, rx) = channel::bounded::<()>(1);
        let handle = spawn_flush_worker(Arc::downgrade(&core), rx)?;

        *lock_plain(&core.worker)? = Some(handle);
        *lock_plain(&core.stop_tx)? = Some(tx);

        Ok(Self { core })
    }

    /// Inserts or overwrites `key`.
    ///
    /// The record is appended to the WAL before it becomes visible in
    /// memory; a WAL failure leaves the memtable untouched. If the record
    /// would push the active memtable past its cap, the memtable is
    /// rotated first and the record lands in the fresh one.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), EngineError> {
        self.ensure_running()?;
        let mut inner = self.core.write_inner()?;
        // Re-check under the lock: a concurrent close may have won the race.
        self.ensure_running()?;

        let record_size = key.len() + value.len();
        if record_size + inner.active.size()? > self.core.options.mem_table_size {
            rotate_active(&mut inner, &self.core.options)?;
        }

        let record = WalRecord {
            key: key.clone(),
            value: value.clone(),
        };
        match self.core.options.wal_sync {
            WalSyncOption::SyncOnWrite => inner.wal.add_record_and_sync(&record)?,
            WalSyncOption::SyncOnClose => inner.wal.add_record(&record)?,
        }

        inner.active.put(key, value)?;
        Ok(())
    }

    /// Deletes `key` by writing a zero-length tombstone.
    pub fn remove(&self, key: Vec<u8>) -> Result<(), EngineError> {
        self.put(key, Vec::new())
    }

    /// Looks up `key` across all layers, newest first.
    ///
    /// Returns `Ok(None)` both for a key that was never written and for a
    /// key whose newest version is a tombstone.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        self.ensure_running()?;
        let inner = self.core.read_inner()?;

        if let Some(value) = inner.active.get(key)? {
            return Ok(live_value(value));
        }

        for memtable in inner.immutables.iter().rev() {
            if let Some(value) = memtable.get(key)? {
                return Ok(live_value(value));
            }
        }

        for sst in inner.sstables.iter().rev() {
            if let Some(value) = sst.get(key)? {
                return Ok(live_value(value));
            }
        }

        Ok(None)
    }

    /// Drains immutable memtables to SSTs.
    ///
    /// With `flush_all` the whole queue is drained; otherwise at most
    /// [`StorageOptions::max_number_of_memtable`] of the oldest entries.
    /// The worker invokes this on every tick; callers may invoke it for a
    /// synchronous flush.
    pub fn flush_run(&self, flush_all: bool) -> Result<(), EngineError> {
        self.core.flush_run(flush_all)
    }

    /// The highest table id handed out so far.
    pub fn get_current_table_id(&self) -> Result<u64, EngineError> {
        Ok(self.core.read_inner()?.latest_table_id)
    }

    /// Gracefully shuts the engine down.
    ///
    /// Joins the flush worker, freezes the active memtable, and drains
    /// every memtable to disk. Idempotent: once a close has begun, later
    /// calls return `Ok(())` immediately.
    pub fn close(&self) -> Result<(), EngineError> {
        if self
            .core
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_STOPPING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Ok(());
        }

        self.core.stop_worker();

        {
            let mut inner = self.core.write_inner()?;
            inner.wal.sync()?;
            inner.wal.close()?;
            inner.active.freeze()?;
            let active = Arc::clone(&inner.active);
            inner.immutables.push(active);
        }

        self.core.flush_run(true)?;

        self.core.state.store(STATE_STOPPED, Ordering::SeqCst);
        info!("storage closed");
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.core.state.load(Ordering::SeqCst) != STATE_RUNNING {
            return Err(EngineError::EngineStopped);
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Core internals
// ------------------------------------------------------------------------------------------------

impl StorageCore {
    fn read_inner(&self) -> Result<RwLockReadGuard<'_, StorageInner>, EngineError> {
        self.inner
            .read()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))
    }

    fn write_inner(&self) -> Result<RwLockWriteGuard<'_, StorageInner>, EngineError> {
        self.inner
            .write()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))
    }

    /// One flush pass: snapshot under the shared lock, write SSTs with no
    /// lock held, commit under the exclusive lock.
    fn flush_run(&self, flush_all: bool) -> Result<(), EngineError> {
        let _serial = self
            .flush_lock
            .lock()
            .map_err(|_| EngineError::Internal("flush mutex poisoned".into()))?;

        let to_flush: Vec<Arc<Memtable>> = {
            let inner = self.read_inner()?;
            let take = if flush_all {
                inner.immutables.len()
            } else {
                inner.immutables.len().min(self.options.max_number_of_memtable)
            };
            inner.immutables.iter().take(take).cloned().collect()
        };

        if to_flush.is_empty() {
            return Ok(());
        }

        // SST writes happen outside the engine lock; an error here leaves
        // the immutable queue intact for the next attempt.
        let mut flushed = Vec::with_capacity(to_flush.len());
        for memtable in &to_flush {
            let sst = memtable.flush(&self.options.sst_directory, self.options.max_sst_block_size)?;
            flushed.push(Arc::new(sst));
        }

        {
            let mut inner = self.write_inner()?;
            let mut edit = VersionEdit::default();
            for memtable in &to_flush {
                edit.add_new_file(0, memtable.id());
            }
            inner.manifest.add_record(&edit)?;
            inner.sstables.extend(flushed);
            inner.immutables.drain(..to_flush.len());
        }

        // The manifest now covers these ids with SSTs, so their WALs are
        // redundant. Removal is best-effort.
        for memtable in &to_flush {
            let wal_path = self
                .options
                .wal_directory
                .join(format!("{}.wal", memtable.id()));
            if let Err(e) = fs::remove_file(&wal_path) {
                warn!(path = %wal_path.display(), error = %e, "flushed WAL removal failed");
            }
        }

        debug!(flushed = to_flush.len(), "flush committed");
        Ok(())
    }

    /// Signals the worker to exit and joins it. Safe to call twice.
    fn stop_worker(&self) {
        self.stopped.store(true, Ordering::Release);
        if let Ok(mut tx) = self.stop_tx.lock() {
            // Dropping the sender disconnects the channel and wakes the
            // worker immediately.
            tx.take();
        }
        if let Ok(mut worker) = self.worker.lock()
            && let Some(handle) = worker.take()
            && handle.join().is_err()
        {
            warn!("flush worker panicked");
        }
    }
}

impl Drop for StorageCore {
    fn drop(&mut self) {
        // Last handle gone without close(): stop the worker, but leave the
        // memtables to WAL recovery.
        self.stop_worker();
    }
}

// ------------------------------------------------------------------------------------------------
// Rotation
// ------------------------------------------------------------------------------------------------

/// Freezes the active memtable, pushes it onto the immutable queue, and
/// installs a fresh memtable + WAL (recorded in the manifest).
fn rotate_active(inner: &mut StorageInner, options: &StorageOptions) -> Result<(), EngineError> {
    inner.active.freeze()?;
    inner.immutables.push(Arc::clone(&inner.active));

    let (active, wal) =
        allocate_active(&mut inner.manifest, &mut inner.latest_table_id, options)?;

    let mut old_wal = std::mem::replace(&mut inner.wal, wal);
    old_wal.close()?;
    inner.active = active;

    debug!(
        frozen = inner.immutables.last().map(|m| m.id()),
        active_id = inner.active.id(),
        queue = inner.immutables.len(),
        "active memtable rotated"
    );
    Ok(())
}

/// Allocates the next table id and opens the memtable + WAL pair for it,
/// appending the new-WAL manifest edit.
fn allocate_active(
    manifest: &mut Manifest,
    latest_table_id: &mut u64,
    options: &StorageOptions,
) -> Result<(Arc<Memtable>, Wal), EngineError> {
    *latest_table_id += 1;
    let id = *latest_table_id;

    let memtable = Arc::new(Memtable::new(id, options.mem_table_size));
    let wal = Wal::create(options.wal_directory.join(format!("{id}.wal")))?;

    let mut edit = VersionEdit::default();
    edit.add_new_wal(id);
    manifest.add_record(&edit)?;

    Ok((memtable, wal))
}

// ------------------------------------------------------------------------------------------------
// Background flush worker
// ------------------------------------------------------------------------------------------------

/// Spawns the flush worker loop.
///
/// The worker holds only a `Weak` reference: it cannot keep the engine
/// alive, and a failed upgrade doubles as an exit signal. The stop flag is
/// the authoritative exit condition; the channel exists so `close` can cut
/// the 50 ms sleep short.
fn spawn_flush_worker(
    core: Weak<StorageCore>,
    stop_rx: Receiver<()>,
) -> Result<JoinHandle<()>, EngineError> {
    std::thread::Builder::new()
        .name("basalt-flush".into())
        .spawn(move || {
            loop {
                match stop_rx.recv_timeout(FLUSH_TICK) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }

                let Some(core) = core.upgrade() else { break };
                if core.stopped.load(Ordering::Acquire) {
                    break;
                }

                if let Err(e) = core.flush_run(false) {
                    warn!(error = %e, "background flush failed; retrying next tick");
                }
            }
            debug!("flush worker exited");
        })
        .map_err(EngineError::Io)
}

// ------------------------------------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------------------------------------

/// Maps a stored value onto the caller-visible result: a zero-length
/// value is a tombstone and reads as absent.
fn live_value(value: Vec<u8>) -> Option<Vec<u8>> {
    if value.is_empty() { None } else { Some(value) }
}

fn lock_plain<'a, T>(mutex: &'a Mutex<T>) -> Result<std::sync::MutexGuard<'a, T>, EngineError> {
    mutex
        .lock()
        .map_err(|_| EngineError::Internal("mutex poisoned".into()))
}
