//! # Memtable Module
//!
//! The ordered in-memory write buffer of the storage engine.
//!
//! ## Design Invariants
//!
//! - Entries are strictly key-ordered with at most one value per key;
//!   overwrites replace in place.
//! - `approximate_size` equals the sum of `key.len + value.len` over the
//!   resident distinct keys at every externally observable point, with
//!   overwrites adjusting by the value-length delta.
//! - The status transitions exactly once, `Mutable → Immutable`, on
//!   [`Memtable::freeze`]. A write that reaches a frozen memtable fails
//!   with [`MemtableError::WriteToImmutable`] — under the engine's own
//!   locking this is unreachable, so it is reported as the invariant
//!   violation it is.
//! - A zero-length value is a tombstone: it occupies an entry and shadows
//!   older versions, and the engine never surfaces it to callers.
//!
//! ## Flush Semantics
//!
//! [`Memtable::flush`] writes the entries in key order into a fresh SST at
//! `{sst_dir}/sst_{id}` — the memtable's id becomes the table's id. Only a
//! frozen memtable may be flushed, and the engine guarantees the flush is
//! not concurrent with any other operation on that memtable.
//!
//! ## Recovery
//!
//! [`Memtable::recover_from_wal`] replays a WAL in file order into a fresh,
//! still-mutable memtable. Duplicate keys collapse to the last occurrence,
//! exactly as if the original writes had been reapplied.


use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::iterator::StorageIterator;
use crate::sstable::{Sst, SstBuilder, SstError};
use crate::wal::{WalError, read_wal};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by memtable operations.
#[derive(Debug, Error)]
pub enum MemtableError {
    /// A write reached a frozen memtable. Internal invariant violation.
    #[error("write to immutable memtable {id}")]
    WriteToImmutable {
        /// Id of the offending memtable.
        id: u64,
    },

    /// Underlying WAL failure during recovery replay.
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    /// Underlying SST failure during flush.
    #[error("SST error: {0}")]
    Sst(#[from] SstError),

    /// Internal invariant violation or poisoned lock.
    #[error("Internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Memtable Core
// ------------------------------------------------------------------------------------------------

/// Lifecycle state of a memtable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemtableStatus {
    /// Accepting writes.
    Mutable,

    /// Frozen: read-only, awaiting flush.
    Immutable,
}

/// Contents and bookkeeping protected by the memtable's own lock.
struct MemtableInner {
    /// Ordered key → value map. Tombstones are empty values.
    map: BTreeMap<Vec<u8>, Vec<u8>>,

    /// Running sum of `key.len + value.len` over resident distinct keys.
    approximate_size: usize,

    /// One-way lifecycle state.
    status: MemtableStatus,
}

/// The ordered in-memory write buffer.
///
/// # Concurrency
///
/// A readers-writer lock protects the map, the size accounting, and the
/// status. `get` and `size` take the shared mode; `put` and `freeze` take
/// the exclusive mode. The lock is independent of the engine lock and is
/// held only for the duration of a single operation.
pub struct Memtable {
    /// Monotonically assigned id, shared with the WAL file name and —
    /// after flush — the SST file name.
    id: u64,

    /// Byte cap supplied at creation. The engine performs the rotation
    /// test; the memtable itself never rejects on size.
    cap_size: usize,

    inner: RwLock<MemtableInner>,
}

impl Memtable {
    /// Creates an empty, mutable memtable.
    pub fn new(id: u64, cap_size: usize) -> Self {
        Self {
            id,
            cap_size,
            inner: RwLock::new(MemtableInner {
                map: BTreeMap::new(),
                approximate_size: 0,
                status: MemtableStatus::Mutable,
            }),
        }
    }

    /// Rebuilds a memtable by replaying the WAL at `wal_path` in file
    /// order. The result is still mutable; duplicate keys collapse to
    /// their last occurrence.
    pub fn recover_from_wal(
        wal_path: impl AsRef<Path>,
        id: u64,
        cap_size: usize,
    ) -> Result<Self, MemtableError> {
        let records = read_wal(&wal_path)?;
        let memtable = Self::new(id, cap_size);

        let replayed = records.len();
        for record in records {
            memtable.put(record.key, record.value)?;
        }

        info!(
            id,
            records = replayed,
            size = memtable.size()?,
            "memtable recovered from WAL"
        );

        Ok(memtable)
    }

    /// Id of this memtable.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Byte cap supplied at creation.
    pub fn cap_size(&self) -> usize {
        self.cap_size
    }

    /// Looks up `key`, returning the stored value — which may be an empty
    /// tombstone — or `None` when the key is not resident.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, MemtableError> {
        let inner = self.read_inner()?;
        Ok(inner.map.get(key).cloned())
    }

    /// Inserts or overwrites `key`, adjusting the size accounting.
    ///
    /// Fails with [`MemtableError::WriteToImmutable`] once the memtable
    /// has been frozen.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), MemtableError> {
        let mut inner = self.write_inner()?;

        if inner.status == MemtableStatus::Immutable {
            return Err(MemtableError::WriteToImmutable { id: self.id });
        }

        trace!(id = self.id, key_len = key.len(), value_len = value.len(), "memtable put");

        match inner.map.get(&key).map(Vec::len) {
            Some(old_len) => {
                inner.approximate_size = inner.approximate_size - old_len + value.len();
            }
            None => {
                inner.approximate_size += key.len() + value.len();
            }
        }
        inner.map.insert(key, value);

        Ok(())
    }

    /// Current `approximate_size` in bytes.
    pub fn size(&self) -> Result<usize, MemtableError> {
        Ok(self.read_inner()?.approximate_size)
    }

    /// Number of resident distinct keys.
    pub fn len(&self) -> Result<usize, MemtableError> {
        Ok(self.read_inner()?.map.len())
    }

    /// True when no keys are resident.
    pub fn is_empty(&self) -> Result<bool, MemtableError> {
        Ok(self.read_inner()?.map.is_empty())
    }

    /// Transitions `Mutable → Immutable`. The transition happens exactly
    /// once; freezing twice is an engine bug and fails.
    pub fn freeze(&self) -> Result<(), MemtableError> {
        let mut inner = self.write_inner()?;
        if inner.status == MemtableStatus::Immutable {
            return Err(MemtableError::Internal(format!(
                "memtable {} frozen twice",
                self.id
            )));
        }
        inner.status = MemtableStatus::Immutable;

        debug!(id = self.id, size = inner.approximate_size, "memtable frozen");
        Ok(())
    }

    /// True once [`Memtable::freeze`] has run.
    pub fn is_immutable(&self) -> Result<bool, MemtableError> {
        Ok(self.read_inner()?.status == MemtableStatus::Immutable)
    }

    /// Key-ordered iterator over a frozen memtable's entries.
    ///
    /// Only produced from a frozen memtable: the snapshot it walks is
    /// guaranteed final.
    pub fn iter(&self) -> Result<ImmutableMemtableIterator, MemtableError> {
        let inner = self.read_inner()?;
        if inner.status != MemtableStatus::Immutable {
            return Err(MemtableError::Internal(format!(
                "iterator requested on mutable memtable {}",
                self.id
            )));
        }

        Ok(ImmutableMemtableIterator {
            entries: inner
                .map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            idx: 0,
        })
    }

    /// Drains this frozen memtable into a fresh SST at
    /// `{sst_dir}/sst_{id}` and returns the ready-to-read handle.
    pub fn flush(
        &self,
        sst_dir: impl AsRef<Path>,
        block_size: usize,
    ) -> Result<Sst, MemtableError> {
        let sst_path = sst_dir.as_ref().join(format!("sst_{}", self.id));

        let mut builder = SstBuilder::new(&sst_path, block_size)?;
        let mut iter = self.iter()?;
        while iter.is_valid() {
            builder.add_entry(&iter.key(), &iter.value())?;
            iter.next();
        }
        let sst = builder.build()?;

        info!(
            id = self.id,
            path = %sst_path.display(),
            blocks = sst.block_count(),
            "memtable flushed"
        );

        Ok(sst)
    }

    fn read_inner(&self) -> Result<std::sync::RwLockReadGuard<'_, MemtableInner>, MemtableError> {
        self.inner
            .read()
            .map_err(|_| MemtableError::Internal("RwLock poisoned".into()))
    }

    fn write_inner(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemtableInner>, MemtableError> {
        self.inner
            .write()
            .map_err(|_| MemtableError::Internal("RwLock poisoned".into()))
    }
}

// ------------------------------------------------------------------------------------------------
// ImmutableMemtableIterator
// ------------------------------------------------------------------------------------------------

/// Cursor over the entries of a frozen memtable, in key order.
#[derive(Debug)]
pub struct ImmutableMemtableIterator {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    idx: usize,
}

impl StorageIterator for ImmutableMemtableIterator {
    fn is_valid(&self) -> bool {
        self.idx < self.entries.len()
    }

    fn next(&mut self) {
        if self.is_valid() {
            self.idx += 1;
        }
    }

    fn key(&self) -> Vec<u8> {
        self.entries
            .get(self.idx)
            .map(|(k, _)| k.clone())
            .unwrap_or_default()
    }

    fn value(&self) -> Vec<u8> {
        self.entries
            .get(self.idx)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }
}
