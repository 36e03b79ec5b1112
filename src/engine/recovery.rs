//! Manifest-driven state reconstruction.
//!
//! Recovery folds the version edits in manifest order into two live sets —
//! WAL ids and per-level SST file ids — then materializes them from disk:
//! SSTs are opened in ascending id order, and each uncovered WAL is
//! replayed into a frozen memtable pushed onto the immutable queue, also
//! in ascending id order. A WAL id already covered by a level-0 SST of the
//! same id is skipped: the flush that produced the SST committed before
//! the WAL file was removed, so its contents are fully on disk.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{info, warn};

use crate::engine::{EngineError, StorageOptions};
use crate::manifest::VersionEdit;
use crate::memtable::Memtable;
use crate::sstable::Sst;

/// Engine state rebuilt from the manifest and the surviving files.
pub(crate) struct RecoveredState {
    /// Replayed memtables, frozen, oldest first.
    pub(crate) immutables: Vec<Arc<Memtable>>,

    /// Opened tables, oldest first.
    pub(crate) sstables: Vec<Arc<Sst>>,

    /// `max(max SST id, max WAL id) + 1`, or 0 when the manifest is empty.
    pub(crate) latest_table_id: u64,
}

/// Folds `edits` and loads the referenced files.
pub(crate) fn replay(
    edits: &[VersionEdit],
    options: &StorageOptions,
) -> Result<RecoveredState, EngineError> {
    let mut live_wals: BTreeSet<u64> = BTreeSet::new();
    let mut live_files: BTreeMap<u64, BTreeSet<u64>> = BTreeMap::new();

    for edit in edits {
        for file in &edit.new_files {
            live_files.entry(file.level).or_default().insert(file.file_id);
        }
        if let Some(wal) = edit.wal_addition {
            live_wals.insert(wal.file_id);
        }
    }

    for level in live_files.keys() {
        if *level != 0 {
            warn!(level, "manifest names a non-zero level; only level 0 is loaded");
        }
    }

    let level0 = live_files.remove(&0).unwrap_or_default();

    let mut sstables = Vec::with_capacity(level0.len());
    for id in &level0 {
        let path = options.sst_directory.join(format!("sst_{id}"));
        sstables.push(Arc::new(Sst::open(&path)?));
    }

    let mut immutables = Vec::new();
    for wal_id in &live_wals {
        if level0.contains(wal_id) {
            // Flushed before the crash; the SST holds this WAL's contents.
            continue;
        }
        let wal_path = options.wal_directory.join(format!("{wal_id}.wal"));
        let memtable = Memtable::recover_from_wal(&wal_path, *wal_id, options.mem_table_size)?;
        memtable.freeze()?;
        immutables.push(Arc::new(memtable));
    }

    let max_id = level0.last().copied().max(live_wals.last().copied());
    let latest_table_id = max_id.map_or(0, |id| id + 1);

    info!(
        sstables = sstables.len(),
        replayed_wals = immutables.len(),
        latest_table_id,
        "recovery replay complete"
    );

    Ok(RecoveredState {
        immutables,
        sstables,
        latest_table_id,
    })
}
