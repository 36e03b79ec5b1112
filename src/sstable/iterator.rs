//! Ordered scans over one block or one whole table.
//!
//! Both iterators implement [`StorageIterator`]: an explicit validity
//! flag, `next` to advance, and `key`/`value` accessors that return empty
//! byte strings once the cursor runs off the end. Neither rewinds —
//! construct a new iterator to restart.

use std::sync::Arc;

use tracing::warn;

use crate::iterator::StorageIterator;
use crate::sstable::block::Block;
use crate::sstable::Sst;

// ------------------------------------------------------------------------------------------------
// BlockIterator
// ------------------------------------------------------------------------------------------------

/// Cursor over the entries of one decoded block, in key order.
#[derive(Debug)]
pub struct BlockIterator {
    block: Arc<Block>,
    idx: usize,
}

impl BlockIterator {
    /// Positions a new cursor on the block's first entry.
    pub fn new(block: Arc<Block>) -> Self {
        Self { block, idx: 0 }
    }
}

impl StorageIterator for BlockIterator {
    fn is_valid(&self) -> bool {
        self.idx < self.block.entry_count()
    }

    fn next(&mut self) {
        if self.is_valid() {
            self.idx += 1;
        }
    }

    fn key(&self) -> Vec<u8> {
        if !self.is_valid() {
            return Vec::new();
        }
        self.block
            .get_entry(self.idx)
            .map(|entry| entry.key)
            .unwrap_or_default()
    }

    fn value(&self) -> Vec<u8> {
        if !self.is_valid() {
            return Vec::new();
        }
        self.block
            .get_entry(self.idx)
            .map(|entry| entry.value)
            .unwrap_or_default()
    }
}

// ------------------------------------------------------------------------------------------------
// SstIterator
// ------------------------------------------------------------------------------------------------

/// Cursor over every entry of one table, chaining its blocks in order.
///
/// Blocks are read from disk lazily as the cursor crosses block
/// boundaries. A read failure mid-scan invalidates the iterator (the
/// condition is logged); point reads surface the same failure through
/// [`Sst::get`], which is the error-reporting path.
#[derive(Debug)]
pub struct SstIterator {
    sst: Arc<Sst>,
    block_iter: Option<BlockIterator>,
    block_idx: usize,
}

impl SstIterator {
    /// Positions a new cursor on the table's first entry.
    pub fn new(sst: Arc<Sst>) -> Self {
        let mut iter = Self {
            sst,
            block_iter: None,
            block_idx: 0,
        };
        iter.load_current_block();
        iter
    }

    /// Loads the block at `block_idx`, invalidating the iterator if the
    /// read fails or the table is exhausted.
    fn load_current_block(&mut self) {
        self.block_iter = None;
        if self.block_idx >= self.sst.block_count() {
            return;
        }
        match self.sst.read_block(self.block_idx) {
            Ok(block) => self.block_iter = Some(BlockIterator::new(Arc::new(block))),
            Err(e) => {
                warn!(
                    path = %self.sst.path().display(),
                    block = self.block_idx,
                    error = %e,
                    "table scan aborted by block read failure"
                );
                self.block_idx = self.sst.block_count();
            }
        }
    }
}

impl StorageIterator for SstIterator {
    fn is_valid(&self) -> bool {
        self.block_iter
            .as_ref()
            .is_some_and(|iter| iter.is_valid())
    }

    fn next(&mut self) {
        let Some(iter) = self.block_iter.as_mut() else {
            return;
        };
        iter.next();
        if !iter.is_valid() {
            self.block_idx += 1;
            self.load_current_block();
        }
    }

    fn key(&self) -> Vec<u8> {
        self.block_iter
            .as_ref()
            .map(|iter| iter.key())
            .unwrap_or_default()
    }

    fn value(&self) -> Vec<u8> {
        self.block_iter
            .as_ref()
            .map(|iter| iter.value())
            .unwrap_or_default()
    }
}
