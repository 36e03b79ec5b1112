//! Streaming SST construction.
//!
//! [`SstBuilder`] accepts entries in non-decreasing key order, packs them
//! into blocks capped at a configured byte size, and finalizes the file
//! with the metadata + trailer layout described in the
//! [module docs](super).

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::encoding::encode_u64;
use crate::io::FileWriter;
use crate::sstable::block::{Block, BlockBuilder};
use crate::sstable::{BlockMetadata, Sst, SstError};

/// Builds one SST file from an ordered entry stream.
///
/// The builder does not re-sort: callers feed keys in non-decreasing
/// order (the memtable iterator already does). An entry larger than the
/// block cap still lands in a block of its own rather than being
/// rejected.
#[derive(Debug)]
pub struct SstBuilder {
    writer: FileWriter,
    path: PathBuf,
    block_size: usize,
    block: BlockBuilder,
    metadata: Vec<BlockMetadata>,
}

impl SstBuilder {
    /// Opens `path` for writing (truncating any previous file) with the
    /// given per-block byte cap.
    pub fn new(path: impl AsRef<Path>, block_size: usize) -> Result<Self, SstError> {
        let path = path.as_ref().to_path_buf();
        let writer = FileWriter::create(&path)?;
        Ok(Self {
            writer,
            path,
            block_size,
            block: BlockBuilder::new(),
            metadata: Vec::new(),
        })
    }

    /// Appends one entry.
    ///
    /// If the entry would push the current block past the block cap, the
    /// block is written out first and a fresh one started.
    pub fn add_entry(&mut self, key: &[u8], value: &[u8]) -> Result<(), SstError> {
        let entry_len = Block::entry_encoded_len(key, value);
        if !self.block.is_empty() && entry_len + self.block.get_size() > self.block_size {
            self.write_block()?;
        }
        self.block.add_entry(key, value)
    }

    /// Flushes the final block, writes the metadata records and trailer,
    /// syncs, and reopens the finished file as a readable [`Sst`].
    pub fn build(mut self) -> Result<Sst, SstError> {
        if !self.block.is_empty() {
            self.write_block()?;
        }

        let mut metadata_offsets = Vec::with_capacity(self.metadata.len());
        for meta in &self.metadata {
            metadata_offsets.push(self.writer.file_size());
            let mut buf = Vec::with_capacity(meta.encoded_len());
            meta.encode(&mut buf)?;
            self.writer.append(&buf)?;
        }

        let mut trailer = Vec::with_capacity((metadata_offsets.len() + 1) * 8);
        for offset in &metadata_offsets {
            encode_u64(*offset, &mut trailer);
        }
        encode_u64(self.metadata.len() as u64, &mut trailer);
        self.writer.append_and_sync(&trailer)?;
        self.writer.close()?;

        debug!(
            path = %self.path.display(),
            blocks = self.metadata.len(),
            bytes = self.writer.file_size(),
            "table built"
        );

        Sst::open(&self.path)
    }

    /// Finalizes the current block into the file and records its metadata.
    fn write_block(&mut self) -> Result<(), SstError> {
        let block = std::mem::replace(&mut self.block, BlockBuilder::new()).build();
        let encoded = block.encode();

        let meta = BlockMetadata {
            offset: self.writer.file_size(),
            size: encoded.len() as u64,
            first_key: block.first_key()?,
            last_key: block.last_key()?,
        };

        self.writer.append(&encoded)?;
        self.metadata.push(meta);
        Ok(())
    }

    /// Block metadata accumulated so far. Exposed for tests.
    pub fn block_metadata(&self) -> &[BlockMetadata] {
        &self.metadata
    }
}
