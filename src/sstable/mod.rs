//! Sorted String Table (SST) Module
//!
//! This module implements the **immutable**, **block-structured**, on-disk
//! tables produced by memtable flushes. Each SST stores key-ordered entries
//! across fixed-capacity blocks, with a resident block-metadata index for
//! point lookups and a fixed trailer for self-describing recovery.
//!
//! # On-disk layout
//!
//! ```text
//! [BLOCK_0]...[BLOCK_n-1]
//! [BLOCK_META_0]...[BLOCK_META_n-1]
//! [META_OFFSET_0_U64]...[META_OFFSET_n-1_U64]
//! [BLOCK_COUNT_U64]
//! ```
//!
//! - **Block** — `payload | offsets | entry_count_u16` (see [`block`]).
//! - **Block metadata** — `block_offset_u64 | block_size_u64 |
//!   first_key_len_u16 | first_key | last_key_len_u16 | last_key`.
//! - **Trailer** — one `u64` metadata offset per block, then the block
//!   count as the final 8 bytes of the file.
//!
//! All integers are big-endian.
//!
//! # Sub-modules
//!
//! - [`block`] — [`BlockBuilder`] and [`Block`]: one block's encode,
//!   decode, and point lookup.
//! - [`builder`] — [`SstBuilder`]: streams ordered entries into a file.
//! - [`iterator`] — [`BlockIterator`] and [`SstIterator`]: ordered scans.
//!
//! # Concurrency model
//!
//! SSTs are never mutated after creation, so reads need no locking: the
//! reader keeps only block metadata resident and fetches block bodies on
//! demand through positional reads, letting any number of threads share
//! one handle.

pub mod block;
pub mod builder;
pub mod iterator;

#[cfg(test)]
mod tests;

pub use block::{Block, BlockBuilder, BlockEntry};
pub use builder::SstBuilder;
pub use iterator::{BlockIterator, SstIterator};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::encoding::{
    self, EncodingError, U16_SIZE, U64_SIZE, decode_len_prefixed, decode_u64, encode_u64,
};
use crate::io::FileReader;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by SST operations (build, open, read).
#[derive(Debug, Error)]
pub enum SstError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding / decoding error.
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Structural decoding failure: impossible offsets, entry counts
    /// inconsistent with payload lengths, truncated trailers.
    #[error("malformed table: {0}")]
    MalformedInput(String),

    /// Block entry index beyond the offsets vector.
    #[error("entry index {index} out of bounds ({count} entries)")]
    OutOfBounds {
        /// Requested entry index.
        index: usize,
        /// Number of entries actually present.
        count: usize,
    },
}

// ------------------------------------------------------------------------------------------------
// Block metadata
// ------------------------------------------------------------------------------------------------

/// Trailer record describing one block: its position in the file and the
/// key range it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMetadata {
    /// Byte offset of the encoded block within the SST file.
    pub offset: u64,

    /// Encoded size of the block in bytes.
    pub size: u64,

    /// Key of the block's first entry.
    pub first_key: Vec<u8>,

    /// Key of the block's last entry.
    pub last_key: Vec<u8>,
}

impl BlockMetadata {
    /// Appends the encoded metadata record to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        encode_u64(self.offset, buf);
        encode_u64(self.size, buf);
        encoding::encode_len_prefixed(&self.first_key, buf)?;
        encoding::encode_len_prefixed(&self.last_key, buf)?;
        Ok(())
    }

    /// Decodes one metadata record from the front of `buf`, returning the
    /// record and the bytes consumed.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut cursor = 0;
        let offset = decode_u64(&buf[cursor..])?;
        cursor += U64_SIZE;
        let size = decode_u64(&buf[cursor..])?;
        cursor += U64_SIZE;
        let (first_key, n) = decode_len_prefixed(&buf[cursor..])?;
        cursor += n;
        let (last_key, n) = decode_len_prefixed(&buf[cursor..])?;
        cursor += n;
        Ok((
            Self {
                offset,
                size,
                first_key,
                last_key,
            },
            cursor,
        ))
    }

    /// Encoded size of this record in bytes.
    pub fn encoded_len(&self) -> usize {
        U64_SIZE * 2 + U16_SIZE + self.first_key.len() + U16_SIZE + self.last_key.len()
    }
}

// ------------------------------------------------------------------------------------------------
// Sst — immutable reader
// ------------------------------------------------------------------------------------------------

/// Handle to one on-disk SST.
///
/// Opening scans only the trailer: the block count, the metadata offsets,
/// and the metadata records themselves. Block bodies stay on disk and are
/// read on demand, so an arbitrarily large table costs a few hundred bytes
/// of memory per block, not its full size.
#[derive(Debug)]
pub struct Sst {
    reader: FileReader,
    path: PathBuf,
    metadata: Vec<BlockMetadata>,
}

impl Sst {
    /// Opens an SST and loads its block metadata into memory.
    ///
    /// A table whose trailer records zero blocks is valid; every lookup on
    /// it is absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SstError> {
        let path = path.as_ref().to_path_buf();
        let reader = FileReader::open(&path)?;
        let file_size = reader.file_size();

        if file_size < U64_SIZE as u64 {
            return Err(SstError::MalformedInput(format!(
                "file of {file_size} bytes cannot hold a trailer"
            )));
        }

        let count_bytes = reader.read_at(file_size - U64_SIZE as u64, U64_SIZE)?;
        let block_count = decode_u64(&count_bytes)? as usize;

        if block_count == 0 {
            debug!(path = %path.display(), "opened empty table");
            return Ok(Self {
                reader,
                path,
                metadata: Vec::new(),
            });
        }

        let offsets_len = block_count
            .checked_mul(U64_SIZE)
            .ok_or_else(|| SstError::MalformedInput("block count overflows trailer".into()))?;
        let trailer_len = offsets_len + U64_SIZE;
        if (file_size as usize) < trailer_len {
            return Err(SstError::MalformedInput(format!(
                "block count {block_count} inconsistent with file size {file_size}"
            )));
        }

        let offsets_start = file_size - trailer_len as u64;
        let offsets_bytes = reader.read_at(offsets_start, offsets_len)?;

        let mut metadata_offsets = Vec::with_capacity(block_count);
        for idx in 0..block_count {
            metadata_offsets.push(decode_u64(&offsets_bytes[idx * U64_SIZE..])?);
        }

        let metadata_start = metadata_offsets[0];
        if metadata_start >= offsets_start {
            return Err(SstError::MalformedInput(
                "metadata region overlaps trailer".into(),
            ));
        }

        let metadata_bytes =
            reader.read_at(metadata_start, (offsets_start - metadata_start) as usize)?;

        let mut metadata = Vec::with_capacity(block_count);
        let mut cursor = 0usize;
        for _ in 0..block_count {
            let (record, consumed) = BlockMetadata::decode(&metadata_bytes[cursor..])?;
            cursor += consumed;
            metadata.push(record);
        }

        debug!(
            path = %path.display(),
            blocks = block_count,
            size = file_size,
            "table opened"
        );

        Ok(Self {
            reader,
            path,
            metadata,
        })
    }

    /// Point lookup.
    ///
    /// Binary-searches the block metadata for the block whose
    /// `[first_key, last_key]` range contains `key`, reads that block, and
    /// delegates to [`Block::get`]. Returns the stored value — which may
    /// be an empty tombstone — or `None` when no block covers the key.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SstError> {
        let idx = self
            .metadata
            .partition_point(|meta| meta.last_key.as_slice() < key);

        let Some(meta) = self.metadata.get(idx) else {
            return Ok(None);
        };
        if meta.first_key.as_slice() > key {
            return Ok(None);
        }

        trace!(block = idx, "table lookup descends into block");
        let block = self.read_block(idx)?;
        block.get(key)
    }

    /// Reads and decodes the block at `idx`.
    pub fn read_block(&self, idx: usize) -> Result<Block, SstError> {
        let meta = self.metadata.get(idx).ok_or(SstError::OutOfBounds {
            index: idx,
            count: self.metadata.len(),
        })?;
        let bytes = self.reader.read_at(meta.offset, meta.size as usize)?;
        Block::decode(&bytes)
    }

    /// Number of blocks recorded in the trailer.
    pub fn block_count(&self) -> usize {
        self.metadata.len()
    }

    /// The resident block metadata, in block order.
    pub fn block_metadata(&self) -> &[BlockMetadata] {
        &self.metadata
    }

    /// On-disk size of the table in bytes.
    pub fn file_size(&self) -> u64 {
        self.reader.file_size()
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
