//! Block construction and decoding.
//!
//! A block is the fixed-capacity physical unit of an SST:
//!
//! ```text
//! [ENTRY][ENTRY]...[ENTRY][OFFSET_U16]...[OFFSET_U16][ENTRY_COUNT_U16]
//! ```
//!
//! Each entry is `key_len_u16 | key | value_len_u16 | value`, all
//! big-endian. The offsets point at entry starts within the payload, one
//! per entry, and the 2-byte footer holds the offset count.

use crate::encoding::{
    self, U16_SIZE, decode_len_prefixed, decode_u16, encode_len_prefixed, encode_u16,
};
use crate::sstable::SstError;

/// A decoded key-value entry within a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    /// Key bytes.
    pub key: Vec<u8>,

    /// Value bytes. Empty for a tombstone.
    pub value: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// Block
// ------------------------------------------------------------------------------------------------

/// An immutable, decoded block: entry payload plus the offset table.
///
/// Entries are strictly key-ordered; point lookups binary-search the
/// offset table instead of scanning the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Concatenated encoded entries.
    data: Vec<u8>,

    /// Start offset of each entry within `data`, in entry order.
    offsets: Vec<u16>,
}

impl Block {
    /// Bytes an entry occupies once encoded into the payload.
    pub fn entry_encoded_len(key: &[u8], value: &[u8]) -> usize {
        U16_SIZE + key.len() + U16_SIZE + value.len()
    }

    /// Serializes the block as `payload | offsets | entry_count`.
    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(self.data.len() + U16_SIZE * (self.offsets.len() + 1));
        encoded.extend_from_slice(&self.data);
        for offset in &self.offsets {
            encode_u16(*offset, &mut encoded);
        }
        encode_u16(self.offsets.len() as u16, &mut encoded);
        encoded
    }

    /// Rebuilds a block from its encoded form.
    ///
    /// Reads the entry count from the footer, then the offset table working
    /// backwards from the footer, and takes whatever precedes the offset
    /// table as the payload. Inconsistent framing fails with
    /// [`SstError::MalformedInput`].
    pub fn decode(bytes: &[u8]) -> Result<Self, SstError> {
        if bytes.len() < U16_SIZE {
            return Err(SstError::MalformedInput(
                "block shorter than its footer".into(),
            ));
        }

        let count = decode_u16(&bytes[bytes.len() - U16_SIZE..])? as usize;

        let tail_len = count * U16_SIZE + U16_SIZE;
        if bytes.len() < tail_len {
            return Err(SstError::MalformedInput(format!(
                "entry count {count} inconsistent with block length {}",
                bytes.len()
            )));
        }

        let payload_len = bytes.len() - tail_len;
        let mut offsets = Vec::with_capacity(count);
        for idx in 0..count {
            let at = payload_len + idx * U16_SIZE;
            let offset = decode_u16(&bytes[at..])?;
            if offset as usize >= payload_len {
                return Err(SstError::MalformedInput(format!(
                    "entry offset {offset} beyond payload length {payload_len}"
                )));
            }
            offsets.push(offset);
        }

        Ok(Self {
            data: bytes[..payload_len].to_vec(),
            offsets,
        })
    }

    /// Number of entries stored in the block.
    pub fn entry_count(&self) -> usize {
        self.offsets.len()
    }

    /// Decodes the entry at `idx`.
    pub fn get_entry(&self, idx: usize) -> Result<BlockEntry, SstError> {
        let offset = *self
            .offsets
            .get(idx)
            .ok_or(SstError::OutOfBounds {
                index: idx,
                count: self.offsets.len(),
            })? as usize;

        let (key, consumed) = decode_len_prefixed(&self.data[offset..])?;
        let (value, _) = decode_len_prefixed(&self.data[offset + consumed..])?;
        Ok(BlockEntry { key, value })
    }

    /// Point lookup via binary search over the offset table.
    ///
    /// Returns the stored value (which may be an empty tombstone) or `None`
    /// when the key is not present in this block.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SstError> {
        let mut lo = 0usize;
        let mut hi = self.offsets.len();

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let entry = self.get_entry(mid)?;
            match entry.key.as_slice().cmp(key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Ok(Some(entry.value)),
            }
        }

        Ok(None)
    }

    /// Key of the first entry.
    pub fn first_key(&self) -> Result<Vec<u8>, SstError> {
        Ok(self.get_entry(0)?.key)
    }

    /// Key of the last entry.
    pub fn last_key(&self) -> Result<Vec<u8>, SstError> {
        if self.offsets.is_empty() {
            return Err(SstError::OutOfBounds { index: 0, count: 0 });
        }
        Ok(self.get_entry(self.offsets.len() - 1)?.key)
    }
}

// ------------------------------------------------------------------------------------------------
// BlockBuilder
// ------------------------------------------------------------------------------------------------

/// Accumulates ordered entries into one block.
///
/// The builder never re-sorts: callers append keys in non-decreasing
/// order. [`BlockBuilder::get_size`] reports the byte size the block
/// would occupy if finalized now (payload + offset table + footer), which
/// the SST builder uses as its block-capacity test.
#[derive(Debug, Default)]
pub struct BlockBuilder {
    data: Vec<u8>,
    offsets: Vec<u16>,
}

impl BlockBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one `key_len | key | value_len | value` entry and records
    /// its payload offset.
    pub fn add_entry(&mut self, key: &[u8], value: &[u8]) -> Result<(), SstError> {
        let offset = encoding::len_to_u16(self.data.len())?;
        encode_len_prefixed(key, &mut self.data)?;
        encode_len_prefixed(value, &mut self.data)?;
        self.offsets.push(offset);
        Ok(())
    }

    /// Byte size of the block if finalized now: payload, offset table,
    /// and the 2-byte footer.
    pub fn get_size(&self) -> usize {
        self.data.len() + U16_SIZE * self.offsets.len() + U16_SIZE
    }

    /// True when no entries have been added yet.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Finalizes the builder into an immutable [`Block`].
    pub fn build(self) -> Block {
        Block {
            data: self.data,
            offsets: self.offsets,
        }
    }
}
