//! Write-Ahead Logging (WAL) Module
//!
//! Each memtable is protected by its own append-only record log. A write
//! reaches the WAL before it becomes visible in memory, so replaying the
//! log after a crash reconstructs exactly the memtable contents that had
//! been acknowledged.
//!
//! # On-disk layout
//!
//! ```text
//! [KEY_LEN_U16][KEY][VALUE_LEN_U16][VALUE]
//! [KEY_LEN_U16][KEY][VALUE_LEN_U16][VALUE]
//! ...
//! ```
//!
//! Records are concatenated with no separators; all integers are
//! big-endian. A zero-length value is a tombstone and is logged like any
//! other record. The file name encodes the id of the memtable it protects
//! (`{id}.wal`), which is how recovery pairs logs with tables.
//!
//! # Durability
//!
//! [`Wal::add_record`] buffers; [`Wal::add_record_and_sync`] additionally
//! forces a full durability barrier. Which one the engine calls is a
//! configuration decision (`SyncOnWrite` vs `SyncOnClose`).
//!
//! # Recovery
//!
//! [`read_wal`] returns the full record sequence in file order. A trailing
//! record with too few bytes left for its framing fails loudly with
//! [`WalError::TruncatedWal`] — recovery never guesses at half-written
//! records.


use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::encoding::{self, EncodingError, U16_SIZE, decode_u16};
use crate::io::{FileReader, FileWriter};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding / decoding error.
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The file ends in the middle of a record.
    #[error("truncated WAL: incomplete record at offset {offset}")]
    TruncatedWal {
        /// File offset at which the incomplete record starts.
        offset: u64,
    },
}

// ------------------------------------------------------------------------------------------------
// WalRecord
// ------------------------------------------------------------------------------------------------

/// One logged mutation: a key paired with its (possibly empty) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    /// Key bytes.
    pub key: Vec<u8>,

    /// Value bytes. Empty denotes a tombstone.
    pub value: Vec<u8>,
}

impl WalRecord {
    /// Appends the encoded record (`key_len | key | value_len | value`)
    /// to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::encode_len_prefixed(&self.key, buf)?;
        encoding::encode_len_prefixed(&self.value, buf)?;
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Wal
// ------------------------------------------------------------------------------------------------

/// Appending handle to one memtable's record log.
pub struct Wal {
    writer: FileWriter,
    path: PathBuf,
}

impl Wal {
    /// Creates a fresh WAL at `path`, truncating any previous file.
    ///
    /// WAL files are always created alongside a brand-new memtable; an
    /// existing file at the same path is stale by definition.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let writer = FileWriter::create(&path)?;

        debug!(path = %path.display(), "WAL created");

        Ok(Self { writer, path })
    }

    /// Appends one record. The bytes may sit in a userspace buffer until
    /// the next [`Wal::sync`] or [`Wal::close`].
    pub fn add_record(&mut self, record: &WalRecord) -> Result<(), WalError> {
        let mut buf =
            Vec::with_capacity(U16_SIZE + record.key.len() + U16_SIZE + record.value.len());
        record.encode(&mut buf)?;
        self.writer.append(&buf)?;

        trace!(
            key_len = record.key.len(),
            value_len = record.value.len(),
            "WAL record appended"
        );
        Ok(())
    }

    /// Appends one record and forces it to stable storage.
    pub fn add_record_and_sync(&mut self, record: &WalRecord) -> Result<(), WalError> {
        self.add_record(record)?;
        self.writer.sync()?;
        Ok(())
    }

    /// Forces all previously appended records to stable storage.
    pub fn sync(&mut self) -> Result<(), WalError> {
        self.writer.sync()?;
        Ok(())
    }

    /// Flushes and closes the log. Idempotent.
    pub fn close(&mut self) -> Result<(), WalError> {
        self.writer.close()?;
        Ok(())
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Logical size of the log in bytes, including buffered appends.
    pub fn file_size(&self) -> u64 {
        self.writer.file_size()
    }
}

// ------------------------------------------------------------------------------------------------
// Recovery read
// ------------------------------------------------------------------------------------------------

/// Reads the full record sequence of the WAL at `path`, in file order.
///
/// Fails with [`WalError::TruncatedWal`] when the file ends mid-record:
/// too few bytes for a length field, or fewer payload bytes than the
/// lengths promise. The engine treats such files as unrecoverable input
/// rather than silently dropping the tail.
pub fn read_wal(path: impl AsRef<Path>) -> Result<Vec<WalRecord>, WalError> {
    let reader = FileReader::open(path.as_ref())?;
    let file_size = reader.file_size();

    let mut records = Vec::new();
    let mut offset = 0u64;

    while offset < file_size {
        let record_start = offset;
        let key = read_frame(&reader, &mut offset, file_size, record_start)?;
        let value = read_frame(&reader, &mut offset, file_size, record_start)?;
        records.push(WalRecord { key, value });
    }

    debug!(
        path = %path.as_ref().display(),
        records = records.len(),
        "WAL replayed"
    );

    Ok(records)
}

/// Reads one `u16 len | bytes` frame at `*offset`, advancing the cursor.
fn read_frame(
    reader: &FileReader,
    offset: &mut u64,
    file_size: u64,
    record_start: u64,
) -> Result<Vec<u8>, WalError> {
    if file_size - *offset < U16_SIZE as u64 {
        return Err(WalError::TruncatedWal {
            offset: record_start,
        });
    }
    let len_bytes = reader.read_at(*offset, U16_SIZE)?;
    let len = decode_u16(&len_bytes)? as u64;
    *offset += U16_SIZE as u64;

    if file_size - *offset < len {
        return Err(WalError::TruncatedWal {
            offset: record_start,
        });
    }
    let bytes = reader.read_at(*offset, len as usize)?;
    *offset += len;
    Ok(bytes)
}
