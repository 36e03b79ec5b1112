//! Byte-level file primitives shared by the WAL, SST, and manifest layers.
//!
//! Two small wrappers over [`std::fs::File`]:
//!
//! - [`FileReader`] — random-access reads at absolute offsets. The file
//!   size is captured at open time and the handle stays open until drop,
//!   so a reader always observes the file as it existed when opened.
//! - [`FileWriter`] — buffered appends with an explicit durability
//!   barrier. `append` may buffer in userspace; `sync` drains the buffer
//!   and forces everything to stable storage.
//!
//! # Durability
//!
//! `sync` maps to [`File::sync_all`], which on platforms with a stronger
//! "full barrier" fsync variant (macOS `F_FULLFSYNC`) uses it — WAL
//! durability depends on that barrier, not on plain `fsync` semantics.
//!
//! Partial writes are retried until the whole buffer is accepted
//! (`write_all`). Closing is idempotent, and dropping an open writer
//! drains its userspace buffer without ever panicking.

#[cfg(test)]
mod tests;

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use tracing::{error, trace};

// ------------------------------------------------------------------------------------------------
// FileReader
// ------------------------------------------------------------------------------------------------

/// Random-access reader over an immutable region of a file.
#[derive(Debug)]
pub struct FileReader {
    file: File,
    path: PathBuf,
    file_size: u64,
}

impl FileReader {
    /// Opens `path` for positional reads, capturing its current size.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let file_size = file.metadata()?.len();

        trace!(path = %path.display(), size = file_size, "file reader opened");

        Ok(Self {
            file,
            path,
            file_size,
        })
    }

    /// Reads exactly `len` bytes starting at `offset` into a fresh buffer.
    ///
    /// Short reads inside the file bounds are completed before returning;
    /// reading past the end of the file fails with `UnexpectedEof`.
    pub fn read_at(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.file.read_exact_at(&mut buf, offset)?;
        Ok(buf)
    }

    /// File size in bytes, as observed at open time.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path this reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ------------------------------------------------------------------------------------------------
// FileWriter
// ------------------------------------------------------------------------------------------------

/// Appending writer with an explicit durability barrier.
///
/// Created either fresh ([`FileWriter::create`], truncating) or in append
/// mode ([`FileWriter::append_to`], preserving existing contents — used by
/// the manifest, which must stay append-only across restarts). Parent
/// directories are created as needed.
#[derive(Debug)]
pub struct FileWriter {
    inner: Option<BufWriter<File>>,
    path: PathBuf,
    written: u64,
}

impl FileWriter {
    /// Creates (or truncates) the file at `path` for appending.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::open_inner(path.as_ref(), true)
    }

    /// Opens the file at `path` for appending, preserving existing bytes.
    pub fn append_to(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::open_inner(path.as_ref(), false)
    }

    fn open_inner(path: &Path, truncate: bool) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true);
        if truncate {
            options.truncate(true);
        } else {
            options.append(true);
        }
        let file = options.open(path)?;
        let written = file.metadata()?.len();

        trace!(path = %path.display(), truncate, existing = written, "file writer opened");

        Ok(Self {
            inner: Some(BufWriter::new(file)),
            path: path.to_path_buf(),
            written,
        })
    }

    /// Appends `bytes` to the file. May buffer in userspace; partial OS
    /// writes are retried until the whole slice is accepted.
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let writer = self.require_open()?;
        writer.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Appends `bytes` and forces them (and everything before them) to
    /// stable storage.
    pub fn append_and_sync(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.append(bytes)?;
        if !bytes.is_empty() {
            self.sync()?;
        }
        Ok(())
    }

    /// Drains the userspace buffer and issues a full durability barrier.
    ///
    /// `sync_all` is required rather than `sync_data`: the WAL depends on
    /// the strongest barrier the platform offers.
    pub fn sync(&mut self) -> io::Result<()> {
        let writer = self.require_open()?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    /// Flushes buffered bytes and closes the file. Idempotent — closing an
    /// already-closed writer is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.inner.take() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Logical file size in bytes, including userspace-buffered appends.
    pub fn file_size(&self) -> u64 {
        self.written
    }

    /// Path this writer appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn require_open(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::other("file writer already closed"))
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if let Some(mut writer) = self.inner.take()
            && let Err(e) = writer.flush()
        {
            error!(path = %self.path.display(), error = %e, "file writer flush failed on drop");
        }
    }
}
