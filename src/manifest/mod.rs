//! # Manifest Module
//!
//! The manifest is the engine's durable metadata authority: an append-only
//! file of line-delimited version edits. Folding every edit in file order
//! — combined with the WAL and SST files actually on disk — reconstructs
//! the engine state after a crash.
//!
//! ## Record format
//!
//! One JSON object per line, each the textual encoding of a
//! [`VersionEdit`]:
//!
//! ```text
//! {"new_files":[],"wal_addition":{"file_id_":1}}
//! {"new_files":[{"level_":0,"file_id_":1}],"wal_addition":null}
//! ```
//!
//! - `new_files` — descriptors of SSTs added by a flush (level 0 only in
//!   this engine).
//! - `wal_addition` — the id of a newly opened WAL, recorded when the
//!   active memtable rotates.
//!
//! ## Durability
//!
//! [`Manifest::add_record`] encodes one edit, terminates it with a
//! newline, and appends with a full durability barrier before returning —
//! an edit either survives whole or was never acknowledged. The writer
//! opens in append mode so a restart never rewrites history.

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::io::FileWriter;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by manifest operations.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A line failed to parse as a version edit.
    #[error("malformed manifest record: {0}")]
    MalformedRecord(#[from] serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// Version edits
// ------------------------------------------------------------------------------------------------

/// Descriptor of one SST added to the tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct NewFileMetadata {
    /// LSM level the file joins. Always 0 for flush output.
    #[serde(rename = "level_")]
    pub level: u64,

    /// File id — the id of the memtable the SST was flushed from.
    #[serde(rename = "file_id_")]
    pub file_id: u64,
}

/// Descriptor of a newly opened WAL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalAddition {
    /// Id of the WAL file (and of the memtable it protects).
    #[serde(rename = "file_id_")]
    pub file_id: u64,
}

/// One manifest entry: any combination of new SST files and a new WAL.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionEdit {
    /// SSTs this edit adds, keyed by (level, file id).
    #[serde(rename = "new_files")]
    pub new_files: BTreeSet<NewFileMetadata>,

    /// WAL this edit opens, if any.
    #[serde(rename = "wal_addition")]
    pub wal_addition: Option<WalAddition>,
}

impl VersionEdit {
    /// Records an SST at `level` with id `file_id`.
    pub fn add_new_file(&mut self, level: u64, file_id: u64) {
        self.new_files.insert(NewFileMetadata { level, file_id });
    }

    /// Records a newly opened WAL.
    pub fn add_new_wal(&mut self, wal_id: u64) {
        self.wal_addition = Some(WalAddition { file_id: wal_id });
    }
}

// ------------------------------------------------------------------------------------------------
// Manifest
// ------------------------------------------------------------------------------------------------

/// Appending handle to the version-edit log.
pub struct Manifest {
    writer: FileWriter,
    path: PathBuf,
}

impl Manifest {
    /// Opens the manifest at `path` and replays its edits.
    ///
    /// Returns the writable handle together with the edits in file order —
    /// an empty list when the file does not exist yet. The handle appends;
    /// it never truncates existing records.
    pub fn recover(path: impl AsRef<Path>) -> Result<(Self, Vec<VersionEdit>), ManifestError> {
        let path = path.as_ref().to_path_buf();

        let edits = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let mut edits = Vec::new();
            for line in contents.lines() {
                if line.is_empty() {
                    continue;
                }
                edits.push(serde_json::from_str::<VersionEdit>(line)?);
            }
            edits
        } else {
            Vec::new()
        };

        let writer = FileWriter::append_to(&path)?;

        info!(
            path = %path.display(),
            edits = edits.len(),
            "manifest recovered"
        );

        Ok((Self { writer, path }, edits))
    }

    /// Encodes `edit` as one line and durably appends it.
    pub fn add_record(&mut self, edit: &VersionEdit) -> Result<(), ManifestError> {
        let mut line = serde_json::to_string(edit)?;
        line.push('\n');
        self.writer.append_and_sync(line.as_bytes())?;

        debug!(
            new_files = edit.new_files.len(),
            new_wal = edit.wal_addition.map(|w| w.file_id),
            "manifest edit appended"
        );
        Ok(())
    }

    /// Path of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
