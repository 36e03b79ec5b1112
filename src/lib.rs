//! # BasaltDB
//!
//! An embeddable, persistent key-value storage engine built on a
//! **Log-Structured Merge Tree (LSM-tree)** write path. Designed for
//! fast writes and crash-safe operation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Storage                          │
//! │  ┌────────────┐  ┌──────────────┐  ┌─────────────┐   │
//! │  │  Active    │  │  Immutable   │  │    SSTs     │   │
//! │  │  Memtable  │  │  Memtables   │  │  (on disk)  │   │
//! │  │  + WAL     │  │              │  │             │   │
//! │  └─────┬──────┘  └──────┬───────┘  └──────┬──────┘   │
//! │        │   freeze       │   flush         │          │
//! │        └─────────►      └────────►        │          │
//! │                                                      │
//! │  ┌──────────────────────────────────────────────────┐│
//! │  │        Manifest (append-only version edits)      ││
//! │  └──────────────────────────────────────────────────┘│
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Core storage engine — open, read, write, rotate, flush, recover |
//! | [`memtable`] | Ordered in-memory write buffer with size accounting and freeze |
//! | [`wal`] | Per-memtable write-ahead log for crash recovery |
//! | [`sstable`] | Immutable, sorted, block-structured on-disk tables |
//! | [`manifest`] | Append-only log of version edits |
//! | [`encoding`] | Big-endian fixed-width integer codec shared by all formats |
//! | [`io`] | Positional file reader and durable appending writer |
//!
//! ## Key properties
//!
//! - **Write-ahead logging** — every mutation is appended to a WAL before
//!   it becomes visible in memory, so an unclean shutdown loses nothing.
//! - **Tombstone deletes** — a zero-length value marks deletion; tombstones
//!   shadow older versions across every layer and never reach callers.
//! - **Background flushing** — a dedicated worker drains frozen memtables
//!   into SSTs on a fixed tick; callers observe bounded staleness of the
//!   on-disk state, never inconsistency.
//! - **Manifest-driven recovery** — replaying the version-edit log plus the
//!   surviving WAL and SST files reconstructs the engine after a crash.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use basaltdb::engine::{Storage, StorageOptions};
//!
//! let options = StorageOptions {
//!     sst_directory: "/tmp/basalt/sst".into(),
//!     wal_directory: "/tmp/basalt/wal".into(),
//!     manifest_path: "/tmp/basalt/manifest.json".into(),
//!     ..StorageOptions::default()
//! };
//!
//! let storage = Storage::open(options).unwrap();
//!
//! // Write
//! storage.put(b"hello".to_vec(), b"world".to_vec()).unwrap();
//!
//! // Read
//! assert_eq!(storage.get(b"hello").unwrap(), Some(b"world".to_vec()));
//!
//! // Delete
//! storage.remove(b"hello".to_vec()).unwrap();
//! assert_eq!(storage.get(b"hello").unwrap(), None);
//!
//! // Graceful shutdown
//! storage.close().unwrap();
//! ```

pub mod encoding;
pub mod engine;
pub mod io;
pub mod iterator;
pub mod manifest;
pub mod memtable;
pub mod sstable;
pub mod wal;
