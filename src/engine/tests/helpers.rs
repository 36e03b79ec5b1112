use crate::engine::{Storage, StorageOptions};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing controlled by `RUST_LOG`. Safe to call repeatedly —
/// only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Options rooted inside `dir` with the stock defaults.
pub fn options_in(dir: &Path) -> StorageOptions {
    init_tracing();
    StorageOptions {
        sst_directory: dir.join("sst"),
        wal_directory: dir.join("wal"),
        manifest_path: dir.join("manifest.json"),
        ..StorageOptions::default()
    }
}

/// Options with a small memtable cap, so rotation triggers quickly.
pub fn small_buffer_options(dir: &Path, mem_table_size: usize) -> StorageOptions {
    StorageOptions {
        mem_table_size,
        ..options_in(dir)
    }
}

/// Opens an engine rooted in `dir` with default-sized buffers.
pub fn open_default(dir: &Path) -> Storage {
    Storage::open(options_in(dir)).expect("open")
}

/// Names of the `sst_*` files currently in the SST directory.
pub fn sst_files(options: &StorageOptions) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(&options.sst_directory) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("sst_"))
        .collect();
    names.sort();
    names
}

/// Names of the `*.wal` files currently in the WAL directory.
pub fn wal_files(options: &StorageOptions) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(&options.wal_directory) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".wal"))
        .collect();
    names.sort();
    names
}
