//! Common iterator capability shared by every storage layer.
//!
//! Blocks, memtables, and SSTs each expose ordered iteration through the
//! same four-method shape, so flush and scan code can be written once
//! against the trait instead of a concrete cursor type. The shape follows
//! the RocksDB `IteratorBase` convention: an explicit validity flag
//! instead of `Option`-returning advancement.

/// Cursor over an ordered sequence of key-value entries.
///
/// A freshly constructed iterator is positioned on the first entry (and is
/// invalid immediately if the sequence is empty). `next` advances past the
/// last entry into the invalid state, where `key` and `value` return empty
/// byte strings. There is no rewind — construct a new iterator to restart.
pub trait StorageIterator {
    /// True while the cursor is positioned on an entry.
    fn is_valid(&self) -> bool;

    /// Advances to the next entry in key order.
    fn next(&mut self);

    /// Key bytes of the current entry; empty when invalid.
    fn key(&self) -> Vec<u8>;

    /// Value bytes of the current entry; empty when invalid.
    fn value(&self) -> Vec<u8>;
}
