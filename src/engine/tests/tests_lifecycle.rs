#[cfg(test)]
mod tests {
    use crate::engine::tests::helpers::{open_default, options_in};
    use crate::engine::{EngineError, Storage};
    use tempfile::TempDir;

    #[test]
    fn test_operations_rejected_after_close() {
        let tmp = TempDir::new().unwrap();
        let storage = open_default(tmp.path());
        storage.put(b"k".to_vec(), b"v".to_vec()).unwrap();
        storage.close().unwrap();

        assert!(matches!(
            storage.put(b"k2".to_vec(), b"v2".to_vec()).unwrap_err(),
            EngineError::EngineStopped
        ));
        assert!(matches!(
            storage.get(b"k").unwrap_err(),
            EngineError::EngineStopped
        ));
        assert!(matches!(
            storage.remove(b"k".to_vec()).unwrap_err(),
            EngineError::EngineStopped
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let storage = open_default(tmp.path());
        storage.put(b"k".to_vec(), b"v".to_vec()).unwrap();

        storage.close().unwrap();
        storage.close().unwrap();
        storage.close().unwrap();
    }

    #[test]
    fn test_close_through_any_clone() {
        let tmp = TempDir::new().unwrap();
        let storage = open_default(tmp.path());
        let other = storage.clone();

        storage.put(b"k".to_vec(), b"v".to_vec()).unwrap();
        other.close().unwrap();

        assert!(matches!(
            storage.get(b"k").unwrap_err(),
            EngineError::EngineStopped
        ));
    }

    #[test]
    fn test_current_table_id_advances_on_rotation() {
        let tmp = TempDir::new().unwrap();
        let mut options = options_in(tmp.path());
        options.mem_table_size = 300;
        let storage = Storage::open(options).unwrap();

        let before = storage.get_current_table_id().unwrap();
        storage.put(b"a".to_vec(), vec![b'x'; 400]).unwrap();
        storage.put(b"b".to_vec(), vec![b'y'; 400]).unwrap();
        let after = storage.get_current_table_id().unwrap();
        assert!(after > before);

        storage.close().unwrap();
    }

    #[test]
    fn test_sync_on_write_option() {
        use crate::engine::WalSyncOption;

        let tmp = TempDir::new().unwrap();
        let mut options = options_in(tmp.path());
        options.wal_sync = WalSyncOption::SyncOnWrite;
        let storage = Storage::open(options).unwrap();

        storage.put(b"durable".to_vec(), b"now".to_vec()).unwrap();
        assert_eq!(storage.get(b"durable").unwrap(), Some(b"now".to_vec()));

        storage.close().unwrap();
    }
}
