#[cfg(test)]
mod tests {
    use crate::sstable::{Sst, SstBuilder};
    use tempfile::TempDir;

    fn build_multi_block(path: &std::path::Path, keys: usize) -> Sst {
        let mut builder = SstBuilder::new(path, 64).unwrap();
        for i in 0..keys {
            let key = format!("key{:04}", i).into_bytes();
            let value = format!("value{:04}", i).into_bytes();
            builder.add_entry(&key, &value).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_get_across_blocks() {
        let tmp = TempDir::new().unwrap();
        let sst = build_multi_block(&tmp.path().join("sst_1"), 40);
        assert!(sst.block_count() > 1);

        for i in 0..40 {
            let key = format!("key{:04}", i).into_bytes();
            let expected = format!("value{:04}", i).into_bytes();
            assert_eq!(sst.get(&key).unwrap(), Some(expected), "key{:04}", i);
        }
    }

    #[test]
    fn test_get_absent_before_between_and_after() {
        let tmp = TempDir::new().unwrap();
        let sst = build_multi_block(&tmp.path().join("sst_2"), 40);

        // Before the first key, lexicographically between keys, after the last.
        assert_eq!(sst.get(b"aaa").unwrap(), None);
        assert_eq!(sst.get(b"key0010x").unwrap(), None);
        assert_eq!(sst.get(b"zzz").unwrap(), None);
    }

    #[test]
    fn test_get_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sst_3");
        let sst = build_multi_block(&path, 10);
        drop(sst);

        let reopened = Sst::open(&path).unwrap();
        assert_eq!(
            reopened.get(b"key0007").unwrap(),
            Some(b"value0007".to_vec())
        );
        assert_eq!(reopened.get(b"nope").unwrap(), None);
    }

    #[test]
    fn test_tombstone_read_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sst_4");

        let mut builder = SstBuilder::new(&path, 1024).unwrap();
        builder.add_entry(b"alive", b"v").unwrap();
        builder.add_entry(b"dead", b"").unwrap();
        let sst = builder.build().unwrap();

        assert_eq!(sst.get(b"alive").unwrap(), Some(b"v".to_vec()));
        assert_eq!(sst.get(b"dead").unwrap(), Some(Vec::new()));
    }
}
