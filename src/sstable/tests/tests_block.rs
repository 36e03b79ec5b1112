#[cfg(test)]
mod tests {
    use crate::sstable::block::{Block, BlockBuilder};
    use crate::sstable::SstError;

    fn sample_block() -> Block {
        let mut builder = BlockBuilder::new();
        builder.add_entry(b"a", b"b").unwrap();
        builder.add_entry(b"x", b"y").unwrap();
        builder.add_entry(b"xx", b"yy").unwrap();
        builder.build()
    }

    #[test]
    fn test_encode_layout() {
        let encoded = sample_block().encode();

        // Entries: (a,b) at 0, (x,y) at 6, (xx,yy) at 12.
        let expected_payload = [
            0x00, 0x01, b'a', 0x00, 0x01, b'b', // ("a","b")
            0x00, 0x01, b'x', 0x00, 0x01, b'y', // ("x","y")
            0x00, 0x02, b'x', b'x', 0x00, 0x02, b'y', b'y', // ("xx","yy")
        ];
        assert_eq!(&encoded[..expected_payload.len()], &expected_payload);

        // Offsets [0, 6, 12] then the footer 0x0003.
        let tail = &encoded[expected_payload.len()..];
        assert_eq!(
            tail,
            &[0x00, 0x00, 0x00, 0x06, 0x00, 0x0C, 0x00, 0x03]
        );
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let block = sample_block();
        let decoded = Block::decode(&block.encode()).unwrap();
        assert_eq!(decoded, block);

        assert_eq!(decoded.entry_count(), 3);
        assert_eq!(decoded.get_entry(0).unwrap().key, b"a");
        assert_eq!(decoded.get_entry(2).unwrap().value, b"yy");
    }

    #[test]
    fn test_get_finds_each_key() {
        let block = sample_block();
        assert_eq!(block.get(b"a").unwrap(), Some(b"b".to_vec()));
        assert_eq!(block.get(b"x").unwrap(), Some(b"y".to_vec()));
        assert_eq!(block.get(b"xx").unwrap(), Some(b"yy".to_vec()));
    }

    #[test]
    fn test_get_absent_keys() {
        let block = sample_block();
        assert_eq!(block.get(b"").unwrap(), None);
        assert_eq!(block.get(b"b").unwrap(), None);
        assert_eq!(block.get(b"xxx").unwrap(), None);
        assert_eq!(block.get(b"zzz").unwrap(), None);
    }

    #[test]
    fn test_tombstone_value_survives_round_trip() {
        let mut builder = BlockBuilder::new();
        builder.add_entry(b"gone", b"").unwrap();
        builder.add_entry(b"here", b"v").unwrap();
        let block = Block::decode(&builder.build().encode()).unwrap();

        // A tombstone is a present entry with an empty value, distinct
        // from an absent key.
        assert_eq!(block.get(b"gone").unwrap(), Some(Vec::new()));
        assert_eq!(block.get(b"missing").unwrap(), None);
    }

    #[test]
    fn test_first_and_last_key() {
        let block = sample_block();
        assert_eq!(block.first_key().unwrap(), b"a");
        assert_eq!(block.last_key().unwrap(), b"xx");
    }

    #[test]
    fn test_get_entry_out_of_bounds() {
        let block = sample_block();
        let err = block.get_entry(3).unwrap_err();
        assert!(matches!(
            err,
            SstError::OutOfBounds { index: 3, count: 3 }
        ));
    }

    #[test]
    fn test_builder_size_accounts_for_footer() {
        let mut builder = BlockBuilder::new();
        assert_eq!(builder.get_size(), 2); // footer only

        builder.add_entry(b"a", b"b").unwrap();
        // entry (6) + one offset (2) + footer (2)
        assert_eq!(builder.get_size(), 10);
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        let err = Block::decode(&[0x01]).unwrap_err();
        assert!(matches!(err, SstError::MalformedInput(_)));
    }

    #[test]
    fn test_decode_rejects_inconsistent_entry_count() {
        // Footer claims 9 entries in a 2-byte buffer.
        let err = Block::decode(&[0x00, 0x09]).unwrap_err();
        assert!(matches!(err, SstError::MalformedInput(_)));
    }

    #[test]
    fn test_decode_rejects_impossible_offset() {
        // One entry, offset pointing past the 6-byte payload.
        let mut bytes = sample_block().encode();
        let len = bytes.len();
        // First offset slot sits 8 bytes from the end: overwrite with 0xFFFF.
        bytes[len - 8] = 0xFF;
        bytes[len - 7] = 0xFF;
        let err = Block::decode(&bytes).unwrap_err();
        assert!(matches!(err, SstError::MalformedInput(_)));
    }
}
