#[cfg(test)]
mod tests {
    use crate::encoding::{
        EncodingError, decode_len_prefixed, decode_u16, decode_u64, encode_len_prefixed,
        encode_u16, encode_u64, len_to_u16,
    };

    #[test]
    fn test_u16_round_trip() {
        for val in [0u16, 1, 255, 256, 0x1234, u16::MAX] {
            let mut buf = Vec::new();
            encode_u16(val, &mut buf);
            assert_eq!(buf.len(), 2);
            assert_eq!(decode_u16(&buf).unwrap(), val);
        }
    }

    #[test]
    fn test_u16_is_big_endian() {
        let mut buf = Vec::new();
        encode_u16(0x0103, &mut buf);
        assert_eq!(buf, vec![0x01, 0x03]);
    }

    #[test]
    fn test_u64_round_trip() {
        for val in [0u64, 1, 0xFF, 0x1_0000_0000, u64::MAX] {
            let mut buf = Vec::new();
            encode_u64(val, &mut buf);
            assert_eq!(buf.len(), 8);
            assert_eq!(decode_u64(&buf).unwrap(), val);
        }
    }

    #[test]
    fn test_u64_is_big_endian() {
        let mut buf = Vec::new();
        encode_u64(0x0102_0304_0506_0708, &mut buf);
        assert_eq!(buf, vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
    }

    #[test]
    fn test_decode_short_buffer_is_malformed() {
        let err = decode_u16(&[0x01]).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::MalformedInput {
                needed: 2,
                available: 1
            }
        ));

        let err = decode_u64(&[0u8; 7]).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::MalformedInput {
                needed: 8,
                available: 7
            }
        ));
    }

    #[test]
    fn test_len_prefixed_round_trip() {
        let mut buf = Vec::new();
        encode_len_prefixed(b"hello", &mut buf).unwrap();
        assert_eq!(buf, vec![0x00, 0x05, b'h', b'e', b'l', b'l', b'o']);

        let (bytes, consumed) = decode_len_prefixed(&buf).unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(consumed, 7);
    }

    #[test]
    fn test_len_prefixed_empty() {
        let mut buf = Vec::new();
        encode_len_prefixed(b"", &mut buf).unwrap();
        assert_eq!(buf, vec![0x00, 0x00]);

        let (bytes, consumed) = decode_len_prefixed(&buf).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_len_prefixed_truncated_payload() {
        // Advertises 5 bytes but carries only 3.
        let buf = vec![0x00, 0x05, b'a', b'b', b'c'];
        let err = decode_len_prefixed(&buf).unwrap_err();
        assert!(matches!(err, EncodingError::MalformedInput { .. }));
    }

    #[test]
    fn test_len_overflow_rejected() {
        let err = len_to_u16(usize::from(u16::MAX) + 1).unwrap_err();
        assert!(matches!(err, EncodingError::LengthOverflow { .. }));
    }
}
