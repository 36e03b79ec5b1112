//! Fixed-width, big-endian integer codec for on-disk persistence.
//!
//! Every binary structure in the engine — block entries, block footers, SST
//! trailers, WAL records — frames its variable-length byte strings with
//! fixed-width unsigned integers. This module is the single place those
//! integers are encoded and decoded, so the wire format cannot drift between
//! writers and readers.
//!
//! # Wire format
//!
//! | Width | Encoding                      |
//! |-------|-------------------------------|
//! | `u16` | 2 bytes, most-significant first |
//! | `u64` | 8 bytes, most-significant first |
//!
//! No varints, no tags, no alignment padding. Decoding a buffer shorter
//! than the advertised width is a caller bug and fails with
//! [`EncodingError::MalformedInput`] rather than panicking.

#[cfg(test)]
mod tests;

use thiserror::Error;

/// Encoded width of a `u16` length field.
pub const U16_SIZE: usize = 2;

/// Encoded width of a `u64` offset or count field.
pub const U64_SIZE: usize = 8;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors produced while encoding or decoding fixed-width integers and
/// length-prefixed byte strings.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The input buffer does not hold the bytes its framing promises.
    #[error("malformed input: need {needed} bytes, have {available}")]
    MalformedInput {
        /// Bytes required to continue decoding.
        needed: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    /// A byte string is too long for its length-prefix width.
    #[error("length overflow: {len} bytes exceeds the u16 framing limit")]
    LengthOverflow {
        /// The offending length.
        len: usize,
    },
}

// ------------------------------------------------------------------------------------------------
// Fixed-width integers
// ------------------------------------------------------------------------------------------------

/// Appends `val` to `buf` as two big-endian bytes.
#[inline]
pub fn encode_u16(val: u16, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&val.to_be_bytes());
}

/// Decodes a big-endian `u16` from the front of `buf`.
#[inline]
pub fn decode_u16(buf: &[u8]) -> Result<u16, EncodingError> {
    require(buf, U16_SIZE)?;
    Ok(u16::from_be_bytes([buf[0], buf[1]]))
}

/// Appends `val` to `buf` as eight big-endian bytes.
#[inline]
pub fn encode_u64(val: u64, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&val.to_be_bytes());
}

/// Decodes a big-endian `u64` from the front of `buf`.
#[inline]
pub fn decode_u64(buf: &[u8]) -> Result<u64, EncodingError> {
    require(buf, U64_SIZE)?;
    let mut raw = [0u8; U64_SIZE];
    raw.copy_from_slice(&buf[..U64_SIZE]);
    Ok(u64::from_be_bytes(raw))
}

// ------------------------------------------------------------------------------------------------
// Length-prefixed byte strings
// ------------------------------------------------------------------------------------------------

/// Converts a byte-string length into the `u16` its framing stores.
///
/// Keys and values are framed with 2-byte length prefixes throughout the
/// engine, which caps each at 65 535 bytes. Oversized inputs are rejected
/// before any bytes hit a file.
#[inline]
pub fn len_to_u16(len: usize) -> Result<u16, EncodingError> {
    u16::try_from(len).map_err(|_| EncodingError::LengthOverflow { len })
}

/// Appends `bytes` to `buf` framed as `u16 len | bytes`.
pub fn encode_len_prefixed(bytes: &[u8], buf: &mut Vec<u8>) -> Result<(), EncodingError> {
    encode_u16(len_to_u16(bytes.len())?, buf);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Decodes a `u16 len | bytes` frame from the front of `buf`.
///
/// Returns the byte string and the total number of bytes consumed.
pub fn decode_len_prefixed(buf: &[u8]) -> Result<(Vec<u8>, usize), EncodingError> {
    let len = decode_u16(buf)? as usize;
    require(&buf[U16_SIZE..], len)?;
    Ok((buf[U16_SIZE..U16_SIZE + len].to_vec(), U16_SIZE + len))
}

// ------------------------------------------------------------------------------------------------
// Internal helpers
// ------------------------------------------------------------------------------------------------

/// Verify that `buf` has at least `needed` bytes.
#[inline]
fn require(buf: &[u8], needed: usize) -> Result<(), EncodingError> {
    if buf.len() < needed {
        Err(EncodingError::MalformedInput {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}
