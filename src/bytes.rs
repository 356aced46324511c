//! Bounds-checked byte-order readers.
//!
//! Every offset derived from container data goes through these helpers, so an
//! out-of-range length field turns into [`DecryptError::TruncatedContainer`]
//! instead of a slice panic.

use crate::error::{DecryptError, Result};
use crate::format::FormatTag;

/// Borrow `len` bytes starting at `offset`.
pub fn field(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset.checked_add(len).ok_or(DecryptError::TruncatedContainer {
        offset,
        needed: len,
        available: buf.len().saturating_sub(offset),
    })?;

    buf.get(offset..end).ok_or(DecryptError::TruncatedContainer {
        offset,
        needed: len,
        available: buf.len().saturating_sub(offset),
    })
}

/// Copy a fixed-size field out of `buf`.
pub fn array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(field(buf, offset, N)?);
    Ok(out)
}

pub fn u32_le(buf: &[u8], offset: usize) -> Result<u32> {
    array::<4>(buf, offset).map(u32::from_le_bytes)
}

/// 24-bit big-endian, as used by FLAC metadata block headers.
pub fn u24_be(buf: &[u8], offset: usize) -> Result<u32> {
    let [a, b, c] = array::<3>(buf, offset)?;
    Ok(u32::from_be_bytes([0, a, b, c]))
}

/// Compare the leading bytes of `buf` against a container signature.
///
/// A buffer that is a strict prefix of `magic` is truncated, anything else
/// that does not match is the wrong container.
pub fn check_magic(buf: &[u8], magic: &[u8], format: FormatTag) -> Result<()> {
    match buf.get(..magic.len()) {
        Some(head) if head == magic => Ok(()),
        None if magic.starts_with(buf) => Err(DecryptError::TruncatedContainer {
            offset: 0,
            needed: magic.len(),
            available: buf.len(),
        }),
        _ => Err(DecryptError::InvalidMagic { format }),
    }
}

/// Sequential reader over an immutable container buffer.
///
/// The cursor never mutates the input; it only hands out sub-slices.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let out = field(self.buf, self.pos, len)?;
        self.pos += len;
        Ok(out)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub fn u32_le(&mut self) -> Result<u32> {
        let value = u32_le(self.buf, self.pos)?;
        self.pos += 4;
        Ok(value)
    }

    /// Read a `u32` little-endian length followed by that many bytes.
    pub fn segment(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        let len = self.u32_le()? as usize;
        self.take(len).inspect_err(|_| self.pos = start)
    }

    /// Everything after the cursor.
    pub fn rest(&self) -> &'a [u8] {
        self.buf.get(self.pos..).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_both_byte_orders() {
        let buf = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(u24_be(&buf, 1).unwrap(), 0x020304);
        assert_eq!(u32_le(&buf, 0).unwrap(), 0x04030201);
    }

    #[test]
    fn out_of_range_is_truncation() {
        let buf = [0u8; 3];
        assert_eq!(
            u32_le(&buf, 0),
            Err(DecryptError::TruncatedContainer {
                offset: 0,
                needed: 4,
                available: 3
            })
        );
        assert!(field(&buf, usize::MAX, 2).is_err());
        assert!(field(&buf, 4, 0).is_err());
        assert_eq!(field(&buf, 3, 0).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn magic_mismatch_versus_short_buffer() {
        assert_eq!(check_magic(b"KWMA....", b"KWMA", FormatTag::Vpr), Ok(()));
        assert!(check_magic(b"KW", b"KWMA", FormatTag::Vpr)
            .unwrap_err()
            .is_truncation());
        assert_eq!(
            check_magic(b"KX", b"KWMA", FormatTag::Vpr),
            Err(DecryptError::InvalidMagic {
                format: FormatTag::Vpr
            })
        );
        assert_eq!(
            check_magic(b"RIFF....", b"KWMA", FormatTag::Vpr),
            Err(DecryptError::InvalidMagic {
                format: FormatTag::Vpr
            })
        );
    }

    #[test]
    fn segment_reads_length_prefixed_data() {
        let mut buf = 3u32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"abcde");
        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.segment().unwrap(), b"abc");
        assert_eq!(cursor.rest(), b"de");
        assert_eq!(cursor.position(), 7);
    }

    #[test]
    fn failed_segment_leaves_cursor_in_place() {
        let mut buf = 9u32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(&buf);
        assert!(matches!(
            cursor.segment(),
            Err(DecryptError::TruncatedContainer { offset: 4, needed: 9, available: 3 })
        ));
        assert_eq!(cursor.position(), 0);
    }
}
