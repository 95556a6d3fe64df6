//! Seekable in-memory byte stream.
//!
//! Legacy Macintosh documents store integers big-endian, so every numeric
//! read here is big-endian. The stream never grows and never fails on
//! seek: out-of-range seeks are clamped and reported through the return
//! value, which is what the position validator relies on.

use crate::entry::Entry;
use crate::error::{Error, Result};
use bytes::Bytes;

/// Origin of a [`ByteStream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// From the start of the stream.
    Set,
    /// From the current position.
    Cur,
    /// From the end of the stream.
    End,
}

/// A random-access byte stream.
#[derive(Debug, Clone, Default)]
pub struct ByteStream {
    data: Bytes,
    pos: i64,
}

impl ByteStream {
    /// Creates a stream over the given bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Total size in bytes.
    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }

    /// Current position.
    pub fn tell(&self) -> i64 {
        self.pos
    }

    /// Returns true once the cursor reached the end.
    pub fn at_eos(&self) -> bool {
        self.pos >= self.size()
    }

    /// Moves the cursor.
    ///
    /// The position is clamped to `[0, size]`. Returns true if the
    /// requested position was reached exactly.
    pub fn seek(&mut self, offset: i64, mode: SeekMode) -> bool {
        let target = match mode {
            SeekMode::Set => offset,
            SeekMode::Cur => self.pos.saturating_add(offset),
            SeekMode::End => self.size().saturating_add(offset),
        };
        self.pos = target.clamp(0, self.size());
        self.pos == target
    }

    /// Returns the whole underlying buffer.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Reads an unsigned big-endian integer of `num_bytes` bytes (1..=8).
    pub fn read_ulong(&mut self, num_bytes: usize) -> Result<u64> {
        if num_bytes == 0 || num_bytes > 8 {
            return Err(Error::InvalidData(format!(
                "cannot read a {}-byte integer",
                num_bytes
            )));
        }
        let bytes = self.take(num_bytes)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Reads a signed big-endian integer of `num_bytes` bytes (1..=8).
    pub fn read_long(&mut self, num_bytes: usize) -> Result<i64> {
        let value = self.read_ulong(num_bytes)?;
        let shift = 64 - 8 * num_bytes as u32;
        Ok(((value << shift) as i64) >> shift)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_ulong(1)? as u8)
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_ulong(2)? as u16)
    }

    /// Reads a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_long(2)? as i16)
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_ulong(4)? as u32)
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_long(4)? as i32)
    }

    /// Reads `len` raw bytes as a zero-copy slice.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        let start = self.pos as usize;
        self.take(len)?;
        Ok(self.data.slice(start..start + len))
    }

    /// Reads a Pascal string (length byte followed by the characters).
    pub fn read_pascal_string(&mut self) -> Result<Bytes> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }

    /// Returns the bytes covered by `entry`, or `None` if it is out of range.
    pub fn slice(&self, entry: &Entry) -> Option<Bytes> {
        if entry.begin() < 0 || entry.length() < 0 || entry.end() > self.size() {
            return None;
        }
        Some(self.data.slice(entry.begin() as usize..entry.end() as usize))
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        let start = self.pos;
        let available = self.size() - start;
        if (len as i64) > available {
            self.pos = self.size();
            return Err(Error::StreamExhausted {
                offset: start,
                needed: len as i64 - available,
            });
        }
        self.pos += len as i64;
        Ok(&self.data[start as usize..start as usize + len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_reads() {
        let mut input = ByteStream::new(vec![0x01, 0x02, 0xFF, 0xFE, 0x80, 0x00, 0x00, 0x01]);
        assert_eq!(input.read_u16().unwrap(), 0x0102);
        assert_eq!(input.read_i16().unwrap(), -2);
        assert_eq!(input.read_long(4).unwrap(), -0x7FFF_FFFF);
        assert!(input.at_eos());
    }

    #[test]
    fn test_read_ulong_all_widths() {
        let mut input = ByteStream::new(vec![0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);
        assert_eq!(input.read_ulong(3).unwrap(), 0x12_3456);
        assert_eq!(input.read_ulong(3).unwrap(), 0x78_9ABC);
        assert!(input.read_ulong(9).is_err());
    }

    #[test]
    fn test_seek_clamps() {
        let mut input = ByteStream::new(vec![0u8; 10]);
        assert!(input.seek(4, SeekMode::Set));
        assert!(input.seek(2, SeekMode::Cur));
        assert_eq!(input.tell(), 6);
        assert!(!input.seek(20, SeekMode::Set));
        assert_eq!(input.tell(), 10);
        assert!(!input.seek(-1, SeekMode::Set));
        assert_eq!(input.tell(), 0);
        assert!(input.seek(-3, SeekMode::End));
        assert_eq!(input.tell(), 7);
    }

    #[test]
    fn test_short_read_moves_to_end() {
        let mut input = ByteStream::new(vec![1, 2, 3]);
        input.seek(1, SeekMode::Set);
        let err = input.read_u32().unwrap_err();
        assert!(matches!(err, Error::StreamExhausted { offset: 1, needed: 2 }));
        assert!(input.at_eos());
    }

    #[test]
    fn test_pascal_string_and_slice() {
        let mut input = ByteStream::new(b"\x03abcdef".to_vec());
        assert_eq!(&input.read_pascal_string().unwrap()[..], b"abc");
        assert_eq!(&input.slice(&Entry::new(4, 3)).unwrap()[..], b"def");
        assert!(input.slice(&Entry::new(5, 3)).is_none());
    }
}
