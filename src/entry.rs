//! Byte-range descriptors into a stream.

use serde::{Serialize, Serializer};
use std::cell::Cell;
use std::fmt;

/// A four-character type code (`'PICT'`, `'STYL'`, ...).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Builds a tag from its four bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        Tag(bytes)
    }

    /// Builds a tag from a big-endian integer.
    pub const fn from_u32(value: u32) -> Self {
        Tag(value.to_be_bytes())
    }

    /// Returns the tag as a big-endian integer.
    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl From<&str> for Tag {
    /// Short strings are padded with spaces, longer ones truncated.
    fn from(value: &str) -> Self {
        let mut bytes = [b' '; 4];
        for (slot, byte) in bytes.iter_mut().zip(value.bytes()) {
            *slot = byte;
        }
        Tag(bytes)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A named `(begin, length)` byte range of a stream.
///
/// Entries are created during zone discovery and never mutated afterwards,
/// except for the `parsed` flag and a one-time length fix-up for zones
/// whose length is only known lazily.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Entry {
    begin: i64,
    length: i64,
    kind: String,
    id: i32,
    name: String,
    parsed: Cell<bool>,
}

impl Entry {
    /// Creates an entry over `[begin, begin + length)`.
    pub fn new(begin: i64, length: i64) -> Self {
        Self {
            begin,
            length,
            ..Self::default()
        }
    }

    /// Creates a typed entry.
    pub fn with_kind(begin: i64, length: i64, kind: impl Into<String>, id: i32) -> Self {
        Self {
            begin,
            length,
            kind: kind.into(),
            id,
            ..Self::default()
        }
    }

    /// Start offset.
    pub fn begin(&self) -> i64 {
        self.begin
    }

    /// Length in bytes.
    pub fn length(&self) -> i64 {
        self.length
    }

    /// One past the last byte.
    pub fn end(&self) -> i64 {
        self.begin + self.length
    }

    /// The entry type, usually a resource tag.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The entry id (resource id, zone number).
    pub fn id(&self) -> i32 {
        self.id
    }

    /// The optional entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the entry name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns true if the entry has a non-negative begin and a positive length.
    pub fn valid(&self) -> bool {
        self.begin >= 0 && self.length > 0
    }

    /// Returns true if `other` lies entirely inside this entry.
    pub fn contains(&self, other: &Entry) -> bool {
        other.begin >= self.begin && other.end() <= self.end()
    }

    /// Fixes the length of a zone discovered lazily.
    ///
    /// Only the first fix-up is honoured; later calls return false.
    pub fn set_length(&mut self, length: i64) -> bool {
        if self.length > 0 || length < 0 {
            return false;
        }
        self.length = length;
        true
    }

    /// Returns true once the entry has been consumed.
    pub fn is_parsed(&self) -> bool {
        self.parsed.get()
    }

    /// Marks the entry as consumed, returning whether it already was.
    pub fn mark_parsed(&self) -> bool {
        self.parsed.replace(true)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.kind.is_empty() {
            write!(f, "{}", self.kind)?;
            if self.id != 0 {
                write!(f, "[{}]", self.id)?;
            }
            write!(f, ":")?;
        }
        write!(f, "{:#x}-{:#x}", self.begin, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        let tag = Tag::from("PICT");
        assert_eq!(tag.0, *b"PICT");
        assert_eq!(Tag::from_u32(tag.to_u32()), tag);
        assert_eq!(Tag::from("fn").0, *b"fn  ");
        assert_eq!(tag.to_string(), "PICT");
    }

    #[test]
    fn test_entry_bounds() {
        let outer = Entry::with_kind(10, 20, "STYL", 128);
        let inner = Entry::new(12, 4);
        let straddling = Entry::new(25, 10);

        assert_eq!(outer.end(), 30);
        assert!(outer.valid());
        assert!(outer.contains(&inner));
        assert!(!outer.contains(&straddling));
        assert!(!Entry::new(-1, 4).valid());
        assert!(!Entry::new(0, 0).valid());
    }

    #[test]
    fn test_parsed_flag_is_idempotent() {
        let entry = Entry::new(0, 4);
        assert!(!entry.mark_parsed());
        assert!(entry.mark_parsed());
        assert!(entry.is_parsed());
    }

    #[test]
    fn test_length_fixup_only_once() {
        let mut entry = Entry::new(8, 0);
        assert!(entry.set_length(16));
        assert!(!entry.set_length(32));
        assert_eq!(entry.length(), 16);
    }
}
