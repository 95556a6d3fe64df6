//! Classified units of a text scan.

use serde::Serialize;

/// What a content zone represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ZoneKind {
    /// A run of plain text
    Text,
    /// Character format change; aux is a font table index
    FormatChange,
    /// Paragraph format change; aux is a ruler table index
    RulerChange,
    /// Footnote anchor
    Footnote,
    /// Header anchor
    Header,
    /// Footer anchor
    Footer,
    /// Field; aux is the field id
    Field,
    /// Token such as a page number; aux is the token kind
    Token,
    /// Page (aux 0) or column (aux 1) break
    PageBreak,
    /// Table cell (aux 0) or row (aux 1) end
    TableMarker,
    /// Picture anchor; aux is the picture resource id
    Picture,
    /// Soft hyphen
    SoftHyphen,
    /// Superscript toggle
    Superscript,
    /// Subscript toggle
    Subscript,
}

/// Token kinds carried by [`ZoneKind::Token`].
pub mod token {
    pub const PAGE_NUMBER: i32 = 1;
    pub const PAGE_COUNT: i32 = 2;
    pub const DATE: i32 = 3;
    pub const TIME: i32 = 4;
    pub const TITLE: i32 = 5;
}

/// A classified byte range of a text stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentZone {
    pub kind: ZoneKind,
    /// Absolute start offset
    pub begin: i64,
    /// Absolute end offset (equal to `begin` for zero-length markers)
    pub end: i64,
    /// Kind-specific value (table index, id, break kind)
    pub aux: i32,
}

impl ContentZone {
    /// Creates a zone.
    pub fn new(kind: ZoneKind, begin: i64, end: i64, aux: i32) -> Self {
        Self {
            kind,
            begin,
            end,
            aux,
        }
    }

    /// Length in source bytes.
    pub fn len(&self) -> i64 {
        self.end - self.begin
    }

    /// Returns true for zero-length markers.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}
