//! Parsing options for document decoding.

use crate::entry::Tag;
use crate::scanner::EscapeConvention;
use encoding_rs::Encoding;

/// Options for controlling document parsing behavior.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// How to handle malformed sub-zones.
    pub error_mode: ErrorMode,

    /// Maximum nesting depth accepted by the recursive zone reader.
    pub max_depth: usize,

    /// Conventions of the format being decoded.
    pub profile: FormatProfile,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            max_depth: 32,
            profile: FormatProfile::default(),
        }
    }
}

impl ParseOptions {
    /// Creates new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets lenient error handling (drop malformed zones and continue).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Sets strict error handling (any dropped zone fails the parse).
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Sets the recursion limit for nested zones.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Replaces the format profile.
    pub fn with_profile(mut self, profile: FormatProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Returns true if malformed zones should be dropped silently.
    pub fn is_lenient(&self) -> bool {
        matches!(self.error_mode, ErrorMode::Lenient)
    }
}

/// How to handle parsing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail as soon as a zone had to be dropped.
    Strict,
    /// Skip malformed zones and keep the rest of the document.
    #[default]
    Lenient,
}

/// Resource tags holding a format's side tables and sub-documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTags {
    pub fonts: Tag,
    pub rulers: Tag,
    pub styles: Tag,
    pub footnotes: Tag,
    pub headers: Tag,
    pub footers: Tag,
    pub pictures: Tag,
    pub info: Tag,
}

impl Default for ResourceTags {
    fn default() -> Self {
        Self {
            fonts: Tag::new(*b"FTAB"),
            rulers: Tag::new(*b"RULR"),
            styles: Tag::new(*b"STYL"),
            footnotes: Tag::new(*b"FTNT"),
            headers: Tag::new(*b"HEAD"),
            footers: Tag::new(*b"FOOT"),
            pictures: Tag::new(*b"PICT"),
            info: Tag::new(*b"INFO"),
        }
    }
}

/// Per-format conventions consumed by the decoding core.
#[derive(Debug, Clone)]
pub struct FormatProfile {
    /// Human-readable format name.
    pub name: String,
    /// Format version, as reported by the format's header.
    pub version: i32,
    /// How control codes are embedded in the text stream.
    pub escape: EscapeConvention,
    /// Encoding of text runs.
    pub encoding: &'static Encoding,
    /// Page width in inches.
    pub page_width: f64,
    /// Page height in inches.
    pub page_height: f64,
    /// Where side tables live in the resource fork.
    pub tags: ResourceTags,
}

impl Default for FormatProfile {
    fn default() -> Self {
        Self {
            name: "generic".into(),
            version: 1,
            escape: EscapeConvention::HighNibble,
            encoding: encoding_rs::MACINTOSH,
            page_width: 8.5,
            page_height: 11.0,
            tags: ResourceTags::default(),
        }
    }
}

impl FormatProfile {
    /// Creates a named profile with default conventions.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the format version.
    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    /// Sets the control-code convention.
    pub fn with_escape(mut self, escape: EscapeConvention) -> Self {
        self.escape = escape;
        self
    }

    /// Sets the text encoding.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the page size in inches.
    pub fn with_page_size(mut self, width: f64, height: f64) -> Self {
        self.page_width = width;
        self.page_height = height;
        self
    }

    /// Overrides the resource tags.
    pub fn with_tags(mut self, tags: ResourceTags) -> Self {
        self.tags = tags;
        self
    }
}
