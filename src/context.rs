//! Shared parser context handed to every sub-parser.

use crate::diagnostics::Diagnostics;
use crate::entry::Entry;
use crate::parse_options::FormatProfile;
use crate::position::PositionValidator;
use crate::stream::ByteStream;

/// What format sub-parsers need from their owning parser.
pub trait ParserState {
    /// Format version.
    fn version(&self) -> i32;

    /// Returns true if `pos` is reachable in the parser's stream.
    fn check_position(&mut self, pos: i64) -> bool;

    /// Page width in inches.
    fn page_width(&self) -> f64;

    /// Page height in inches.
    fn page_height(&self) -> f64;
}

/// One stream plus everything needed to decode it.
#[derive(Debug)]
pub struct ParserContext {
    /// The stream being decoded.
    pub input: ByteStream,
    /// Per-parse warnings.
    pub diagnostics: Diagnostics,
    validator: PositionValidator,
    version: i32,
    page_width: f64,
    page_height: f64,
}

impl ParserContext {
    /// Creates a context over `input` with default page geometry.
    pub fn new(input: ByteStream) -> Self {
        Self {
            input,
            diagnostics: Diagnostics::new(),
            validator: PositionValidator::new(),
            version: 1,
            page_width: 8.5,
            page_height: 11.0,
        }
    }

    /// Creates a context using a format profile's version and geometry.
    pub fn with_profile(input: ByteStream, profile: &FormatProfile) -> Self {
        Self {
            version: profile.version,
            page_width: profile.page_width,
            page_height: profile.page_height,
            ..Self::new(input)
        }
    }

    /// Returns true if `entry` lies entirely in the reachable stream.
    pub fn check_entry(&mut self, entry: &Entry) -> bool {
        entry.begin() >= 0
            && entry.length() >= 0
            && self.check_position(entry.begin())
            && self.check_position(entry.end())
    }
}

impl ParserState for ParserContext {
    fn version(&self) -> i32 {
        self.version
    }

    fn check_position(&mut self, pos: i64) -> bool {
        self.validator.is_valid_position(&mut self.input, pos)
    }

    fn page_width(&self) -> f64 {
        self.page_width
    }

    fn page_height(&self) -> f64 {
        self.page_height
    }
}
