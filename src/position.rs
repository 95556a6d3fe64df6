//! Cheap reachability checks for offsets read from a file.

use crate::stream::{ByteStream, SeekMode};

/// Tracks the highest offset proven readable so far.
///
/// Every offset or length read from a document goes through
/// [`PositionValidator::is_valid_position`] before it is trusted. The
/// watermark only grows, and checks never move the stream cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionValidator {
    watermark: i64,
}

impl PositionValidator {
    /// Creates a validator with nothing confirmed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The highest confirmed offset.
    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    /// Returns true if `pos` is reachable in `input`.
    pub fn is_valid_position(&mut self, input: &mut ByteStream, pos: i64) -> bool {
        if pos < 0 {
            return false;
        }
        if pos <= self.watermark {
            return true;
        }
        let saved = input.tell();
        let reached = input.seek(pos, SeekMode::Set) && input.tell() == pos;
        input.seek(saved, SeekMode::Set);
        if reached {
            log::trace!("position {:#x} confirmed", pos);
            self.watermark = pos;
        }
        reached
    }
}
