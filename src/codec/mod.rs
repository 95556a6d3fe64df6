//! Property-handler interchange format.
//!
//! Structural events are flattened into one byte buffer so that a parsed
//! sub-document (an embedded picture, for instance) can travel through an
//! opaque blob boundary and be replayed later.
//!
//! Record layout, all integers 4-byte little-endian:
//!
//! | tag | payload                                           |
//! |-----|---------------------------------------------------|
//! | `S` | name, property list                               |
//! | `V` | name, property list, count, count property lists  |
//! | `E` | name                                              |
//! | `I` | name                                              |
//! | `T` | text                                              |
//!
//! A string is its byte length followed by the bytes; a property list is
//! a count followed by `(key, value)` string pairs.

mod decoder;
mod encoder;
mod handler;
mod property;

pub use decoder::{PropertyHandlerDecoder, WireReader};
pub use encoder::{escape_xml, PropertyHandlerEncoder};
pub use handler::{DocumentHandler, NullHandler};
pub use property::{PropertyList, PropertyListVector, PropertyValue, Unit};

/// Record tag bytes.
pub(crate) mod tag {
    pub const START: u8 = b'S';
    pub const START_WITH_VECTOR: u8 = b'V';
    pub const END: u8 = b'E';
    pub const INSERT: u8 = b'I';
    pub const TEXT: u8 = b'T';
}
