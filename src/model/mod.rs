//! Document model.
//!
//! Value types shared by the decoders: the side tables, the content zones
//! produced by the text scanner and the final decoded document.

mod document;
mod style;
mod zone;

pub use document::*;
pub use style::*;
pub use zone::*;
