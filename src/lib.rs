//! # unmwaw
//!
//! A Rust library for decoding legacy Macintosh word-processor documents
//! into a structured stream of document events.
//!
//! A document is read from its two forks: the data fork carries the text
//! with embedded control codes, the resource fork carries fonts, rulers,
//! styles, notes, pictures and document info. The decoded body is kept as
//! a compact event buffer that can be replayed into any
//! [`DocumentHandler`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use unmwaw::parse_file;
//!
//! fn main() -> unmwaw::Result<()> {
//!     let document = parse_file("memo.mcw")?;
//!
//!     println!("{:?}", document.metadata.title);
//!     println!("{}", document.plain_text()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `container` (default): MacBinary, AppleSingle and AppleDouble unwrapping

pub mod codec;
pub mod container;
pub mod context;
pub mod diagnostics;
pub mod document;
pub mod emitter;
pub mod entry;
pub mod error;
pub mod model;
pub mod parse_options;
pub mod position;
pub mod recursive;
pub mod render;
pub mod rsrc;
pub mod scanner;
pub mod stream;

// Re-exports
pub use codec::{
    DocumentHandler, PropertyHandlerDecoder, PropertyHandlerEncoder, PropertyList,
    PropertyListVector, PropertyValue,
};
pub use container::{ContainerKind, MacForks};
pub use diagnostics::Diagnostics;
pub use document::{DocumentParser, SubDocument, SubDocumentKind};
pub use entry::{Entry, Tag};
pub use error::{Error, ParseStatus, Result};
pub use model::{DocumentModel, EmbeddedObject, Metadata};
pub use parse_options::{ErrorMode, FormatProfile, ParseOptions, ResourceTags};
pub use render::{EventRecorder, TextRenderer};

use bytes::Bytes;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Parses a document from a file path.
///
/// The file may be a MacBinary or AppleSingle container or a bare data
/// fork; a bare data fork picks up an AppleDouble `._name` sidecar when
/// one sits next to it.
///
/// # Example
///
/// ```no_run
/// use unmwaw::parse_file;
///
/// let document = parse_file("memo.mcw")?;
/// println!("Zones: {}", document.zone_count);
/// # Ok::<(), unmwaw::Error>(())
/// ```
pub fn parse_file(path: impl AsRef<Path>) -> Result<DocumentModel> {
    parse_file_with_options(path, ParseOptions::default())
}

/// Parses a document from a file path with custom options.
pub fn parse_file_with_options(
    path: impl AsRef<Path>,
    options: ParseOptions,
) -> Result<DocumentModel> {
    let forks = open_forks(path.as_ref())?;
    parse_forks(forks, options)
}

/// Parses a document from a reader holding a whole container.
pub fn parse_reader<R: Read>(reader: R) -> Result<DocumentModel> {
    parse_forks(MacForks::from_reader(reader)?, ParseOptions::default())
}

/// Parses a document from bytes holding a whole container.
pub fn parse_bytes(data: impl Into<Bytes>) -> Result<DocumentModel> {
    parse_bytes_with_options(data, ParseOptions::default())
}

/// Parses a document from bytes with custom options.
pub fn parse_bytes_with_options(
    data: impl Into<Bytes>,
    options: ParseOptions,
) -> Result<DocumentModel> {
    parse_forks(MacForks::from_bytes(data)?, options)
}

/// Parses a document from already separated forks.
pub fn parse_forks(forks: MacForks, options: ParseOptions) -> Result<DocumentModel> {
    DocumentParser::new(forks, options).parse()
}

/// Extracts plain text from a document file.
///
/// This is a convenience function for when you only need the text content
/// without formatting or structure.
///
/// # Example
///
/// ```no_run
/// use unmwaw::extract_text;
///
/// let text = extract_text("memo.mcw")?;
/// println!("{}", text);
/// # Ok::<(), unmwaw::Error>(())
/// ```
pub fn extract_text(path: impl AsRef<Path>) -> Result<String> {
    parse_file(path)?.plain_text()
}

/// Returns a document's metadata, decoded events and diagnostics as JSON.
pub fn to_json(path: impl AsRef<Path>) -> Result<String> {
    Ok(parse_file(path)?.raw_content())
}

fn open_forks(path: &Path) -> Result<MacForks> {
    let forks = MacForks::open(path)?;
    if forks.resource.is_some() || !cfg!(feature = "container") {
        return Ok(forks);
    }
    match sidecar_path(path) {
        Some(sidecar) if sidecar.is_file() => {
            log::debug!("reading resource fork from {}", sidecar.display());
            let data = std::fs::read(&sidecar)?;
            forks.with_resource_file(Bytes::from(data))
        }
        _ => Ok(forks),
    }
}

/// AppleDouble companion of `path` (`dir/._name`).
fn sidecar_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with("._") {
        return None;
    }
    Some(path.with_file_name(format!("._{}", name)))
}

/// Builder for parsing documents.
///
/// Provides a fluent API for configuring document decoding.
///
/// # Example
///
/// ```no_run
/// use unmwaw::Unmwaw;
///
/// let text = Unmwaw::new()
///     .strict()
///     .with_max_depth(8)
///     .parse("memo.mcw")?
///     .plain_text()?;
/// # Ok::<(), unmwaw::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Unmwaw {
    options: ParseOptions,
    resource_fork: Option<Bytes>,
}

impl Unmwaw {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets lenient error handling (drop malformed zones).
    pub fn lenient(mut self) -> Self {
        self.options = self.options.lenient();
        self
    }

    /// Fails the parse on the first dropped zone.
    pub fn strict(mut self) -> Self {
        self.options = self.options.strict();
        self
    }

    /// Sets the recursion limit for nested zones.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.options = self.options.with_max_depth(depth);
        self
    }

    /// Uses another format profile.
    pub fn with_profile(mut self, profile: FormatProfile) -> Self {
        self.options = self.options.with_profile(profile);
        self
    }

    /// Supplies the resource fork separately (AppleDouble or bare fork).
    pub fn with_resource_fork(mut self, data: impl Into<Bytes>) -> Self {
        self.resource_fork = Some(data.into());
        self
    }

    /// Parses a document from a file path.
    pub fn parse(self, path: impl AsRef<Path>) -> Result<DocumentModel> {
        let forks = open_forks(path.as_ref())?;
        self.parse_forks(forks)
    }

    /// Parses a document held in memory.
    pub fn parse_bytes(self, data: impl Into<Bytes>) -> Result<DocumentModel> {
        let forks = MacForks::from_bytes(data)?;
        self.parse_forks(forks)
    }

    fn parse_forks(self, forks: MacForks) -> Result<DocumentModel> {
        let forks = match self.resource_fork {
            Some(resource) => forks.with_resource_file(resource)?,
            None => forks,
        };
        parse_forks(forks, self.options)
    }
}
