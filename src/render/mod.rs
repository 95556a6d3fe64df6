//! Document handlers that consume the event stream.

mod events;
mod text;

pub use events::{Event, EventRecorder};
pub use text::TextRenderer;

pub use crate::codec::NullHandler;

use crate::error::Result;
use crate::model::DocumentModel;
use std::io::Write;
use std::path::Path;

/// Renders a document as plain text.
pub fn render_text(document: &DocumentModel) -> Result<String> {
    let mut renderer = TextRenderer::new();
    document.replay(&mut renderer)?;
    Ok(renderer.finish())
}

/// Renders a document as plain text and writes it to a file.
pub fn render_to_file(document: &DocumentModel, path: impl AsRef<Path>) -> Result<()> {
    let content = render_text(document)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Renders a document as plain text and writes it to a writer.
pub fn render_to_writer<W: Write>(document: &DocumentModel, writer: &mut W) -> Result<()> {
    let content = render_text(document)?;
    writer.write_all(content.as_bytes())?;
    Ok(())
}
