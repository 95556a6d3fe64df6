//! Parsed document and metadata.

use crate::codec::{DocumentHandler, PropertyHandlerDecoder, PropertyList};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::render::{EventRecorder, TextRenderer};
use bytes::Bytes;
use serde::Serialize;

/// A decoded document.
///
/// The body is kept as an encoded event buffer; replay it into any
/// [`DocumentHandler`] to render it.
#[derive(Debug, Clone, Default)]
pub struct DocumentModel {
    /// Document metadata
    pub metadata: Metadata,
    /// Encoded body events
    pub events: Bytes,
    /// Embedded objects, each an encoded mini-document
    pub objects: Vec<EmbeddedObject>,
    /// Number of content zones in the main text
    pub zone_count: usize,
    /// Warnings and dropped-zone counts of the parse
    pub diagnostics: Diagnostics,
}

impl DocumentModel {
    /// Replays the body into `handler`.
    pub fn replay<H: DocumentHandler + ?Sized>(&self, handler: &mut H) -> Result<()> {
        PropertyHandlerDecoder::extended().read_data(&self.events, handler)
    }

    /// Returns the plain text content of the document.
    pub fn plain_text(&self) -> Result<String> {
        let mut renderer = TextRenderer::new();
        self.replay(&mut renderer)?;
        Ok(renderer.finish())
    }

    /// Looks up an embedded object by its resource id.
    pub fn object(&self, id: i32) -> Option<&EmbeddedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Returns the document as JSON: metadata, the decoded event list,
    /// objects and diagnostics.
    pub fn raw_content(&self) -> String {
        let mut recorder = EventRecorder::new();
        if let Err(err) = self.replay(&mut recorder) {
            log::warn!("event buffer is damaged: {}", err);
        }
        let raw = RawContent {
            metadata: &self.metadata,
            events: recorder.events(),
            objects: &self.objects,
            zone_count: self.zone_count,
            diagnostics: &self.diagnostics,
        };
        serde_json::to_string_pretty(&raw).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Serialize)]
struct RawContent<'a> {
    metadata: &'a Metadata,
    events: &'a [crate::render::Event],
    objects: &'a [EmbeddedObject],
    zone_count: usize,
    diagnostics: &'a Diagnostics,
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Keywords
    pub keywords: Vec<String>,
    /// Finder file type
    pub file_type: Option<String>,
    /// Finder creator code
    pub creator: Option<String>,
    /// Name of the format profile used to decode the file
    pub format: Option<String>,
}

impl Metadata {
    /// Properties of the `Document` element.
    pub fn to_properties(&self) -> PropertyList {
        let mut props = PropertyList::new();
        if let Some(title) = &self.title {
            props.insert("dc:title", title.as_str());
        }
        if let Some(author) = &self.author {
            props.insert("dc:creator", author.as_str());
        }
        if let Some(subject) = &self.subject {
            props.insert("dc:subject", subject.as_str());
        }
        if !self.keywords.is_empty() {
            props.insert("meta:keyword", self.keywords.join(", "));
        }
        if let Some(file_type) = &self.file_type {
            props.insert("unmwaw:file-type", file_type.as_str());
        }
        if let Some(creator) = &self.creator {
            props.insert("unmwaw:creator", creator.as_str());
        }
        props
    }
}

/// A picture carried as its own encoded mini-document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmbeddedObject {
    /// Resource id
    pub id: i32,
    /// Width in inches
    pub width: f64,
    /// Height in inches
    pub height: f64,
    pub mime_type: String,
    /// Raw picture data
    #[serde(skip)]
    pub data: Bytes,
    /// Encoded events describing the picture
    #[serde(skip)]
    pub events: Bytes,
}

impl EmbeddedObject {
    /// Replays the object's mini-document into `handler`.
    pub fn replay<H: DocumentHandler + ?Sized>(&self, handler: &mut H) -> Result<()> {
        PropertyHandlerDecoder::extended().read_data(&self.events, handler)
    }
}
