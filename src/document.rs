//! Whole-document decoding pipeline.
//!
//! Forks -> resource index -> side tables -> metadata tree -> pictures ->
//! main text scan -> footnote/header/footer text -> event emission.

use crate::codec::{DocumentHandler, PropertyHandlerEncoder, PropertyList, PropertyValue};
use crate::container::MacForks;
use crate::context::{ParserContext, ParserState};
use crate::diagnostics::Diagnostics;
use crate::emitter::{DocumentWriter, Layout};
use crate::entry::{Entry, Tag};
use crate::error::{Error, Result};
use crate::model::{ContentZone, DocumentModel, EmbeddedObject, Metadata, StyleTable, ZoneKind};
use crate::parse_options::{ErrorMode, ParseOptions};
use crate::recursive::RecursiveZoneReader;
use crate::rsrc::{parse_resource_fork, ResourceZoneIndex};
use crate::scanner::{ContentZoneScanner, FootnoteTable};
use crate::stream::ByteStream;

/// Metadata leaf types of the info tree.
mod info {
    pub const TITLE: &[u8; 4] = b"titl";
    pub const AUTHOR: &[u8; 4] = b"auth";
    pub const SUBJECT: &[u8; 4] = b"subj";
    pub const KEYWORDS: &[u8; 4] = b"keyw";
}

/// Size of a QuickDraw picture header: size, then the bounding box.
const PICT_HEADER: usize = 10;
/// Points per inch.
const POINTS_PER_INCH: f64 = 72.0;

/// Kind of a text sub-document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubDocumentKind {
    Footnote,
    Header,
    Footer,
}

impl SubDocumentKind {
    const ALL: [SubDocumentKind; 3] = [
        SubDocumentKind::Footnote,
        SubDocumentKind::Header,
        SubDocumentKind::Footer,
    ];

    /// Marker zone kind that refers to this sub-document kind.
    pub fn marker(self) -> ZoneKind {
        match self {
            SubDocumentKind::Footnote => ZoneKind::Footnote,
            SubDocumentKind::Header => ZoneKind::Header,
            SubDocumentKind::Footer => ZoneKind::Footer,
        }
    }
}

/// A text sub-document, resolved on demand against its parser.
#[derive(Debug, Clone, PartialEq)]
pub struct SubDocument {
    pub kind: SubDocumentKind,
    /// Resource tag
    pub tag: Tag,
    /// Resource id
    pub id: i32,
    /// Byte range in the resource fork
    pub entry: Entry,
}

/// Decodes one document.
///
/// The parser owns the forks, the resource fork context, the index and the
/// side tables; everything it hands out is borrowed from it.
pub struct DocumentParser {
    options: ParseOptions,
    forks: MacForks,
    ctx: ParserContext,
    index: ResourceZoneIndex,
    table: StyleTable,
    scanner: ContentZoneScanner,
}

impl DocumentParser {
    pub fn new(forks: MacForks, options: ParseOptions) -> Self {
        let resource = forks.resource.clone().unwrap_or_default();
        let ctx = ParserContext::with_profile(ByteStream::new(resource), &options.profile);
        let scanner = ContentZoneScanner::new(options.profile.escape);
        Self {
            options,
            forks,
            ctx,
            index: ResourceZoneIndex::new(),
            table: StyleTable::new(),
            scanner,
        }
    }

    pub fn index(&self) -> &ResourceZoneIndex {
        &self.index
    }

    pub fn style_table(&self) -> &StyleTable {
        &self.table
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.ctx.diagnostics
    }

    /// Indexes the resource fork and loads the side tables.
    ///
    /// A damaged resource fork is fatal in strict mode; otherwise the
    /// document is decoded from its data fork alone.
    pub fn load_resources(&mut self) -> Result<()> {
        if self.forks.resource.is_none() {
            log::debug!("no resource fork");
            return Ok(());
        }
        match parse_resource_fork(&mut self.ctx) {
            Ok(index) => self.index = index,
            Err(err) if self.options.is_lenient() => {
                self.ctx
                    .diagnostics
                    .record_malformed(format!("resource fork ignored: {}", err));
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        let tags = self.options.profile.tags;
        let encoding = self.options.profile.encoding;
        for entry in self.index.get(tags.fonts) {
            if let Some(data) = self.claim(entry) {
                self.table.load_fonts(data, &mut self.ctx.diagnostics);
            }
        }
        for entry in self.index.get(tags.rulers) {
            if let Some(data) = self.claim(entry) {
                self.table.load_rulers(data, &mut self.ctx.diagnostics);
            }
        }
        for entry in self.index.get(tags.styles) {
            if let Some(data) = self.claim(entry) {
                self.table
                    .load_styles(data, encoding, &mut self.ctx.diagnostics);
            }
        }
        self.table.validate_references(&mut self.ctx.diagnostics);
        log::debug!(
            "side tables: {} fonts, {} rulers, {} styles",
            self.table.font_count(),
            self.table.ruler_count(),
            self.table.style_count()
        );
        Ok(())
    }

    /// Marks an indexed entry as consumed and returns its bytes.
    fn claim(&self, entry: &Entry) -> Option<bytes::Bytes> {
        if entry.mark_parsed() {
            log::debug!("{} is read again", entry);
        }
        self.ctx.input.slice(entry)
    }

    /// Reads the document metadata from the info tree.
    pub fn read_metadata(&mut self) -> Metadata {
        let mut metadata = Metadata {
            file_type: self.forks.file_type.map(|t| t.to_string()),
            creator: self.forks.creator.map(|t| t.to_string()),
            format: Some(self.options.profile.name.clone()),
            ..Metadata::default()
        };
        let reader = RecursiveZoneReader::new().with_max_depth(self.options.max_depth);
        let encoding = self.options.profile.encoding;
        let info_tag = self.options.profile.tags.info;
        let entries: Vec<Entry> = self.index.get(info_tag).to_vec();

        for entry in &entries {
            let tree = match reader.read(&mut self.ctx, entry) {
                Ok(tree) => tree,
                Err(err) => {
                    self.ctx
                        .diagnostics
                        .record_malformed(format!("info zone {}: {}", entry, err));
                    continue;
                }
            };
            if let Some(original) = self.index.get_by_id(info_tag, entry.id()) {
                original.mark_parsed();
            }
            for leaf in tree.leaves() {
                let Some(raw) = leaf.payload(&self.ctx.input) else {
                    continue;
                };
                let (text, _) = encoding.decode_without_bom_handling(&raw);
                let text = text.trim_matches(char::from(0)).trim().to_string();
                if text.is_empty() {
                    continue;
                }
                match &leaf.tag().0 {
                    info::TITLE => metadata.title = Some(text),
                    info::AUTHOR => metadata.author = Some(text),
                    info::SUBJECT => metadata.subject = Some(text),
                    info::KEYWORDS => metadata.keywords.extend(
                        text.split(',')
                            .map(str::trim)
                            .filter(|k| !k.is_empty())
                            .map(str::to_string),
                    ),
                    _ => self.ctx.diagnostics.record_unknown(
                        "info-leaf",
                        format!("unknown info leaf {}", leaf.tag()),
                    ),
                }
            }
        }
        metadata
    }

    /// Decodes every picture resource into an embedded object.
    pub fn read_pictures(&mut self) -> Vec<EmbeddedObject> {
        let entries: Vec<Entry> = self
            .index
            .get(self.options.profile.tags.pictures)
            .to_vec();
        let mut objects = Vec::new();
        for entry in &entries {
            let Some(data) = self.claim(entry) else {
                continue;
            };
            if data.len() < PICT_HEADER {
                self.ctx.diagnostics.record_malformed(format!(
                    "picture {} is shorter than its header",
                    entry.id()
                ));
                continue;
            }
            let mut input = ByteStream::new(data.clone());
            let [top, left, bottom, right] = match picture_frame(&mut input) {
                Ok(frame) => frame,
                Err(err) => {
                    self.ctx
                        .diagnostics
                        .record_malformed(format!("picture {}: {}", entry.id(), err));
                    continue;
                }
            };
            if bottom < top || right < left {
                self.ctx.diagnostics.record_malformed(format!(
                    "picture {} has an inverted frame",
                    entry.id()
                ));
                continue;
            }
            let width = f64::from(i32::from(right) - i32::from(left)) / POINTS_PER_INCH;
            let height = f64::from(i32::from(bottom) - i32::from(top)) / POINTS_PER_INCH;
            objects.push(EmbeddedObject {
                id: entry.id(),
                width,
                height,
                mime_type: "image/pict".to_string(),
                events: picture_document(entry.id(), width, height, data.len()),
                data,
            });
        }
        objects
    }

    /// Sub-document descriptors of one kind, in file order.
    pub fn sub_documents(&self, kind: SubDocumentKind) -> Vec<SubDocument> {
        let tags = self.options.profile.tags;
        let tag = match kind {
            SubDocumentKind::Footnote => tags.footnotes,
            SubDocumentKind::Header => tags.headers,
            SubDocumentKind::Footer => tags.footers,
        };
        self.index
            .get(tag)
            .iter()
            .map(|entry| SubDocument {
                kind,
                tag,
                id: entry.id(),
                entry: entry.clone(),
            })
            .collect()
    }

    /// Scans a sub-document's text.
    ///
    /// Zone offsets are absolute positions in the resource fork.
    pub fn resolve(&mut self, sub: &SubDocument) -> Result<Vec<ContentZone>> {
        if !self.ctx.check_entry(&sub.entry) {
            return Err(Error::InvalidPosition {
                pos: sub.entry.end(),
                end: self.ctx.input.size(),
            });
        }
        if let Some(original) = self.index.get_by_id(sub.tag, sub.id) {
            if original.mark_parsed() {
                self.ctx
                    .diagnostics
                    .warn_once("subdoc-reparse", format!("{} is resolved twice", original));
            }
        }
        let data = self
            .ctx
            .input
            .slice(&sub.entry)
            .ok_or_else(|| Error::structure(sub.entry.begin(), "sub-document out of range"))?;
        self.scanner.scan(
            &data,
            sub.entry.begin(),
            &mut self.table,
            &mut self.ctx.diagnostics,
        )
    }

    /// Pairs the n-th marker of each kind with the n-th sub-document.
    fn resolve_notes(&mut self, zones: &[ContentZone]) -> FootnoteTable {
        let mut notes = FootnoteTable::new();
        for kind in SubDocumentKind::ALL {
            let subs = self.sub_documents(kind);
            let markers: Vec<&ContentZone> =
                zones.iter().filter(|z| z.kind == kind.marker()).collect();
            if subs.len() > markers.len() {
                self.ctx.diagnostics.warn(format!(
                    "{} {:?} texts but only {} markers",
                    subs.len(),
                    kind,
                    markers.len()
                ));
            }
            for (marker, sub) in markers.into_iter().zip(&subs) {
                match self.resolve(sub) {
                    Ok(note_zones) => attach_note(
                        &mut notes,
                        marker,
                        sub.id,
                        note_zones,
                        &mut self.ctx.diagnostics,
                    ),
                    Err(err) => self
                        .ctx
                        .diagnostics
                        .record_malformed(format!("{:?} {}: {}", kind, sub.id, err)),
                }
            }
        }
        notes
    }

    /// Runs the whole pipeline.
    pub fn parse(mut self) -> Result<DocumentModel> {
        log::info!(
            "decoding {} document: {:?}, data fork {} bytes, resource fork {} bytes",
            self.options.profile.name,
            self.forks.kind,
            self.forks.data.len(),
            self.forks.resource.as_ref().map_or(0, |r| r.len())
        );
        self.load_resources()?;
        let metadata = self.read_metadata();
        let objects = self.read_pictures();

        let text = self.forks.data.clone();
        let zones = self
            .scanner
            .scan(&text, 0, &mut self.table, &mut self.ctx.diagnostics)?;
        log::debug!("main text: {} zones", zones.len());
        let notes = self.resolve_notes(&zones);

        for (tag, entry) in self.index.unparsed() {
            log::debug!("resource {} {} left unread", tag, entry.id());
        }

        let layout = Layout {
            table: &self.table,
            notes: &notes,
            note_data: self.ctx.input.data(),
            objects: &objects,
            metadata: &metadata,
            page_width: self.ctx.page_width(),
            page_height: self.ctx.page_height(),
        };
        let mut writer = DocumentWriter::new(
            PropertyHandlerEncoder::new(),
            layout,
            self.scanner,
            self.options.profile.encoding,
        );
        writer.write_document(&text, 0, &zones, &mut self.ctx.diagnostics);
        let events = writer.into_handler().finish();

        let diagnostics = std::mem::take(&mut self.ctx.diagnostics);
        if self.options.error_mode == ErrorMode::Strict && diagnostics.malformed_count() > 0 {
            return Err(Error::structure(
                0,
                format!("{} malformed zones dropped", diagnostics.malformed_count()),
            ));
        }
        log::info!(
            "decoded {} zones, {} objects, {} warnings",
            zones.len(),
            objects.len(),
            diagnostics.warnings().len()
        );
        Ok(DocumentModel {
            metadata,
            events,
            objects,
            zone_count: zones.len(),
            diagnostics,
        })
    }
}

/// Registers a resolved note; a note whose marker overlaps another is dropped.
fn attach_note(
    notes: &mut FootnoteTable,
    marker: &ContentZone,
    id: i32,
    zones: Vec<ContentZone>,
    diagnostics: &mut Diagnostics,
) {
    if !notes.insert(marker, id, zones) {
        diagnostics.record_malformed(format!(
            "note {} dropped: marker at {:#x} overlaps another note",
            id, marker.begin
        ));
    }
}

/// Reads the `top, left, bottom, right` frame of a QuickDraw picture.
fn picture_frame(input: &mut ByteStream) -> Result<[i16; 4]> {
    input.read_u16()?;
    Ok([
        input.read_i16()?,
        input.read_i16()?,
        input.read_i16()?,
        input.read_i16()?,
    ])
}

/// Encodes a picture as its own mini-document.
fn picture_document(id: i32, width: f64, height: f64, size: usize) -> bytes::Bytes {
    let mut enc = PropertyHandlerEncoder::new();
    let frame = PropertyList::new()
        .with("unmwaw:resource-id", id)
        .with("svg:width", PropertyValue::inches(width))
        .with("svg:height", PropertyValue::inches(height));
    enc.start_element("Graphic", &frame);
    let image = PropertyList::new()
        .with("unmwaw:mime-type", "image/pict")
        .with("unmwaw:data-size", size as i32);
    enc.start_element("Image", &image);
    enc.end_element("Image");
    enc.end_element("Graphic");
    enc.finish()
}
