//! Turns scanned content zones into structural events.
//!
//! Element tree: `Document` > `PageSpan` > `Paragraph` > `Span` >
//! characters. Paragraphs and spans open lazily on the first character or
//! insert, so an open paragraph always has content.

use crate::codec::{DocumentHandler, PropertyList, PropertyListVector, PropertyValue};
use crate::diagnostics::Diagnostics;
use crate::model::{
    token, ContentZone, EmbeddedObject, Font, FontFlags, Justification, Metadata, Ruler,
    StyleTable, TabKind, ZoneKind,
};
use crate::scanner::{ContentZoneScanner, FootnoteTable};
use encoding_rs::Encoding;

/// Element names.
pub mod element {
    pub const DOCUMENT: &str = "Document";
    pub const PAGE_SPAN: &str = "PageSpan";
    pub const PARAGRAPH: &str = "Paragraph";
    pub const SPAN: &str = "Span";
    pub const FOOTNOTE: &str = "Footnote";
    pub const HEADER: &str = "Header";
    pub const FOOTER: &str = "Footer";
    pub const FIELD: &str = "Field";
    pub const OBJECT: &str = "Object";
    pub const TAB: &str = "Tab";
    pub const LINE_BREAK: &str = "LineBreak";
    pub const SOFT_HYPHEN: &str = "SoftHyphen";
    pub const PAGE_BREAK: &str = "PageBreak";
    pub const COLUMN_BREAK: &str = "ColumnBreak";
    pub const CELL_BREAK: &str = "CellBreak";
    pub const ROW_BREAK: &str = "RowBreak";
}

/// Field type property and its values.
pub mod field {
    pub const TYPE_KEY: &str = "text:field-type";
    pub const ID_KEY: &str = "unmwaw:field-id";
    pub const PAGE_NUMBER: &str = "text:page-number";
    pub const PAGE_COUNT: &str = "text:page-count";
    pub const DATE: &str = "text:date";
    pub const TIME: &str = "text:time";
    pub const TITLE: &str = "text:title";
    pub const USER: &str = "text:user-defined";
}

/// Points per inch.
const POINTS_PER_INCH: f64 = 72.0;
/// Page margin in inches.
const PAGE_MARGIN: f64 = 1.0;

/// QuickDraw's eight basic colors, by color id.
const PALETTE: [&str; 8] = [
    "#000000", "#ffffff", "#ff0000", "#00ff00", "#0000ff", "#00ffff", "#ff00ff", "#ffff00",
];

/// Everything the writer reads besides the main text.
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    pub table: &'a StyleTable,
    /// Notes, headers and footers keyed by marker position
    pub notes: &'a FootnoteTable,
    /// Buffer the note zones point into (offsets are absolute)
    pub note_data: &'a [u8],
    pub objects: &'a [EmbeddedObject],
    pub metadata: &'a Metadata,
    /// Page width in inches
    pub page_width: f64,
    /// Page height in inches
    pub page_height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Script {
    #[default]
    Normal,
    Super,
    Sub,
}

#[derive(Debug, Clone, Default)]
struct Flow {
    paragraph: bool,
    span: bool,
    font: Option<usize>,
    ruler: Option<usize>,
    style: Option<usize>,
    script: Script,
    in_note: bool,
}

/// Writes a document's events to a handler.
pub struct DocumentWriter<'a, H: DocumentHandler> {
    handler: H,
    layout: Layout<'a>,
    scanner: ContentZoneScanner,
    encoding: &'static Encoding,
    flow: Flow,
    footnotes: i32,
}

impl<'a, H: DocumentHandler> DocumentWriter<'a, H> {
    pub fn new(
        handler: H,
        layout: Layout<'a>,
        scanner: ContentZoneScanner,
        encoding: &'static Encoding,
    ) -> Self {
        Self {
            handler,
            layout,
            scanner,
            encoding,
            flow: Flow::default(),
            footnotes: 0,
        }
    }

    /// Returns the handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Writes the whole document around the main text `zones`.
    ///
    /// `data` is the scanned buffer and `base` the offset its zones were
    /// scanned with.
    pub fn write_document(
        &mut self,
        data: &[u8],
        base: i64,
        zones: &[ContentZone],
        diagnostics: &mut Diagnostics,
    ) {
        let metadata = self.layout.metadata.to_properties();
        self.handler.start_element(element::DOCUMENT, &metadata);

        let page = PropertyList::new()
            .with("fo:page-width", PropertyValue::inches(self.layout.page_width))
            .with("fo:page-height", PropertyValue::inches(self.layout.page_height))
            .with("fo:margin-left", PropertyValue::inches(PAGE_MARGIN))
            .with("fo:margin-right", PropertyValue::inches(PAGE_MARGIN))
            .with("fo:margin-top", PropertyValue::inches(PAGE_MARGIN))
            .with("fo:margin-bottom", PropertyValue::inches(PAGE_MARGIN));
        self.handler.start_element(element::PAGE_SPAN, &page);

        self.flow = self.initial_flow(false);
        self.write_flow(data, base, zones, diagnostics);
        self.close_paragraph();

        self.handler.end_element(element::PAGE_SPAN);
        self.handler.end_element(element::DOCUMENT);
    }

    fn initial_flow(&self, in_note: bool) -> Flow {
        let table = self.layout.table;
        let style = (table.style_count() > 0).then_some(0);
        let base = style.and_then(|id| table.style(id));
        Flow {
            font: base
                .and_then(|s| s.font)
                .or((table.font_count() > 0).then_some(0)),
            ruler: base
                .and_then(|s| s.ruler)
                .or((table.ruler_count() > 0).then_some(0)),
            style,
            in_note,
            ..Flow::default()
        }
    }

    fn write_flow(
        &mut self,
        data: &[u8],
        base: i64,
        zones: &[ContentZone],
        diagnostics: &mut Diagnostics,
    ) {
        for zone in zones {
            match zone.kind {
                ZoneKind::Text => {
                    let text = self.scanner.text_of(data, base, zone, self.encoding);
                    self.write_text(&text);
                }
                ZoneKind::FormatChange => {
                    self.close_span();
                    self.flow.font = usize::try_from(zone.aux).ok();
                }
                ZoneKind::RulerChange => self.flow.ruler = usize::try_from(zone.aux).ok(),
                ZoneKind::Superscript => self.toggle_script(Script::Super),
                ZoneKind::Subscript => self.toggle_script(Script::Sub),
                ZoneKind::SoftHyphen => self.insert(element::SOFT_HYPHEN),
                ZoneKind::PageBreak => {
                    self.close_paragraph();
                    let name = if zone.aux == 1 {
                        element::COLUMN_BREAK
                    } else {
                        element::PAGE_BREAK
                    };
                    self.handler.insert_element(name);
                }
                ZoneKind::TableMarker => {
                    let name = if zone.aux == 1 {
                        element::ROW_BREAK
                    } else {
                        element::CELL_BREAK
                    };
                    self.insert(name);
                }
                ZoneKind::Footnote | ZoneKind::Header | ZoneKind::Footer => {
                    self.write_note(zone, diagnostics)
                }
                ZoneKind::Field => {
                    let props = PropertyList::new()
                        .with(field::TYPE_KEY, field::USER)
                        .with(field::ID_KEY, zone.aux);
                    self.write_field(&props, None);
                }
                ZoneKind::Token => self.write_token(zone, diagnostics),
                ZoneKind::Picture => self.write_picture(zone, diagnostics),
            }
        }
    }

    fn write_text(&mut self, text: &str) {
        let mut run = String::new();
        for c in text.chars() {
            match c {
                '\r' => {
                    self.flush(&mut run);
                    self.open_paragraph();
                    self.close_paragraph();
                }
                '\n' => {
                    self.flush(&mut run);
                    self.insert(element::LINE_BREAK);
                }
                '\t' => {
                    self.flush(&mut run);
                    self.insert(element::TAB);
                }
                c if c.is_control() => {}
                c => run.push(c),
            }
        }
        self.flush(&mut run);
    }

    fn flush(&mut self, run: &mut String) {
        if !run.is_empty() {
            self.open_span();
            self.handler.characters(run);
            run.clear();
        }
    }

    fn toggle_script(&mut self, script: Script) {
        self.close_span();
        self.flow.script = if self.flow.script == script {
            Script::Normal
        } else {
            script
        };
    }

    fn write_note(&mut self, zone: &ContentZone, diagnostics: &mut Diagnostics) {
        let name = match zone.kind {
            ZoneKind::Footnote => element::FOOTNOTE,
            ZoneKind::Header => element::HEADER,
            _ => element::FOOTER,
        };
        if self.flow.in_note {
            diagnostics.warn_once(
                "emit-nested-note",
                format!("{} marker inside a note is ignored", name),
            );
            return;
        }
        let notes = self.layout.notes;
        let Some(note) = notes.lookup(zone.begin) else {
            diagnostics.warn_once(
                "emit-unresolved-note",
                format!("no text for the {} marker at {:#x}", name, zone.begin),
            );
            return;
        };

        let mut props = PropertyList::new();
        if zone.kind == ZoneKind::Footnote {
            self.footnotes += 1;
            props.insert("text:note-number", self.footnotes);
            props.insert("unmwaw:resource-id", note.id);
            self.open_span();
        } else {
            self.close_paragraph();
            props.insert("unmwaw:resource-id", note.id);
        }
        self.handler.start_element(name, &props);

        let fresh = self.initial_flow(true);
        let saved = std::mem::replace(&mut self.flow, fresh);
        let note_data = self.layout.note_data;
        self.write_flow(note_data, 0, &note.zones, diagnostics);
        self.close_paragraph();
        self.flow = saved;

        self.handler.end_element(name);
    }

    fn write_token(&mut self, zone: &ContentZone, diagnostics: &mut Diagnostics) {
        let kind = match zone.aux {
            token::PAGE_NUMBER => field::PAGE_NUMBER,
            token::PAGE_COUNT => field::PAGE_COUNT,
            token::DATE => field::DATE,
            token::TIME => field::TIME,
            token::TITLE => field::TITLE,
            other => {
                diagnostics.record_unknown(
                    "emit-token",
                    format!("unknown token kind {} at {:#x}", other, zone.begin),
                );
                return;
            }
        };
        let props = PropertyList::new().with(field::TYPE_KEY, kind);
        let metadata = self.layout.metadata;
        let title = metadata.title.as_deref();
        let text = if kind == field::TITLE { title } else { None };
        self.write_field(&props, text);
    }

    fn write_field(&mut self, props: &PropertyList, text: Option<&str>) {
        self.open_span();
        self.handler.start_element(element::FIELD, props);
        if let Some(text) = text {
            self.handler.characters(text);
        }
        self.handler.end_element(element::FIELD);
    }

    fn write_picture(&mut self, zone: &ContentZone, diagnostics: &mut Diagnostics) {
        let objects = self.layout.objects;
        let Some((index, object)) = objects.iter().enumerate().find(|(_, o)| o.id == zone.aux)
        else {
            diagnostics.record_malformed(format!(
                "picture {} anchored at {:#x} does not exist",
                zone.aux, zone.begin
            ));
            return;
        };
        let props = PropertyList::new()
            .with("unmwaw:object-index", index as i32)
            .with("unmwaw:mime-type", object.mime_type.as_str())
            .with("svg:width", PropertyValue::inches(object.width))
            .with("svg:height", PropertyValue::inches(object.height));
        self.open_span();
        self.handler.start_element(element::OBJECT, &props);
        self.handler.end_element(element::OBJECT);
    }

    fn insert(&mut self, name: &str) {
        self.open_span();
        self.handler.insert_element(name);
    }

    fn open_paragraph(&mut self) {
        if self.flow.paragraph {
            return;
        }
        let table = self.layout.table;
        let ruler = self.flow.ruler.and_then(|id| table.ruler(id));
        let (props, tabs) = ruler.map(paragraph_properties).unwrap_or_default();
        if tabs.is_empty() {
            self.handler.start_element(element::PARAGRAPH, &props);
        } else {
            self.handler
                .start_element_with_vector(element::PARAGRAPH, &props, &tabs);
        }
        self.flow.paragraph = true;
    }

    fn open_span(&mut self) {
        self.open_paragraph();
        if self.flow.span {
            return;
        }
        let table = self.layout.table;
        let font = self.flow.font.and_then(|id| table.font(id));
        let mut props = font.map(span_properties).unwrap_or_default();
        match self.flow.script {
            Script::Super => {
                props.insert("style:text-position", "super 58%");
            }
            Script::Sub => {
                props.insert("style:text-position", "sub 58%");
            }
            Script::Normal => {}
        }
        self.handler.start_element(element::SPAN, &props);
        self.flow.span = true;
    }

    fn close_span(&mut self) {
        if self.flow.span {
            self.handler.end_element(element::SPAN);
            self.flow.span = false;
        }
    }

    fn close_paragraph(&mut self) {
        self.close_span();
        if !self.flow.paragraph {
            return;
        }
        self.handler.end_element(element::PARAGRAPH);
        self.flow.paragraph = false;

        // The next paragraph follows the current style's successor.
        let table = self.layout.table;
        if let Some(next) = self
            .flow
            .style
            .and_then(|id| table.style(id))
            .and_then(|s| s.next_id)
        {
            self.flow.style = Some(next);
            if let Some(ruler) = table.style(next).and_then(|s| s.ruler) {
                self.flow.ruler = Some(ruler);
            }
        }
    }
}

fn points_to_inches(points: i16) -> PropertyValue {
    PropertyValue::inches(f64::from(points) / POINTS_PER_INCH)
}

/// Paragraph properties and tab stops of a ruler.
pub fn paragraph_properties(ruler: &Ruler) -> (PropertyList, PropertyListVector) {
    let align = match ruler.justification {
        Justification::Left => "left",
        Justification::Center => "center",
        Justification::Right => "end",
        Justification::Full => "justify",
    };
    let mut props = PropertyList::new()
        .with("fo:text-align", align)
        .with("fo:margin-left", points_to_inches(ruler.left_margin))
        .with("fo:margin-right", points_to_inches(ruler.right_margin))
        .with("fo:text-indent", points_to_inches(ruler.first_indent));
    if ruler.line_spacing > 0 {
        props.insert(
            "fo:line-height",
            PropertyValue::percent(f64::from(ruler.line_spacing) / 100.0),
        );
    }
    if ruler.space_before != 0 {
        props.insert(
            "fo:margin-top",
            PropertyValue::points(f64::from(ruler.space_before)),
        );
    }
    if ruler.space_after != 0 {
        props.insert(
            "fo:margin-bottom",
            PropertyValue::points(f64::from(ruler.space_after)),
        );
    }

    let tabs = ruler
        .tabs
        .iter()
        .map(|tab| {
            let kind = match tab.kind {
                TabKind::Left => "left",
                TabKind::Center => "center",
                TabKind::Right => "right",
                TabKind::Decimal => "char",
            };
            let mut stop = PropertyList::new()
                .with("style:position", points_to_inches(tab.position))
                .with("style:type", kind);
            if tab.kind == TabKind::Decimal {
                stop.insert("style:char", ".");
            }
            if tab.leader != 0 {
                stop.insert("style:leader-text", char::from(tab.leader).to_string());
            }
            stop
        })
        .collect();
    (props, tabs)
}

/// Span properties of a font.
pub fn span_properties(font: &Font) -> PropertyList {
    let mut props = PropertyList::new();
    if let Some(name) = mac_font_name(font.family) {
        props.insert("style:font-name", name);
    }
    if font.size > 0 {
        props.insert("fo:font-size", PropertyValue::points(f64::from(font.size)));
    }
    if font.flags.contains(FontFlags::BOLD) {
        props.insert("fo:font-weight", "bold");
    }
    if font.flags.contains(FontFlags::ITALIC) {
        props.insert("fo:font-style", "italic");
    }
    if font.flags.contains(FontFlags::UNDERLINE) {
        props.insert("style:text-underline-type", "single");
    }
    if font.flags.contains(FontFlags::OUTLINE) {
        props.insert("style:text-outline", true);
    }
    if font.flags.contains(FontFlags::SHADOW) {
        props.insert("fo:text-shadow", "1pt 1pt");
    }
    if font.flags.contains(FontFlags::STRIKEOUT) {
        props.insert("style:text-line-through-type", "single");
    }
    if font.flags.contains(FontFlags::SUPERSCRIPT) {
        props.insert("style:text-position", "super 58%");
    } else if font.flags.contains(FontFlags::SUBSCRIPT) {
        props.insert("style:text-position", "sub 58%");
    }
    if let Some(color) = PALETTE.get(usize::from(font.color_id)) {
        props.insert("fo:color", *color);
    }
    if font.spacing != 0 {
        props.insert(
            "fo:letter-spacing",
            PropertyValue::points(f64::from(font.spacing)),
        );
    }
    props
}

/// Name of a classic Macintosh font family id.
pub fn mac_font_name(family: u16) -> Option<&'static str> {
    Some(match family {
        0 => "Chicago",
        2 => "New York",
        1 | 3 => "Geneva",
        4 => "Monaco",
        5 => "Venice",
        6 => "London",
        7 => "Athens",
        8 => "San Francisco",
        9 => "Toronto",
        11 => "Cairo",
        12 => "Los Angeles",
        20 => "Times",
        21 => "Helvetica",
        22 => "Courier",
        23 => "Symbol",
        24 => "Mobile",
        _ => return None,
    })
}
