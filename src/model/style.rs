//! Font, ruler and style side tables.
//!
//! All records are fixed-layout big-endian structures. Content zones refer
//! to entries of these tables by index.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::stream::ByteStream;
use bitflags::bitflags;
use encoding_rs::Encoding;
use serde::Serialize;

bitflags! {
    /// Character style flags of a font record.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
    pub struct FontFlags: u16 {
        const BOLD = 0x0001;
        const ITALIC = 0x0002;
        const UNDERLINE = 0x0004;
        const OUTLINE = 0x0008;
        const SHADOW = 0x0010;
        const SUPERSCRIPT = 0x0020;
        const SUBSCRIPT = 0x0040;
        const STRIKEOUT = 0x0080;
    }
}

/// A character format.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Font {
    /// Macintosh font family id
    pub family: u16,
    /// Size in points
    pub size: u16,
    /// Style flags
    pub flags: FontFlags,
    /// Palette color index (0 = black)
    pub color_id: u16,
    /// Extra letter spacing in points
    pub spacing: i16,
}

impl Font {
    /// Size of a font record.
    pub const RECORD_SIZE: usize = 10;

    /// Reads one font record.
    pub fn read(input: &mut ByteStream) -> Result<Self> {
        let family = input.read_u16()?;
        let size = input.read_u16()?;
        let raw_flags = input.read_u16()?;
        let color_id = input.read_u16()?;
        let spacing = input.read_i16()?;
        Ok(Self {
            family,
            size,
            flags: FontFlags::from_bits_truncate(raw_flags),
            color_id,
            spacing,
        })
    }
}

/// Paragraph justification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Justification {
    #[default]
    Left,
    Center,
    Right,
    Full,
}

impl Justification {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Justification::Left),
            1 => Some(Justification::Center),
            2 => Some(Justification::Right),
            3 => Some(Justification::Full),
            _ => None,
        }
    }
}

/// Tab stop alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TabKind {
    #[default]
    Left,
    Center,
    Right,
    Decimal,
}

/// One tab stop of a ruler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabStop {
    /// Position in points from the left margin
    pub position: i16,
    /// Alignment
    pub kind: TabKind,
    /// Leader character (0 = none)
    pub leader: u8,
}

/// A paragraph format.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ruler {
    pub justification: Justification,
    /// Left margin in points
    pub left_margin: i16,
    /// Right margin in points
    pub right_margin: i16,
    /// First-line indent in points, relative to the left margin
    pub first_indent: i16,
    /// Line spacing in percent (0 = single)
    pub line_spacing: i16,
    /// Space before in points
    pub space_before: i16,
    /// Space after in points
    pub space_after: i16,
    pub tabs: Vec<TabStop>,
}

impl Ruler {
    /// Size of a ruler record without its tab stops.
    pub const MIN_SIZE: usize = 16;
    /// Size of one tab stop.
    pub const TAB_SIZE: usize = 4;

    /// Reads one ruler record, tab stops included.
    pub fn read(input: &mut ByteStream, diagnostics: &mut Diagnostics) -> Result<Self> {
        let begin = input.tell();
        let code = input.read_u8()?;
        let justification = Justification::from_code(code).unwrap_or_else(|| {
            diagnostics.warn_once(
                "ruler-justification",
                format!("unknown justification {} at {:#x}", code, begin),
            );
            Justification::Left
        });
        let _reserved = input.read_u8()?;
        let mut ruler = Self {
            justification,
            left_margin: input.read_i16()?,
            right_margin: input.read_i16()?,
            first_indent: input.read_i16()?,
            line_spacing: input.read_i16()?,
            space_before: input.read_i16()?,
            space_after: input.read_i16()?,
            tabs: Vec::new(),
        };
        let tab_count = input.read_u16()? as usize;
        if (tab_count * Self::TAB_SIZE) as i64 > input.size() - input.tell() {
            return Err(Error::StreamExhausted {
                offset: input.tell(),
                needed: (tab_count * Self::TAB_SIZE) as i64 - (input.size() - input.tell()),
            });
        }
        for _ in 0..tab_count {
            let position = input.read_i16()?;
            let kind = match input.read_u8()? {
                1 => TabKind::Center,
                2 => TabKind::Right,
                3 => TabKind::Decimal,
                _ => TabKind::Left,
            };
            let leader = input.read_u8()?;
            ruler.tabs.push(TabStop {
                position,
                kind,
                leader,
            });
        }
        Ok(ruler)
    }
}

/// A named style combining a font and a ruler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Style {
    pub name: String,
    /// Index into the font table
    pub font: Option<usize>,
    /// Index into the ruler table
    pub ruler: Option<usize>,
    /// Style applied to the following paragraph
    pub next_id: Option<usize>,
}

impl Style {
    /// Smallest possible style record (empty name).
    pub const MIN_SIZE: usize = 7;

    /// Reads one style record.
    pub fn read(input: &mut ByteStream, encoding: &'static Encoding) -> Result<Self> {
        let raw_name = input.read_pascal_string()?;
        let (name, _) = encoding.decode_without_bom_handling(&raw_name);
        let index = |value: i16| usize::try_from(value).ok();
        Ok(Self {
            name: name.into_owned(),
            font: index(input.read_i16()?),
            ruler: index(input.read_i16()?),
            next_id: index(input.read_i16()?),
        })
    }
}

/// Flat, indexable font/ruler/style tables for one document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StyleTable {
    fonts: Vec<Font>,
    rulers: Vec<Ruler>,
    styles: Vec<Style>,
}

impl StyleTable {
    /// Creates empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a font and returns its index.
    pub fn push_font(&mut self, font: Font) -> usize {
        self.fonts.push(font);
        self.fonts.len() - 1
    }

    /// Appends a ruler and returns its index.
    pub fn push_ruler(&mut self, ruler: Ruler) -> usize {
        self.rulers.push(ruler);
        self.rulers.len() - 1
    }

    /// Appends a style and returns its index.
    pub fn push_style(&mut self, style: Style) -> usize {
        self.styles.push(style);
        self.styles.len() - 1
    }

    pub fn font(&self, id: usize) -> Option<&Font> {
        self.fonts.get(id)
    }

    pub fn ruler(&self, id: usize) -> Option<&Ruler> {
        self.rulers.get(id)
    }

    pub fn style(&self, id: usize) -> Option<&Style> {
        self.styles.get(id)
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub fn ruler_count(&self) -> usize {
        self.rulers.len()
    }

    pub fn style_count(&self) -> usize {
        self.styles.len()
    }

    /// Decodes a packed array of font records.
    ///
    /// Returns the number of fonts added. A short trailing record is
    /// dropped with a warning.
    pub fn load_fonts(&mut self, data: bytes::Bytes, diagnostics: &mut Diagnostics) -> usize {
        let count = data.len() / Font::RECORD_SIZE;
        if data.len() % Font::RECORD_SIZE != 0 {
            diagnostics.record_malformed(format!(
                "font table has {} trailing bytes",
                data.len() % Font::RECORD_SIZE
            ));
        }
        let mut input = ByteStream::new(data);
        let mut added = 0;
        for _ in 0..count {
            match Font::read(&mut input) {
                Ok(font) => {
                    self.push_font(font);
                    added += 1;
                }
                Err(err) => {
                    diagnostics.record_malformed(format!("font record: {}", err));
                    break;
                }
            }
        }
        added
    }

    /// Decodes consecutive ruler records until the data is consumed.
    pub fn load_rulers(&mut self, data: bytes::Bytes, diagnostics: &mut Diagnostics) -> usize {
        let mut input = ByteStream::new(data);
        let mut added = 0;
        while !input.at_eos() {
            let begin = input.tell();
            match Ruler::read(&mut input, diagnostics) {
                Ok(ruler) => {
                    self.push_ruler(ruler);
                    added += 1;
                }
                Err(err) => {
                    diagnostics.record_malformed(format!("ruler record at {:#x}: {}", begin, err));
                    break;
                }
            }
        }
        added
    }

    /// Decodes consecutive style records until the data is consumed.
    pub fn load_styles(
        &mut self,
        data: bytes::Bytes,
        encoding: &'static Encoding,
        diagnostics: &mut Diagnostics,
    ) -> usize {
        let mut input = ByteStream::new(data);
        let mut added = 0;
        while !input.at_eos() {
            let begin = input.tell();
            match Style::read(&mut input, encoding) {
                Ok(style) => {
                    self.push_style(style);
                    added += 1;
                }
                Err(err) => {
                    diagnostics.record_malformed(format!("style record at {:#x}: {}", begin, err));
                    break;
                }
            }
        }
        added
    }

    /// Clears style references that point outside the tables.
    pub fn validate_references(&mut self, diagnostics: &mut Diagnostics) {
        let (fonts, rulers, styles) = (self.fonts.len(), self.rulers.len(), self.styles.len());
        for (id, style) in self.styles.iter_mut().enumerate() {
            if style.font.is_some_and(|f| f >= fonts) {
                diagnostics.warn(format!("style {} refers to missing font", id));
                style.font = None;
            }
            if style.ruler.is_some_and(|r| r >= rulers) {
                diagnostics.warn(format!("style {} refers to missing ruler", id));
                style.ruler = None;
            }
            if style.next_id.is_some_and(|n| n >= styles) {
                diagnostics.warn(format!("style {} has a dangling next style", id));
                style.next_id = None;
            }
        }
    }

    /// Follows the `next_id` chain from `id`, stopping at the first repeat.
    pub fn chain(&self, id: usize) -> Vec<usize> {
        let mut seen = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur >= self.styles.len() || seen.contains(&cur) {
                break;
            }
            seen.push(cur);
            current = self.styles[cur].next_id;
        }
        seen
    }
}
