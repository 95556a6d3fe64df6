//! Text stream scanning.
//!
//! A text zone is a mixture of plain characters and embedded control codes.
//! The scanner walks it once and produces a flat, ordered list of
//! [`ContentZone`]s: text runs, single-byte markers, and structured records
//! whose end is found by looking for a terminator code rather than a
//! declared length.
//!
//! Control codes (low nibble):
//!
//! | code  | meaning                          | operand             |
//! |-------|----------------------------------|---------------------|
//! | 0     | font reference                   | `u16` font index    |
//! | 1..=6 | soft hyphen, footnote, header, footer, superscript, subscript | none |
//! | 7     | terminator of structured records | none                |
//! | 8     | inline ruler record              | ruler record        |
//! | 9     | token                            | `u16` token kind    |
//! | A     | table marker                     | `u16` cell/row      |
//! | B     | inline font record               | font record         |
//! | C     | picture anchor                   | `i16` picture id    |
//! | D     | field                            | `u16` field id      |
//! | E     | ruler reference                  | `u16` ruler index   |
//!
//! Plain `0x0C` and `0x0B` bytes are page and column breaks.

mod footnote;

pub use footnote::{FootnoteTable, NoteEntry};

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::model::{ContentZone, Font, Ruler, StyleTable, ZoneKind};
use crate::stream::ByteStream;
use bytes::Bytes;
use encoding_rs::Encoding;

/// Control code values.
pub mod code {
    pub const FONT_REF: u8 = 0x0;
    pub const SOFT_HYPHEN: u8 = 0x1;
    pub const FOOTNOTE: u8 = 0x2;
    pub const HEADER: u8 = 0x3;
    pub const FOOTER: u8 = 0x4;
    pub const SUPERSCRIPT: u8 = 0x5;
    pub const SUBSCRIPT: u8 = 0x6;
    pub const TERMINATOR: u8 = 0x7;
    pub const RULER: u8 = 0x8;
    pub const TOKEN: u8 = 0x9;
    pub const TABLE_MARKER: u8 = 0xA;
    pub const FONT_RECORD: u8 = 0xB;
    pub const PICTURE: u8 = 0xC;
    pub const FIELD: u8 = 0xD;
    pub const RULER_REF: u8 = 0xE;
}

/// Page break byte.
pub const PAGE_BREAK: u8 = 0x0C;
/// Column break byte.
pub const COLUMN_BREAK: u8 = 0x0B;

/// How control codes are embedded in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeConvention {
    /// Every byte in `0xF0..=0xFF` is a control code.
    HighNibble,
    /// A sentinel byte followed by the code; a doubled sentinel is a literal.
    Prefixed(u8),
}

/// One lexical unit of the text stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Text(usize),
    Control { code: u8, width: usize },
}

/// Classifies a text stream into content zones.
#[derive(Debug, Clone, Copy)]
pub struct ContentZoneScanner {
    escape: EscapeConvention,
}

impl ContentZoneScanner {
    /// Creates a scanner for the given control-code convention.
    pub fn new(escape: EscapeConvention) -> Self {
        Self { escape }
    }

    /// Scans `data`, whose first byte sits at absolute offset `base`.
    ///
    /// Inline font and ruler records are appended to `table`. Malformed
    /// records are skipped and reported; the scan only fails if the data
    /// ends inside a record whose minimum size cannot be met.
    pub fn scan(
        &self,
        data: &[u8],
        base: i64,
        table: &mut StyleTable,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<ContentZone>> {
        let mut zones = Vec::new();
        let mut text_start: Option<usize> = None;
        let mut i = 0;

        while i < data.len() {
            if data[i] == PAGE_BREAK || data[i] == COLUMN_BREAK {
                flush_text(&mut zones, &mut text_start, i, base);
                let aux = i32::from(data[i] == COLUMN_BREAK);
                let at = base + i as i64;
                zones.push(ContentZone::new(ZoneKind::PageBreak, at, at, aux));
                i += 1;
                continue;
            }

            let (ctrl, width) = match self.lex(data, i) {
                Lexeme::Text(width) => {
                    text_start.get_or_insert(i);
                    i += width;
                    continue;
                }
                Lexeme::Control { code, width } => (code, width),
            };
            flush_text(&mut zones, &mut text_start, i, base);
            let start = i;
            i += width;

            match ctrl {
                code::FONT_REF => {
                    if data.len() - i < 2 {
                        return Err(Error::StreamExhausted {
                            offset: base + i as i64,
                            needed: (2 - (data.len() - i)) as i64,
                        });
                    }
                    let id = u16::from_be_bytes([data[i], data[i + 1]]) as usize;
                    i += 2;
                    if id < table.font_count() {
                        zones.push(self.zone(ZoneKind::FormatChange, base, start, i, id as i32));
                    } else {
                        diagnostics.record_malformed(format!(
                            "font reference {} at {:#x} exceeds the font table ({})",
                            id,
                            base + start as i64,
                            table.font_count()
                        ));
                    }
                }
                code::SOFT_HYPHEN..=code::SUBSCRIPT => {
                    let kind = match ctrl {
                        code::SOFT_HYPHEN => ZoneKind::SoftHyphen,
                        code::FOOTNOTE => ZoneKind::Footnote,
                        code::HEADER => ZoneKind::Header,
                        code::FOOTER => ZoneKind::Footer,
                        code::SUPERSCRIPT => ZoneKind::Superscript,
                        _ => ZoneKind::Subscript,
                    };
                    zones.push(self.zone(kind, base, start, i, 0));
                }
                code::TERMINATOR => {
                    diagnostics.warn_once(
                        "scan-stray-terminator",
                        format!("stray terminator at {:#x}", base + start as i64),
                    );
                }
                _ => {
                    let (payload_end, end) = match self.find_terminator(data, i) {
                        Some((pos, w)) => (pos, pos + w),
                        None => {
                            let remaining = data.len() - i;
                            let min = min_record_size(ctrl);
                            if remaining < min {
                                return Err(Error::StreamExhausted {
                                    offset: base + i as i64,
                                    needed: (min - remaining) as i64,
                                });
                            }
                            diagnostics.warn_once(
                                "scan-unterminated",
                                format!("unterminated record at {:#x}", base + start as i64),
                            );
                            (data.len(), data.len())
                        }
                    };
                    let payload = &data[i..payload_end];
                    if let Some(zone) =
                        self.structured(ctrl, payload, base, start, end, table, diagnostics)
                    {
                        zones.push(zone);
                    }
                    i = end;
                }
            }
        }
        flush_text(&mut zones, &mut text_start, data.len(), base);
        Ok(zones)
    }

    /// Decodes the characters of a text zone.
    ///
    /// `data` must be the buffer that was scanned with the same `base`.
    pub fn text_of(
        &self,
        data: &[u8],
        base: i64,
        zone: &ContentZone,
        encoding: &'static Encoding,
    ) -> String {
        let begin = (zone.begin - base).max(0) as usize;
        let end = ((zone.end - base).max(0) as usize).min(data.len());
        if begin >= end {
            return String::new();
        }
        let raw = &data[begin..end];
        match self.escape {
            EscapeConvention::Prefixed(sentinel) => {
                let mut unescaped = Vec::with_capacity(raw.len());
                let mut j = 0;
                while j < raw.len() {
                    unescaped.push(raw[j]);
                    j += if raw[j] == sentinel && raw.get(j + 1) == Some(&sentinel) {
                        2
                    } else {
                        1
                    };
                }
                encoding.decode_without_bom_handling(&unescaped).0.into_owned()
            }
            EscapeConvention::HighNibble => encoding.decode_without_bom_handling(raw).0.into_owned(),
        }
    }

    fn lex(&self, data: &[u8], i: usize) -> Lexeme {
        let byte = data[i];
        match self.escape {
            EscapeConvention::HighNibble if byte >= 0xF0 => Lexeme::Control {
                code: byte & 0x0F,
                width: 1,
            },
            EscapeConvention::Prefixed(sentinel) if byte == sentinel => match data.get(i + 1) {
                Some(&next) if next == sentinel => Lexeme::Text(2),
                Some(&next) => Lexeme::Control {
                    code: next & 0x0F,
                    width: 2,
                },
                None => Lexeme::Text(1),
            },
            _ => Lexeme::Text(1),
        }
    }

    /// Position and width of the next terminator at or after `from`.
    fn find_terminator(&self, data: &[u8], from: usize) -> Option<(usize, usize)> {
        let mut j = from;
        while j < data.len() {
            match self.lex(data, j) {
                Lexeme::Control {
                    code: code::TERMINATOR,
                    width,
                } => return Some((j, width)),
                Lexeme::Control { width, .. } | Lexeme::Text(width) => j += width,
            }
        }
        None
    }

    fn zone(&self, kind: ZoneKind, base: i64, start: usize, end: usize, aux: i32) -> ContentZone {
        ContentZone::new(kind, base + start as i64, base + end as i64, aux)
    }

    #[allow(clippy::too_many_arguments)]
    fn structured(
        &self,
        ctrl: u8,
        payload: &[u8],
        base: i64,
        start: usize,
        end: usize,
        table: &mut StyleTable,
        diagnostics: &mut Diagnostics,
    ) -> Option<ContentZone> {
        let at = base + start as i64;
        if ctrl > code::RULER_REF {
            diagnostics.record_unknown(
                "scan-unknown-code",
                format!("unknown control code {:#x} at {:#x}", ctrl, at),
            );
            return None;
        }
        if payload.len() < min_record_size(ctrl) {
            diagnostics.record_malformed(format!(
                "record {:#x} at {:#x} is too short ({} bytes)",
                ctrl,
                at,
                payload.len()
            ));
            return None;
        }
        let word = u16::from_be_bytes([payload[0], payload[1]]);

        let (kind, aux) = match ctrl {
            code::RULER => {
                let mut input = ByteStream::new(Bytes::copy_from_slice(payload));
                match Ruler::read(&mut input, diagnostics) {
                    Ok(ruler) => (ZoneKind::RulerChange, table.push_ruler(ruler) as i32),
                    Err(err) => {
                        diagnostics.record_malformed(format!("ruler at {:#x}: {}", at, err));
                        return None;
                    }
                }
            }
            code::FONT_RECORD => {
                let mut input = ByteStream::new(Bytes::copy_from_slice(payload));
                match Font::read(&mut input) {
                    Ok(font) => (ZoneKind::FormatChange, table.push_font(font) as i32),
                    Err(err) => {
                        diagnostics.record_malformed(format!("font at {:#x}: {}", at, err));
                        return None;
                    }
                }
            }
            code::TOKEN => (ZoneKind::Token, i32::from(word)),
            code::TABLE_MARKER if word <= 1 => (ZoneKind::TableMarker, i32::from(word)),
            code::TABLE_MARKER => {
                diagnostics.record_malformed(format!("table marker {} at {:#x}", word, at));
                return None;
            }
            code::PICTURE => (ZoneKind::Picture, i32::from(word as i16)),
            code::FIELD => (ZoneKind::Field, i32::from(word)),
            _ if usize::from(word) < table.ruler_count() => (ZoneKind::RulerChange, i32::from(word)),
            _ => {
                diagnostics.record_malformed(format!(
                    "ruler reference {} at {:#x} exceeds the ruler table ({})",
                    word,
                    at,
                    table.ruler_count()
                ));
                return None;
            }
        };
        log::trace!("{:?} at {:#x} aux={}", kind, at, aux);
        Some(self.zone(kind, base, start, end, aux))
    }
}

/// Minimum payload size of a structured record.
fn min_record_size(ctrl: u8) -> usize {
    match ctrl {
        code::RULER => Ruler::MIN_SIZE,
        code::FONT_RECORD => Font::RECORD_SIZE,
        _ => 2,
    }
}

fn flush_text(zones: &mut Vec<ContentZone>, text_start: &mut Option<usize>, at: usize, base: i64) {
    if let Some(start) = text_start.take() {
        if at > start {
            zones.push(ContentZone::new(
                ZoneKind::Text,
                base + start as i64,
                base + at as i64,
                0,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(data: &[u8]) -> (Vec<ContentZone>, StyleTable, Diagnostics) {
        let mut table = StyleTable::new();
        table.push_font(Font::default());
        table.push_ruler(Ruler::default());
        let mut diag = Diagnostics::new();
        let zones = ContentZoneScanner::new(EscapeConvention::HighNibble)
            .scan(data, 100, &mut table, &mut diag)
            .unwrap();
        (zones, table, diag)
    }

    fn kinds(zones: &[ContentZone]) -> Vec<ZoneKind> {
        zones.iter().map(|z| z.kind).collect()
    }

    fn assert_ordered(zones: &[ContentZone]) {
        for pair in zones.windows(2) {
            assert!(pair[0].end <= pair[1].begin, "{:?} overlaps {:?}", pair[0], pair[1]);
            assert!(pair[0].begin < pair[1].begin || pair[0].is_empty());
        }
    }

    #[test]
    fn test_plain_text_is_one_zone() {
        let (zones, _, diag) = scan(b"Hello\rWorld\t!");
        assert_eq!(zones, vec![ContentZone::new(ZoneKind::Text, 100, 113, 0)]);
        assert!(diag.is_clean());
    }

    #[test]
    fn test_font_reference_and_flags() {
        let (zones, _, _) = scan(b"ab\xF0\x00\x00cd\xF2ef\xF5g\xF1");
        assert_eq!(
            kinds(&zones),
            vec![
                ZoneKind::Text,
                ZoneKind::FormatChange,
                ZoneKind::Text,
                ZoneKind::Footnote,
                ZoneKind::Text,
                ZoneKind::Superscript,
                ZoneKind::Text,
                ZoneKind::SoftHyphen,
            ]
        );
        assert_eq!(zones[1], ContentZone::new(ZoneKind::FormatChange, 102, 105, 0));
        assert_eq!(zones[3], ContentZone::new(ZoneKind::Footnote, 107, 108, 0));
        assert_ordered(&zones);
    }

    #[test]
    fn test_breaks_are_zero_length() {
        let (zones, _, _) = scan(b"a\x0Cb\x0Bc");
        assert_eq!(zones.len(), 5);
        assert_eq!(zones[1], ContentZone::new(ZoneKind::PageBreak, 101, 101, 0));
        assert_eq!(zones[3], ContentZone::new(ZoneKind::PageBreak, 103, 103, 1));
        assert_eq!(zones[4], ContentZone::new(ZoneKind::Text, 104, 105, 0));
        assert_ordered(&zones);
    }

    #[test]
    fn test_inline_records_grow_tables() {
        let mut data = b"x\xFB".to_vec();
        data.extend_from_slice(&[0, 3, 0, 14, 0, 1, 0, 0, 0, 0]);
        data.push(0xF7);
        data.extend_from_slice(b"\xF8");
        data.extend_from_slice(&[1, 0, 0, 36, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        data.extend_from_slice(b"\xF7y");

        let (zones, table, diag) = scan(&data);
        assert!(diag.is_clean());
        assert_eq!(
            kinds(&zones),
            vec![ZoneKind::Text, ZoneKind::FormatChange, ZoneKind::RulerChange, ZoneKind::Text]
        );
        assert_eq!(zones[1].aux, 1);
        assert_eq!(table.font(1).unwrap().size, 14);
        assert_eq!(zones[2].aux, 1);
        assert_eq!(table.ruler(1).unwrap().left_margin, 36);
        assert_eq!(zones[3].begin, 100 + data.len() as i64 - 1);
        assert_ordered(&zones);
    }

    #[test]
    fn test_short_record_is_skipped() {
        // A ruler needs 16 bytes; this one has 3.
        let (zones, table, diag) = scan(b"a\xF8\x01\x02\x03\xF7b");
        assert_eq!(kinds(&zones), vec![ZoneKind::Text, ZoneKind::Text]);
        assert_eq!(table.ruler_count(), 1);
        assert_eq!(diag.malformed_count(), 1);
    }

    #[test]
    fn test_out_of_range_reference_is_dropped() {
        let (zones, _, diag) = scan(b"a\xF0\x00\x05b\xFE\x00\x09\xF7");
        assert_eq!(kinds(&zones), vec![ZoneKind::Text, ZoneKind::Text]);
        assert_eq!(diag.malformed_count(), 2);
    }

    #[test]
    fn test_tokens_fields_pictures_tables() {
        let (zones, _, _) = scan(b"\xF9\x00\x01\xF7\xFD\x00\x07\xF7\xFC\x00\x80\xF7\xFA\x00\x01\xF7");
        assert_eq!(
            zones.iter().map(|z| (z.kind, z.aux)).collect::<Vec<_>>(),
            vec![
                (ZoneKind::Token, 1),
                (ZoneKind::Field, 7),
                (ZoneKind::Picture, 128),
                (ZoneKind::TableMarker, 1),
            ]
        );
        assert_ordered(&zones);
    }

    #[test]
    fn test_unknown_code_is_skipped() {
        let (zones, _, diag) = scan(b"a\xFF\x01\x02\xF7b");
        assert_eq!(kinds(&zones), vec![ZoneKind::Text, ZoneKind::Text]);
        assert_eq!(diag.unknown_count(), 1);
        assert_eq!(diag.malformed_count(), 0);
    }

    #[test]
    fn test_truncated_record_aborts() {
        let mut table = StyleTable::new();
        let mut diag = Diagnostics::new();
        let scanner = ContentZoneScanner::new(EscapeConvention::HighNibble);

        let err = scanner.scan(b"ab\xF8\x00\x01", 0, &mut table, &mut diag).unwrap_err();
        assert!(matches!(err, Error::StreamExhausted { offset: 3, needed: 14 }));

        let err = scanner.scan(b"ab\xF0\x01", 0, &mut table, &mut diag).unwrap_err();
        assert!(matches!(err, Error::StreamExhausted { offset: 3, needed: 1 }));
    }

    #[test]
    fn test_unterminated_record_with_enough_bytes() {
        let (zones, _, diag) = scan(b"a\xF9\x00\x02\x00");
        assert_eq!(kinds(&zones), vec![ZoneKind::Text, ZoneKind::Token]);
        assert_eq!(zones[1].end, 105);
        assert_eq!(diag.occurrences("scan-unterminated"), 1);
    }

    #[test]
    fn test_prefixed_convention() {
        let scanner = ContentZoneScanner::new(EscapeConvention::Prefixed(0x1F));
        let mut table = StyleTable::new();
        let mut diag = Diagnostics::new();
        let data = b"a\x1F\x1Fb\x1F\x02c\xF5";
        let zones = scanner.scan(data, 0, &mut table, &mut diag).unwrap();

        assert_eq!(kinds(&zones), vec![ZoneKind::Text, ZoneKind::Footnote, ZoneKind::Text]);
        assert_eq!(zones[0], ContentZone::new(ZoneKind::Text, 0, 4, 0));
        let text = scanner.text_of(data, 0, &zones[0], encoding_rs::MACINTOSH);
        assert_eq!(text, "a\u{1F}b");
        let tail = scanner.text_of(data, 0, &zones[2], encoding_rs::MACINTOSH);
        assert_eq!(tail, "c\u{0131}");
    }

    #[test]
    fn test_text_of_macroman() {
        let data = b"caf\x8E";
        let scanner = ContentZoneScanner::new(EscapeConvention::HighNibble);
        let zone = ContentZone::new(ZoneKind::Text, 10, 14, 0);
        assert_eq!(scanner.text_of(data, 10, &zone, encoding_rs::MACINTOSH), "café");
    }

    #[test]
    fn test_scan_is_repeatable() {
        let data = b"ab\xF0\x00\x00cd\xF2\x0Cef\xF9\x00\x03\xF7gh";
        let (first, _, _) = scan(data);
        let (second, _, _) = scan(data);
        assert_eq!(first, second);
    }
}
