//! Event stream to interchange buffer.

use super::handler::DocumentHandler;
use super::property::{PropertyList, PropertyListVector};
use super::tag;
use bytes::{BufMut, Bytes, BytesMut};

/// Serializes structural events into a single contiguous buffer.
///
/// Integers are 4-byte little-endian, strings are length-prefixed raw bytes
/// and every property value travels as its string form.
#[derive(Debug, Clone, Default)]
pub struct PropertyHandlerEncoder {
    buf: BytesMut,
}

impl PropertyHandlerEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the encoder and returns the buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write_integer(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    /// Writes a length-prefixed string. Strings longer than `i32::MAX`
    /// bytes are cut at that length.
    pub fn write_string(&mut self, s: &str) {
        let len = wire_len(s.len());
        self.write_integer(len);
        self.buf.put_slice(&s.as_bytes()[..len as usize]);
    }

    pub fn write_property(&mut self, key: &str, value: &str) {
        self.write_string(key);
        self.write_string(value);
    }

    pub fn write_property_list(&mut self, list: &PropertyList) {
        let count = wire_len(list.len());
        self.write_integer(count);
        for (key, value) in list.iter().take(count as usize) {
            self.write_property(key, &value.to_wire_string());
        }
    }
}

/// Converts a length or count to its wire form, clamping at `i32::MAX`.
fn wire_len(len: usize) -> i32 {
    i32::try_from(len).unwrap_or_else(|_| {
        log::warn!("{} exceeds the wire limit, keeping the first {}", len, i32::MAX);
        i32::MAX
    })
}

impl DocumentHandler for PropertyHandlerEncoder {
    fn start_element(&mut self, name: &str, properties: &PropertyList) {
        self.buf.put_u8(tag::START);
        self.write_string(name);
        self.write_property_list(properties);
    }

    fn start_element_with_vector(
        &mut self,
        name: &str,
        properties: &PropertyList,
        vector: &PropertyListVector,
    ) {
        self.buf.put_u8(tag::START_WITH_VECTOR);
        self.write_string(name);
        self.write_property_list(properties);
        let count = wire_len(vector.len());
        self.write_integer(count);
        for list in vector.iter().take(count as usize) {
            self.write_property_list(list);
        }
    }

    fn end_element(&mut self, name: &str) {
        self.buf.put_u8(tag::END);
        self.write_string(name);
    }

    fn insert_element(&mut self, name: &str) {
        self.buf.put_u8(tag::INSERT);
        self.write_string(name);
    }

    /// Emits nothing for empty text. Emptiness is tested on the escaped
    /// form, but the unescaped text is what gets written.
    fn characters(&mut self, text: &str) {
        if escape_xml(text).is_empty() {
            return;
        }
        self.buf.put_u8(tag::TEXT);
        self.write_string(text);
    }
}

/// XML-escapes `&`, `<`, `>`, `"` and `'`.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
