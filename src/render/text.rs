//! Plain-text rendering.

use crate::codec::{DocumentHandler, PropertyList};
use crate::emitter::{element, field};

/// Renders the event stream as plain text.
///
/// Paragraphs become lines, footnotes become `[n]` references with the
/// note bodies appended at the end, and headers, footers and embedded
/// objects are left out.
#[derive(Debug, Clone, Default)]
pub struct TextRenderer {
    body: String,
    notes: Vec<String>,
    note_depth: usize,
    skip_depth: usize,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rendered text.
    pub fn finish(self) -> String {
        let mut out = self.body;
        if !self.notes.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            for (i, note) in self.notes.iter().enumerate() {
                out.push_str(&format!("[{}] {}\n", i + 1, note.trim()));
            }
        }
        out
    }

    fn target(&mut self) -> &mut String {
        match self.notes.last_mut() {
            Some(note) if self.note_depth > 0 => note,
            _ => &mut self.body,
        }
    }
}

impl DocumentHandler for TextRenderer {
    fn start_element(&mut self, name: &str, properties: &PropertyList) {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return;
        }
        match name {
            element::HEADER | element::FOOTER | element::OBJECT => self.skip_depth = 1,
            element::FOOTNOTE if self.note_depth == 0 => {
                let reference = format!("[{}]", self.notes.len() + 1);
                self.body.push_str(&reference);
                self.notes.push(String::new());
                self.note_depth = 1;
            }
            element::FOOTNOTE => self.note_depth += 1,
            element::FIELD => match properties.get_str(field::TYPE_KEY) {
                Some(field::PAGE_NUMBER) | Some(field::PAGE_COUNT) => self.target().push('#'),
                _ => {}
            },
            _ => {}
        }
    }

    fn end_element(&mut self, name: &str) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        match name {
            element::PARAGRAPH => self.target().push('\n'),
            element::FOOTNOTE => self.note_depth = self.note_depth.saturating_sub(1),
            _ => {}
        }
    }

    fn insert_element(&mut self, name: &str) {
        if self.skip_depth > 0 {
            return;
        }
        match name {
            element::TAB | element::CELL_BREAK => self.target().push('\t'),
            element::LINE_BREAK | element::ROW_BREAK => self.target().push('\n'),
            _ => {}
        }
    }

    fn characters(&mut self, text: &str) {
        if self.skip_depth == 0 {
            self.target().push_str(text);
        }
    }
}
