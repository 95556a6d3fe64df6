//! Marker-to-content mapping for sub-documents.

use crate::model::ContentZone;

/// One footnote (or header/footer) attached to a marker range.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEntry {
    /// Absolute range of the marker in the main text
    pub begin: i64,
    pub end: i64,
    /// Resource id of the note text
    pub id: i32,
    /// Scanned zones of the note text
    pub zones: Vec<ContentZone>,
}

/// Maps marker ranges to the content zones of their notes.
///
/// Ranges never overlap; lookups are by any position inside a range.
#[derive(Debug, Clone, Default)]
pub struct FootnoteTable {
    notes: Vec<NoteEntry>,
}

impl FootnoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `zones` to the marker. Returns false if the marker
    /// overlaps one that is already registered.
    pub fn insert(&mut self, marker: &ContentZone, id: i32, zones: Vec<ContentZone>) -> bool {
        let end = marker.end.max(marker.begin + 1);
        let at = self.notes.partition_point(|n| n.begin < marker.begin);
        let clashes_prev = at > 0 && self.notes[at - 1].end > marker.begin;
        let clashes_next = self.notes.get(at).is_some_and(|n| n.begin < end);
        if clashes_prev || clashes_next {
            return false;
        }
        self.notes.insert(
            at,
            NoteEntry {
                begin: marker.begin,
                end,
                id,
                zones,
            },
        );
        true
    }

    /// Finds the note whose marker covers `pos`.
    pub fn lookup(&self, pos: i64) -> Option<&NoteEntry> {
        let at = self.notes.partition_point(|n| n.begin <= pos);
        let note = self.notes.get(at.checked_sub(1)?)?;
        (pos < note.end).then_some(note)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Notes in marker order.
    pub fn iter(&self) -> impl Iterator<Item = &NoteEntry> {
        self.notes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ZoneKind;

    fn marker(begin: i64, end: i64) -> ContentZone {
        ContentZone::new(ZoneKind::Footnote, begin, end, 0)
    }

    #[test]
    fn test_lookup_by_position() {
        let mut table = FootnoteTable::new();
        let text = vec![ContentZone::new(ZoneKind::Text, 500, 510, 0)];
        assert!(table.insert(&marker(40, 41), 2, Vec::new()));
        assert!(table.insert(&marker(10, 12), 1, text.clone()));

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(11).unwrap().zones, text);
        assert_eq!(table.lookup(40).unwrap().id, 2);
        assert!(table.lookup(12).is_none());
        assert!(table.lookup(5).is_none());
        assert_eq!(table.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_overlap_is_rejected() {
        let mut table = FootnoteTable::new();
        assert!(table.insert(&marker(10, 14), 1, Vec::new()));
        assert!(!table.insert(&marker(12, 13), 2, Vec::new()));
        assert!(!table.insert(&marker(8, 11), 3, Vec::new()));
        assert!(table.insert(&marker(14, 14), 4, Vec::new()));
        assert_eq!(table.lookup(14).unwrap().id, 4);
    }
}
