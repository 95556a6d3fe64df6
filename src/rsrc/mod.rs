//! Macintosh resource fork indexing.
//!
//! Every resource-fork-based format starts the same way: the fork is parsed
//! into a multimap from four-character tags to [`Entry`] records, and the
//! per-format code queries it by tag.

mod fork;

pub use fork::{parse_resource_fork, ResourceForkHeader};

#[cfg(test)]
pub(crate) use fork::build;

use crate::entry::{Entry, Tag};
use std::collections::BTreeMap;

/// Ordered multimap from resource tag to entries.
///
/// Tags iterate in sorted order; entries sharing a tag keep the order in
/// which they were found in the file, which some formats depend on.
#[derive(Debug, Clone, Default)]
pub struct ResourceZoneIndex {
    buckets: BTreeMap<Tag, Vec<Entry>>,
}

impl ResourceZoneIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry under `tag`, after any entries already there.
    pub fn insert(&mut self, tag: Tag, entry: Entry) {
        self.buckets.entry(tag).or_default().push(entry);
    }

    /// The full map, for collaborators that walk every tag.
    pub fn entries_map(&self) -> &BTreeMap<Tag, Vec<Entry>> {
        &self.buckets
    }

    /// Entries stored under `tag`, in file order.
    pub fn get(&self, tag: Tag) -> &[Entry] {
        self.buckets.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first entry stored under `tag`.
    pub fn first(&self, tag: Tag) -> Option<&Entry> {
        self.get(tag).first()
    }

    /// The entry with the given tag and resource id.
    pub fn get_by_id(&self, tag: Tag, id: i32) -> Option<&Entry> {
        self.get(tag).iter().find(|e| e.id() == id)
    }

    /// Iterates over `(tag, entry)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &Entry)> {
        self.buckets
            .iter()
            .flat_map(|(tag, entries)| entries.iter().map(move |e| (*tag, e)))
    }

    /// Number of distinct tags.
    pub fn tag_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Entries that were indexed but never consumed.
    pub fn unparsed(&self) -> impl Iterator<Item = (Tag, &Entry)> {
        self.iter().filter(|(_, e)| !e.is_parsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_tag_keeps_insertion_order() {
        let mut index = ResourceZoneIndex::new();
        let pict = Tag::from("PICT");
        index.insert(pict, Entry::with_kind(300, 10, "PICT", 130));
        index.insert(Tag::from("STYL"), Entry::with_kind(100, 10, "STYL", 128));
        index.insert(pict, Entry::with_kind(200, 10, "PICT", 128));

        let ids: Vec<_> = index.get(pict).iter().map(Entry::id).collect();
        assert_eq!(ids, vec![130, 128]);
        assert_eq!(index.first(pict).map(Entry::id), Some(130));
        assert_eq!(index.get_by_id(pict, 128).map(Entry::begin), Some(200));
        assert_eq!(index.len(), 3);
        assert_eq!(index.tag_count(), 2);
    }

    #[test]
    fn test_missing_tag_is_empty() {
        let index = ResourceZoneIndex::new();
        assert!(index.get(Tag::from("FTNT")).is_empty());
        assert!(index.first(Tag::from("FTNT")).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_unparsed_tracking() {
        let mut index = ResourceZoneIndex::new();
        index.insert(Tag::from("STR "), Entry::with_kind(0, 4, "STR ", 1));
        index.insert(Tag::from("STR "), Entry::with_kind(4, 4, "STR ", 2));
        index.get(Tag::from("STR "))[0].mark_parsed();

        let left: Vec<_> = index.unparsed().map(|(_, e)| e.id()).collect();
        assert_eq!(left, vec![2]);
    }
}
