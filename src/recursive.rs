//! Self-describing nested zones.
//!
//! A recursive zone is a tree of nodes. Each node starts with a big-endian
//! header `level: i32, type: i32, size: i32` where `size` covers the whole
//! node. Internal nodes (levels 0..=2) add a `u32` child count hint for a
//! 16-byte header and are followed by their children; leaf nodes (level 3)
//! add a single flags byte for a 13-byte header and are followed by an
//! opaque payload. Node sizes are padded to an even number of bytes.
//!
//! Sizes are only known top-down, so the tree is built by recursive
//! descent. A child whose own content is corrupt is dropped and its
//! siblings are kept.

use crate::context::{ParserContext, ParserState};
use crate::entry::{Entry, Tag};
use crate::error::{Error, Result};
use crate::stream::{ByteStream, SeekMode};
use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// Level of leaf nodes.
pub const LEAF_LEVEL: i32 = 3;
/// Header size of internal nodes.
pub const NODE_HEADER_SIZE: i64 = 16;
/// Header size of leaf nodes.
pub const LEAF_HEADER_SIZE: i64 = 13;
/// Bytes needed to read the common `level, type, size` prefix.
const HEADER_PREFIX: i64 = 12;
/// Types at or above this value are structural placeholders.
pub const PLACEHOLDER_TYPE_BASE: i32 = 0x7FFF_FF00;

/// One node of a recursive zone.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneNode {
    level: i32,
    node_type: i32,
    flags: u8,
    entry: Entry,
    data: Option<Entry>,
    children: Vec<ZoneNode>,
}

impl ZoneNode {
    /// Nesting level (0..=3).
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Type tag of the node.
    pub fn node_type(&self) -> i32 {
        self.node_type
    }

    /// Type tag as a four-character code.
    pub fn tag(&self) -> Tag {
        Tag::from_u32(self.node_type as u32)
    }

    /// Returns true for structural placeholder nodes.
    pub fn is_placeholder(&self) -> bool {
        self.node_type >= PLACEHOLDER_TYPE_BASE
    }

    /// Leaf flags byte (0 for internal nodes).
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// The byte range of the whole node.
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// The payload range of a leaf.
    pub fn data(&self) -> Option<&Entry> {
        self.data.as_ref()
    }

    /// Child nodes, in stream order.
    pub fn children(&self) -> &[ZoneNode] {
        &self.children
    }

    /// Returns true for leaf nodes.
    pub fn is_leaf(&self) -> bool {
        self.data.is_some()
    }

    /// All nodes of the subtree in pre-order, starting with `self`.
    pub fn walk(&self) -> Vec<&ZoneNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }

    /// Leaves of the subtree, in stream order.
    pub fn leaves(&self) -> Vec<&ZoneNode> {
        self.walk().into_iter().filter(|n| n.is_leaf()).collect()
    }

    /// First node of the given type in pre-order.
    pub fn find(&self, node_type: i32) -> Option<&ZoneNode> {
        self.walk().into_iter().find(|n| n.node_type == node_type)
    }

    /// Reads a leaf's payload bytes.
    pub fn payload(&self, input: &ByteStream) -> Option<Bytes> {
        self.data.as_ref().and_then(|d| input.slice(d))
    }
}

impl fmt::Display for ZoneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level={}", self.level)?;
        if !self.is_placeholder() {
            write!(f, " type={}", self.tag())?;
        }
        write!(f, " [{:#x}-{:#x}]", self.entry.begin(), self.entry.end())?;
        if self.flags != 0 {
            write!(f, " flags={:#x}", self.flags)?;
        }
        Ok(())
    }
}

/// Recursive-descent reader for nested zones.
#[derive(Debug, Clone, Copy)]
pub struct RecursiveZoneReader {
    level: i32,
    depth: usize,
    max_depth: usize,
}

impl Default for RecursiveZoneReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RecursiveZoneReader {
    /// Creates a reader expecting top-level nodes at level 0 or 1.
    pub fn new() -> Self {
        Self {
            level: 0,
            depth: 0,
            max_depth: 32,
        }
    }

    /// Sets the level expected for the first nodes.
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Sets the recursion limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parses the zone covering `entry`.
    ///
    /// The returned root node spans `entry` and carries the reader's level.
    pub fn read(&self, ctx: &mut ParserContext, entry: &Entry) -> Result<ZoneNode> {
        if !ctx.check_entry(entry) {
            return Err(Error::InvalidPosition {
                pos: entry.end(),
                end: ctx.input.size(),
            });
        }
        if entry.mark_parsed() {
            ctx.diagnostics
                .warn_once("recursive-reparse", format!("zone {} is parsed twice", entry));
        }
        let children = self.read_children(ctx, entry)?;
        Ok(ZoneNode {
            level: self.level,
            node_type: PLACEHOLDER_TYPE_BASE,
            flags: 0,
            entry: entry.clone(),
            data: None,
            children,
        })
    }

    fn read_children(&self, ctx: &mut ParserContext, parent: &Entry) -> Result<Vec<ZoneNode>> {
        if self.depth > self.max_depth {
            return Err(Error::structure(parent.begin(), "zone nesting is too deep"));
        }

        let end = parent.end();
        let mut pos = parent.begin();
        let mut children = Vec::new();
        while pos != end {
            let (level, node_type, size) = match self.read_header(ctx, pos, end) {
                Ok(header) => header,
                // Later siblings cannot be located past a bad header.
                Err(err) if self.depth > 0 => {
                    ctx.diagnostics
                        .record_malformed(format!("truncating zone list at {:#x}: {}", pos, err));
                    break;
                }
                Err(err) => return Err(err),
            };
            let leaf = level == LEAF_LEVEL;
            let child_end = (pos + size + (size & 1)).min(end);
            let node_entry = Entry::with_kind(pos, child_end - pos, "RecursiveZone", level);

            if leaf {
                let flags = ctx.input.read_u8()?;
                let data = Entry::with_kind(
                    pos + LEAF_HEADER_SIZE,
                    size - LEAF_HEADER_SIZE,
                    "Leaf",
                    node_type,
                );
                let node = ZoneNode {
                    level,
                    node_type,
                    flags,
                    entry: node_entry,
                    data: Some(data),
                    children: Vec::new(),
                };
                log::trace!("leaf {}", node);
                children.push(node);
                pos = child_end;
                continue;
            }

            let count_hint = ctx.input.read_u32()?;
            if size == NODE_HEADER_SIZE {
                if level == 1 {
                    log::debug!("empty zone marker at {:#x}", pos);
                } else {
                    ctx.diagnostics.warn_once(
                        "recursive-empty",
                        format!("empty level-{} zone at {:#x}", level, pos),
                    );
                }
            }

            let body = Entry::new(pos + NODE_HEADER_SIZE, size - NODE_HEADER_SIZE);
            let child_reader = Self {
                level,
                depth: self.depth + 1,
                max_depth: self.max_depth,
            };
            match child_reader.read_children(ctx, &body) {
                Ok(grandchildren) => {
                    if grandchildren.len() as u64 != u64::from(count_hint) {
                        ctx.diagnostics.warn_once(
                            "recursive-count",
                            format!(
                                "zone at {:#x} announces {} children, found {}",
                                pos,
                                count_hint,
                                grandchildren.len()
                            ),
                        );
                    }
                    children.push(ZoneNode {
                        level,
                        node_type,
                        flags: 0,
                        entry: node_entry,
                        data: None,
                        children: grandchildren,
                    });
                }
                Err(err) => {
                    ctx.diagnostics
                        .record_malformed(format!("dropping zone at {:#x}: {}", pos, err));
                }
            }
            pos = child_end;
        }
        Ok(children)
    }

    /// Reads and checks the `level, type, size` prefix of the node at `pos`.
    fn read_header(
        &self,
        ctx: &mut ParserContext,
        pos: i64,
        end: i64,
    ) -> Result<(i32, i32, i64)> {
        if end - pos < HEADER_PREFIX {
            return Err(Error::StreamExhausted {
                offset: pos,
                needed: HEADER_PREFIX - (end - pos),
            });
        }
        ctx.input.seek(pos, SeekMode::Set);
        let level = ctx.input.read_i32()?;
        let node_type = ctx.input.read_i32()?;
        let size = i64::from(ctx.input.read_i32()?);

        if level != self.level && level != self.level + 1 {
            return Err(Error::structure(
                pos,
                format!("unexpected level {} (expected {})", level, self.level),
            ));
        }
        let min_size = if level == LEAF_LEVEL { LEAF_HEADER_SIZE } else { NODE_HEADER_SIZE };
        if size < min_size || pos + size > end {
            return Err(Error::structure(
                pos,
                format!("bad node size {} (room for {})", size, end - pos),
            ));
        }
        Ok((level, node_type, size))
    }
}


#[cfg(test)]
mod tests {
    use super::build::{node, Node};
    use super::*;

    fn tag(code: &[u8; 4]) -> i32 {
        i32::from_be_bytes(*code)
    }

    fn sample() -> Vec<u8> {
        let tree = vec![
            Node::Branch(
                1,
                tag(b"HDR "),
                vec![Node::Branch(
                    2,
                    tag(b"TITL"),
                    vec![Node::Leaf(tag(b"text"), b"Report".to_vec())],
                )],
            ),
            Node::Branch(
                1,
                tag(b"BODY"),
                vec![
                    Node::Branch(2, tag(b"PARA"), vec![Node::Leaf(tag(b"text"), b"abc".to_vec())]),
                    Node::Branch(2, tag(b"PARA"), vec![Node::Leaf(tag(b"text"), b"de".to_vec())]),
                ],
            ),
        ];
        tree.iter().flat_map(node).collect()
    }

    fn read(bytes: Vec<u8>) -> (ParserContext, Result<ZoneNode>) {
        let len = bytes.len() as i64;
        let mut ctx = ParserContext::new(ByteStream::new(bytes));
        let result = RecursiveZoneReader::new().read(&mut ctx, &Entry::new(0, len));
        (ctx, result)
    }

    fn assert_contained(node: &ZoneNode) {
        let mut last_end = node.entry().begin();
        for child in node.children() {
            assert!(node.entry().contains(child.entry()));
            assert!(child.entry().begin() >= last_end);
            last_end = child.entry().end();
            assert_contained(child);
        }
        if let Some(data) = node.data() {
            assert!(node.entry().contains(data));
        }
    }

    #[test]
    fn test_read_tree() {
        let (ctx, result) = read(sample());
        let root = result.unwrap();

        assert_eq!(root.children().len(), 2);
        assert_eq!(root.children()[1].children().len(), 2);
        let leaves = root.leaves();
        assert_eq!(leaves.len(), 3);
        assert!(leaves.iter().all(|l| l.level() == LEAF_LEVEL));
        assert_eq!(&leaves[0].payload(&ctx.input).unwrap()[..], b"Report");
        assert_eq!(&leaves[2].payload(&ctx.input).unwrap()[..], b"de");
        assert!(root.find(tag(b"TITL")).is_some());
        assert!(ctx.diagnostics.is_clean());
        assert_contained(&root);
    }

    #[test]
    fn test_odd_payload_is_padded() {
        let bytes = node(&Node::Branch(1, tag(b"ONE "), vec![Node::Branch(
            2,
            tag(b"TWO "),
            vec![
                Node::Leaf(tag(b"odd "), vec![1, 2, 3, 4]),
                Node::Leaf(tag(b"next"), vec![9]),
            ],
        )]));
        let (ctx, result) = read(bytes);
        let root = result.unwrap();
        let leaves = root.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].entry().length(), 18);
        assert_eq!(&leaves[1].payload(&ctx.input).unwrap()[..], &[9]);
        assert_contained(&root);
    }

    #[test]
    fn test_level_jump_fails() {
        let mut bytes = sample();
        // First node claims level 2 while level 0 or 1 is expected.
        bytes[0..4].copy_from_slice(&2i32.to_be_bytes());
        let (_, result) = read(bytes);
        assert!(matches!(result, Err(Error::Structure { offset: 0, .. })));
    }

    #[test]
    fn test_corrupt_child_keeps_siblings() {
        let mut bytes: Vec<u8> = node(&Node::Branch(1, tag(b"BODY"), vec![
            Node::Branch(2, tag(b"PARA"), vec![Node::Leaf(tag(b"text"), b"one".to_vec())]),
            Node::Branch(2, tag(b"PARA"), vec![Node::Leaf(tag(b"text"), b"two".to_vec())]),
            Node::Branch(2, tag(b"PARA"), vec![Node::Leaf(tag(b"text"), b"six".to_vec())]),
        ]));
        // Each PARA is 16 + 16 bytes; corrupt the size of the second PARA's leaf.
        let second_leaf = 16 + 32 + 16;
        bytes[second_leaf + 8..second_leaf + 12].copy_from_slice(&0x4000i32.to_be_bytes());

        let (ctx, result) = read(bytes);
        let root = result.unwrap();
        let body = &root.children()[0];
        assert_eq!(body.children().len(), 3);
        assert!(body.children()[1].children().is_empty());
        let texts: Vec<_> = body
            .leaves()
            .iter()
            .map(|l| l.payload(&ctx.input).unwrap())
            .collect();
        assert_eq!(&texts[0][..], b"one");
        assert_eq!(&texts[1][..], b"six");
        assert_eq!(ctx.diagnostics.malformed_count(), 1);
        assert_contained(&root);
    }

    #[test]
    fn test_corrupt_node_size_keeps_earlier_siblings() {
        let mut bytes: Vec<u8> = node(&Node::Branch(1, tag(b"BODY"), vec![
            Node::Branch(2, tag(b"PARA"), vec![Node::Leaf(tag(b"text"), b"one".to_vec())]),
            Node::Branch(2, tag(b"PARA"), vec![Node::Leaf(tag(b"text"), b"two".to_vec())]),
            Node::Branch(2, tag(b"PARA"), vec![Node::Leaf(tag(b"text"), b"six".to_vec())]),
        ]));
        // The second PARA claims far more room than BODY has left.
        let second_para = 16 + 32;
        bytes[second_para + 8..second_para + 12].copy_from_slice(&0x4000i32.to_be_bytes());

        let (ctx, result) = read(bytes);
        let root = result.unwrap();
        assert_eq!(root.children().len(), 1);
        let body = &root.children()[0];
        assert_eq!(body.children().len(), 1);
        let leaves = body.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(&leaves[0].payload(&ctx.input).unwrap()[..], b"one");
        assert_eq!(ctx.diagnostics.malformed_count(), 1);
        assert_contained(&root);
    }

    #[test]
    fn test_nested_level_mismatch_keeps_earlier_siblings() {
        let mut bytes: Vec<u8> = node(&Node::Branch(1, tag(b"BODY"), vec![
            Node::Branch(2, tag(b"PARA"), vec![Node::Leaf(tag(b"text"), b"one".to_vec())]),
            Node::Branch(2, tag(b"PARA"), vec![Node::Leaf(tag(b"text"), b"two".to_vec())]),
        ]));
        bytes[48..52].copy_from_slice(&0i32.to_be_bytes());

        let (_, result) = read(bytes);
        let root = result.unwrap();
        assert_eq!(root.children()[0].children().len(), 1);
        assert_eq!(root.leaves().len(), 1);
    }

    #[test]
    fn test_empty_marker_levels() {
        let bytes: Vec<u8> = [
            node(&Node::Branch(1, tag(b"NONE"), vec![])),
            node(&Node::Branch(1, tag(b"WRAP"), vec![Node::Branch(2, tag(b"VOID"), vec![])])),
        ]
        .concat();
        let (ctx, result) = read(bytes);
        let root = result.unwrap();
        assert_eq!(root.children().len(), 2);
        assert_eq!(ctx.diagnostics.occurrences("recursive-empty"), 1);
        assert_eq!(ctx.diagnostics.malformed_count(), 0);
    }

    #[test]
    fn test_trailing_garbage_fails() {
        let mut bytes = sample();
        bytes.extend_from_slice(&[0, 0, 0]);
        let (_, result) = read(bytes);
        assert!(matches!(result, Err(Error::StreamExhausted { .. })));
    }

    #[test]
    fn test_depth_guard() {
        let mut n = Node::Leaf(tag(b"deep"), vec![]);
        for _ in 0..6 {
            n = Node::Branch(2, tag(b"NEST"), vec![n]);
        }
        let bytes = node(&Node::Branch(1, tag(b"TOP "), vec![n]));
        let len = bytes.len() as i64;
        let mut ctx = ParserContext::new(ByteStream::new(bytes));
        let root = RecursiveZoneReader::new()
            .with_max_depth(3)
            .read(&mut ctx, &Entry::new(0, len))
            .unwrap();
        let nest1 = &root.children()[0].children()[0];
        let nest2 = &nest1.children()[0];
        assert!(nest2.children().is_empty());
        assert_eq!(ctx.diagnostics.malformed_count(), 1);
    }

    #[test]
    fn test_placeholder_type_hidden_in_display() {
        let (_, result) = read(sample());
        let root = result.unwrap();
        assert!(root.is_placeholder());
        assert!(!root.to_string().contains("type="));
        assert!(root.children()[0].to_string().contains("type=HDR"));
    }
}
