//! Resource fork map parsing.
//!
//! Layout (all big-endian):
//! - Header (16 bytes): data offset, map offset, data length, map length
//! - Resource data: each item is a `u32` length followed by the bytes
//! - Map: copy of the header, 8 reserved bytes, `u16` attributes,
//!   `u16` type list offset, `u16` name list offset (both from map start)
//! - Type list: `u16` (type count - 1), then 8-byte items
//!   `(tag, u16 count - 1, u16 reference list offset)`
//! - Reference items (12 bytes): `i16` id, `u16` name offset
//!   (0xFFFF = unnamed), `u8` attributes, `u24` data offset, `u32` handle

use super::ResourceZoneIndex;
use crate::context::{ParserContext, ParserState};
use crate::entry::{Entry, Tag};
use crate::error::{Error, Result};
use crate::stream::SeekMode;

/// Size of the fork header.
const HEADER_SIZE: i64 = 16;
/// Offset of the type list offset field inside the map.
const MAP_TYPE_LIST_FIELD: i64 = 24;
/// Size of one type list item.
const TYPE_ITEM_SIZE: i64 = 8;
/// Size of one reference list item.
const REF_ITEM_SIZE: i64 = 12;

/// The four fields of a resource fork header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceForkHeader {
    pub data_offset: i64,
    pub map_offset: i64,
    pub data_length: i64,
    pub map_length: i64,
}

impl ResourceForkHeader {
    /// Reads and validates the header at the start of the fork.
    pub fn read(ctx: &mut ParserContext) -> Result<Self> {
        ctx.input.seek(0, SeekMode::Set);
        if ctx.input.size() < HEADER_SIZE {
            return Err(Error::StreamExhausted {
                offset: 0,
                needed: HEADER_SIZE - ctx.input.size(),
            });
        }
        let header = Self {
            data_offset: i64::from(ctx.input.read_u32()?),
            map_offset: i64::from(ctx.input.read_u32()?),
            data_length: i64::from(ctx.input.read_u32()?),
            map_length: i64::from(ctx.input.read_u32()?),
        };

        if header.data_offset < HEADER_SIZE || header.map_length < MAP_TYPE_LIST_FIELD + 4 {
            return Err(Error::structure(0, "resource fork header is inconsistent"));
        }
        let data_end = header.data_offset + header.data_length;
        let map_end = header.map_offset + header.map_length;
        if !ctx.check_position(data_end) || !ctx.check_position(map_end) {
            return Err(Error::InvalidPosition {
                pos: data_end.max(map_end),
                end: ctx.input.size(),
            });
        }
        Ok(header)
    }

    fn map_end(&self) -> i64 {
        self.map_offset + self.map_length
    }
}

/// Parses a resource fork into a tag index.
///
/// A corrupt header or map is an error; individual resources whose data
/// is unreachable are dropped with a warning.
pub fn parse_resource_fork(ctx: &mut ParserContext) -> Result<ResourceZoneIndex> {
    let header = ResourceForkHeader::read(ctx)?;
    log::debug!("resource fork header: {:?}", header);

    ctx.input
        .seek(header.map_offset + MAP_TYPE_LIST_FIELD, SeekMode::Set);
    let type_list = header.map_offset + i64::from(ctx.input.read_u16()?);
    let name_list = header.map_offset + i64::from(ctx.input.read_u16()?);
    if type_list + 2 > header.map_end() {
        return Err(Error::structure(type_list, "type list outside the map"));
    }

    ctx.input.seek(type_list, SeekMode::Set);
    let type_count = (i64::from(ctx.input.read_u16()?) + 1) & 0xFFFF;
    if type_list + 2 + type_count * TYPE_ITEM_SIZE > header.map_end() {
        return Err(Error::structure(type_list, "type list overflows the map"));
    }

    let mut index = ResourceZoneIndex::new();
    for t in 0..type_count {
        ctx.input
            .seek(type_list + 2 + t * TYPE_ITEM_SIZE, SeekMode::Set);
        let tag = Tag::from_u32(ctx.input.read_u32()?);
        let count = i64::from(ctx.input.read_u16()?) + 1;
        let ref_list = type_list + i64::from(ctx.input.read_u16()?);

        if ref_list + count * REF_ITEM_SIZE > header.map_end() {
            ctx.diagnostics.record_malformed(format!(
                "reference list of {} overflows the resource map",
                tag
            ));
            continue;
        }
        for r in 0..count {
            let item = ref_list + r * REF_ITEM_SIZE;
            if let Some(entry) = read_reference(ctx, &header, tag, item, name_list)? {
                log::trace!("indexed {}", entry);
                index.insert(tag, entry);
            }
        }
    }

    log::debug!(
        "resource fork indexed: {} tags, {} entries",
        index.tag_count(),
        index.len()
    );
    Ok(index)
}

/// Reads one reference item; unreachable data yields `None`.
fn read_reference(
    ctx: &mut ParserContext,
    header: &ResourceForkHeader,
    tag: Tag,
    item: i64,
    name_list: i64,
) -> Result<Option<Entry>> {
    ctx.input.seek(item, SeekMode::Set);
    let id = i32::from(ctx.input.read_i16()?);
    let name_offset = ctx.input.read_u16()?;
    let _attributes = ctx.input.read_u8()?;
    let data_offset = ctx.input.read_ulong(3)? as i64;

    let length_pos = header.data_offset + data_offset;
    if length_pos + 4 > header.data_offset + header.data_length
        || !ctx.check_position(length_pos + 4)
    {
        ctx.diagnostics.record_malformed(format!(
            "resource {}:{} has its data outside the fork",
            tag, id
        ));
        return Ok(None);
    }
    ctx.input.seek(length_pos, SeekMode::Set);
    let length = i64::from(ctx.input.read_u32()?);
    let mut entry = Entry::with_kind(length_pos + 4, length, tag.to_string(), id);
    if !ctx.check_position(entry.end()) {
        ctx.diagnostics.record_malformed(format!(
            "resource {}:{} claims {} bytes past the end of the fork",
            tag,
            id,
            length
        ));
        return Ok(None);
    }

    if name_offset != 0xFFFF {
        let name_pos = name_list + i64::from(name_offset);
        if name_pos < header.map_end() {
            ctx.input.seek(name_pos, SeekMode::Set);
            match ctx.input.read_pascal_string() {
                Ok(raw) => {
                    let (name, _) = encoding_rs::MACINTOSH.decode_without_bom_handling(&raw);
                    entry.set_name(name.into_owned());
                }
                Err(_) => {
                    ctx.diagnostics
                        .warn_once("rsrc-name", "resource name runs past the fork");
                }
            }
        }
    }
    Ok(Some(entry))
}

/// Builds resource forks; used by tests across the crate.
#[cfg(test)]
pub(crate) mod build {
    /// Builds a fork holding the given `(tag, id, name, data)` resources.
    pub fn fork(resources: &[(&[u8; 4], i16, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut data = Vec::new();
        let mut offsets = Vec::new();
        for (_, _, _, bytes) in resources {
            offsets.push(data.len() as u32);
            data.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            data.extend_from_slice(bytes);
        }

        let mut tags: Vec<[u8; 4]> = Vec::new();
        for (tag, ..) in resources {
            if !tags.contains(tag) {
                tags.push(**tag);
            }
        }

        let type_list_len = 2 + 8 * tags.len();
        let mut type_list = Vec::new();
        let mut ref_list = Vec::new();
        let mut names = Vec::new();
        type_list.extend_from_slice(&((tags.len() as u16).wrapping_sub(1)).to_be_bytes());
        for tag in &tags {
            let members: Vec<usize> = (0..resources.len())
                .filter(|&i| resources[i].0 == tag)
                .collect();
            type_list.extend_from_slice(tag);
            type_list.extend_from_slice(&((members.len() - 1) as u16).to_be_bytes());
            type_list.extend_from_slice(&((type_list_len + ref_list.len()) as u16).to_be_bytes());
            for i in members {
                let (_, id, name, _) = resources[i];
                ref_list.extend_from_slice(&id.to_be_bytes());
                match name {
                    Some(n) => {
                        ref_list.extend_from_slice(&(names.len() as u16).to_be_bytes());
                        names.push(n.len() as u8);
                        names.extend_from_slice(n.as_bytes());
                    }
                    None => ref_list.extend_from_slice(&0xFFFFu16.to_be_bytes()),
                }
                ref_list.push(0);
                ref_list.extend_from_slice(&offsets[i].to_be_bytes()[1..]);
                ref_list.extend_from_slice(&[0; 4]);
            }
        }

        let data_offset = 16u32;
        let map_offset = data_offset + data.len() as u32;
        let type_offset = 28u16;
        let name_offset = type_offset + (type_list.len() + ref_list.len()) as u16;
        let mut map = vec![0u8; 24];
        map.extend_from_slice(&type_offset.to_be_bytes());
        map.extend_from_slice(&name_offset.to_be_bytes());
        map.extend_from_slice(&type_list);
        map.extend_from_slice(&ref_list);
        map.extend_from_slice(&names);

        let mut fork = Vec::new();
        fork.extend_from_slice(&data_offset.to_be_bytes());
        fork.extend_from_slice(&map_offset.to_be_bytes());
        fork.extend_from_slice(&(data.len() as u32).to_be_bytes());
        fork.extend_from_slice(&(map.len() as u32).to_be_bytes());
        fork.extend_from_slice(&data);
        fork.extend_from_slice(&map);
        fork
    }
}
