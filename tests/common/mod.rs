//! Builders for synthetic Macintosh documents.

#![allow(dead_code)]

/// Builds a resource fork holding `(tag, id, name, data)` resources.
pub fn resource_fork(resources: &[(&[u8; 4], i16, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut offsets = Vec::new();
    for (_, _, _, bytes) in resources {
        offsets.push(data.len() as u32);
        data.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        data.extend_from_slice(bytes);
    }

    let mut tags: Vec<[u8; 4]> = Vec::new();
    for (tag, ..) in resources {
        if !tags.contains(*tag) {
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

/// Wraps both forks in a MacBinary container.
pub fn macbinary(data: &[u8], rsrc: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; 128];
    out[1] = 4;
    out[2..6].copy_from_slice(b"memo");
    out[65..69].copy_from_slice(b"WORD");
    out[69..73].copy_from_slice(b"MACA");
    out[83..87].copy_from_slice(&(data.len() as u32).to_be_bytes());
    out[87..91].copy_from_slice(&(rsrc.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    while out.len() % 128 != 0 {
        out.push(0);
    }
    out.extend_from_slice(rsrc);
    out
}

/// Serializes a leaf of a recursive zone.
pub fn leaf(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let size = 13 + payload.len() as i32;
    let mut out = Vec::new();
    out.extend_from_slice(&3i32.to_be_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(&size.to_be_bytes());
    out.push(0);
    out.extend_from_slice(payload);
    if size % 2 == 1 {
        out.push(0);
    }
    out
}

/// Serializes an internal node of a recursive zone.
pub fn branch(level: i32, tag: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = children.concat();
    let mut out = Vec::new();
    out.extend_from_slice(&level.to_be_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(&(16 + body.len() as i32).to_be_bytes());
    out.extend_from_slice(&(children.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

/// A document info tree with a title and an author.
pub fn info(title: &str, author: &str) -> Vec<u8> {
    branch(
        1,
        b"INFO",
        &[branch(
            2,
            b"DOCI",
            &[leaf(b"titl", title.as_bytes()), leaf(b"auth", author.as_bytes())],
        )],
    )
}

/// A QuickDraw picture header framing `width` x `height` points.
pub fn pict(width: i16, height: i16) -> Vec<u8> {
    let mut out = Vec::new();
    for word in [10i16, 0, 0, height, width] {
        out.extend_from_slice(&word.to_be_bytes());
    }
    out.extend_from_slice(&[0x00, 0x11, 0x02, 0xFF]);
    out
}

/// A 10-byte font record.
pub fn font(family: u16, size: u16, flags: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&family.to_be_bytes());
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(&flags.to_be_bytes());
    out.extend_from_slice(&[0, 0, 0, 0]);
    out
}
