//! Macintosh file containers.
//!
//! A Mac file has two forks. Off the Mac they travel either wrapped
//! (MacBinary, AppleSingle) or split (AppleDouble holds the resource fork
//! next to a bare data fork). Anything unrecognized is treated as a bare
//! data fork.

use crate::entry::Tag;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::io::Read;
use std::path::Path;

/// MacBinary header size.
const MACBINARY_HEADER: usize = 128;
/// AppleSingle magic number.
const APPLE_SINGLE_MAGIC: u32 = 0x0005_1600;
/// AppleDouble magic number.
const APPLE_DOUBLE_MAGIC: u32 = 0x0005_1607;
/// AppleSingle/AppleDouble header size before the entry table.
const APPLE_HEADER: usize = 26;
/// Size of one AppleSingle entry descriptor.
const APPLE_ENTRY: usize = 12;

/// AppleSingle entry ids.
mod entry_id {
    pub const DATA_FORK: u32 = 1;
    pub const RESOURCE_FORK: u32 = 2;
    pub const FINDER_INFO: u32 = 9;
}

/// How the forks were packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    MacBinary,
    AppleSingle,
    AppleDouble,
    /// A bare data fork
    Raw,
}

/// The two forks of a Macintosh file.
#[derive(Debug, Clone)]
pub struct MacForks {
    pub kind: ContainerKind,
    pub data: Bytes,
    pub resource: Option<Bytes>,
    pub file_type: Option<Tag>,
    pub creator: Option<Tag>,
}

impl MacForks {
    /// Wraps a bare data fork.
    pub fn raw(data: impl Into<Bytes>) -> Self {
        Self {
            kind: ContainerKind::Raw,
            data: data.into(),
            resource: None,
            file_type: None,
            creator: None,
        }
    }

    /// Builds forks from separate data and resource buffers.
    pub fn from_parts(data: impl Into<Bytes>, resource: Option<Bytes>) -> Self {
        Self {
            resource: resource.filter(|r| !r.is_empty()),
            ..Self::raw(data)
        }
    }

    /// Opens a file, unwrapping its container.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Reads a whole container from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Unwraps a container held in memory.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.is_empty() {
            return Err(Error::UnsupportedFormat("empty input".into()));
        }
        if cfg!(feature = "container") {
            if let Some(forks) = read_apple_single(&data)? {
                return Ok(forks);
            }
            if let Some(forks) = read_macbinary(&data) {
                return Ok(forks);
            }
        }
        log::debug!("no container header, reading {} bytes as a data fork", data.len());
        Ok(Self::raw(data))
    }

    /// Attaches an AppleDouble (or bare) resource fork to these forks.
    pub fn with_resource_file(mut self, sidecar: Bytes) -> Result<Self> {
        match read_apple_single(&sidecar)? {
            Some(double) => {
                self.resource = double.resource;
                self.file_type = double.file_type.or(self.file_type);
                self.creator = double.creator.or(self.creator);
            }
            None if !sidecar.is_empty() => self.resource = Some(sidecar),
            None => {}
        }
        Ok(self)
    }
}

fn be_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_macbinary(data: &Bytes) -> Option<MacForks> {
    if data.len() < MACBINARY_HEADER {
        return None;
    }
    let name_len = data[1] as usize;
    if data[0] != 0 || !(1..=63).contains(&name_len) || data[74] != 0 || data[82] != 0 {
        return None;
    }
    let data_len = be_u32(data, 83) as usize;
    let rsrc_len = be_u32(data, 87) as usize;
    let rsrc_start = MACBINARY_HEADER + data_len.div_ceil(MACBINARY_HEADER) * MACBINARY_HEADER;
    if MACBINARY_HEADER + data_len > data.len()
        || (rsrc_len > 0 && rsrc_start + rsrc_len > data.len())
    {
        return None;
    }
    log::debug!("MacBinary: data {} bytes, resource {} bytes", data_len, rsrc_len);
    Some(MacForks {
        kind: ContainerKind::MacBinary,
        data: data.slice(MACBINARY_HEADER..MACBINARY_HEADER + data_len),
        resource: (rsrc_len > 0).then(|| data.slice(rsrc_start..rsrc_start + rsrc_len)),
        file_type: Some(Tag::new([data[65], data[66], data[67], data[68]])),
        creator: Some(Tag::new([data[69], data[70], data[71], data[72]])),
    })
}

fn read_apple_single(data: &Bytes) -> Result<Option<MacForks>> {
    if data.len() < 8 {
        return Ok(None);
    }
    let kind = match be_u32(data, 0) {
        APPLE_SINGLE_MAGIC => ContainerKind::AppleSingle,
        APPLE_DOUBLE_MAGIC => ContainerKind::AppleDouble,
        _ => return Ok(None),
    };
    let version = be_u32(data, 4);
    if version != 0x0001_0000 && version != 0x0002_0000 {
        return Err(Error::UnsupportedFormat(format!(
            "{:?} version {:#x}",
            kind, version
        )));
    }
    if data.len() < APPLE_HEADER {
        return Err(Error::StreamExhausted {
            offset: data.len() as i64,
            needed: (APPLE_HEADER - data.len()) as i64,
        });
    }
    let count = u16::from_be_bytes([data[24], data[25]]) as usize;
    let table_end = APPLE_HEADER + count * APPLE_ENTRY;
    if table_end > data.len() {
        return Err(Error::structure(24, "entry table runs past the end"));
    }

    let mut forks = MacForks {
        kind,
        data: Bytes::new(),
        resource: None,
        file_type: None,
        creator: None,
    };
    for i in 0..count {
        let at = APPLE_HEADER + i * APPLE_ENTRY;
        let id = be_u32(data, at);
        let offset = be_u32(data, at + 4) as usize;
        let length = be_u32(data, at + 8) as usize;
        let end = offset.checked_add(length).unwrap_or(usize::MAX);
        if end > data.len() {
            return Err(Error::InvalidPosition {
                pos: end as i64,
                end: data.len() as i64,
            });
        }
        let body = data.slice(offset..end);
        match id {
            entry_id::DATA_FORK => forks.data = body,
            entry_id::RESOURCE_FORK if length > 0 => forks.resource = Some(body),
            entry_id::FINDER_INFO if length >= 8 => {
                forks.file_type = Some(Tag::new([body[0], body[1], body[2], body[3]]));
                forks.creator = Some(Tag::new([body[4], body[5], body[6], body[7]]));
            }
            other => log::trace!("{:?}: skipping entry {}", kind, other),
        }
    }
    Ok(Some(forks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn macbinary(data: &[u8], rsrc: &[u8]) -> Vec<u8> {
        let mut header = vec![0u8; MACBINARY_HEADER];
        header[1] = 4;
        header[2..6].copy_from_slice(b"memo");
        header[65..69].copy_from_slice(b"TEXT");
        header[69..73].copy_from_slice(b"ttxt");
        header[83..87].copy_from_slice(&(data.len() as u32).to_be_bytes());
        header[87..91].copy_from_slice(&(rsrc.len() as u32).to_be_bytes());
        header.extend_from_slice(data);
        while header.len() % MACBINARY_HEADER != 0 {
            header.push(0);
        }
        header.extend_from_slice(rsrc);
        header
    }

    fn apple(magic: u32, version: u32, entries: &[(u32, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&magic.to_be_bytes());
        out.extend_from_slice(&version.to_be_bytes());
        out.extend_from_slice(&[0; 16]);
        out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
        let mut offset = APPLE_HEADER + entries.len() * APPLE_ENTRY;
        for (id, body) in entries {
            out.extend_from_slice(&id.to_be_bytes());
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&(body.len() as u32).to_be_bytes());
            offset += body.len();
        }
        for (_, body) in entries {
            out.extend_from_slice(body);
        }
        out
    }

    #[test]
    #[cfg(feature = "container")]
    fn test_macbinary() {
        let forks = MacForks::from_bytes(macbinary(b"hello", b"resource")).unwrap();
        assert_eq!(forks.kind, ContainerKind::MacBinary);
        assert_eq!(&forks.data[..], b"hello");
        assert_eq!(forks.resource.as_deref(), Some(&b"resource"[..]));
        assert_eq!(forks.file_type, Some(Tag::from("TEXT")));
        assert_eq!(forks.creator, Some(Tag::from("ttxt")));
    }

    #[test]
    #[cfg(feature = "container")]
    fn test_apple_single_and_double() {
        let single = apple(
            APPLE_SINGLE_MAGIC,
            0x0002_0000,
            &[(9, b"WORDMSWD"), (1, b"text"), (2, b"rsrc")],
        );
        let forks = MacForks::from_bytes(single).unwrap();
        assert_eq!(forks.kind, ContainerKind::AppleSingle);
        assert_eq!(&forks.data[..], b"text");
        assert_eq!(forks.resource.as_deref(), Some(&b"rsrc"[..]));
        assert_eq!(forks.creator, Some(Tag::from("MSWD")));

        let double = apple(APPLE_DOUBLE_MAGIC, 0x0002_0000, &[(2, b"fork")]);
        let forks = MacForks::raw(&b"body"[..])
            .with_resource_file(Bytes::from(double))
            .unwrap();
        assert_eq!(&forks.data[..], b"body");
        assert_eq!(forks.resource.as_deref(), Some(&b"fork"[..]));
    }

    #[test]
    #[cfg(feature = "container")]
    fn test_bad_apple_version_is_unsupported() {
        let bad = apple(APPLE_SINGLE_MAGIC, 0x0003_0000, &[(1, b"x")]);
        assert!(matches!(
            MacForks::from_bytes(bad),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    #[cfg(feature = "container")]
    fn test_apple_entry_out_of_range() {
        let mut single = apple(APPLE_SINGLE_MAGIC, 0x0002_0000, &[(1, b"text")]);
        single.truncate(single.len() - 2);
        assert!(matches!(
            MacForks::from_bytes(single),
            Err(Error::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_raw_and_empty() {
        let forks = MacForks::from_bytes(&b"Just some text"[..]).unwrap();
        assert_eq!(forks.kind, ContainerKind::Raw);
        assert!(forks.resource.is_none());
        assert!(matches!(
            MacForks::from_bytes(Vec::new()),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
