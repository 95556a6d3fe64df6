//! Interchange buffer to event stream.

use super::handler::{DocumentHandler, NullHandler};
use super::property::{PropertyList, PropertyListVector, PropertyValue};
use super::tag;
use crate::error::{Error, Result};

/// Cursor over an encoded buffer.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::codec(self.pos, "unexpected end of buffer"))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads a 4-byte little-endian signed integer.
    pub fn read_integer(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        let value = u32::from(bytes[0])
            | (u32::from(bytes[1]) << 8)
            | (u32::from(bytes[2]) << 16)
            | (u32::from(bytes[3]) << 24);
        Ok(value as i32)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let at = self.pos;
        let len = self.read_integer()?;
        let len = usize::try_from(len)
            .map_err(|_| Error::codec(at, format!("negative string length {}", len)))?;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| Error::codec(at, "string is not valid UTF-8"))
    }

    /// Reads a property list; every value comes back as a string.
    pub fn read_property_list(&mut self) -> Result<PropertyList> {
        let count = self.read_count()?;
        let mut list = PropertyList::new();
        for _ in 0..count {
            let key = self.read_string()?;
            let value = self.read_string()?;
            list.insert(key, PropertyValue::String(value));
        }
        Ok(list)
    }

    pub fn read_property_list_vector(&mut self) -> Result<PropertyListVector> {
        let count = self.read_count()?;
        (0..count).map(|_| self.read_property_list()).collect()
    }

    fn read_count(&mut self) -> Result<usize> {
        let at = self.pos;
        let count = self.read_integer()?;
        usize::try_from(count).map_err(|_| Error::codec(at, format!("negative count {}", count)))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::codec(
                    self.pos,
                    format!("{} bytes requested, {} left", len, self.data.len() - self.pos),
                )
            })?;
        let data = self.data;
        let slice = &data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

/// Replays an encoded buffer into a [`DocumentHandler`].
///
/// The default decoder accepts only start, end and text records. The
/// extended decoder also accepts vector-start and insert records, which the
/// encoder produces.
///
/// Decoding is not transactional: events before a structural error have
/// already reached the handler. Run [`check_data`](Self::check_data) first
/// when that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyHandlerDecoder {
    extended: bool,
}

impl PropertyHandlerDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A decoder that also accepts `V` and `I` records.
    pub fn extended() -> Self {
        Self { extended: true }
    }

    /// Returns true if the buffer decodes without a structural error.
    pub fn check_data(&self, data: &[u8]) -> bool {
        self.read_data(data, &mut NullHandler).is_ok()
    }

    /// Decodes the buffer, dispatching each event as it is read.
    pub fn read_data<H: DocumentHandler + ?Sized>(&self, data: &[u8], handler: &mut H) -> Result<()> {
        let mut reader = WireReader::new(data);
        let mut open: Vec<String> = Vec::new();

        while !reader.at_end() {
            let at = reader.position();
            match reader.read_u8()? {
                tag::START => {
                    let name = reader.read_string()?;
                    let props = reader.read_property_list()?;
                    handler.start_element(&name, &props);
                    open.push(name);
                }
                tag::END => {
                    let name = reader.read_string()?;
                    match open.last() {
                        Some(top) if *top == name => {}
                        Some(top) => {
                            return Err(Error::codec(
                                at,
                                format!("end of '{}' while '{}' is open", name, top),
                            ))
                        }
                        None => {
                            return Err(Error::codec(
                                at,
                                format!("end of '{}' without a start", name),
                            ))
                        }
                    }
                    open.pop();
                    handler.end_element(&name);
                }
                tag::TEXT => {
                    let text = reader.read_string()?;
                    handler.characters(&text);
                }
                tag::START_WITH_VECTOR if self.extended => {
                    let name = reader.read_string()?;
                    let props = reader.read_property_list()?;
                    let vector = reader.read_property_list_vector()?;
                    handler.start_element_with_vector(&name, &props, &vector);
                    open.push(name);
                }
                tag::INSERT if self.extended => {
                    let name = reader.read_string()?;
                    handler.insert_element(&name);
                }
                other => {
                    return Err(Error::codec(at, format!("unknown record tag {:#04x}", other)));
                }
            }
        }

        match open.last() {
            Some(name) => Err(Error::codec(
                reader.position(),
                format!("'{}' is never closed", name),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PropertyHandlerEncoder;
    use crate::render::{Event, EventRecorder};

    fn start(name: &str) -> Vec<u8> {
        let mut enc = PropertyHandlerEncoder::new();
        enc.start_element(name, &PropertyList::new());
        enc.finish().to_vec()
    }

    fn end(name: &str) -> Vec<u8> {
        let mut enc = PropertyHandlerEncoder::new();
        enc.end_element(name);
        enc.finish().to_vec()
    }

    #[test]
    fn test_decode_document_scenario() {
        let mut data = start("Document");
        data.extend_from_slice(b"T\x02\x00\x00\x00hi");
        data.extend(end("Document"));

        let mut recorder = EventRecorder::new();
        PropertyHandlerDecoder::new().read_data(&data, &mut recorder).unwrap();
        assert_eq!(
            recorder.events(),
            &[
                Event::start("Document", PropertyList::new()),
                Event::Characters("hi".into()),
                Event::End("Document".into()),
            ]
        );
    }

    #[test]
    fn test_integer_shifts() {
        let mut reader = WireReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x04, 0x03, 0x02, 0x81]);
        assert_eq!(reader.read_integer().unwrap(), -1);
        assert_eq!(reader.read_integer().unwrap(), 0x8102_0304u32 as i32);
        assert!(reader.read_integer().is_err());

        let mut enc = PropertyHandlerEncoder::new();
        for v in [-1, 0, 1, i32::MIN, i32::MAX, 0x00FF_0000, -0x0100] {
            enc.write_integer(v);
        }
        let data = enc.finish();
        let mut reader = WireReader::new(&data);
        for v in [-1, 0, 1, i32::MIN, i32::MAX, 0x00FF_0000, -0x0100] {
            assert_eq!(reader.read_integer().unwrap(), v);
        }
    }

    #[test]
    fn test_ill_nested_input_is_rejected() {
        let mut data = start("a");
        data.extend(start("b"));
        data.extend(end("a"));

        let decoder = PropertyHandlerDecoder::new();
        assert!(!decoder.check_data(&data));

        let mut recorder = EventRecorder::new();
        let err = decoder.read_data(&data, &mut recorder).unwrap_err();
        assert!(matches!(err, Error::Codec { .. }));
        assert_eq!(
            recorder.events(),
            &[
                Event::start("a", PropertyList::new()),
                Event::start("b", PropertyList::new()),
            ]
        );
    }

    #[test]
    fn test_unclosed_and_unopened_elements() {
        let decoder = PropertyHandlerDecoder::new();
        assert!(!decoder.check_data(&start("a")));
        assert!(!decoder.check_data(&end("a")));
        assert!(decoder.check_data(&[]));
    }

    #[test]
    fn test_strict_decoder_rejects_extended_records() {
        let mut enc = PropertyHandlerEncoder::new();
        enc.start_element("P", &PropertyList::new());
        enc.insert_element("Tab");
        enc.end_element("P");
        let data = enc.finish();

        assert!(!PropertyHandlerDecoder::new().check_data(&data));
        assert!(PropertyHandlerDecoder::extended().check_data(&data));
    }

    #[test]
    fn test_truncated_and_garbage_buffers() {
        let mut data = start("Document");
        data.truncate(data.len() - 2);
        assert!(!PropertyHandlerDecoder::new().check_data(&data));

        assert!(!PropertyHandlerDecoder::new().check_data(b"X"));
        assert!(!PropertyHandlerDecoder::new().check_data(b"T\xFF\xFF\xFF\xFF"));
        assert!(!PropertyHandlerDecoder::new().check_data(b"T\x04\x00\x00\x00\xFF\xFEab"));
    }
}
