//! Bytes to value graph.
//!
//! The decoder rebuilds values in the order the encoder assigned reference
//! indices. Containers are registered before their children are read, so a
//! child that refers back to its parent resolves to the very container being
//! filled.

use crate::encode::HEADER;
use crate::map::{Record, ValueMap, ValueSet};
use crate::options::CodecOptions;
use crate::reader::ByteReader;
use crate::refs::ReferenceLookup;
use crate::tag::{Layout, Tag};
use crate::value::{Blob, Pattern, PixelArray, TypedView, Value, ViewKind};
use crate::{Error, Result};
use chrono::DateTime;
use std::rc::Rc;
use tracing::debug;

/// Decodes one complete stream. Trailing bytes after the root are rejected.
pub(crate) fn decode(bytes: &[u8], options: &CodecOptions) -> Result<Value> {
    let mut decoder = Decoder::new(bytes, options);
    if options.header {
        decoder.read_header()?;
    }
    let value = decoder.read_value()?;
    if decoder.reader.remaining() != 0 {
        return Err(Error::corrupt(
            decoder.reader.position(),
            &format!("{} trailing byte(s) after the root value", decoder.reader.remaining()),
        ));
    }
    debug!(
        bytes = bytes.len(),
        references = decoder.lookup.len(),
        "decoded value graph"
    );
    Ok(value)
}

struct Decoder<'a> {
    reader: ByteReader<'a>,
    lookup: ReferenceLookup,
    options: &'a CodecOptions,
    depth: usize,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8], options: &'a CodecOptions) -> Self {
        Decoder {
            reader: ByteReader::new(bytes),
            lookup: ReferenceLookup::new(),
            options,
            depth: 0,
        }
    }

    fn read_header(&mut self) -> Result<()> {
        let header = self.reader.read_bytes(HEADER.len())?;
        if header[..4] != HEADER[..4] {
            return Err(Error::corrupt(0, "missing stream header"));
        }
        if header != HEADER {
            return Err(Error::corrupt(4, "unsupported stream version or line ending"));
        }
        Ok(())
    }

    fn descend<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.options.max_depth {
            return Err(Error::depth_limit(self.options.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn read_value(&mut self) -> Result<Value> {
        let offset = self.reader.position();
        let byte = self.reader.read_u8()?;
        let tag = Tag::try_from(byte)
            .map_err(|byte| Error::corrupt(offset, &format!("unknown type tag 0x{byte:02X}")))?;
        match tag.layout() {
            Layout::Fixed => Ok(match tag {
                Tag::Null => Value::Null,
                Tag::Undefined => Value::Undefined,
                Tag::True => Value::Bool(true),
                Tag::False => Value::Bool(false),
                _ => return Err(Error::internal(format!("{tag} is not a fixed tag"))),
            }),
            Layout::Inline => self.read_inline(tag, offset),
            Layout::Prefixed => {
                let length = self.reader.read_len()?;
                let remaining = self.reader.remaining();
                if length > remaining {
                    return Err(Error::unexpected_eof(self.reader.position(), length - remaining));
                }
                let end = self.reader.position() + length;
                let value = if tag == Tag::String {
                    let text = self.reader.read_text(length)?;
                    let value = Value::from(text);
                    self.lookup.push(value.clone());
                    value
                } else {
                    self.descend(|d| d.read_prefixed(tag, end))?
                };
                if self.reader.position() != end {
                    return Err(Error::corrupt(
                        self.reader.position(),
                        &format!("{tag} payload does not end at byte {end}"),
                    ));
                }
                Ok(value)
            }
        }
    }

    fn read_inline(&mut self, tag: Tag, offset: usize) -> Result<Value> {
        match tag {
            Tag::Float64 => Ok(Value::Number(self.reader.read_f64()?)),
            Tag::PositiveInt => Ok(Value::Number(f64::from(self.reader.read_varint()?))),
            Tag::NegativeInt => Ok(Value::Number(-f64::from(self.reader.read_varint()?))),
            Tag::Reference => {
                let index = self.reader.read_varint()?;
                self.lookup.resolve(index, offset)
            }
            Tag::Date => self.descend(|d| {
                let millis = d.reader.read_f64()?;
                let at = (millis.is_finite() && millis.fract() == 0.0)
                    .then(|| DateTime::from_timestamp_millis(millis as i64))
                    .flatten()
                    .ok_or_else(|| Error::corrupt(offset, &format!("invalid timestamp {millis}")))?;
                let value = Value::date(at);
                d.lookup.push(value.clone());
                Ok(value)
            }),
            _ => Err(Error::internal(format!("{tag} is not an inline tag"))),
        }
    }

    /// Bytes left before `end`, or an error if a field already ran past it.
    fn left_until(&self, end: usize) -> Result<usize> {
        end.checked_sub(self.reader.position())
            .ok_or_else(|| Error::corrupt(end, "field runs past the declared payload length"))
    }

    fn read_sized_text(&mut self) -> Result<&'a str> {
        let len = self.reader.read_len()?;
        self.reader.read_text(len)
    }

    fn read_prefixed(&mut self, tag: Tag, end: usize) -> Result<Value> {
        let start = self.reader.position();
        if let Some(kind) = ViewKind::from_tag(tag) {
            return self.read_view(kind);
        }
        let value = match tag {
            Tag::Pattern => {
                let text = self.reader.read_text(end - start)?;
                Value::pattern(Pattern::parse(text)?)
            }
            Tag::ArrayBuffer => Value::array_buffer(self.reader.read_bytes(end - start)?.to_vec()),
            Tag::Blob | Tag::File => {
                let mime = self.read_sized_text()?;
                let file = if tag == Tag::File {
                    let name = self.read_sized_text()?;
                    Some((name, self.reader.read_i64()?))
                } else {
                    None
                };
                let contents = self.reader.read_bytes(self.left_until(end)?)?;
                let blob = Blob::from_bytes(mime, contents.to_vec());
                Value::blob(match file {
                    Some((name, last_modified)) => blob.with_file(name, last_modified),
                    None => blob,
                })
            }
            Tag::ImageData | Tag::ImageBitmap => {
                let pixels = self.read_pixels(start, end)?;
                if tag == Tag::ImageData {
                    Value::image_data(pixels)
                } else {
                    let codec = self
                        .options
                        .pixel_codec
                        .as_ref()
                        .ok_or_else(|| Error::platform_unavailable("Bitmap conversion"))?;
                    Value::bitmap(codec.from_pixel_array(pixels)?)
                }
            }
            Tag::Array => return self.read_array(end),
            Tag::Object => return self.read_object(end),
            Tag::Map => return self.read_map(end),
            Tag::Set => return self.read_set(end),
            _ => return Err(Error::internal(format!("{tag} is not a prefixed object tag"))),
        };
        self.lookup.push(value.clone());
        Ok(value)
    }

    fn read_pixels(&mut self, start: usize, end: usize) -> Result<PixelArray> {
        let width = self.reader.read_varint()?;
        let height = self.reader.read_varint()?;
        let data = self.reader.read_bytes(self.left_until(end)?)?;
        PixelArray::new(width, height, data.to_vec())
            .map_err(|err| Error::corrupt(start, &err.to_string()))
    }

    fn read_view(&mut self, kind: ViewKind) -> Result<Value> {
        let slot = self.lookup.reserve();
        let count = self.reader.read_len()?;
        let byte_offset = self.reader.read_len()?;
        let buffer_at = self.reader.position();
        let buffer = match self.read_value()? {
            Value::ArrayBuffer(buffer) => buffer,
            other => {
                return Err(Error::corrupt(
                    buffer_at,
                    &format!("typed view wraps a {} instead of an array buffer", other.kind().name()),
                ))
            }
        };
        let view = TypedView::new(kind, buffer, byte_offset, count)
            .map_err(|err| Error::corrupt(buffer_at, &err.to_string()))?;
        let value = Value::view(view);
        self.lookup.fill(slot, value.clone())?;
        Ok(value)
    }

    fn read_array(&mut self, end: usize) -> Result<Value> {
        let items = Rc::new(std::cell::RefCell::new(Vec::new()));
        let value = Value::Array(Rc::clone(&items));
        self.lookup.push(value.clone());
        while self.reader.position() < end {
            let item = self.read_value()?;
            items.borrow_mut().push(item);
        }
        Ok(value)
    }

    fn read_object(&mut self, end: usize) -> Result<Value> {
        let value = Value::object(Record::new());
        self.lookup.push(value.clone());
        let Value::Object(record) = &value else {
            return Err(Error::internal("object placeholder has the wrong kind"));
        };
        while self.reader.position() < end {
            let key = self.read_sized_text()?;
            let child = self.read_value()?;
            record.borrow_mut().insert(key, child);
        }
        Ok(value)
    }

    fn read_map(&mut self, end: usize) -> Result<Value> {
        let value = Value::map(ValueMap::new());
        self.lookup.push(value.clone());
        let Value::Map(map) = &value else {
            return Err(Error::internal("map placeholder has the wrong kind"));
        };
        while self.reader.position() < end {
            let key = self.read_value()?;
            let child = self.read_value()?;
            map.borrow_mut().insert(key, child);
        }
        Ok(value)
    }

    fn read_set(&mut self, end: usize) -> Result<Value> {
        let value = Value::set(ValueSet::new());
        self.lookup.push(value.clone());
        let Value::Set(set) = &value else {
            return Err(Error::internal("set placeholder has the wrong kind"));
        };
        while self.reader.position() < end {
            let member = self.read_value()?;
            set.borrow_mut().insert(member);
        }
        Ok(value)
    }
}
