//! Value graph to token tree.
//!
//! The tokenizer walks a graph depth-first, interning every referenceable
//! value at first sight. Strings are interned by content and everything
//! object-like by identity, so a later sighting becomes a `REFERENCE` token
//! instead of a second copy. Cycles terminate the same way: a container is
//! interned before its children are visited.

use crate::options::CodecOptions;
use crate::refs::{ReferenceTable, Sighting};
use crate::registry::{Handler, TypeRegistry};
use crate::tag::Tag;
use crate::token::{sized_text_len, Payload, Token};
use crate::value::{Blob, PixelArray, Value};
use crate::varint;
use crate::{Error, Result};
use std::rc::Rc;
use tracing::trace;

/// Numbers with a magnitude below this, and no fractional part, travel as VarInts.
const VARINT_LIMIT: f64 = 4_294_967_296.0;

/// Converts a value graph into a token tree for one encode call.
pub struct Tokenizer<'a> {
    registry: &'a TypeRegistry,
    options: &'a CodecOptions,
    references: ReferenceTable,
    blobs: Vec<Rc<Blob>>,
    depth: usize,
}

impl<'a> Tokenizer<'a> {
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, options: &'a CodecOptions) -> Self {
        Tokenizer {
            registry,
            options,
            references: ReferenceTable::new(),
            blobs: Vec::new(),
            depth: 0,
        }
    }

    #[must_use]
    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    /// Blobs met so far, in the order their contents will be written.
    #[must_use]
    pub fn blobs(&self) -> &[Rc<Blob>] {
        &self.blobs
    }

    pub(crate) fn into_blobs(self) -> Vec<Rc<Blob>> {
        self.blobs
    }

    /// Tokenizes a value and everything reachable from it.
    pub fn tokenize(&mut self, value: &Value) -> Result<Token> {
        match value {
            Value::Undefined => Ok(Token::fixed(Tag::Undefined)),
            Value::Null => Ok(Token::fixed(Tag::Null)),
            Value::Bool(true) => Ok(Token::fixed(Tag::True)),
            Value::Bool(false) => Ok(Token::fixed(Tag::False)),
            Value::Number(n) => Ok(number_token(*n)),
            Value::String(text) => match self.references.intern_text(text)? {
                Sighting::Seen(index) => Ok(Token::reference(index)),
                Sighting::New(_) => Token::new(Tag::String, text.len(), Payload::Text(Rc::clone(text))),
            },
            Value::Function(function) => Err(Error::unsupported(&format!(
                "function `{}` cannot be serialized",
                function.name()
            ))),
            _ => match self.references.intern_object(value)? {
                Sighting::Seen(index) => Ok(Token::reference(index)),
                Sighting::New(index) => self.descend(|t| t.tokenize_new(value, index)),
            },
        }
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

    fn tokenize_new(&mut self, value: &Value, index: u32) -> Result<Token> {
        let registry = self.registry;
        let (name, lower) = match registry.resolve(value)? {
            Handler::Builtin(tokenize) => return tokenize(value, self),
            Handler::Host { name, lower } => (name, lower),
        };
        let host = value
            .as_host()
            .ok_or_else(|| Error::internal("host handler resolved for a built-in value"))?;
        trace!(host = name, index, "lowering host object");
        let lowered = lower(host.as_any())?;
        match registry.resolve(&lowered) {
            Ok(Handler::Builtin(tokenize)) => match self.references.lookup(&lowered) {
                Some(existing) => {
                    self.references.forward(value, index, existing)?;
                    Ok(Token::reference(existing))
                }
                None => {
                    self.references.alias(&lowered, index);
                    tokenize(&lowered, self)
                }
            },
            _ => Err(Error::unsupported(&format!(
                "host type `{name}` must lower to a built-in object, got {}",
                lowered.kind().name()
            ))),
        }
    }
}

fn number_token(n: f64) -> Token {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < VARINT_LIMIT {
        let magnitude = n.abs() as u32;
        // -0.0 is not below zero, so it lands on the positive tag.
        let tag = if n < 0.0 {
            Tag::NegativeInt
        } else {
            Tag::PositiveInt
        };
        Token::uint(tag, magnitude)
    } else {
        Token::float(Tag::Float64, n)
    }
}

fn mismatch(value: &Value, expected: &str) -> Error {
    Error::internal(format!(
        "{expected} tokenizer received a {}",
        value.kind().name()
    ))
}

fn pixels_token(tag: Tag, pixels: Rc<PixelArray>) -> Result<Token> {
    let length =
        varint::len_u32(pixels.width()) + varint::len_u32(pixels.height()) + pixels.data().len();
    Token::new(tag, length, Payload::Pixels(pixels))
}

fn items_token(tag: Tag, items: Vec<Token>) -> Result<Token> {
    let length = items.iter().map(Token::encoded_len).sum();
    Token::new(tag, length, Payload::Items(items))
}

pub(crate) fn tokenize_array(value: &Value, t: &mut Tokenizer<'_>) -> Result<Token> {
    let Value::Array(items) = value else {
        return Err(mismatch(value, "array"));
    };
    let items = items
        .borrow()
        .iter()
        .map(|item| t.tokenize(item))
        .collect::<Result<Vec<_>>>()?;
    items_token(Tag::Array, items)
}

pub(crate) fn tokenize_set(value: &Value, t: &mut Tokenizer<'_>) -> Result<Token> {
    let Value::Set(set) = value else {
        return Err(mismatch(value, "set"));
    };
    let items = set
        .borrow()
        .iter()
        .map(|item| t.tokenize(item))
        .collect::<Result<Vec<_>>>()?;
    items_token(Tag::Set, items)
}

pub(crate) fn tokenize_object(value: &Value, t: &mut Tokenizer<'_>) -> Result<Token> {
    let Value::Object(record) = value else {
        return Err(mismatch(value, "object"));
    };
    let record = record.borrow();
    let mut length = 0;
    let mut fields = Vec::with_capacity(record.len());
    for (key, child) in record.iter() {
        let token = t.tokenize(child)?;
        length += sized_text_len(key.len())? + token.encoded_len();
        fields.push((Rc::from(key.as_str()), token));
    }
    Token::new(Tag::Object, length, Payload::Fields(fields))
}

pub(crate) fn tokenize_map(value: &Value, t: &mut Tokenizer<'_>) -> Result<Token> {
    let Value::Map(map) = value else {
        return Err(mismatch(value, "map"));
    };
    let map = map.borrow();
    let mut length = 0;
    let mut entries = Vec::with_capacity(map.len());
    for (key, child) in map.iter() {
        let key = t.tokenize(key)?;
        let child = t.tokenize(child)?;
        length += key.encoded_len() + child.encoded_len();
        entries.push((key, child));
    }
    Token::new(Tag::Map, length, Payload::Entries(entries))
}

pub(crate) fn tokenize_pattern(value: &Value, _: &mut Tokenizer<'_>) -> Result<Token> {
    let pattern = value
        .as_pattern()
        .ok_or_else(|| mismatch(value, "pattern"))?;
    let text: Rc<str> = Rc::from(pattern.to_string());
    Token::new(Tag::Pattern, text.len(), Payload::Text(text))
}

pub(crate) fn tokenize_date(value: &Value, _: &mut Tokenizer<'_>) -> Result<Token> {
    let at = value.as_date().ok_or_else(|| mismatch(value, "date"))?;
    Ok(Token::float(Tag::Date, at.timestamp_millis() as f64))
}

pub(crate) fn tokenize_array_buffer(value: &Value, _: &mut Tokenizer<'_>) -> Result<Token> {
    let buffer = value
        .as_array_buffer()
        .ok_or_else(|| mismatch(value, "array buffer"))?;
    let length = buffer.borrow().len();
    Token::new(Tag::ArrayBuffer, length, Payload::Bytes(Rc::clone(buffer)))
}

pub(crate) fn tokenize_view(value: &Value, t: &mut Tokenizer<'_>) -> Result<Token> {
    let view = value.as_view().ok_or_else(|| mismatch(value, "typed view"))?;
    let available = view.buffer().borrow().len();
    if view.byte_offset() + view.byte_len() > available {
        return Err(Error::unsupported(&format!(
            "view of {} element(s) at offset {} exceeds a {available}-byte buffer",
            view.len(),
            view.byte_offset()
        )));
    }
    let count = u32::try_from(view.len())
        .map_err(|_| Error::format_limit("view length", view.len() as u64, varint::MAX_VALUE))?;
    let offset = u32::try_from(view.byte_offset()).map_err(|_| {
        Error::format_limit("view byte offset", view.byte_offset() as u64, varint::MAX_VALUE)
    })?;
    let buffer = t.tokenize(&Value::ArrayBuffer(Rc::clone(view.buffer())))?;
    let length = varint::len_u32(count) + varint::len_u32(offset) + buffer.encoded_len();
    Token::new(
        view.kind().tag(),
        length,
        Payload::View {
            count,
            offset,
            buffer: Box::new(buffer),
        },
    )
}

pub(crate) fn tokenize_blob(value: &Value, t: &mut Tokenizer<'_>) -> Result<Token> {
    let Value::Blob(blob) = value else {
        return Err(mismatch(value, "blob"));
    };
    let size = usize::try_from(blob.size())
        .map_err(|_| Error::format_limit("blob size", blob.size(), varint::MAX_VALUE))?;
    let mut length = sized_text_len(blob.mime_type().len())? + size;
    let tag = match blob.file() {
        Some(file) => {
            length += sized_text_len(file.name.len())? + 8;
            Tag::File
        }
        None => Tag::Blob,
    };
    let slot = t.blobs.len();
    t.blobs.push(Rc::clone(blob));
    Token::new(
        tag,
        length,
        Payload::Blob {
            mime: Rc::from(blob.mime_type()),
            file: blob.file().cloned(),
            size,
            slot,
        },
    )
}

pub(crate) fn tokenize_image_data(value: &Value, _: &mut Tokenizer<'_>) -> Result<Token> {
    let Value::ImageData(pixels) = value else {
        return Err(mismatch(value, "image data"));
    };
    pixels_token(Tag::ImageData, Rc::clone(pixels))
}

pub(crate) fn tokenize_bitmap(value: &Value, t: &mut Tokenizer<'_>) -> Result<Token> {
    let bitmap = value.as_bitmap().ok_or_else(|| mismatch(value, "bitmap"))?;
    let codec = t
        .options
        .pixel_codec
        .as_ref()
        .ok_or_else(|| Error::platform_unavailable("Bitmap conversion"))?;
    let pixels = codec.to_pixel_array(bitmap)?;
    pixels_token(Tag::ImageBitmap, Rc::new(pixels))
}
