//! Token tree to bytes.

use crate::options::CodecOptions;
use crate::registry::TypeRegistry;
use crate::tag::Layout;
use crate::token::{Payload, Token};
use crate::tokenizer::Tokenizer;
use crate::value::{Blob, Value};
use crate::writer::ByteWriter;
use crate::{Error, Result};
use std::rc::Rc;
use tracing::{debug, trace};

/// Optional stream header: magic, version 0, then CR LF.
pub const HEADER: [u8; 8] = *b"JSOF\x00\x00\r\n";

/// A tokenized graph waiting for its blob contents.
struct Prepared {
    root: Token,
    blobs: Vec<Rc<Blob>>,
    references: usize,
}

fn prepare(value: &Value, registry: &TypeRegistry, options: &CodecOptions) -> Result<Prepared> {
    let mut tokenizer = Tokenizer::new(registry, options);
    let root = tokenizer.tokenize(value)?;
    let references = tokenizer.references().len();
    Ok(Prepared {
        root,
        blobs: tokenizer.into_blobs(),
        references,
    })
}

/// Encodes using only blob contents that are already in memory.
pub(crate) fn encode(value: &Value, registry: &TypeRegistry, options: &CodecOptions) -> Result<Vec<u8>> {
    let prepared = prepare(value, registry, options)?;
    let contents = prepared
        .blobs
        .iter()
        .map(|blob| {
            blob.bytes().ok_or_else(|| {
                Error::unsupported("blob contents require asynchronous reading; use encode_async")
            })
        })
        .collect::<Result<Vec<_>>>()?;
    finish(&prepared, &contents, options)
}

/// Encodes after awaiting every blob's contents, in tokenization order.
pub(crate) async fn encode_async(
    value: &Value,
    registry: &TypeRegistry,
    options: &CodecOptions,
) -> Result<Vec<u8>> {
    let prepared = prepare(value, registry, options)?;
    let mut contents = Vec::with_capacity(prepared.blobs.len());
    for (slot, blob) in prepared.blobs.iter().enumerate() {
        trace!(slot, size = blob.size(), mime = blob.mime_type(), "reading blob contents");
        contents.push(blob.source().read_all_bytes().await?);
    }
    finish(&prepared, &contents, options)
}

fn finish<C: AsRef<[u8]>>(prepared: &Prepared, contents: &[C], options: &CodecOptions) -> Result<Vec<u8>> {
    let header = if options.header { HEADER.len() } else { 0 };
    let mut writer = ByteWriter::new(header + prepared.root.encoded_len());
    if options.header {
        writer.write_bytes(&HEADER)?;
    }
    write_token(&mut writer, &prepared.root, contents)?;
    let bytes = writer.finish()?;
    debug!(
        bytes = bytes.len(),
        references = prepared.references,
        blobs = prepared.blobs.len(),
        "encoded value graph"
    );
    Ok(bytes)
}

fn write_sized_text(writer: &mut ByteWriter, text: &str) -> Result<()> {
    writer.write_varint(text.len() as u64)?;
    writer.write_text(text)
}

fn write_token<C: AsRef<[u8]>>(writer: &mut ByteWriter, token: &Token, contents: &[C]) -> Result<()> {
    writer.write_u8(token.tag().as_u8())?;
    if token.tag().layout() == Layout::Prefixed {
        writer.write_varint(u64::from(token.length()))?;
    }
    let start = writer.position();
    match token.payload() {
        Payload::Empty => {}
        Payload::Uint(value) => {
            writer.write_varint(u64::from(*value))?;
        }
        Payload::Float(value) => writer.write_f64(*value)?,
        Payload::Text(text) => writer.write_text(text)?,
        Payload::Bytes(buffer) => writer.write_bytes(&buffer.borrow())?,
        Payload::View {
            count,
            offset,
            buffer,
        } => {
            writer.write_varint(u64::from(*count))?;
            writer.write_varint(u64::from(*offset))?;
            write_token(writer, buffer, contents)?;
        }
        Payload::Pixels(pixels) => {
            writer.write_varint(u64::from(pixels.width()))?;
            writer.write_varint(u64::from(pixels.height()))?;
            writer.write_bytes(pixels.data())?;
        }
        Payload::Blob {
            mime,
            file,
            size,
            slot,
        } => {
            write_sized_text(writer, mime)?;
            if let Some(file) = file {
                write_sized_text(writer, &file.name)?;
                writer.write_i64(file.last_modified)?;
            }
            let bytes = contents
                .get(*slot)
                .map(|content| content.as_ref())
                .ok_or_else(|| Error::internal(format!("no contents for blob {slot}")))?;
            if bytes.len() != *size {
                return Err(Error::internal(format!(
                    "blob {slot} reported {size} bytes but produced {}",
                    bytes.len()
                )));
            }
            writer.write_bytes(bytes)?;
        }
        Payload::Items(items) => {
            for item in items {
                write_token(writer, item, contents)?;
            }
        }
        Payload::Fields(fields) => {
            for (key, child) in fields {
                write_sized_text(writer, key)?;
                write_token(writer, child, contents)?;
            }
        }
        Payload::Entries(entries) => {
            for (key, child) in entries {
                write_token(writer, key, contents)?;
                write_token(writer, child, contents)?;
            }
        }
    }
    let written = writer.position() - start;
    if written != token.length() as usize {
        return Err(Error::internal(format!(
            "{} payload wrote {written} bytes, expected {}",
            token.tag(),
            token.length()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{value, ErrorKind};

    fn encode_default(value: &Value) -> Result<Vec<u8>> {
        encode(value, &TypeRegistry::new(), &CodecOptions::new())
    }

    #[test]
    fn scalars() {
        assert_eq!(encode_default(&Value::Null).unwrap(), [0x00]);
        assert_eq!(encode_default(&Value::Undefined).unwrap(), [0x01]);
        assert_eq!(encode_default(&Value::from(true)).unwrap(), [0x05]);
        assert_eq!(encode_default(&Value::from(false)).unwrap(), [0x06]);
        assert_eq!(encode_default(&Value::from(42)).unwrap(), [0x03, 0x2A]);
        assert_eq!(encode_default(&Value::from(-42)).unwrap(), [0x04, 0x2A]);
        assert_eq!(encode_default(&Value::from(0)).unwrap(), [0x03, 0x00]);

        let mut float = vec![0x02];
        float.extend_from_slice(&3.14f64.to_be_bytes());
        assert_eq!(encode_default(&Value::from(3.14)).unwrap(), float);
    }

    #[test]
    fn strings_are_prefixed() {
        assert_eq!(
            encode_default(&Value::from("hi")).unwrap(),
            [0x09, 0x02, b'h', b'i']
        );
        assert_eq!(encode_default(&Value::from("")).unwrap(), [0x09, 0x00]);
    }

    #[test]
    fn nested_object_layout() {
        let value = value!({ "a": 1, "b": [1, 2, 3], "c": null });
        assert_eq!(
            encode_default(&value).unwrap(),
            [
                0x1A, 0x11, 0x01, 0x61, 0x03, 0x01, 0x01, 0x62, 0x19, 0x06, 0x03, 0x01, 0x03,
                0x02, 0x03, 0x03, 0x01, 0x63, 0x00
            ]
        );
    }

    #[test]
    fn header_is_prepended() {
        let options = CodecOptions::new().with_header(true);
        let bytes = encode(&Value::Null, &TypeRegistry::new(), &options).unwrap();
        assert_eq!(bytes, [b'J', b'S', b'O', b'F', 0x00, 0x00, 0x0D, 0x0A, 0x00]);
    }

    #[test]
    fn non_resident_blob_needs_async() {
        struct Lazy;

        #[async_trait::async_trait(?Send)]
        impl crate::BlobSource for Lazy {
            fn size(&self) -> u64 {
                1
            }

            async fn read_all_bytes(&self) -> std::result::Result<Vec<u8>, crate::BlobError> {
                Ok(vec![7])
            }
        }

        let blob = Value::blob(Blob::new("text/plain", Rc::new(Lazy)));
        let err = encode_default(&blob).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    }

    #[test]
    fn blob_that_changes_size_is_internal_error() {
        struct Liar;

        #[async_trait::async_trait(?Send)]
        impl crate::BlobSource for Liar {
            fn size(&self) -> u64 {
                4
            }

            async fn read_all_bytes(&self) -> std::result::Result<Vec<u8>, crate::BlobError> {
                Ok(vec![1, 2])
            }

            fn as_resident(&self) -> Option<&[u8]> {
                Some(&[1, 2])
            }
        }

        let blob = Value::blob(Blob::new("x", Rc::new(Liar)));
        let err = encode_default(&blob).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalConsistency);
    }

    #[test]
    fn payload_length_drift_is_internal_error() {
        let token = Token::new(crate::tag::Tag::String, 5, Payload::Text("ab".into())).unwrap();
        let mut writer = ByteWriter::new(token.encoded_len());
        let err = write_token::<Vec<u8>>(&mut writer, &token, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalConsistency);
    }
}
