//! Dynamic value graph.
//!
//! This module provides the [`Value`] enum, the in-memory representation the
//! codec reads from and rebuilds. Unlike a tree-shaped document model, a
//! `Value` graph can share nodes and contain cycles: every object-like
//! variant holds its contents behind an [`Rc`], and cloning a `Value` clones
//! the handle, not the contents.
//!
//! ## Core Types
//!
//! - [`Value`]: any encodable value
//! - [`Pattern`]: a `/source/flags` text pattern
//! - [`TypedView`] and [`ViewKind`]: numeric views over a shared byte buffer
//! - [`Blob`], [`PixelArray`], [`Bitmap`]: platform-flavoured binary objects
//! - [`HostObject`]: an arbitrary Rust value lowered through the
//!   [`TypeRegistry`](crate::TypeRegistry)
//!
//! ## Identity vs equality
//!
//! ```rust
//! use freezedry::{value, Value};
//!
//! let a = value!([1, 2]);
//! let b = a.clone();
//! let c = value!([1, 2]);
//!
//! assert!(Value::ptr_eq(&a, &b));
//! assert!(!Value::ptr_eq(&a, &c));
//! assert_eq!(a, c);
//! ```
//!
//! ## Cycles
//!
//! ```rust
//! use freezedry::{Record, Value};
//!
//! let node = Value::object(Record::new());
//! node.as_object().unwrap().borrow_mut().insert("self", node.clone());
//!
//! let inner = node.get("self").unwrap();
//! assert!(Value::ptr_eq(&node, &inner));
//! ```
//!
//! `Rc` cycles are never collected; a cyclic graph lives until the process
//! ends unless the caller breaks the cycle.

use crate::map::{Record, ValueMap, ValueSet};
use crate::platform::{BlobSource, MemoryBlob};
use crate::tag::Tag;
use crate::{Error, Result};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// A shared, mutable sequence.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
/// A shared, mutable record.
pub type ObjectRef = Rc<RefCell<Record>>;
/// A shared, mutable byte buffer.
pub type BufferRef = Rc<RefCell<Vec<u8>>>;

/// A dynamically-typed node in a value graph.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Date(Rc<DateTime<Utc>>),
    Pattern(Rc<Pattern>),
    Array(ArrayRef),
    Object(ObjectRef),
    Map(Rc<RefCell<ValueMap>>),
    Set(Rc<RefCell<ValueSet>>),
    ArrayBuffer(BufferRef),
    View(Rc<TypedView>),
    Blob(Rc<Blob>),
    ImageData(Rc<PixelArray>),
    Bitmap(Rc<Bitmap>),
    Function(Rc<Function>),
    Host(HostObject),
}

/// The variant of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Undefined,
    Null,
    Bool,
    Number,
    String,
    Date,
    Pattern,
    Array,
    Object,
    Map,
    Set,
    ArrayBuffer,
    View,
    Blob,
    ImageData,
    Bitmap,
    Function,
    Host,
}

impl ValueKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Date => "date",
            ValueKind::Pattern => "pattern",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Map => "map",
            ValueKind::Set => "set",
            ValueKind::ArrayBuffer => "array buffer",
            ValueKind::View => "typed view",
            ValueKind::Blob => "blob",
            ValueKind::ImageData => "image data",
            ValueKind::Bitmap => "bitmap",
            ValueKind::Function => "function",
            ValueKind::Host => "host object",
        }
    }
}

fn addr<T: ?Sized>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc).cast::<()>() as usize
}

impl Value {
    /// Wraps a vector as a shared array.
    #[must_use]
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// Wraps a record as a shared object.
    #[must_use]
    pub fn object(record: Record) -> Self {
        Value::Object(Rc::new(RefCell::new(record)))
    }

    #[must_use]
    pub fn map(map: ValueMap) -> Self {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    #[must_use]
    pub fn set(set: ValueSet) -> Self {
        Value::Set(Rc::new(RefCell::new(set)))
    }

    #[must_use]
    pub fn array_buffer(bytes: Vec<u8>) -> Self {
        Value::ArrayBuffer(Rc::new(RefCell::new(bytes)))
    }

    #[must_use]
    pub fn view(view: TypedView) -> Self {
        Value::View(Rc::new(view))
    }

    /// Wraps a timestamp, truncated to whole milliseconds.
    #[must_use]
    pub fn date(at: DateTime<Utc>) -> Self {
        Value::Date(Rc::new(at.trunc_subsecs(3)))
    }

    #[must_use]
    pub fn pattern(pattern: Pattern) -> Self {
        Value::Pattern(Rc::new(pattern))
    }

    #[must_use]
    pub fn blob(blob: Blob) -> Self {
        Value::Blob(Rc::new(blob))
    }

    #[must_use]
    pub fn image_data(pixels: PixelArray) -> Self {
        Value::ImageData(Rc::new(pixels))
    }

    #[must_use]
    pub fn bitmap(bitmap: Bitmap) -> Self {
        Value::Bitmap(Rc::new(bitmap))
    }

    /// Wraps a closure. Functions can live in a graph but never encode.
    pub fn function<F>(name: &str, call: F) -> Self
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        Value::Function(Rc::new(Function {
            name: name.to_string(),
            call: Box::new(call),
        }))
    }

    /// Wraps an arbitrary Rust value. Encoding it requires a registry entry.
    pub fn host<T: Any>(value: T) -> Self {
        Value::Host(HostObject::new(value))
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Date(_) => ValueKind::Date,
            Value::Pattern(_) => ValueKind::Pattern,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Map(_) => ValueKind::Map,
            Value::Set(_) => ValueKind::Set,
            Value::ArrayBuffer(_) => ValueKind::ArrayBuffer,
            Value::View(_) => ValueKind::View,
            Value::Blob(_) => ValueKind::Blob,
            Value::ImageData(_) => ValueKind::ImageData,
            Value::Bitmap(_) => ValueKind::Bitmap,
            Value::Function(_) => ValueKind::Function,
            Value::Host(_) => ValueKind::Host,
        }
    }

    /// Address of the shared allocation behind an object-like value.
    ///
    /// Returns `None` for scalars and strings, which have no identity of their own.
    #[must_use]
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Undefined
            | Value::Null
            | Value::Bool(_)
            | Value::Number(_)
            | Value::String(_) => None,
            Value::Date(v) => Some(addr(v)),
            Value::Pattern(v) => Some(addr(v)),
            Value::Array(v) => Some(addr(v)),
            Value::Object(v) => Some(addr(v)),
            Value::Map(v) => Some(addr(v)),
            Value::Set(v) => Some(addr(v)),
            Value::ArrayBuffer(v) => Some(addr(v)),
            Value::View(v) => Some(addr(v)),
            Value::Blob(v) => Some(addr(v)),
            Value::ImageData(v) => Some(addr(v)),
            Value::Bitmap(v) => Some(addr(v)),
            Value::Function(v) => Some(addr(v)),
            Value::Host(v) => Some(v.addr()),
        }
    }

    /// Returns `true` if both values are the same shared object.
    #[must_use]
    pub fn ptr_eq(a: &Value, b: &Value) -> bool {
        matches!((a.identity(), b.identity()), (Some(x), Some(y)) if x == y)
    }

    /// Structural equality that terminates on cyclic graphs.
    ///
    /// Records, maps and sets compare in insertion order. `NaN` equals `NaN`.
    #[must_use]
    pub fn deep_eq(&self, other: &Value) -> bool {
        let mut assumed = HashSet::new();
        deep_eq(self, other, &mut assumed)
    }

    #[inline]
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// If the value is a whole number that fits in `i64`, returns it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use freezedry::Value;
    ///
    /// assert_eq!(Value::from(42).as_i64(), Some(42));
    /// assert_eq!(Value::from(42.5).as_i64(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_992.0 => {
                Some(*n as i64)
            }
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(record) => Some(record),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&Rc<RefCell<ValueMap>>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_set(&self) -> Option<&Rc<RefCell<ValueSet>>> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array_buffer(&self) -> Option<&BufferRef> {
        match self {
            Value::ArrayBuffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_view(&self) -> Option<&TypedView> {
        match self {
            Value::View(view) => Some(view),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(at) => Some(at),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            Value::Pattern(pattern) => Some(pattern),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Value::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_image_data(&self) -> Option<&PixelArray> {
        match self {
            Value::ImageData(pixels) => Some(pixels),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bitmap(&self) -> Option<&Bitmap> {
        match self {
            Value::Bitmap(bitmap) => Some(bitmap),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_host(&self) -> Option<&HostObject> {
        match self {
            Value::Host(host) => Some(host),
            _ => None,
        }
    }

    /// Looks up a field of an object, returning a shared handle to it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.as_object()
            .and_then(|record| record.borrow().get(key).cloned())
    }

    /// Looks up an element of an array, returning a shared handle to it.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<Value> {
        self.as_array()
            .and_then(|items| items.borrow().get(index).cloned())
    }
}

fn deep_eq(a: &Value, b: &Value, assumed: &mut HashSet<(usize, usize)>) -> bool {
    // Pairs already under comparison are assumed equal so cycles terminate.
    if let (Some(x), Some(y)) = (a.identity(), b.identity()) {
        if x == y || !assumed.insert((x, y)) {
            return true;
        }
    }
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::Pattern(x), Value::Pattern(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| deep_eq(l, r, assumed))
        }
        (Value::Object(x), Value::Object(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|((lk, lv), (rk, rv))| lk == rk && deep_eq(lv, rv, assumed))
        }
        (Value::Map(x), Value::Map(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter().zip(y.iter()).all(|((lk, lv), (rk, rv))| {
                    deep_eq(lk, rk, assumed) && deep_eq(lv, rv, assumed)
                })
        }
        (Value::Set(x), Value::Set(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| deep_eq(l, r, assumed))
        }
        (Value::ArrayBuffer(x), Value::ArrayBuffer(y)) => *x.borrow() == *y.borrow(),
        (Value::View(x), Value::View(y)) => {
            x.kind == y.kind
                && x.byte_offset == y.byte_offset
                && x.length == y.length
                && *x.buffer.borrow() == *y.buffer.borrow()
        }
        (Value::Blob(x), Value::Blob(y)) => {
            x.mime_type == y.mime_type
                && x.file == y.file
                && x.size() == y.size()
                && match (x.bytes(), y.bytes()) {
                    (Some(l), Some(r)) => l == r,
                    _ => Rc::ptr_eq(&x.source, &y.source),
                }
        }
        (Value::ImageData(x), Value::ImageData(y)) => x == y,
        // Opaque handles only compare by identity, which was checked above.
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

/// A text pattern in `/source/flags` form.
///
/// Only the shape is validated; the source is stored verbatim and never compiled.
///
/// # Examples
///
/// ```rust
/// use freezedry::Pattern;
///
/// let pattern = Pattern::parse("/a\\/b+/gi").unwrap();
/// assert_eq!(pattern.source(), "a\\/b+");
/// assert_eq!(pattern.flags(), "gi");
/// assert_eq!(pattern.to_string(), "/a\\/b+/gi");
/// assert!(Pattern::parse("no slashes").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    source: String,
    flags: String,
}

impl Pattern {
    /// Creates a pattern, validating that `flags` are word characters.
    pub fn new(source: &str, flags: &str) -> Result<Self> {
        if !flags.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::invalid_pattern(
                &format!("/{source}/{flags}"),
                "flags must be word characters",
            ));
        }
        Ok(Pattern {
            source: source.to_string(),
            flags: flags.to_string(),
        })
    }

    /// Parses the canonical `/source/flags` text.
    pub fn parse(text: &str) -> Result<Self> {
        let body = text
            .strip_prefix('/')
            .ok_or_else(|| Error::invalid_pattern(text, "expected a leading '/'"))?;
        let split = body
            .rfind('/')
            .ok_or_else(|| Error::invalid_pattern(text, "expected a closing '/'"))?;
        Pattern::new(&body[..split], &body[split + 1..])
            .map_err(|_| Error::invalid_pattern(text, "flags must be word characters"))
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flags
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// Element type of a [`TypedView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    /// Untyped byte access; `length` counts bytes.
    DataView,
}

impl ViewKind {
    pub const ALL: [ViewKind; 10] = [
        ViewKind::Int8,
        ViewKind::Uint8,
        ViewKind::Uint8Clamped,
        ViewKind::Int16,
        ViewKind::Uint16,
        ViewKind::Int32,
        ViewKind::Uint32,
        ViewKind::Float32,
        ViewKind::Float64,
        ViewKind::DataView,
    ];

    /// Size of one element in bytes.
    #[must_use]
    pub const fn element_size(self) -> usize {
        match self {
            ViewKind::Int8 | ViewKind::Uint8 | ViewKind::Uint8Clamped | ViewKind::DataView => 1,
            ViewKind::Int16 | ViewKind::Uint16 => 2,
            ViewKind::Int32 | ViewKind::Uint32 | ViewKind::Float32 => 4,
            ViewKind::Float64 => 8,
        }
    }

    pub(crate) const fn tag(self) -> Tag {
        match self {
            ViewKind::Int8 => Tag::Int8Array,
            ViewKind::Uint8 => Tag::Uint8Array,
            ViewKind::Uint8Clamped => Tag::Uint8ClampedArray,
            ViewKind::Int16 => Tag::Int16Array,
            ViewKind::Uint16 => Tag::Uint16Array,
            ViewKind::Int32 => Tag::Int32Array,
            ViewKind::Uint32 => Tag::Uint32Array,
            ViewKind::Float32 => Tag::Float32Array,
            ViewKind::Float64 => Tag::Float64Array,
            ViewKind::DataView => Tag::DataView,
        }
    }

    pub(crate) const fn from_tag(tag: Tag) -> Option<Self> {
        Some(match tag {
            Tag::Int8Array => ViewKind::Int8,
            Tag::Uint8Array => ViewKind::Uint8,
            Tag::Uint8ClampedArray => ViewKind::Uint8Clamped,
            Tag::Int16Array => ViewKind::Int16,
            Tag::Uint16Array => ViewKind::Uint16,
            Tag::Int32Array => ViewKind::Int32,
            Tag::Uint32Array => ViewKind::Uint32,
            Tag::Float32Array => ViewKind::Float32,
            Tag::Float64Array => ViewKind::Float64,
            Tag::DataView => ViewKind::DataView,
            _ => return None,
        })
    }
}

/// A window of typed elements over a shared [`Value::ArrayBuffer`] allocation.
///
/// Views never copy: two views built over one buffer observe each other's writes,
/// and they round-trip as two views over one decoded buffer.
#[derive(Clone)]
pub struct TypedView {
    kind: ViewKind,
    buffer: BufferRef,
    byte_offset: usize,
    length: usize,
}

impl TypedView {
    /// Creates a view of `length` elements starting at `byte_offset`.
    ///
    /// # Errors
    ///
    /// Fails if the offset is not a multiple of the element size or the window
    /// extends past the end of the buffer.
    pub fn new(kind: ViewKind, buffer: BufferRef, byte_offset: usize, length: usize) -> Result<Self> {
        let size = kind.element_size();
        if byte_offset % size != 0 {
            return Err(Error::custom(format!(
                "byte offset {byte_offset} is not a multiple of the {size}-byte element size"
            )));
        }
        let available = buffer.borrow().len();
        let end = length
            .checked_mul(size)
            .and_then(|bytes| bytes.checked_add(byte_offset));
        match end {
            Some(end) if end <= available => Ok(TypedView {
                kind,
                buffer,
                byte_offset,
                length,
            }),
            _ => Err(Error::custom(format!(
                "view of {length} element(s) at offset {byte_offset} exceeds a {available}-byte buffer"
            ))),
        }
    }

    /// Creates a view spanning the whole buffer.
    pub fn over(kind: ViewKind, buffer: BufferRef) -> Result<Self> {
        let length = buffer.borrow().len() / kind.element_size();
        TypedView::new(kind, buffer, 0, length)
    }

    #[must_use]
    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    #[must_use]
    pub fn buffer(&self) -> &BufferRef {
        &self.buffer
    }

    #[must_use]
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.length * self.kind.element_size()
    }

    /// Copies the visible window out of the buffer.
    ///
    /// Returns `None` if the buffer has shrunk below the window since the
    /// view was created.
    #[must_use]
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let end = self.byte_offset.checked_add(self.byte_len())?;
        self.buffer.borrow().get(self.byte_offset..end).map(<[u8]>::to_vec)
    }

    /// Reads element `index` as little-endian and widens it to `f64`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        if index >= self.length {
            return None;
        }
        let size = self.kind.element_size();
        let start = self.byte_offset + index * size;
        let buffer = self.buffer.borrow();
        let bytes = buffer.get(start..start + size)?;
        let mut raw = [0u8; 8];
        raw[..size].copy_from_slice(bytes);
        Some(match self.kind {
            ViewKind::Int8 => f64::from(bytes[0] as i8),
            ViewKind::Uint8 | ViewKind::Uint8Clamped | ViewKind::DataView => f64::from(bytes[0]),
            ViewKind::Int16 => f64::from(i16::from_le_bytes([raw[0], raw[1]])),
            ViewKind::Uint16 => f64::from(u16::from_le_bytes([raw[0], raw[1]])),
            ViewKind::Int32 => f64::from(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
            ViewKind::Uint32 => f64::from(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
            ViewKind::Float32 => f64::from(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
            ViewKind::Float64 => f64::from_le_bytes(raw),
        })
    }
}

impl fmt::Debug for TypedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedView")
            .field("kind", &self.kind)
            .field("byte_offset", &self.byte_offset)
            .field("length", &self.length)
            .field("buffer_len", &self.buffer.borrow().len())
            .finish()
    }
}

/// File metadata attached to a [`Blob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub last_modified: i64,
}

/// An opaque binary object with a MIME type and optional file metadata.
///
/// The contents are only reachable through its [`BlobSource`].
#[derive(Clone)]
pub struct Blob {
    mime_type: String,
    file: Option<FileInfo>,
    source: Rc<dyn BlobSource>,
}

impl Blob {
    pub fn new(mime_type: &str, source: Rc<dyn BlobSource>) -> Self {
        Blob {
            mime_type: mime_type.to_string(),
            file: None,
            source,
        }
    }

    /// Creates a blob over bytes held in memory.
    #[must_use]
    pub fn from_bytes(mime_type: &str, bytes: Vec<u8>) -> Self {
        Blob::new(mime_type, Rc::new(MemoryBlob::new(bytes)))
    }

    /// Attaches a file name and last-modified timestamp.
    #[must_use]
    pub fn with_file(mut self, name: &str, last_modified: i64) -> Self {
        self.file = Some(FileInfo {
            name: name.to_string(),
            last_modified,
        });
        self
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub fn file(&self) -> Option<&FileInfo> {
        self.file.as_ref()
    }

    #[must_use]
    pub fn source(&self) -> &Rc<dyn BlobSource> {
        &self.source
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.source.size()
    }

    /// Contents, if they are already resident in memory.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.source.as_resident()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("mime_type", &self.mime_type)
            .field("file", &self.file)
            .field("size", &self.size())
            .finish()
    }
}

/// Canonical RGBA pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelArray {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelArray {
    /// Bytes per pixel.
    pub const CHANNELS: usize = 4;

    /// Creates a pixel array, checking that `data` holds exactly `width * height` RGBA pixels.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(Self::CHANNELS));
        if expected != Some(data.len()) {
            return Err(Error::custom(format!(
                "{width}x{height} pixels need {} bytes, got {}",
                u64::from(width) * u64::from(height) * Self::CHANNELS as u64,
                data.len()
            )));
        }
        Ok(PixelArray {
            width,
            height,
            data,
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// A platform bitmap handle, converted through a [`PixelCodec`](crate::PixelCodec).
#[derive(Clone)]
pub struct Bitmap {
    handle: Rc<dyn Any>,
}

impl Bitmap {
    pub fn new<T: Any>(handle: T) -> Self {
        Bitmap {
            handle: Rc::new(handle),
        }
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref()
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Bitmap { .. }")
    }
}

/// A callable value.
pub struct Function {
    name: String,
    call: Box<dyn Fn(&[Value]) -> Value>,
}

impl Function {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.call)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

/// An arbitrary Rust value carried inside a graph.
#[derive(Clone)]
pub struct HostObject {
    inner: Rc<dyn Any>,
    type_name: &'static str,
}

impl HostObject {
    pub fn new<T: Any>(value: T) -> Self {
        HostObject {
            inner: Rc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// `TypeId` of the wrapped value (not of the `Rc`).
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        Any::type_id(&*self.inner)
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    #[must_use]
    pub fn as_any(&self) -> &dyn Any {
        &*self.inner
    }

    pub(crate) fn addr(&self) -> usize {
        addr(&self.inner)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({})", self.type_name)
    }
}

/// Debug view that prints `[Circular]` instead of re-entering a container.
struct DebugGraph<'a> {
    value: &'a Value,
    active: &'a RefCell<Vec<usize>>,
}

impl DebugGraph<'_> {
    fn child<'b>(&'b self, value: &'b Value) -> DebugGraph<'b> {
        DebugGraph {
            value,
            active: self.active,
        }
    }
}

impl fmt::Debug for DebugGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self.value {
            Value::Array(_) | Value::Object(_) | Value::Map(_) | Value::Set(_) => {
                self.value.identity()
            }
            _ => None,
        };
        if let Some(id) = id {
            if self.active.borrow().contains(&id) {
                return f.write_str("[Circular]");
            }
            self.active.borrow_mut().push(id);
        }
        let result = match self.value {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(&&**s).finish(),
            Value::Date(at) => f.debug_tuple("Date").field(&at.to_rfc3339()).finish(),
            Value::Pattern(p) => write!(f, "Pattern({p})"),
            Value::Array(items) => f
                .debug_list()
                .entries(items.borrow().iter().map(|v| self.child(v)))
                .finish(),
            Value::Object(record) => f
                .debug_map()
                .entries(record.borrow().iter().map(|(k, v)| (k, self.child(v))))
                .finish(),
            Value::Map(map) => {
                f.write_str("Map ")?;
                f.debug_map()
                    .entries(map.borrow().iter().map(|(k, v)| (self.child(k), self.child(v))))
                    .finish()
            }
            Value::Set(set) => {
                f.write_str("Set ")?;
                f.debug_set()
                    .entries(set.borrow().iter().map(|v| self.child(v)))
                    .finish()
            }
            Value::ArrayBuffer(bytes) => f.debug_tuple("ArrayBuffer").field(&bytes.borrow()).finish(),
            Value::View(view) => fmt::Debug::fmt(&**view, f),
            Value::Blob(blob) => fmt::Debug::fmt(&**blob, f),
            Value::ImageData(pixels) => f
                .debug_struct("ImageData")
                .field("width", &pixels.width)
                .field("height", &pixels.height)
                .finish(),
            Value::Bitmap(bitmap) => fmt::Debug::fmt(&**bitmap, f),
            Value::Function(function) => fmt::Debug::fmt(&**function, f),
            Value::Host(host) => fmt::Debug::fmt(host, f),
        };
        if id.is_some() {
            self.active.borrow_mut().pop();
        }
        result
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = RefCell::new(Vec::new());
        fmt::Debug::fmt(
            &DebugGraph {
                value: self,
                active: &active,
            },
            f,
        )
    }
}

/// Serialize view that rejects cycles instead of recursing forever.
struct SerializeGraph<'a> {
    value: &'a Value,
    active: &'a RefCell<Vec<usize>>,
}

impl SerializeGraph<'_> {
    fn child<'b>(&'b self, value: &'b Value) -> SerializeGraph<'b> {
        SerializeGraph {
            value,
            active: self.active,
        }
    }
}

impl Serialize for SerializeGraph<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::{Error as _, SerializeMap, SerializeSeq, SerializeStruct};

        let id = match self.value {
            Value::Array(_) | Value::Object(_) | Value::Map(_) | Value::Set(_) => {
                self.value.identity()
            }
            _ => None,
        };
        if let Some(id) = id {
            if self.active.borrow().contains(&id) {
                return Err(S::Error::custom("cannot serialize a cyclic value"));
            }
            self.active.borrow_mut().push(id);
        }
        let result = match self.value {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => match self.value.as_i64() {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(at) => serializer.serialize_str(&at.to_rfc3339()),
            Value::Pattern(p) => serializer.collect_str(p),
            Value::Array(items) => {
                let items = items.borrow();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(&self.child(item))?;
                }
                seq.end()
            }
            Value::Set(set) => {
                let set = set.borrow();
                let mut seq = serializer.serialize_seq(Some(set.len()))?;
                for item in set.iter() {
                    seq.serialize_element(&self.child(item))?;
                }
                seq.end()
            }
            Value::Object(record) => {
                let record = record.borrow();
                let mut map = serializer.serialize_map(Some(record.len()))?;
                for (k, v) in record.iter() {
                    map.serialize_entry(k, &self.child(v))?;
                }
                map.end()
            }
            Value::Map(entries) => {
                let entries = entries.borrow();
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries.iter() {
                    map.serialize_entry(&self.child(k), &self.child(v))?;
                }
                map.end()
            }
            Value::ArrayBuffer(bytes) => serializer.serialize_bytes(&bytes.borrow()),
            Value::View(view) => {
                let bytes = view
                    .to_bytes()
                    .ok_or_else(|| S::Error::custom("view extends past the end of its buffer"))?;
                serializer.serialize_bytes(&bytes)
            }
            Value::ImageData(pixels) => {
                let mut image = serializer.serialize_struct("ImageData", 3)?;
                image.serialize_field("width", &pixels.width)?;
                image.serialize_field("height", &pixels.height)?;
                image.serialize_field("data", &Bytes(&pixels.data))?;
                image.end()
            }
            Value::Blob(_) | Value::Bitmap(_) | Value::Function(_) | Value::Host(_) => Err(
                S::Error::custom(format!("{} values cannot be serialized", self.value.kind().name())),
            ),
        };
        if id.is_some() {
            self.active.borrow_mut().pop();
        }
        result
    }
}

/// Serializes a byte slice with `serialize_bytes` rather than as a sequence.
struct Bytes<'a>(&'a [u8]);

impl Serialize for Bytes<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(self.0)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let active = RefCell::new(Vec::new());
        SerializeGraph {
            value: self,
            active: &active,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E> {
                Ok(Value::Number(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E> {
                Ok(Value::Number(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
                Ok(Value::Number(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E> {
                Ok(Value::from(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> std::result::Result<Value, E> {
                Ok(Value::array_buffer(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> std::result::Result<Value, E> {
                Ok(Value::array_buffer(value))
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::array(vec))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut values = Record::new();
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    values.insert(key, value);
                }
                Ok(Value::object(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| Error::custom(format!("expected integer, found {:?}", value)))
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| Error::custom(format!("expected number, found {:?}", value)))
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| Error::custom(format!("expected bool, found {:?}", value)))
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            _ => Err(Error::custom(format!("expected string, found {:?}", value))),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(value as f64)
                }
            }
        )*
    };
}

from_number!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::array(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::object(value)
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Value::map(value)
    }
}

impl From<ValueSet> for Value {
    fn from(value: ValueSet) -> Self {
        Value::set(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::date(value)
    }
}

impl From<Pattern> for Value {
    fn from(value: Pattern) -> Self {
        Value::pattern(value)
    }
}

impl From<TypedView> for Value {
    fn from(value: TypedView) -> Self {
        Value::view(value)
    }
}

impl From<Blob> for Value {
    fn from(value: Blob) -> Self {
        Value::blob(value)
    }
}

impl From<PixelArray> for Value {
    fn from(value: PixelArray) -> Self {
        Value::image_data(value)
    }
}
