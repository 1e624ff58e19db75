//! Reference bookkeeping for one encode or decode call.
//!
//! Both sides assign indices in the same order: the encoder numbers each
//! referenceable value at first sight during tokenization, and the decoder
//! appends each referenceable value as it meets the corresponding token.
//! A `REFERENCE` token therefore names a position both sides agree on.

use crate::varint;
use crate::{Error, Result, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// Outcome of interning a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sighting {
    /// Already interned at this index; emit a reference.
    Seen(u32),
    /// Newly assigned this index; emit the full value.
    New(u32),
}

/// Encode-side map from identity to index.
///
/// Object-like values are keyed by the address of their shared allocation,
/// strings by content. Every interned value is retained until the table is
/// dropped, so an address cannot be freed and reused by another value while
/// the table is alive.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    objects: HashMap<usize, u32>,
    strings: HashMap<Rc<str>, u32>,
    retained: Vec<Value>,
    next: u32,
}

impl ReferenceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indices handed out so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.next as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    fn allocate(&mut self) -> Result<u32> {
        let index = self.next;
        self.next = index
            .checked_add(1)
            .ok_or_else(|| Error::format_limit("reference index", u64::from(index) + 1, varint::MAX_VALUE))?;
        Ok(index)
    }

    /// Interns an object-like value by identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] for values without identity, and
    /// [`Error::FormatLimit`] once 2^32 indices are exhausted.
    pub fn intern_object(&mut self, value: &Value) -> Result<Sighting> {
        let id = value.identity().ok_or_else(|| {
            Error::internal(format!("{} values have no identity", value.kind().name()))
        })?;
        if let Some(&index) = self.objects.get(&id) {
            return Ok(Sighting::Seen(index));
        }
        let index = self.allocate()?;
        self.objects.insert(id, index);
        self.retained.push(value.clone());
        Ok(Sighting::New(index))
    }

    /// Interns a string by content.
    pub fn intern_text(&mut self, text: &Rc<str>) -> Result<Sighting> {
        if let Some(&index) = self.strings.get(text) {
            return Ok(Sighting::Seen(index));
        }
        let index = self.allocate()?;
        self.strings.insert(Rc::clone(text), index);
        Ok(Sighting::New(index))
    }

    /// Makes `value` resolve to an index that was assigned to another value.
    ///
    /// Used when a host object is lowered: the lowered form occupies the
    /// host's slot, so later sightings of either become references to it.
    pub fn alias(&mut self, value: &Value, index: u32) {
        if let Some(id) = value.identity() {
            if !self.objects.contains_key(&id) {
                self.objects.insert(id, index);
                self.retained.push(value.clone());
            }
        }
    }

    /// Gives back the most recently allocated index and points `value` at
    /// `target` instead.
    ///
    /// Used when a host object lowers to a value interned earlier: the host
    /// becomes a reference to that value and occupies no slot of its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if `released` is not the latest index.
    pub fn forward(&mut self, value: &Value, released: u32, target: u32) -> Result<()> {
        if released.checked_add(1) != Some(self.next) {
            return Err(Error::internal(format!(
                "index {released} cannot be released; {} was allocated since",
                self.next.saturating_sub(1)
            )));
        }
        self.next = released;
        if let Some(id) = value.identity() {
            self.objects.insert(id, target);
        }
        Ok(())
    }

    #[must_use]
    pub fn lookup(&self, value: &Value) -> Option<u32> {
        match value {
            Value::String(text) => self.strings.get(text).copied(),
            other => other.identity().and_then(|id| self.objects.get(&id).copied()),
        }
    }
}

/// Decode-side list of values by index.
///
/// Slots may be reserved before their value exists; resolving a reserved but
/// unfilled slot is an error, as is resolving past the end.
#[derive(Debug, Default)]
pub struct ReferenceLookup {
    slots: Vec<Option<Value>>,
}

impl ReferenceLookup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Registers a value at the next index.
    pub fn push(&mut self, value: Value) -> usize {
        self.slots.push(Some(value));
        self.slots.len() - 1
    }

    /// Claims the next index without a value yet.
    pub fn reserve(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    /// Fills a slot previously returned by [`reserve`](Self::reserve).
    pub fn fill(&mut self, slot: usize, value: Value) -> Result<()> {
        match self.slots.get_mut(slot) {
            Some(entry @ None) => {
                *entry = Some(value);
                Ok(())
            }
            Some(Some(_)) => Err(Error::internal(format!("reference slot {slot} filled twice"))),
            None => Err(Error::internal(format!("reference slot {slot} was never reserved"))),
        }
    }

    /// Resolves a `REFERENCE` index read at byte `offset`.
    pub fn resolve(&self, index: u32, offset: usize) -> Result<Value> {
        self.slots
            .get(index as usize)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or_else(|| Error::invalid_reference(offset, index, self.slots.len()))
    }
}
