//! User-visible values produced by accessors
//!
//! Every value borrows from the raw input tree - the binder is zero-copy
//! over the `serde_json::Value` it was handed. "No value" (a missing
//! optional field, a tolerated `null`, an unmatched subtype accessor) is
//! [`FieldValue::None`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::error::{AccessError, AccessResult};
use crate::handler::Registry;
use crate::parsers::{self, ValueParser};
use crate::view::TypedView;

/// The result of an accessor call
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    /// No value: absent optional field, tolerated `null`, void accessor, or
    /// unmatched subtype case
    None,
    /// 64-bit integer
    Long(i64),
    /// Boolean
    Bool(bool),
    /// 32-bit float
    Float(f32),
    /// JSON string, borrowed from the input
    Str(&'a str),
    /// Raw JSON value (opaque pass-through or raw-object field)
    Json(&'a JsonValue),
    /// Matched enumeration variant
    Enum(EnumValue<'a>),
    /// Parsed list
    List(ListValue<'a>),
    /// Nested typed view
    Object(TypedView<'a>),
}

impl<'a> FieldValue<'a> {
    /// Whether this is "no value"
    pub fn is_none(&self) -> bool {
        matches!(self, FieldValue::None)
    }

    /// Integer value, if this is one
    pub fn as_long(&self) -> Option<i64> {
        match self {
            FieldValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean value, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value, if this is one
    pub fn as_float(&self) -> Option<f32> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String value, if this is one
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Raw JSON value, if this is one
    pub fn as_json(&self) -> Option<&'a JsonValue> {
        match self {
            FieldValue::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Enumeration value, if this is one
    pub fn as_enum(&self) -> Option<&EnumValue<'a>> {
        match self {
            FieldValue::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// List value, if this is one
    pub fn as_list(&self) -> Option<&ListValue<'a>> {
        match self {
            FieldValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Typed view, if this is one
    pub fn as_object(&self) -> Option<&TypedView<'a>> {
        match self {
            FieldValue::Object(v) => Some(v),
            _ => None,
        }
    }
}

/// A matched enumeration variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue<'a> {
    ordinal: usize,
    name: &'a str,
}

impl<'a> EnumValue<'a> {
    pub(crate) fn new(ordinal: usize, name: &'a str) -> Self {
        Self { ordinal, name }
    }

    /// Position of the variant in the declared variant list
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// The variant name as it appeared in the input
    pub fn name(&self) -> &'a str {
        self.name
    }
}

/// A parsed list value
///
/// Eager lists hold finished elements; lazy lists parse element `i` on
/// first access and memoize the result, so element failures surface on the
/// accessing caller.
#[derive(Clone)]
pub struct ListValue<'a>(pub(crate) ListRepr<'a>);

#[derive(Clone)]
pub(crate) enum ListRepr<'a> {
    Eager(Arc<[FieldValue<'a>]>),
    Lazy(Arc<LazyElements<'a>>),
}

impl<'a> ListValue<'a> {
    pub(crate) fn eager(items: Vec<FieldValue<'a>>) -> Self {
        Self(ListRepr::Eager(items.into()))
    }

    pub(crate) fn lazy(elements: LazyElements<'a>) -> Self {
        Self(ListRepr::Lazy(Arc::new(elements)))
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match &self.0 {
            ListRepr::Eager(items) => items.len(),
            ListRepr::Lazy(lazy) => lazy.len(),
        }
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`; a lazy element is parsed on first access
    pub fn get(&self, index: usize) -> AccessResult<FieldValue<'a>> {
        match &self.0 {
            ListRepr::Eager(items) => {
                items.get(index).cloned().ok_or(AccessError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                })
            }
            ListRepr::Lazy(lazy) => lazy.get(index),
        }
    }

    /// Iterate the elements in order; lazy elements parse as the iterator
    /// reaches them
    pub fn iter<'s>(&'s self) -> impl Iterator<Item = AccessResult<FieldValue<'a>>> + 's {
        (0..self.len()).map(move |i| self.get(i))
    }
}

impl PartialEq for ListValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (ListRepr::Eager(a), ListRepr::Eager(b)) => a == b,
            // Two lazy lists are equal when they view the same raw elements;
            // equality must not force parses
            (ListRepr::Lazy(a), ListRepr::Lazy(b)) => a.items == b.items,
            _ => false,
        }
    }
}

impl fmt::Debug for ListValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ListRepr::Eager(items) => f.debug_list().entries(items.iter()).finish(),
            ListRepr::Lazy(lazy) => write!(f, "LazyList(len = {})", lazy.len()),
        }
    }
}

/// The lazy element store behind a LAZY list
///
/// Publication is first-writer-wins through per-index `OnceLock`s; the gate
/// serializes parse work so each element is parsed by one thread at a time.
pub(crate) struct LazyElements<'a> {
    pub(crate) items: &'a [JsonValue],
    component: &'a ValueParser,
    registry: &'a Registry,
    slots: Box<[OnceLock<FieldValue<'a>>]>,
    gate: Mutex<()>,
}

impl<'a> LazyElements<'a> {
    pub(crate) fn new(
        items: &'a [JsonValue],
        component: &'a ValueParser,
        registry: &'a Registry,
    ) -> Self {
        Self {
            items,
            component,
            registry,
            slots: (0..items.len()).map(|_| OnceLock::new()).collect(),
            gate: Mutex::new(()),
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> AccessResult<FieldValue<'a>> {
        let raw = self.items.get(index).ok_or(AccessError::IndexOutOfBounds {
            index,
            len: self.items.len(),
        })?;
        if let Some(value) = self.slots[index].get() {
            return Ok(value.clone());
        }
        // A null element yields "no value" without touching the component
        // parser and without caching
        if raw.is_null() {
            return Ok(FieldValue::None);
        }

        let _guard = self.gate.lock();
        if let Some(value) = self.slots[index].get() {
            return Ok(value.clone());
        }
        let stored = self
            .component
            .parse_slow(raw, None, self.registry)
            .map_err(|source| AccessError::Element { index, source })?;
        let value = parsers::finish(&stored);
        let _ = self.slots[index].set(value.clone());
        Ok(self.slots[index].get().cloned().unwrap_or(value))
    }
}
