//! Accessor dispatch over parsed data
//!
//! A [`TypedView`] materializes the declared accessor surface of a schema
//! over one parsed value. Each call is routed to the accessor handler the
//! build session compiled; unknown names walk the supertype chain against
//! supertype data sharing the same raw JSON.

use std::fmt;
use std::sync::{Arc, OnceLock};

use djson_domain::{RawObject, SchemaId};
use serde_json::Value as JsonValue;

use crate::binding::AccessorHandler;
use crate::error::{AccessError, AccessResult, ParseError};
use crate::handler::ObjectData;
use crate::parsers::{finish, Stored};
use crate::value::FieldValue;

/// A typed, immutable view over one parsed value
///
/// Views are cheap to clone and safe to share across threads; lazy fields
/// publish first-writer-wins, so repeated calls to the same accessor return
/// equal values.
#[derive(Clone)]
pub struct TypedView<'a> {
    data: Arc<ObjectData<'a>>,
}

impl<'a> TypedView<'a> {
    pub(crate) fn new(data: Arc<ObjectData<'a>>) -> Self {
        Self { data }
    }

    /// Identity of the schema this view was parsed under
    pub fn schema_id(&self) -> &SchemaId {
        &self.data.handler.id
    }

    /// The underlying raw JSON value
    pub fn raw(&self) -> &'a JsonValue {
        self.data.raw
    }

    /// Invoke a declared accessor by name
    ///
    /// Accessors not declared on this schema are resolved against the
    /// supertype chain. Lazy-path parse failures surface here wrapped in
    /// the [`AccessError`] envelope; eager fields were already checked when
    /// the object was parsed.
    pub fn get(&self, accessor: &str) -> AccessResult<FieldValue<'a>> {
        let mut current = self.data.clone();
        loop {
            let handler = current.handler;
            if let Some(shape) = handler.accessors.get(accessor) {
                return eval(&current, accessor, shape);
            }
            match ObjectData::supertype_data(&current).map_err(|source| AccessError::Parse {
                accessor: accessor.to_string(),
                schema: handler.id.clone(),
                source,
            })? {
                Some(super_data) => current = super_data,
                None => {
                    return Err(AccessError::UnknownAccessor {
                        accessor: accessor.to_string(),
                        schema: self.data.handler.id.clone(),
                    })
                }
            }
        }
    }
}

/// Evaluate one compiled accessor against the data that declares it
fn eval<'a>(
    data: &Arc<ObjectData<'a>>,
    accessor: &str,
    shape: &'a AccessorHandler,
) -> AccessResult<FieldValue<'a>> {
    match shape {
        AccessorHandler::Preparsed { slot } => Ok(finish(&data.fields[*slot])),

        AccessorHandler::LazyQuick {
            key,
            parser,
            optional,
        } => match read_key(data, accessor, key, *optional)? {
            None => Ok(FieldValue::None),
            Some(raw) => parser
                .parse_slow(raw, None, data.registry)
                .map(|stored| finish(&stored))
                .map_err(|e| envelope(data, accessor, e.in_field(key, &data.handler.id))),
        },

        AccessorHandler::LazyCached {
            slot,
            key,
            parser,
            optional,
        } => {
            if let Some(cached) = data.lazy[*slot].get() {
                return Ok(cached.clone());
            }
            let value = match read_key(data, accessor, key, *optional)? {
                None => FieldValue::None,
                Some(raw) => parser
                    .parse_slow(raw, Some(data), data.registry)
                    .map(|stored| finish(&stored))
                    .map_err(|e| envelope(data, accessor, e.in_field(key, &data.handler.id)))?,
            };
            Ok(publish(&data.lazy[*slot], value))
        }

        AccessorHandler::AutoSubtype {
            code_slot,
            value_slot,
            code,
        } => match &data.fields[*code_slot] {
            Stored::Code(actual) if actual == code => Ok(finish(&data.fields[*value_slot])),
            _ => Ok(FieldValue::None),
        },

        AccessorHandler::ManualSubtype { slot, parser } => {
            if let Some(cached) = data.lazy[*slot].get() {
                return Ok(cached.clone());
            }
            let value = parser
                .parse_slow(data.raw, Some(data), data.registry)
                .map(|stored| finish(&stored))
                .map_err(|e| envelope(data, accessor, e))?;
            Ok(publish(&data.lazy[*slot], value))
        }

        AccessorHandler::DefaultCase => Ok(FieldValue::None),
    }
}

/// Read a field's raw value from the backing object
///
/// `Ok(None)` means the key is absent and the field tolerates that.
fn read_key<'a>(
    data: &Arc<ObjectData<'a>>,
    accessor: &str,
    key: &str,
    optional: bool,
) -> AccessResult<Option<&'a JsonValue>> {
    let object: &RawObject = data.raw_object().ok_or_else(|| AccessError::ObjectRequired {
        accessor: accessor.to_string(),
        schema: data.handler.id.clone(),
    })?;
    match object.get(key) {
        Some(raw) => Ok(Some(raw)),
        None if optional => Ok(None),
        None => Err(envelope(
            data,
            accessor,
            ParseError::MissingField {
                field: key.to_string(),
                schema: data.handler.id.clone(),
            },
        )),
    }
}

fn envelope(data: &Arc<ObjectData<'_>>, accessor: &str, source: ParseError) -> AccessError {
    AccessError::Parse {
        accessor: accessor.to_string(),
        schema: data.handler.id.clone(),
        source,
    }
}

/// First-writer-wins publication into a lazy slot
fn publish<'a>(slot: &OnceLock<FieldValue<'a>>, value: FieldValue<'a>) -> FieldValue<'a> {
    let _ = slot.set(value.clone());
    slot.get().cloned().unwrap_or(value)
}

impl PartialEq for TypedView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.schema_id() == other.schema_id() && self.raw() == other.raw()
    }
}

impl fmt::Debug for TypedView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedView")
            .field("schema", self.schema_id())
            .field("raw", &self.raw())
            .finish()
    }
}

impl fmt::Display for TypedView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.schema_id(), self.raw())
    }
}
