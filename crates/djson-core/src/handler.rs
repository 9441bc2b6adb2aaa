//! Type handlers: compiled per-schema parsers and their parsed data
//!
//! A [`TypeHandler`] is the compiled artifact for one declared schema. The
//! build session creates one per schema, wires subtype relations between
//! them, and freezes the batch into a [`Registry`]. Parsing produces an
//! [`ObjectData`]: the raw value, a write-once array of eagerly parsed
//! field slots, and a lazy-cache slot array published by compare-and-set.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use djson_domain::{RawObject, SchemaId, SubtypingMode};
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::binding::{AccessorHandler, Conditions, Loaders};
use crate::error::{ParseError, ParseResult};
use crate::parsers::Stored;
use crate::value::FieldValue;
use crate::view::TypedView;

/// Reference to a type handler
///
/// During a build, references to batch-local schemas are placeholders
/// carrying only the target's seed position; they become resolvable the
/// moment the batch's handler table is fully populated. References into
/// previously built batches bind directly.
#[derive(Debug, Clone)]
pub(crate) enum HandlerRef {
    /// Target lives in the same batch, at this position
    Local(usize),
    /// Target lives in an earlier-built batch
    Imported {
        /// The frozen registry owning the target
        registry: Arc<Registry>,
        /// Target position within that registry
        pos: usize,
    },
}

impl HandlerRef {
    /// Resolve against the registry of the schema holding this ref
    ///
    /// Returns the handler together with the registry that owns it, so
    /// nested parsing resolves the handler's own refs in the right table.
    pub(crate) fn resolve<'a>(&'a self, local: &'a Registry) -> (&'a TypeHandler, &'a Registry) {
        match self {
            HandlerRef::Local(pos) => (&local.handlers[*pos], local),
            HandlerRef::Imported { registry, pos } => (&registry.handlers[*pos], &**registry),
        }
    }
}

/// Subtype-dispatch block of one schema
#[derive(Debug)]
pub(crate) enum AlgCases {
    /// Automatic dispatch by structural conditions
    Auto {
        /// Field-array slot for the matched variant code
        code_slot: usize,
        /// Field-array slot for the matched variant data
        value_slot: usize,
        /// Whether a void default case was declared
        has_default: bool,
        /// Declared subtypes, in declaration order
        subtypes: Vec<HandlerRef>,
    },
    /// Manual reinterpretation casts; the caller selects the interpretation
    Manual {
        /// Structural subtypes (schema-targeted, non-reinterpret casters)
        subtypes: Vec<HandlerRef>,
    },
}

/// Compiled per-schema parser and dispatcher
pub(crate) struct TypeHandler {
    pub(crate) id: SchemaId,
    pub(crate) mode: SubtypingMode,
    /// Declared supertype: its id (diagnostics) and ref
    pub(crate) supertype: Option<(SchemaId, HandlerRef)>,
    /// Size of the eager field array, including dispatch slots
    pub(crate) field_array_size: usize,
    /// Number of lazy-cache slots
    pub(crate) volatile_count: usize,
    /// Eager field loaders, in declared order
    pub(crate) loaders: Loaders,
    /// Conditions this schema contributes when it is a dispatch candidate
    pub(crate) conditions: Conditions,
    /// Accessor name to compiled handler
    pub(crate) accessors: HashMap<String, AccessorHandler>,
    /// Subtype-dispatch block, if the schema declares casters
    pub(crate) cases: Option<AlgCases>,
    /// All declared field JSON keys (eager and lazy, overrides included)
    pub(crate) own_keys: Vec<String>,
    /// Set while wiring: some schema declared a caster targeting this one
    pub(crate) caster_installed: bool,
    /// Strict mode: the closed set of permissible JSON keys
    pub(crate) closed_names: Option<HashSet<String>>,
}

impl TypeHandler {
    /// Whether every declared condition holds for the raw object
    pub(crate) fn check_conditions(&self, object: &RawObject) -> bool {
        self.conditions.iter().all(|c| {
            let holds = c.condition.evaluate(object);
            if !holds {
                trace!(schema = %self.id, field = %c.field, "subtype condition failed");
            }
            holds
        })
    }

    /// Facade entry point: parse and materialize the accessor view
    pub(crate) fn parse_root<'a>(
        &'a self,
        value: &'a JsonValue,
        registry: &'a Registry,
    ) -> ParseResult<TypedView<'a>> {
        Ok(TypedView::new(self.parse(value, None, registry)?))
    }

    /// Parse a raw value into object data
    ///
    /// `parent` is set when this parse is a subtyping one - the new data
    /// shares the parent's raw JSON and back-references it.
    pub(crate) fn parse<'a>(
        &'a self,
        value: &'a JsonValue,
        parent: Option<&Arc<ObjectData<'a>>>,
        registry: &'a Registry,
    ) -> ParseResult<Arc<ObjectData<'a>>> {
        let raw_object = match value.as_object() {
            Some(map) => Some(map),
            None if self.mode == SubtypingMode::Manual => None,
            None => return Err(ParseError::NotAnObject { schema: self.id.clone() }),
        };

        let mut fields: Vec<Stored<'a>> = vec![Stored::Nothing; self.field_array_size];

        for loader in &self.loaders {
            let object = raw_object.ok_or_else(|| ParseError::NotAnObject {
                schema: self.id.clone(),
            })?;
            fields[loader.slot] = match object.get(&loader.key) {
                Some(raw) => loader
                    .parser
                    .parse_slow(raw, None, registry)
                    .map_err(|e| e.in_field(&loader.key, &self.id))?,
                None if loader.optional => Stored::Nothing,
                None => {
                    return Err(ParseError::MissingField {
                        field: loader.key.clone(),
                        schema: self.id.clone(),
                    })
                }
            };
        }

        let mut matched_child: Option<Arc<ObjectData<'a>>> = None;
        if let Some(AlgCases::Auto {
            code_slot,
            value_slot,
            has_default,
            subtypes,
        }) = &self.cases
        {
            let object = raw_object.ok_or_else(|| ParseError::NotAnObject {
                schema: self.id.clone(),
            })?;
            let mut code: i32 = -1;
            for (i, subtype_ref) in subtypes.iter().enumerate() {
                let (subtype, _) = subtype_ref.resolve(registry);
                if subtype.check_conditions(object) {
                    if code >= 0 {
                        return Err(ParseError::AmbiguousSubtype { schema: self.id.clone() });
                    }
                    code = i as i32;
                }
            }
            if code < 0 {
                if !has_default {
                    return Err(ParseError::NoMatchingSubtype { schema: self.id.clone() });
                }
            } else {
                trace!(schema = %self.id, code, "matched subtype case");
                let (subtype, subtype_registry) = subtypes[code as usize].resolve(registry);
                let child = subtype.parse(value, None, subtype_registry)?;
                fields[*value_slot] = Stored::Data(child.clone());
                matched_child = Some(child);
            }
            fields[*code_slot] = Stored::Code(code);
        }

        if let (Some(closed), Some(object)) = (&self.closed_names, raw_object) {
            for key in object.keys() {
                if !closed.contains(key) {
                    return Err(ParseError::UnexpectedKey {
                        schema: self.id.clone(),
                        key: key.clone(),
                    });
                }
            }
        }

        let data = Arc::new(ObjectData {
            handler: self,
            registry,
            raw: value,
            fields: fields.into_boxed_slice(),
            lazy: (0..self.volatile_count).map(|_| OnceLock::new()).collect(),
            base: OnceLock::new(),
            super_cache: OnceLock::new(),
        });
        if let Some(parent) = parent {
            let _ = data.base.set(parent.clone());
        }
        if let Some(child) = matched_child {
            let _ = child.base.set(data.clone());
        }
        Ok(data)
    }
}

impl fmt::Debug for TypeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subtypes = match &self.cases {
            Some(AlgCases::Auto { subtypes, .. }) | Some(AlgCases::Manual { subtypes }) => {
                subtypes.len()
            }
            None => 0,
        };
        f.debug_struct("TypeHandler")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("fields", &self.field_array_size)
            .field("accessors", &self.accessors.len())
            .field("subtypes", &subtypes)
            .finish()
    }
}

/// Per-parsed-value state
///
/// Eager slots are written exactly once, before the data is published to
/// any reader; lazy slots and the supertype caches publish first-writer-wins.
pub(crate) struct ObjectData<'a> {
    /// The handler this data was parsed by
    pub(crate) handler: &'a TypeHandler,
    /// Registry owning `handler`
    pub(crate) registry: &'a Registry,
    /// The underlying raw JSON value
    pub(crate) raw: &'a JsonValue,
    /// Eagerly parsed field slots
    pub(crate) fields: Box<[Stored<'a>]>,
    /// Lazy-cache slots
    pub(crate) lazy: Box<[OnceLock<FieldValue<'a>>]>,
    /// The base object when this data was parsed as a subtype of it
    pub(crate) base: OnceLock<Arc<ObjectData<'a>>>,
    /// Lazily materialized supertype data when `base` is not the supertype
    super_cache: OnceLock<Arc<ObjectData<'a>>>,
}

impl fmt::Debug for ObjectData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectData")
            .field("handler", &self.handler.id)
            .finish()
    }
}

impl<'a> ObjectData<'a> {
    /// The raw value as a JSON object, when it is one
    pub(crate) fn raw_object(&self) -> Option<&'a RawObject> {
        self.raw.as_object()
    }

    /// Data for the declared supertype, sharing this object's raw JSON
    ///
    /// When this data was produced by subtype dispatch the back-reference
    /// installed at parse time is used; otherwise the supertype is parsed
    /// over the same raw value on first request and memoized.
    pub(crate) fn supertype_data(this: &Arc<Self>) -> ParseResult<Option<Arc<ObjectData<'a>>>> {
        let Some((_, super_ref)) = &this.handler.supertype else {
            return Ok(None);
        };
        let (super_handler, super_registry) = super_ref.resolve(this.registry);
        if let Some(base) = this.base.get() {
            if base.handler.id == super_handler.id {
                return Ok(Some(base.clone()));
            }
        }
        if let Some(cached) = this.super_cache.get() {
            return Ok(Some(cached.clone()));
        }
        let data = super_handler.parse(this.raw, None, super_registry)?;
        let _ = this.super_cache.set(data.clone());
        Ok(this.super_cache.get().cloned().or(Some(data)))
    }
}

/// Frozen handler table of one built batch
pub(crate) struct Registry {
    pub(crate) handlers: Vec<TypeHandler>,
    pub(crate) index: HashMap<SchemaId, usize>,
    pub(crate) strict: bool,
}

impl Registry {
    /// Handler for a schema id, if the id is in this batch
    pub(crate) fn handler(&self, id: &SchemaId) -> Option<&TypeHandler> {
        self.index.get(id).map(|pos| &self.handlers[*pos])
    }

    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self {
            handlers: Vec::new(),
            index: HashMap::new(),
            strict: false,
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("schemas", &self.handlers.len())
            .field("strict", &self.strict)
            .finish()
    }
}
