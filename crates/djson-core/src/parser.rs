//! Parser facade
//!
//! [`DynamicParser`] owns the frozen handler table of one built schema
//! batch. Building is single-threaded and one-shot; parsing is reentrant
//! and may run on any number of threads once the build has completed.

use std::fmt;
use std::sync::Arc;

use djson_domain::{SchemaDescriptor, SchemaId, SchemaResult};
use serde_json::Value as JsonValue;

use crate::error::{ParseError, ParseResult};
use crate::handler::Registry;
use crate::session;
use crate::view::TypedView;

/// A compiled protocol parser over one schema batch
pub struct DynamicParser {
    registry: Arc<Registry>,
}

impl DynamicParser {
    /// Compile a batch of schema descriptors
    pub fn new<I>(schemas: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = SchemaDescriptor>,
    {
        Self::builder().schemas(schemas).build()
    }

    /// Start a builder to set base packages or strict mode
    pub fn builder() -> DynamicParserBuilder {
        DynamicParserBuilder::default()
    }

    /// Parse a raw JSON object as the given schema
    ///
    /// Fails if the value is not a JSON object or the schema id is unknown.
    /// This is the entry point for the common case.
    pub fn parse<'a>(
        &'a self,
        value: &'a JsonValue,
        schema: &SchemaId,
    ) -> ParseResult<TypedView<'a>> {
        if !value.is_object() {
            return Err(ParseError::NotAnObject {
                schema: schema.clone(),
            });
        }
        self.parse_anything(value, schema)
    }

    /// Parse any raw JSON value as the given schema
    ///
    /// A non-object value only makes sense for schemas declared in
    /// manual-subtyping mode, which may bind to arbitrary underlying values.
    pub fn parse_anything<'a>(
        &'a self,
        value: &'a JsonValue,
        schema: &SchemaId,
    ) -> ParseResult<TypedView<'a>> {
        let registry = self.registry.as_ref();
        let handler = registry
            .handler(schema)
            .ok_or_else(|| ParseError::UnknownSchema(schema.clone()))?;
        handler.parse_root(value, registry)
    }

    /// Whether the given schema id was compiled into this parser
    pub fn has_schema(&self, schema: &SchemaId) -> bool {
        self.registry.index.contains_key(schema)
    }

    /// Whether this parser rejects JSON keys outside the closed name sets
    pub fn is_strict(&self) -> bool {
        self.registry.strict
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl fmt::Debug for DynamicParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicParser")
            .field("schemas", &self.registry.handlers.len())
            .field("strict", &self.registry.strict)
            .finish()
    }
}

/// Builder for [`DynamicParser`]
#[derive(Default)]
pub struct DynamicParserBuilder {
    schemas: Vec<SchemaDescriptor>,
    bases: Vec<Arc<Registry>>,
    strict: bool,
}

impl DynamicParserBuilder {
    /// Add one schema descriptor to the batch
    pub fn schema(mut self, schema: SchemaDescriptor) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Add schema descriptors to the batch
    pub fn schemas<I>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = SchemaDescriptor>,
    {
        self.schemas.extend(schemas);
        self
    }

    /// Allow references into a previously built parser
    ///
    /// Base packages are consulted in registration order; batch-local
    /// declarations shadow them.
    pub fn base_package(mut self, base: &DynamicParser) -> Self {
        self.bases.push(base.registry().clone());
        self
    }

    /// Reject JSON keys outside each schema's closed name set
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Run the build session and freeze the handler table
    pub fn build(self) -> SchemaResult<DynamicParser> {
        let registry = session::build(self.schemas, self.bases, self.strict)?;
        Ok(DynamicParser {
            registry: Arc::new(registry),
        })
    }
}

impl fmt::Debug for DynamicParserBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicParserBuilder")
            .field("schemas", &self.schemas.len())
            .field("base_packages", &self.bases.len())
            .field("strict", &self.strict)
            .finish()
    }
}
