//! djson Domain Layer - Schema Declarations
//!
//! This crate contains the schema-declaration surface for djson, a dynamic
//! JSON protocol binder. A protocol type is declared as plain data: a
//! [`SchemaDescriptor`] names the type, its field accessors and its subtype
//! relations. The descriptors are consumed by the `djson-core` build session,
//! which compiles them into type handlers.
//!
//! Descriptors are immutable once built; all construction goes through
//! consuming builders.
//!
//! ## Error taxonomy
//!
//! [`SchemaError`] covers *schema-model* errors: mistakes in the declared
//! schema itself, raised while a schema batch is being compiled. Input data
//! that does not conform to a schema is a parse error, which lives in
//! `djson-core`.

#![warn(missing_docs)]

pub mod condition;
pub mod schema;

pub use condition::{Condition, RawObject};
pub use schema::{
    CasterDescriptor, EnumShape, FieldDescriptor, LoadStrategy, SchemaDescriptor, SchemaId,
    SubtypingMode, ValueShape,
};

/// Schema-model Result type
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema-model errors
///
/// Raised only while a schema batch is being compiled. They indicate
/// programmer mistakes in the declared schemas and should be treated as
/// fatal configuration bugs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// The same schema id was submitted twice in one batch
    #[error("schema declared twice in one batch: {0}")]
    DuplicateSchema(SchemaId),

    /// A field or caster references a schema that is neither in this batch
    /// nor in any base package
    #[error("unknown schema reference {referenced} (in type {schema})")]
    UnknownReference {
        /// Schema whose declaration holds the dangling reference
        schema: SchemaId,
        /// The referenced, unknown schema id
        referenced: SchemaId,
    },

    /// A declared supertype is neither in this batch nor in any base package
    #[error("unknown supertype {supertype} (in type {schema})")]
    UnknownSupertype {
        /// Schema declaring the supertype
        schema: SchemaId,
        /// The unknown supertype id
        supertype: SchemaId,
    },

    /// Two non-override fields of one schema bind the same JSON key
    #[error("duplicate field name {field:?} (in type {schema})")]
    DuplicateField {
        /// Schema declaring the field twice
        schema: SchemaId,
        /// The duplicated JSON key
        field: String,
    },

    /// Two accessors of one schema share a name
    #[error("duplicate accessor {accessor:?} (in type {schema})")]
    DuplicateAccessor {
        /// Schema declaring the accessor twice
        schema: SchemaId,
        /// The duplicated accessor name
        accessor: String,
    },

    /// Nullability was declared on a primitive-shaped value type
    #[error("the type of field {field:?} cannot be declared nullable (in type {schema})")]
    NullablePrimitive {
        /// Schema declaring the field
        schema: SchemaId,
        /// The offending field accessor name
        field: String,
    },

    /// `reinterpret` is only available with manually chosen subtypes
    #[error(
        "option 'reinterpret' is only available with manually chosen subtypes: \
         {accessor:?} (in type {schema})"
    )]
    ReinterpretNotManual {
        /// Schema declaring the caster
        schema: SchemaId,
        /// The offending caster accessor name
        accessor: String,
    },

    /// An automatic-mode subtype accessor must target a schema, or be a
    /// void default case
    #[error(
        "automatic subtype accessor must target a schema or be a void default case: \
         {accessor:?} (in type {schema})"
    )]
    InvalidCasterTarget {
        /// Schema declaring the caster
        schema: SchemaId,
        /// The offending caster accessor name
        accessor: String,
    },

    /// More than one void default case was declared
    #[error("duplicate default case accessor: {accessor:?} (in type {schema})")]
    DuplicateDefaultCase {
        /// Schema declaring the second default case
        schema: SchemaId,
        /// The second default-case accessor name
        accessor: String,
    },

    /// A schema declared a supertype, but the supertype never declared a
    /// caster pointing back at it
    #[error("type {schema} declares supertype {supertype} but no subtype caster points at it")]
    MissingSubtypeCaster {
        /// The subtype schema
        schema: SchemaId,
        /// Its declared supertype
        supertype: SchemaId,
    },
}
