//! Error types for parsing and accessor dispatch
//!
//! Two taxonomies are visible at the boundary. [`ParseError`] covers input
//! data that does not conform to a schema, raised by the facade's parse
//! entry points and wrapped with field/schema breadcrumbs at every nesting
//! level. [`AccessError`] is the runtime envelope for failures that surface
//! through an accessor *after* the initial parse - the lazy paths cannot
//! thread checked parse errors, so callers that need checked semantics use
//! eager loading instead.
//!
//! Schema-model errors (mistakes in the declarations themselves) are
//! [`djson_domain::SchemaError`], raised only while a batch is built.

use djson_domain::SchemaId;
use serde_json::Value as JsonValue;

/// Result type alias for parse operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type alias for accessor calls
pub type AccessResult<T> = Result<T, AccessError>;

/// Input data does not conform to the schema
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Breadcrumb wrapper: a nested failure, annotated with the field and
    /// enclosing schema it occurred under
    #[error("failed to parse field {field:?} in type {schema}")]
    Field {
        /// JSON key of the failing field
        field: String,
        /// Schema enclosing the field
        schema: SchemaId,
        /// The underlying failure
        #[source]
        source: Box<ParseError>,
    },

    /// A non-optional field's key is absent from the raw object
    #[error("field is not optional: {field:?} (in type {schema})")]
    MissingField {
        /// JSON key of the missing field
        field: String,
        /// Schema declaring the field
        schema: SchemaId,
    },

    /// The raw value has the wrong JSON type
    #[error("value must have type {expected}, got {actual}")]
    TypeMismatch {
        /// Expected JSON type
        expected: &'static str,
        /// Actual JSON type of the input
        actual: &'static str,
    },

    /// A JSON string did not name any declared enum variant
    #[error("unknown name {name:?} for enum {enum_name}")]
    UnknownEnumName {
        /// Declared name of the enumeration
        enum_name: String,
        /// The unmatched input string
        name: String,
    },

    /// More than one subtype's conditions matched the raw object
    #[error("more than one subtype case matches (in type {schema})")]
    AmbiguousSubtype {
        /// The dispatching schema
        schema: SchemaId,
    },

    /// No subtype's conditions matched and no default case was declared
    #[error("not a single subtype case matches (in type {schema})")]
    NoMatchingSubtype {
        /// The dispatching schema
        schema: SchemaId,
    },

    /// Strict mode: the raw object carries a key outside the schema's
    /// closed name set
    #[error("unexpected key {key:?} (in strict type {schema})")]
    UnexpectedKey {
        /// The strict schema
        schema: SchemaId,
        /// The extraneous key
        key: String,
    },

    /// A JSON object was required but something else arrived
    #[error("JSON object input expected (for type {schema})")]
    NotAnObject {
        /// The schema the value was parsed under
        schema: SchemaId,
    },

    /// The schema id is not in the handler map
    #[error("unknown schema id: {0}")]
    UnknownSchema(SchemaId),
}

impl ParseError {
    /// Wrap this error with the field and schema it occurred under
    pub(crate) fn in_field(self, field: &str, schema: &SchemaId) -> ParseError {
        ParseError::Field {
            field: field.to_string(),
            schema: schema.clone(),
            source: Box::new(self),
        }
    }
}

/// Runtime envelope for failures surfacing through accessors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum AccessError {
    /// On-demand parsing failed behind a lazy accessor
    #[error("on-demand parsing failed for accessor {accessor:?} (in type {schema})")]
    Parse {
        /// The accessor that triggered the parse
        accessor: String,
        /// Schema declaring the accessor
        schema: SchemaId,
        /// The underlying parse failure
        #[source]
        source: ParseError,
    },

    /// The accessor name is not declared on the schema or any supertype
    #[error("unknown accessor {accessor:?} (in type {schema})")]
    UnknownAccessor {
        /// The unresolved accessor name
        accessor: String,
        /// Schema the call was routed to
        schema: SchemaId,
    },

    /// A field accessor was invoked on data whose raw value is not a JSON
    /// object (possible only in manual-subtyping mode)
    #[error("accessor {accessor:?} requires a JSON object backing (in type {schema})")]
    ObjectRequired {
        /// The accessor requiring object backing
        accessor: String,
        /// Schema declaring the accessor
        schema: SchemaId,
    },

    /// List element index past the end
    #[error("list index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Length of the list
        len: usize,
    },

    /// A lazy list element failed to parse
    #[error("list element {index} failed to parse")]
    Element {
        /// Index of the failing element
        index: usize,
        /// The underlying parse failure
        #[source]
        source: ParseError,
    },
}

/// JSON type name of a raw value, for mismatch diagnostics
pub(crate) fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breadcrumb_wrapping() {
        let inner = ParseError::TypeMismatch {
            expected: "string",
            actual: "number",
        };
        let wrapped = inner.in_field("middle", &SchemaId::new("Name"));
        let message = wrapped.to_string();
        assert!(message.contains("middle"));
        assert!(message.contains("Name"));

        let source = std::error::Error::source(&wrapped).map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some("value must have type string, got number"));
    }

    #[test]
    fn test_missing_field_message() {
        let err = ParseError::MissingField {
            field: "y".into(),
            schema: SchemaId::new("Point"),
        };
        assert_eq!(err.to_string(), "field is not optional: \"y\" (in type Point)");
    }

    #[test]
    fn test_json_type_names() {
        use serde_json::json;
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(true)), "boolean");
        assert_eq!(json_type_name(&json!(3)), "number");
        assert_eq!(json_type_name(&json!("s")), "string");
        assert_eq!(json_type_name(&json!([])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
    }
}
