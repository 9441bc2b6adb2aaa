//! # djson Core
//!
//! Schema-driven JSON-to-typed-object binding for large, evolving wire
//! protocols. Protocol types are declared as plain-data descriptors
//! (see `djson-domain`); a one-shot build session compiles them into a
//! frozen network of type handlers; at runtime the [`DynamicParser`] facade
//! parses raw `serde_json::Value`s into immutable [`TypedView`]s exposing
//! the declared accessors.
//!
//! ## Highlights
//!
//! - Forward and cyclic cross-schema references, resolved in a two-phase
//!   build (seed placeholders, then bind).
//! - Two subtyping flavors: automatic discrimination by structural
//!   conditions (exactly-one-match rule) and manual reinterpretation casts.
//! - Per-field load strategy: eager pre-parse into a compact slot array, or
//!   lazy parse-on-access memoized safely under concurrent accessors.
//! - Strict mode: each schema's closed set of permissible JSON keys,
//!   computed over the supertype chain and the automatic-dispatch subtype
//!   graph.
//!
//! ## Example
//!
//! ```
//! use djson_core::prelude::*;
//! use serde_json::json;
//!
//! let parser = DynamicParser::new([
//!     SchemaDescriptor::new("Point")
//!         .field(FieldDescriptor::new("x", ValueShape::Long))
//!         .field(FieldDescriptor::new("y", ValueShape::Long)),
//! ])?;
//!
//! let raw = json!({"x": 3, "y": -7});
//! let point = parser.parse(&raw, &SchemaId::new("Point"))?;
//! assert_eq!(point.get("x")?.as_long(), Some(3));
//! assert_eq!(point.get("y")?.as_long(), Some(-7));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod parser;
pub mod value;
pub mod view;

mod binding;
mod handler;
mod parsers;
mod session;

pub use error::{AccessError, AccessResult, ParseError, ParseResult};
pub use parser::{DynamicParser, DynamicParserBuilder};
pub use value::{EnumValue, FieldValue, ListValue};
pub use view::TypedView;

// The declaration surface, re-exported so most users need one crate
pub use djson_domain::{
    CasterDescriptor, Condition, EnumShape, FieldDescriptor, LoadStrategy, RawObject,
    SchemaDescriptor, SchemaError, SchemaId, SchemaResult, SubtypingMode, ValueShape,
};

/// Re-export of commonly used types
pub mod prelude {
    pub use super::{
        AccessError, AccessResult, CasterDescriptor, Condition, DynamicParser,
        DynamicParserBuilder, EnumShape, EnumValue, FieldDescriptor, FieldValue, ListValue,
        LoadStrategy, ParseError, ParseResult, SchemaDescriptor, SchemaError, SchemaId,
        SchemaResult, SubtypingMode, TypedView, ValueShape,
    };
}
