//! Value parser combinators
//!
//! A [`ValueParser`] consumes one raw JSON value. Scalars, enums and void
//! are *quick*: context-free, producing a finished value immediately. Lists
//! and typed-object parsers are *slow*: they may need the enclosing object
//! (subtyping shares the parent's raw JSON) and produce a stored form that
//! is finished on the way out to the caller. Every quick parser is usable
//! through the slow interface.

use std::sync::Arc;

use djson_domain::EnumShape;
use serde_json::Value as JsonValue;

use crate::error::{json_type_name, ParseError, ParseResult};
use crate::handler::{HandlerRef, ObjectData, Registry};
use crate::value::{EnumValue, FieldValue, LazyElements, ListValue};
use crate::view::TypedView;

/// Internal stored form of a parsed field slot
#[derive(Debug, Clone)]
pub(crate) enum Stored<'a> {
    /// Absent optional field, void value, or unmatched variant value
    Nothing,
    /// A finished value
    Value(FieldValue<'a>),
    /// Nested object data; finished into a typed view on access
    Data(Arc<ObjectData<'a>>),
    /// Automatic-dispatch variant code
    Code(i32),
}

/// Finish a stored slot into its user-visible form
///
/// The only stored form that differs from the exposed one is nested object
/// data, which accessors must expose as a view.
pub(crate) fn finish<'a>(stored: &Stored<'a>) -> FieldValue<'a> {
    match stored {
        Stored::Nothing | Stored::Code(_) => FieldValue::None,
        Stored::Value(value) => value.clone(),
        Stored::Data(data) => FieldValue::Object(TypedView::new(data.clone())),
    }
}

/// A compiled parser for one declared value shape
#[derive(Debug)]
pub(crate) enum ValueParser {
    Long,
    Bool,
    Float,
    Str { nullable: bool },
    Any { nullable: bool },
    JsonObject { nullable: bool },
    Void,
    Enum { shape: Arc<EnumShape>, nullable: bool },
    List(ListParser),
    Typed(TypedParser),
}

/// List parser: nullable at the top level, eager or lazy elements
#[derive(Debug)]
pub(crate) struct ListParser {
    pub(crate) component: Box<ValueParser>,
    pub(crate) nullable: bool,
    pub(crate) lazy: bool,
}

/// Nested-schema parser delegating to a type handler
///
/// `subtyping` means the parsed data shares the enclosing object's raw JSON
/// and keeps a back-reference to it.
#[derive(Debug)]
pub(crate) struct TypedParser {
    pub(crate) target: HandlerRef,
    pub(crate) nullable: bool,
    pub(crate) subtyping: bool,
}

impl ValueParser {
    /// Whether this parser has a quick (context-free) form
    pub(crate) fn is_quick(&self) -> bool {
        !matches!(self, ValueParser::List(_) | ValueParser::Typed(_))
    }

    /// Parse a raw value
    ///
    /// `parent` is the enclosing object's data, consulted only by subtyping
    /// typed parsers; `registry` is the handler table of the schema that
    /// owns this parser.
    pub(crate) fn parse_slow<'a>(
        &'a self,
        value: &'a JsonValue,
        parent: Option<&Arc<ObjectData<'a>>>,
        registry: &'a Registry,
    ) -> ParseResult<Stored<'a>> {
        match self {
            ValueParser::Long => value
                .as_i64()
                .map(|v| Stored::Value(FieldValue::Long(v)))
                .ok_or_else(|| mismatch("integer", value)),
            ValueParser::Bool => value
                .as_bool()
                .map(|v| Stored::Value(FieldValue::Bool(v)))
                .ok_or_else(|| mismatch("boolean", value)),
            ValueParser::Float => value
                .as_f64()
                .map(|v| Stored::Value(FieldValue::Float(v as f32)))
                .ok_or_else(|| mismatch("number", value)),
            ValueParser::Str { nullable } => match value {
                JsonValue::Null => nothing_if(*nullable, "string", value),
                JsonValue::String(s) => Ok(Stored::Value(FieldValue::Str(s))),
                _ => Err(mismatch("string", value)),
            },
            ValueParser::Any { nullable } => match value {
                JsonValue::Null => nothing_if(*nullable, "value", value),
                _ => Ok(Stored::Value(FieldValue::Json(value))),
            },
            ValueParser::JsonObject { nullable } => match value {
                JsonValue::Null => nothing_if(*nullable, "object", value),
                JsonValue::Object(_) => Ok(Stored::Value(FieldValue::Json(value))),
                _ => Err(mismatch("object", value)),
            },
            ValueParser::Void => Ok(Stored::Value(FieldValue::None)),
            ValueParser::Enum { shape, nullable } => match value {
                JsonValue::Null => nothing_if(*nullable, "string", value),
                JsonValue::String(s) => shape
                    .variants()
                    .iter()
                    .position(|v| v == s)
                    .map(|ordinal| Stored::Value(FieldValue::Enum(EnumValue::new(ordinal, s))))
                    .ok_or_else(|| ParseError::UnknownEnumName {
                        enum_name: shape.name().to_string(),
                        name: s.clone(),
                    }),
                _ => Err(mismatch("string", value)),
            },
            ValueParser::List(list) => list.parse(value, registry),
            ValueParser::Typed(typed) => typed.parse(value, parent, registry),
        }
    }
}

impl ListParser {
    fn parse<'a>(&'a self, value: &'a JsonValue, registry: &'a Registry) -> ParseResult<Stored<'a>> {
        let items = match value {
            JsonValue::Null if self.nullable => return Ok(Stored::Value(FieldValue::None)),
            JsonValue::Array(items) => items,
            _ => return Err(mismatch("array", value)),
        };
        let list = if self.lazy {
            ListValue::lazy(LazyElements::new(items, &self.component, registry))
        } else {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                // Array components never see the enclosing object
                let stored = self.component.parse_slow(item, None, registry)?;
                out.push(finish(&stored));
            }
            ListValue::eager(out)
        };
        Ok(Stored::Value(FieldValue::List(list)))
    }
}

impl TypedParser {
    fn parse<'a>(
        &'a self,
        value: &'a JsonValue,
        parent: Option<&Arc<ObjectData<'a>>>,
        registry: &'a Registry,
    ) -> ParseResult<Stored<'a>> {
        if value.is_null() && self.nullable {
            return Ok(Stored::Nothing);
        }
        let (handler, target_registry) = self.target.resolve(registry);
        let parent = if self.subtyping { parent } else { None };
        let data = handler.parse(value, parent, target_registry)?;
        Ok(Stored::Data(data))
    }
}

fn mismatch(expected: &'static str, value: &JsonValue) -> ParseError {
    ParseError::TypeMismatch {
        expected,
        actual: json_type_name(value),
    }
}

fn nothing_if<'a>(
    nullable: bool,
    expected: &'static str,
    value: &JsonValue,
) -> ParseResult<Stored<'a>> {
    if nullable {
        Ok(Stored::Value(FieldValue::None))
    } else {
        Err(mismatch(expected, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quick<'a>(parser: &'a ValueParser, value: &'a JsonValue, registry: &'a Registry) -> ParseResult<FieldValue<'a>> {
        parser.parse_slow(value, None, registry).map(|s| finish(&s))
    }

    #[test]
    fn test_long_parser() {
        let registry = Registry::empty();
        let value = json!(-7);
        assert_eq!(quick(&ValueParser::Long, &value, &registry), Ok(FieldValue::Long(-7)));

        let value = json!(3.5);
        assert!(matches!(
            quick(&ValueParser::Long, &value, &registry),
            Err(ParseError::TypeMismatch { expected: "integer", .. })
        ));
    }

    #[test]
    fn test_float_accepts_whole_numbers() {
        let registry = Registry::empty();
        let value = json!(3);
        assert_eq!(quick(&ValueParser::Float, &value, &registry), Ok(FieldValue::Float(3.0)));
    }

    #[test]
    fn test_string_nullability() {
        let registry = Registry::empty();
        let null = json!(null);

        let nullable = ValueParser::Str { nullable: true };
        assert_eq!(quick(&nullable, &null, &registry), Ok(FieldValue::None));

        let strict = ValueParser::Str { nullable: false };
        assert!(matches!(
            quick(&strict, &null, &registry),
            Err(ParseError::TypeMismatch { expected: "string", actual: "null" })
        ));
    }

    #[test]
    fn test_void_consumes_anything() {
        let registry = Registry::empty();
        for value in [json!(null), json!(42), json!({"a": 1})] {
            assert_eq!(quick(&ValueParser::Void, &value, &registry), Ok(FieldValue::None));
        }
    }

    #[test]
    fn test_enum_parser() {
        let registry = Registry::empty();
        let parser = ValueParser::Enum {
            shape: Arc::new(EnumShape::new("State", ["open", "closed"])),
            nullable: false,
        };

        let value = json!("closed");
        let parsed = quick(&parser, &value, &registry).unwrap();
        let var = parsed.as_enum().unwrap();
        assert_eq!(var.ordinal(), 1);
        assert_eq!(var.name(), "closed");

        let value = json!("missing");
        assert!(matches!(
            quick(&parser, &value, &registry),
            Err(ParseError::UnknownEnumName { .. })
        ));
    }

    #[test]
    fn test_eager_list_rejects_null_elements() {
        let registry = Registry::empty();
        let parser = ValueParser::List(ListParser {
            component: Box::new(ValueParser::Long),
            nullable: false,
            lazy: false,
        });
        let value = json!([1, null, 3]);
        assert!(quick(&parser, &value, &registry).is_err());
    }

    #[test]
    fn test_lazy_list_tolerates_null_elements() {
        let registry = Registry::empty();
        let parser = ValueParser::List(ListParser {
            component: Box::new(ValueParser::Long),
            nullable: false,
            lazy: true,
        });
        let value = json!([1, null, 3]);
        let parsed = quick(&parser, &value, &registry).unwrap();
        let list = parsed.as_list().unwrap();
        assert_eq!(list.get(0).unwrap(), FieldValue::Long(1));
        assert_eq!(list.get(1).unwrap(), FieldValue::None);
        assert_eq!(list.get(2).unwrap(), FieldValue::Long(3));
    }

    #[test]
    fn test_nullable_list() {
        let registry = Registry::empty();
        let parser = ValueParser::List(ListParser {
            component: Box::new(ValueParser::Long),
            nullable: true,
            lazy: false,
        });
        let value = json!(null);
        assert_eq!(quick(&parser, &value, &registry), Ok(FieldValue::None));
    }
}
