//! Build-session tests: the schema-model error taxonomy, reference
//! resolution across batches, and shadowing.

use djson_core::prelude::*;
use serde_json::json;

// Schema-model errors

#[test]
fn test_duplicate_schema_in_batch() {
    let err = DynamicParser::new([
        SchemaDescriptor::new("Point"),
        SchemaDescriptor::new("Point"),
    ])
    .unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateSchema(ref id) if id.as_str() == "Point"));
}

#[test]
fn test_unknown_field_reference() {
    let err = DynamicParser::new([SchemaDescriptor::new("Bag")
        .field(FieldDescriptor::new("item", ValueShape::schema("Missing")))])
    .unwrap_err();
    assert!(matches!(
        err,
        SchemaError::UnknownReference { ref referenced, .. } if referenced.as_str() == "Missing"
    ));
}

#[test]
fn test_unknown_supertype() {
    let err = DynamicParser::new([SchemaDescriptor::new("Sub").supertype("Missing")]).unwrap_err();
    assert!(matches!(
        err,
        SchemaError::UnknownSupertype { ref supertype, .. } if supertype.as_str() == "Missing"
    ));
}

#[test]
fn test_duplicate_field_name() {
    let err = DynamicParser::new([SchemaDescriptor::new("Point")
        .field(FieldDescriptor::new("x", ValueShape::Long))
        .field(FieldDescriptor::new("x2", ValueShape::Long).json_key("x"))])
    .unwrap_err();
    assert!(matches!(
        err,
        SchemaError::DuplicateField { ref field, .. } if field == "x"
    ));
}

#[test]
fn test_duplicate_accessor_name() {
    let err = DynamicParser::new([SchemaDescriptor::new("Point")
        .field(FieldDescriptor::new("x", ValueShape::Long).json_key("a"))
        .field(FieldDescriptor::new("x", ValueShape::Long).json_key("b"))])
    .unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateAccessor { .. }));
}

#[test]
fn test_nullable_primitive_rejected() {
    for shape in [ValueShape::Long, ValueShape::Bool, ValueShape::Float] {
        let err = DynamicParser::new([SchemaDescriptor::new("Point")
            .field(FieldDescriptor::new("v", shape).nullable())])
        .unwrap_err();
        assert!(matches!(err, SchemaError::NullablePrimitive { .. }));
    }
}

#[test]
fn test_nullable_reference_shapes_accepted() {
    let shapes = [
        ValueShape::String,
        ValueShape::Any,
        ValueShape::JsonObject,
        ValueShape::list(ValueShape::Long),
    ];
    for shape in shapes {
        assert!(DynamicParser::new([SchemaDescriptor::new("Holder")
            .field(FieldDescriptor::new("v", shape).nullable().optional())])
        .is_ok());
    }
}

#[test]
fn test_reinterpret_rejected_outside_manual_mode() {
    let err = DynamicParser::new([
        SchemaDescriptor::new("Base")
            .caster(CasterDescriptor::new("sub", ValueShape::schema("Sub")).reinterpret()),
        SchemaDescriptor::new("Sub"),
    ])
    .unwrap_err();
    assert!(matches!(err, SchemaError::ReinterpretNotManual { .. }));
}

#[test]
fn test_automatic_caster_must_target_schema_or_void() {
    let err = DynamicParser::new([SchemaDescriptor::new("Base")
        .caster(CasterDescriptor::new("sub", ValueShape::Long))])
    .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidCasterTarget { .. }));
}

#[test]
fn test_duplicate_default_case() {
    let err = DynamicParser::new([SchemaDescriptor::new("Base")
        .caster(CasterDescriptor::default_case("a"))
        .caster(CasterDescriptor::default_case("b"))])
    .unwrap_err();
    assert!(matches!(
        err,
        SchemaError::DuplicateDefaultCase { ref accessor, .. } if accessor == "b"
    ));
}

#[test]
fn test_supertype_without_caster_rejected() {
    let err = DynamicParser::new([
        SchemaDescriptor::new("Base"),
        SchemaDescriptor::new("Sub").supertype("Base"),
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        SchemaError::MissingSubtypeCaster { ref schema, ref supertype }
            if schema.as_str() == "Sub" && supertype.as_str() == "Base"
    ));
}

#[test]
fn test_supertype_with_caster_accepted() {
    let parser = DynamicParser::new([
        SchemaDescriptor::new("Base")
            .caster(CasterDescriptor::new("asSub", ValueShape::schema("Sub")))
            .caster(CasterDescriptor::default_case("other")),
        SchemaDescriptor::new("Sub").supertype("Base").field(
            FieldDescriptor::new("tag", ValueShape::String).when(Condition::key_present("tag")),
        ),
    ]);
    assert!(parser.is_ok());
}

// Base packages

#[test]
fn test_reference_into_base_package() {
    let base = DynamicParser::new([
        SchemaDescriptor::new("Item").field(FieldDescriptor::new("id", ValueShape::Long)),
    ])
    .unwrap();
    let parser = DynamicParser::builder()
        .schema(
            SchemaDescriptor::new("Bag")
                .field(FieldDescriptor::new("item", ValueShape::schema("Item"))),
        )
        .base_package(&base)
        .build()
        .unwrap();

    assert!(parser.has_schema(&SchemaId::new("Bag")));
    assert!(!parser.has_schema(&SchemaId::new("Item")));

    let raw = json!({"item": {"id": 8}});
    let bag = parser.parse(&raw, &SchemaId::new("Bag")).unwrap();
    let item = bag.get("item").unwrap();
    assert_eq!(item.as_object().unwrap().get("id").unwrap().as_long(), Some(8));
}

#[test]
fn test_reference_fails_without_base_package() {
    let err = DynamicParser::new([SchemaDescriptor::new("Bag")
        .field(FieldDescriptor::new("item", ValueShape::schema("Item")))])
    .unwrap_err();
    assert!(matches!(err, SchemaError::UnknownReference { .. }));
}

#[test]
fn test_local_schema_shadows_base_package() {
    let base = DynamicParser::new([
        SchemaDescriptor::new("Item").field(FieldDescriptor::new("id", ValueShape::Long)),
    ])
    .unwrap();
    // The local Item binds "name" instead of "id"
    let parser = DynamicParser::builder()
        .schemas([
            SchemaDescriptor::new("Bag")
                .field(FieldDescriptor::new("item", ValueShape::schema("Item"))),
            SchemaDescriptor::new("Item")
                .field(FieldDescriptor::new("name", ValueShape::String)),
        ])
        .base_package(&base)
        .build()
        .unwrap();

    let raw = json!({"item": {"name": "local"}});
    let bag = parser.parse(&raw, &SchemaId::new("Bag")).unwrap();
    let item = bag.get("item").unwrap();
    assert_eq!(item.as_object().unwrap().get("name").unwrap().as_str(), Some("local"));
}

#[test]
fn test_base_packages_consulted_in_order() {
    let first = DynamicParser::new([
        SchemaDescriptor::new("Item").field(FieldDescriptor::new("id", ValueShape::Long)),
    ])
    .unwrap();
    let second = DynamicParser::new([
        SchemaDescriptor::new("Item").field(FieldDescriptor::new("name", ValueShape::String)),
    ])
    .unwrap();
    let parser = DynamicParser::builder()
        .schema(
            SchemaDescriptor::new("Bag")
                .field(FieldDescriptor::new("item", ValueShape::schema("Item"))),
        )
        .base_package(&first)
        .base_package(&second)
        .build()
        .unwrap();

    let raw = json!({"item": {"id": 1}});
    assert!(parser.parse(&raw, &SchemaId::new("Bag")).is_ok());
    let raw = json!({"item": {"name": "x"}});
    assert!(parser.parse(&raw, &SchemaId::new("Bag")).is_err());
}

#[test]
fn test_empty_batch_builds() {
    let parser = DynamicParser::new(Vec::<SchemaDescriptor>::new()).unwrap();
    assert!(!parser.has_schema(&SchemaId::new("Anything")));
}
