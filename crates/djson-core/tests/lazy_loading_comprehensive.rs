//! Lazy loading tests: lazy lists with element isolation, lazy-cached
//! fields, lazy-quick fields, and memoization under concurrent accessors.

use djson_core::prelude::*;
use serde_json::json;

fn bag_parser(strict: bool) -> DynamicParser {
    DynamicParser::builder()
        .schemas([
            SchemaDescriptor::new("Bag").field(
                FieldDescriptor::new("items", ValueShape::list(ValueShape::schema("Item")))
                    .lazy(),
            ),
            SchemaDescriptor::new("Item")
                .field(FieldDescriptor::new("id", ValueShape::Long)),
        ])
        .strict(strict)
        .build()
        .unwrap()
}

// Lazy lists

#[test]
fn test_lazy_list_elements_parse_independently() {
    // Strict mode makes element parsing observable: items[0] carries a key
    // outside Item's closed name set, so touching it would fail
    let parser = bag_parser(true);
    let raw = json!({"items": [
        {"id": 1, "junk": true},
        {"id": 2},
        {"id": 3, "junk": true}
    ]});
    let bag = parser.parse(&raw, &SchemaId::new("Bag")).unwrap();

    let value = bag.get("items").unwrap();
    let items = value.as_list().unwrap();
    assert_eq!(items.len(), 3);

    let second = items.get(1).unwrap();
    assert_eq!(second.as_object().unwrap().get("id").unwrap().as_long(), Some(2));

    // The poisoned neighbors fail only when accessed
    assert!(matches!(items.get(0), Err(AccessError::Element { index: 0, .. })));
    assert!(matches!(items.get(2), Err(AccessError::Element { index: 2, .. })));
}

#[test]
fn test_lazy_list_element_memoization() {
    let parser = bag_parser(false);
    let raw = json!({"items": [{"id": 5}]});
    let bag = parser.parse(&raw, &SchemaId::new("Bag")).unwrap();
    let value = bag.get("items").unwrap();
    let items = value.as_list().unwrap();

    let first = items.get(0).unwrap();
    let again = items.get(0).unwrap();
    assert_eq!(first, again);
}

#[test]
fn test_lazy_list_failed_element_is_retried() {
    let parser = bag_parser(true);
    let raw = json!({"items": [{"id": 1, "junk": true}]});
    let bag = parser.parse(&raw, &SchemaId::new("Bag")).unwrap();
    let value = bag.get("items").unwrap();
    let items = value.as_list().unwrap();

    // Failures are not cached; every access reports the same failure
    assert!(items.get(0).is_err());
    assert!(items.get(0).is_err());
}

#[test]
fn test_lazy_list_out_of_bounds() {
    let parser = bag_parser(false);
    let raw = json!({"items": [{"id": 1}]});
    let bag = parser.parse(&raw, &SchemaId::new("Bag")).unwrap();
    let value = bag.get("items").unwrap();
    let items = value.as_list().unwrap();
    assert!(matches!(
        items.get(7),
        Err(AccessError::IndexOutOfBounds { index: 7, len: 1 })
    ));
}

// Lazy-cached fields (slow parser + LAZY strategy)

#[test]
fn test_lazy_cached_nested_field() {
    let parser = DynamicParser::new([
        SchemaDescriptor::new("Holder")
            .field(FieldDescriptor::new("inner", ValueShape::schema("Inner")).lazy()),
        SchemaDescriptor::new("Inner")
            .field(FieldDescriptor::new("id", ValueShape::Long)),
    ])
    .unwrap();
    let raw = json!({"inner": {"id": 11}});
    let holder = parser.parse(&raw, &SchemaId::new("Holder")).unwrap();

    let first = holder.get("inner").unwrap();
    assert_eq!(first.as_object().unwrap().get("id").unwrap().as_long(), Some(11));
    let second = holder.get("inner").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_lazy_cached_field_error_surfaces_on_access() {
    let parser = DynamicParser::new([
        SchemaDescriptor::new("Holder")
            .field(FieldDescriptor::new("inner", ValueShape::schema("Inner")).lazy()),
        SchemaDescriptor::new("Inner")
            .field(FieldDescriptor::new("id", ValueShape::Long)),
    ])
    .unwrap();
    // The malformed nested object parses fine at Holder level; the failure
    // belongs to the accessor
    let raw = json!({"inner": {"id": "nope"}});
    let holder = parser.parse(&raw, &SchemaId::new("Holder")).unwrap();
    assert!(matches!(holder.get("inner"), Err(AccessError::Parse { .. })));
    assert!(matches!(holder.get("inner"), Err(AccessError::Parse { .. })));
}

#[test]
fn test_lazy_cached_missing_optional() {
    let parser = DynamicParser::new([
        SchemaDescriptor::new("Holder")
            .field(FieldDescriptor::new("inner", ValueShape::schema("Inner")).lazy().optional()),
        SchemaDescriptor::new("Inner"),
    ])
    .unwrap();
    let raw = json!({});
    let holder = parser.parse(&raw, &SchemaId::new("Holder")).unwrap();
    assert!(holder.get("inner").unwrap().is_none());
}

// Lazy-quick fields (quick parser + LAZY strategy)

#[test]
fn test_lazy_quick_field_reparses_per_call() {
    let parser = DynamicParser::new([SchemaDescriptor::new("Tag")
        .field(FieldDescriptor::new("label", ValueShape::String).lazy())])
    .unwrap();
    let raw = json!({"label": "alpha"});
    let view = parser.parse(&raw, &SchemaId::new("Tag")).unwrap();

    assert_eq!(view.get("label").unwrap().as_str(), Some("alpha"));
    assert_eq!(view.get("label").unwrap().as_str(), Some("alpha"));
}

#[test]
fn test_lazy_quick_bad_value_parses_at_access_time() {
    let parser = DynamicParser::new([SchemaDescriptor::new("Tag")
        .field(FieldDescriptor::new("label", ValueShape::String).lazy())])
    .unwrap();
    // Parse succeeds; the mismatch surfaces through the accessor
    let raw = json!({"label": 9});
    let view = parser.parse(&raw, &SchemaId::new("Tag")).unwrap();
    assert!(matches!(view.get("label"), Err(AccessError::Parse { .. })));
}

#[test]
fn test_lazy_quick_missing_required_fails_on_access() {
    let parser = DynamicParser::new([SchemaDescriptor::new("Tag")
        .field(FieldDescriptor::new("label", ValueShape::String).lazy())])
    .unwrap();
    let raw = json!({});
    let view = parser.parse(&raw, &SchemaId::new("Tag")).unwrap();
    let err = view.get("label").unwrap_err();
    assert!(err.to_string().contains("on-demand parsing failed"));
}

// Eager strategy forces parse-time failures

#[test]
fn test_eager_strategy_fails_at_parse_time() {
    let parser = DynamicParser::new([SchemaDescriptor::new("Tag")
        .field(FieldDescriptor::new("label", ValueShape::String).load(LoadStrategy::Eager))])
    .unwrap();
    let raw = json!({"label": 9});
    assert!(parser.parse(&raw, &SchemaId::new("Tag")).is_err());
}

// Concurrency

#[test]
fn test_concurrent_lazy_cached_accessors_agree() {
    let parser = DynamicParser::new([
        SchemaDescriptor::new("Holder")
            .field(FieldDescriptor::new("inner", ValueShape::schema("Inner")).lazy()),
        SchemaDescriptor::new("Inner")
            .field(FieldDescriptor::new("id", ValueShape::Long)),
    ])
    .unwrap();
    let raw = json!({"inner": {"id": 21}});
    let holder = parser.parse(&raw, &SchemaId::new("Holder")).unwrap();

    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let view = holder.clone();
                scope.spawn(move || {
                    let value = view.get("inner").unwrap();
                    value.as_object().unwrap().get("id").unwrap().as_long().unwrap()
                })
            })
            .collect();
        for worker in workers {
            assert_eq!(worker.join().unwrap(), 21);
        }
    });
}

#[test]
fn test_concurrent_lazy_list_element_access() {
    let parser = bag_parser(false);
    let raw = json!({"items": [{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}]});
    let bag = parser.parse(&raw, &SchemaId::new("Bag")).unwrap();
    let value = bag.get("items").unwrap();
    let items = value.as_list().unwrap();

    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let items = items.clone();
                scope.spawn(move || {
                    let index = worker % 4;
                    let element = items.get(index).unwrap();
                    element.as_object().unwrap().get("id").unwrap().as_long().unwrap()
                })
            })
            .collect();
        for (worker, handle) in workers.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), (worker % 4) as i64 + 1);
        }
    });
}
