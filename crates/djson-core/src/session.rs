//! The schema-building session
//!
//! A single-threaded, one-shot pass that compiles a batch of schema
//! descriptors into a frozen [`Registry`]. Phases: seed the id table
//! (duplicates fail) -> analyze every descriptor's accessors into handlers,
//! recording placeholder refs for batch-local targets and binding directly
//! into base packages -> link (the populated table makes every placeholder
//! resolvable) -> wire subtype casters into their targets -> validate that
//! every declared supertype relation has a caster -> build the strict-mode
//! closed name sets.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use djson_domain::{
    FieldDescriptor, LoadStrategy, SchemaDescriptor, SchemaError, SchemaId, SchemaResult,
    SubtypingMode, ValueShape,
};
use tracing::{debug, info};

use crate::binding::{AccessorHandler, Conditions, FieldCondition, FieldLoader, Loaders};
use crate::handler::{AlgCases, HandlerRef, Registry, TypeHandler};
use crate::parsers::{ListParser, TypedParser, ValueParser};

/// Compile a schema batch against previously built base packages
pub(crate) fn build(
    schemas: Vec<SchemaDescriptor>,
    bases: Vec<Arc<Registry>>,
    strict: bool,
) -> SchemaResult<Registry> {
    // Seed: register every batch-local identity at its position
    let mut index: HashMap<SchemaId, usize> = HashMap::with_capacity(schemas.len());
    for (pos, schema) in schemas.iter().enumerate() {
        if index.insert(schema.id().clone(), pos).is_some() {
            return Err(SchemaError::DuplicateSchema(schema.id().clone()));
        }
    }

    let session = BuildSession { index, bases };

    // Analyze: one handler per descriptor; cross-references become
    // placeholders (batch-local) or direct binds (base packages)
    let mut handlers: Vec<TypeHandler> = Vec::with_capacity(schemas.len());
    let mut caster_targets: Vec<HandlerRef> = Vec::new();
    for schema in &schemas {
        handlers.push(session.compile(schema, &mut caster_targets)?);
    }

    // Link: the handler table is now fully populated, so every Local
    // placeholder resolves. Wire each caster into its target.
    for target in caster_targets {
        match target {
            HandlerRef::Local(pos) => handlers[pos].caster_installed = true,
            // An imported target was validated when its own batch was built
            HandlerRef::Imported { .. } => {}
        }
    }

    // Validate: a schema that declared a supertype must be reachable
    // through a caster on some schema
    for handler in &handlers {
        if let Some((super_id, _)) = &handler.supertype {
            if !handler.caster_installed {
                return Err(SchemaError::MissingSubtypeCaster {
                    schema: handler.id.clone(),
                    supertype: super_id.clone(),
                });
            }
        }
    }

    if strict {
        let closed: Vec<HashSet<String>> = (0..handlers.len())
            .map(|pos| closed_name_set(pos, &handlers))
            .collect();
        for (handler, names) in handlers.iter_mut().zip(closed) {
            handler.closed_names = Some(names);
        }
    }

    info!(schemas = handlers.len(), strict, "schema batch compiled");
    Ok(Registry {
        handlers,
        index: session.index,
        strict,
    })
}

struct BuildSession {
    index: HashMap<SchemaId, usize>,
    bases: Vec<Arc<Registry>>,
}

impl BuildSession {
    /// Resolve a schema reference: batch-local first, then base packages
    /// in order
    fn type_ref(&self, id: &SchemaId) -> Option<HandlerRef> {
        if let Some(&pos) = self.index.get(id) {
            return Some(HandlerRef::Local(pos));
        }
        for base in &self.bases {
            if let Some(&pos) = base.index.get(id) {
                return Some(HandlerRef::Imported {
                    registry: base.clone(),
                    pos,
                });
            }
        }
        None
    }

    fn compile(
        &self,
        schema: &SchemaDescriptor,
        caster_targets: &mut Vec<HandlerRef>,
    ) -> SchemaResult<TypeHandler> {
        let id = schema.id();
        let mut field_array_size = 0usize;
        let mut volatile_count = 0usize;
        let mut loaders = Loaders::new();
        let mut conditions = Conditions::new();
        let mut accessors: HashMap<String, AccessorHandler> = HashMap::new();
        let mut own_keys: Vec<String> = Vec::new();
        let mut local_keys: HashSet<String> = HashSet::new();

        for field in schema.fields() {
            if accessors.contains_key(field.name()) {
                return Err(SchemaError::DuplicateAccessor {
                    schema: id.clone(),
                    accessor: field.name().to_string(),
                });
            }
            let key = field.key().to_string();
            if !field.is_override() && !local_keys.insert(key.clone()) {
                return Err(SchemaError::DuplicateField {
                    schema: id.clone(),
                    field: key,
                });
            }
            own_keys.push(key.clone());

            let parser = self.shape_parser(
                id,
                field.name(),
                field.shape(),
                field.is_nullable(),
                false,
                field.load_strategy(),
            )?;
            if let Some(condition) = field.condition() {
                conditions.push(FieldCondition {
                    field: key.clone(),
                    condition: condition.clone(),
                });
            }

            let handler = Self::field_handler(
                field,
                key,
                parser,
                &mut field_array_size,
                &mut volatile_count,
                &mut loaders,
            );
            accessors.insert(field.name().to_string(), handler);
        }

        let mut auto = AutoDraft::default();
        let mut manual_subtypes: Vec<HandlerRef> = Vec::new();
        let mut saw_manual_caster = false;

        for caster in schema.casters() {
            if accessors.contains_key(caster.name()) {
                return Err(SchemaError::DuplicateAccessor {
                    schema: id.clone(),
                    accessor: caster.name().to_string(),
                });
            }
            let handler = match schema.mode() {
                SubtypingMode::Automatic => {
                    if caster.is_reinterpret() {
                        return Err(SchemaError::ReinterpretNotManual {
                            schema: id.clone(),
                            accessor: caster.name().to_string(),
                        });
                    }
                    match caster.target() {
                        ValueShape::Void => {
                            if auto.has_default {
                                return Err(SchemaError::DuplicateDefaultCase {
                                    schema: id.clone(),
                                    accessor: caster.name().to_string(),
                                });
                            }
                            auto.has_default = true;
                            AccessorHandler::DefaultCase
                        }
                        ValueShape::Schema(target_id) => {
                            let target =
                                self.type_ref(target_id)
                                    .ok_or_else(|| SchemaError::UnknownReference {
                                        schema: id.clone(),
                                        referenced: target_id.clone(),
                                    })?;
                            // The first real subtype allocates the two
                            // dispatch slots: variant code + variant value
                            if auto.subtypes.is_empty() {
                                auto.code_slot = field_array_size;
                                auto.value_slot = field_array_size + 1;
                                field_array_size += 2;
                            }
                            let code = auto.subtypes.len() as i32;
                            auto.subtypes.push(target.clone());
                            caster_targets.push(target);
                            AccessorHandler::AutoSubtype {
                                code_slot: auto.code_slot,
                                value_slot: auto.value_slot,
                                code,
                            }
                        }
                        _ => {
                            return Err(SchemaError::InvalidCasterTarget {
                                schema: id.clone(),
                                accessor: caster.name().to_string(),
                            })
                        }
                    }
                }
                SubtypingMode::Manual => {
                    saw_manual_caster = true;
                    let parser = self.shape_parser(
                        id,
                        caster.name(),
                        caster.target(),
                        false,
                        !caster.is_reinterpret(),
                        LoadStrategy::Auto,
                    )?;
                    if let ValueParser::Typed(typed) = &parser {
                        if typed.subtyping {
                            caster_targets.push(typed.target.clone());
                            manual_subtypes.push(typed.target.clone());
                        }
                    }
                    let slot = volatile_count;
                    volatile_count += 1;
                    AccessorHandler::ManualSubtype { slot, parser }
                }
            };
            accessors.insert(caster.name().to_string(), handler);
        }

        let cases = match schema.mode() {
            SubtypingMode::Automatic if !auto.subtypes.is_empty() => Some(AlgCases::Auto {
                code_slot: auto.code_slot,
                value_slot: auto.value_slot,
                has_default: auto.has_default,
                subtypes: auto.subtypes,
            }),
            SubtypingMode::Manual if saw_manual_caster => Some(AlgCases::Manual {
                subtypes: manual_subtypes,
            }),
            _ => None,
        };

        let supertype = match schema.declared_supertype() {
            Some(super_id) => {
                let super_ref =
                    self.type_ref(super_id)
                        .ok_or_else(|| SchemaError::UnknownSupertype {
                            schema: id.clone(),
                            supertype: super_id.clone(),
                        })?;
                Some((super_id.clone(), super_ref))
            }
            None => None,
        };

        debug!(
            schema = %id,
            eager = loaders.len(),
            lazy = volatile_count,
            "compiled type handler"
        );
        Ok(TypeHandler {
            id: id.clone(),
            mode: schema.mode(),
            supertype,
            field_array_size,
            volatile_count,
            loaders,
            conditions,
            accessors,
            cases,
            own_keys,
            caster_installed: false,
            closed_names: None,
        })
    }

    /// Resolve one field into its accessor shape, allocating slots
    fn field_handler(
        field: &FieldDescriptor,
        key: String,
        parser: ValueParser,
        field_array_size: &mut usize,
        volatile_count: &mut usize,
        loaders: &mut Loaders,
    ) -> AccessorHandler {
        let optional = field.is_optional();
        match (parser.is_quick(), field.load_strategy()) {
            (true, LoadStrategy::Lazy) => AccessorHandler::LazyQuick {
                key,
                parser,
                optional,
            },
            (false, LoadStrategy::Lazy) => {
                let slot = *volatile_count;
                *volatile_count += 1;
                AccessorHandler::LazyCached {
                    slot,
                    key,
                    parser,
                    optional,
                }
            }
            // Quick or slow with AUTO/EAGER: parse at object-parse time
            (_, LoadStrategy::Auto | LoadStrategy::Eager) => {
                let slot = *field_array_size;
                *field_array_size += 1;
                loaders.push(FieldLoader {
                    slot,
                    key,
                    parser,
                    optional,
                });
                AccessorHandler::Preparsed { slot }
            }
        }
    }

    /// Compile a declared value shape into a parser
    fn shape_parser(
        &self,
        schema: &SchemaId,
        accessor: &str,
        shape: &ValueShape,
        nullable: bool,
        subtyping: bool,
        load: LoadStrategy,
    ) -> SchemaResult<ValueParser> {
        if nullable && shape.is_primitive() {
            return Err(SchemaError::NullablePrimitive {
                schema: schema.clone(),
                field: accessor.to_string(),
            });
        }
        let parser = match shape {
            ValueShape::Long => ValueParser::Long,
            ValueShape::Bool => ValueParser::Bool,
            ValueShape::Float => ValueParser::Float,
            ValueShape::Void => ValueParser::Void,
            ValueShape::String => ValueParser::Str { nullable },
            ValueShape::Any => ValueParser::Any { nullable },
            ValueShape::JsonObject => ValueParser::JsonObject { nullable },
            ValueShape::Enum(shape) => ValueParser::Enum {
                shape: shape.clone(),
                nullable,
            },
            ValueShape::List(component) => {
                let component = self.shape_parser(schema, accessor, component, false, false, load)?;
                ValueParser::List(ListParser {
                    component: Box::new(component),
                    nullable,
                    lazy: load == LoadStrategy::Lazy,
                })
            }
            ValueShape::Schema(target_id) => {
                let target =
                    self.type_ref(target_id)
                        .ok_or_else(|| SchemaError::UnknownReference {
                            schema: schema.clone(),
                            referenced: target_id.clone(),
                        })?;
                ValueParser::Typed(TypedParser {
                    target,
                    nullable,
                    subtyping,
                })
            }
        };
        Ok(parser)
    }
}

#[derive(Default)]
struct AutoDraft {
    code_slot: usize,
    value_slot: usize,
    has_default: bool,
    subtypes: Vec<HandlerRef>,
}

/// Closed name set for one handler: the union of its own field keys, its
/// supertype chain's keys, and the keys of every subtype reachable through
/// automatic dispatch. Computed as a closure over the subtype graph.
fn closed_name_set(start: usize, handlers: &[TypeHandler]) -> HashSet<String> {
    type Node = (Option<Arc<Registry>>, usize);

    let mut out: HashSet<String> = HashSet::new();
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut stack: Vec<Node> = vec![(None, start)];

    while let Some((context, pos)) = stack.pop() {
        let context_key = context
            .as_ref()
            .map(|r| Arc::as_ptr(r) as usize)
            .unwrap_or(0);
        if !seen.insert((context_key, pos)) {
            continue;
        }
        let handler = match &context {
            None => &handlers[pos],
            Some(registry) => &registry.handlers[pos],
        };
        out.extend(handler.own_keys.iter().cloned());

        let push = |r: &HandlerRef, stack: &mut Vec<Node>| match r {
            // A local ref is relative to the registry it was compiled in
            HandlerRef::Local(p) => stack.push((context.clone(), *p)),
            HandlerRef::Imported { registry, pos } => stack.push((Some(registry.clone()), *pos)),
        };
        if let Some((_, super_ref)) = &handler.supertype {
            push(super_ref, &mut stack);
        }
        if let Some(AlgCases::Auto { subtypes, .. }) = &handler.cases {
            for subtype in subtypes {
                push(subtype, &mut stack);
            }
        }
    }
    out
}
