//! Schema descriptors
//!
//! A protocol type is declared as a [`SchemaDescriptor`]: an interface-like
//! bag of typed field accessors, plus optional subtype relations. The
//! descriptor carries everything the build session needs - it is the
//! declared accessor surface itself, not a separate schema language.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Identity of a declared protocol type
///
/// Schema ids are plain strings chosen by the protocol author
/// (e.g. `"Page.FrameTree"`). They key the handler map and are the stable
/// identifiers used for cross-type references, including forward and cyclic
/// ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaId(String);

impl SchemaId {
    /// Create a new schema identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the schema id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SchemaId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SchemaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// When a field is parsed relative to the enclosing object's parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadStrategy {
    /// Let the binder pick: eager unless the parser has no quick form and
    /// laziness was forced
    #[default]
    Auto,
    /// Parse at object-parse time into a pre-sized slot
    Eager,
    /// Parse on first accessor call
    Lazy,
}

/// How a schema's subtypes are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubtypingMode {
    /// Dispatch by structural condition predicates; exactly one subtype may
    /// match a given JSON object
    #[default]
    Automatic,
    /// The caller selects the interpretation through reinterpretation-cast
    /// accessors; no matching occurs at parse time
    Manual,
}

/// A declared enumeration: a closed set of string variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumShape {
    name: String,
    variants: Vec<String>,
}

impl EnumShape {
    /// Declare an enumeration with the given variant names
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// The enumeration's declared name (used in diagnostics)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared variant names, in declaration order
    pub fn variants(&self) -> &[String] {
        &self.variants
    }
}

/// The declared shape of a field or caster value
#[derive(Debug, Clone)]
pub enum ValueShape {
    /// 64-bit integer; never nullable
    Long,
    /// Boolean; never nullable
    Bool,
    /// 32-bit float; never nullable
    Float,
    /// JSON string
    String,
    /// Opaque pass-through: any JSON value, unchecked
    Any,
    /// A raw JSON object, exposed as-is
    JsonObject,
    /// No value; consumes anything. Used for default cases in automatic
    /// subtype dispatch; never nullable
    Void,
    /// An enumeration parsed from a JSON string by variant name
    Enum(Arc<EnumShape>),
    /// A JSON array of the component shape
    List(Box<ValueShape>),
    /// A nested protocol type, referenced by schema id
    Schema(SchemaId),
}

impl ValueShape {
    /// Shorthand for a nested-schema reference
    pub fn schema(id: impl Into<SchemaId>) -> Self {
        Self::Schema(id.into())
    }

    /// Shorthand for a list of `component`
    pub fn list(component: ValueShape) -> Self {
        Self::List(Box::new(component))
    }

    /// Shorthand for an enumeration shape
    pub fn enumeration(shape: EnumShape) -> Self {
        Self::Enum(Arc::new(shape))
    }

    /// Primitive-shaped types may not be declared nullable
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ValueShape::Long | ValueShape::Bool | ValueShape::Float | ValueShape::Void
        )
    }
}

/// One declared field accessor
///
/// The JSON key defaults to the accessor name unless overridden with
/// [`FieldDescriptor::json_key`].
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    json_key: Option<String>,
    shape: ValueShape,
    optional: bool,
    nullable: bool,
    load: LoadStrategy,
    condition: Option<Condition>,
    overrides: bool,
}

impl FieldDescriptor {
    /// Declare a field accessor with the given name and value shape
    pub fn new(name: impl Into<String>, shape: ValueShape) -> Self {
        Self {
            name: name.into(),
            json_key: None,
            shape,
            optional: false,
            nullable: false,
            load: LoadStrategy::Auto,
            condition: None,
            overrides: false,
        }
    }

    /// Bind the accessor to a JSON key different from its name
    pub fn json_key(mut self, key: impl Into<String>) -> Self {
        self.json_key = Some(key.into());
        self
    }

    /// A missing key yields "no value" instead of failing the parse
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// A JSON `null` yields "no value". Rejected on primitive shapes
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Set the load strategy explicitly
    pub fn load(mut self, strategy: LoadStrategy) -> Self {
        self.load = strategy;
        self
    }

    /// Shorthand for `load(LoadStrategy::Lazy)`
    pub fn lazy(self) -> Self {
        self.load(LoadStrategy::Lazy)
    }

    /// Attach a subtype-dispatch condition to this field
    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Mark this accessor as shadowing a base schema's field rather than
    /// declaring a new one
    pub fn overrides(mut self) -> Self {
        self.overrides = true;
        self
    }

    /// Accessor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective JSON key: the explicit literal if set, else the accessor name
    pub fn key(&self) -> &str {
        self.json_key.as_deref().unwrap_or(&self.name)
    }

    /// Declared value shape
    pub fn shape(&self) -> &ValueShape {
        &self.shape
    }

    /// Whether a missing key is tolerated
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether a JSON `null` is tolerated
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Declared load strategy
    pub fn load_strategy(&self) -> LoadStrategy {
        self.load
    }

    /// Subtype-dispatch condition, if any
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Whether this accessor shadows a base schema's field
    pub fn is_override(&self) -> bool {
        self.overrides
    }
}

/// One declared subtype-caster accessor
///
/// In automatic mode the target must be a schema (or [`ValueShape::Void`]
/// for the default case). In manual mode the target may be any shape; the
/// accessor reinterprets the same underlying JSON under it.
#[derive(Debug, Clone)]
pub struct CasterDescriptor {
    name: String,
    target: ValueShape,
    reinterpret: bool,
}

impl CasterDescriptor {
    /// Declare a caster accessor with the given name and target shape
    pub fn new(name: impl Into<String>, target: ValueShape) -> Self {
        Self {
            name: name.into(),
            target,
            reinterpret: false,
        }
    }

    /// Declare the void default case of an automatic-mode schema
    pub fn default_case(name: impl Into<String>) -> Self {
        Self::new(name, ValueShape::Void)
    }

    /// Reparse the underlying value instead of treating the target as a
    /// structural subtype. Only valid in manual mode
    pub fn reinterpret(mut self) -> Self {
        self.reinterpret = true;
        self
    }

    /// Accessor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target shape
    pub fn target(&self) -> &ValueShape {
        &self.target
    }

    /// Whether the underlying value is reparsed rather than shared
    pub fn is_reinterpret(&self) -> bool {
        self.reinterpret
    }
}

/// A declared protocol type: identity, fields, subtype relations
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    id: SchemaId,
    supertype: Option<SchemaId>,
    mode: SubtypingMode,
    fields: Vec<FieldDescriptor>,
    casters: Vec<CasterDescriptor>,
}

impl SchemaDescriptor {
    /// Declare a schema with the given identity, in automatic subtyping mode
    pub fn new(id: impl Into<SchemaId>) -> Self {
        Self {
            id: id.into(),
            supertype: None,
            mode: SubtypingMode::Automatic,
            fields: Vec::new(),
            casters: Vec::new(),
        }
    }

    /// Switch the schema to manual subtyping mode
    pub fn manual(mut self) -> Self {
        self.mode = SubtypingMode::Manual;
        self
    }

    /// Declare the schema's supertype (at most one)
    pub fn supertype(mut self, id: impl Into<SchemaId>) -> Self {
        self.supertype = Some(id.into());
        self
    }

    /// Add a field accessor
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a subtype-caster accessor
    pub fn caster(mut self, caster: CasterDescriptor) -> Self {
        self.casters.push(caster);
        self
    }

    /// Schema identity
    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    /// Declared supertype, if any
    pub fn declared_supertype(&self) -> Option<&SchemaId> {
        self.supertype.as_ref()
    }

    /// Subtyping mode
    pub fn mode(&self) -> SubtypingMode {
        self.mode
    }

    /// Declared field accessors, in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Declared caster accessors, in declaration order
    pub fn casters(&self) -> &[CasterDescriptor] {
        &self.casters
    }
}
