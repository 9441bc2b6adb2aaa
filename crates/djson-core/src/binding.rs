//! Per-field compiled metadata
//!
//! The build session lowers each declared accessor into one of the handler
//! shapes here. Eager fields additionally get a [`FieldLoader`] that runs
//! at object-parse time; condition-carrying fields contribute a
//! [`FieldCondition`] to their schema's subtype-dispatch block.

use djson_domain::Condition;
use smallvec::SmallVec;

use crate::parsers::ValueParser;

/// Eager field: parsed during object parse into a fixed slot
#[derive(Debug)]
pub(crate) struct FieldLoader {
    /// Dense slot index in the object's field array
    pub(crate) slot: usize,
    /// JSON key to read
    pub(crate) key: String,
    /// Parser for the raw value
    pub(crate) parser: ValueParser,
    /// Whether a missing key is tolerated
    pub(crate) optional: bool,
}

/// A subtype-dispatch condition contributed by one field
#[derive(Debug)]
pub(crate) struct FieldCondition {
    /// JSON key of the contributing field (diagnostics only)
    pub(crate) field: String,
    /// The predicate over the raw object
    pub(crate) condition: Condition,
}

pub(crate) type Loaders = SmallVec<[FieldLoader; 4]>;
pub(crate) type Conditions = SmallVec<[FieldCondition; 2]>;

/// Compiled accessor shape, dispatched by the typed view
#[derive(Debug)]
pub(crate) enum AccessorHandler {
    /// Read a pre-parsed eager slot; no parse cost at call time
    Preparsed {
        /// Slot index in the field array
        slot: usize,
    },
    /// Re-read and quick-parse the JSON key on every call; cheap enough to
    /// repeat, so nothing is cached
    LazyQuick {
        /// JSON key to read
        key: String,
        /// Quick parser for the raw value
        parser: ValueParser,
        /// Whether a missing key is tolerated
        optional: bool,
    },
    /// Parse on first call through the slow parser and publish into the
    /// object's lazy-cache slot; later calls read the cache
    LazyCached {
        /// Lazy-cache slot index
        slot: usize,
        /// JSON key to read
        key: String,
        /// Parser for the raw value
        parser: ValueParser,
        /// Whether a missing key is tolerated
        optional: bool,
    },
    /// Automatic-mode subtype accessor: yields the matched subtype view iff
    /// its code is the one dispatch stored
    AutoSubtype {
        /// Slot holding the matched variant code
        code_slot: usize,
        /// Slot holding the matched variant data
        value_slot: usize,
        /// This accessor's variant code
        code: i32,
    },
    /// Manual-mode caster: reparse the same underlying raw value under the
    /// target shape on first call, memoized in a lazy-cache slot
    ManualSubtype {
        /// Lazy-cache slot index
        slot: usize,
        /// Reinterpretation parser over the whole raw value
        parser: ValueParser,
    },
    /// Void default case of automatic dispatch; always "no value"
    DefaultCase,
}
