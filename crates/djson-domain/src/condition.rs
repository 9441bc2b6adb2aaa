//! Field conditions for automatic subtype dispatch
//!
//! A [`Condition`] is a first-class predicate over the raw JSON object of a
//! value being parsed. Automatic subtype dispatch evaluates the conditions
//! declared on each candidate subtype's fields and requires exactly one
//! candidate to match.

use std::fmt;
use std::sync::Arc;

/// The raw JSON object type read by field loaders and conditions
pub type RawObject = serde_json::Map<String, serde_json::Value>;

/// A structural predicate over a raw JSON object
///
/// Conditions are pure functions: they must not depend on anything but the
/// object handed to them, since subtype dispatch may evaluate them in any
/// interleaving across concurrent parses.
#[derive(Clone)]
pub struct Condition(Arc<dyn Fn(&RawObject) -> bool + Send + Sync>);

impl Condition {
    /// Wrap an arbitrary predicate
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&RawObject) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Condition that holds when `key` is present in the raw object
    pub fn key_present(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move |obj| obj.contains_key(&key))
    }

    /// Condition that holds when `key` is absent from the raw object
    pub fn key_absent(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move |obj| !obj.contains_key(&key))
    }

    /// Evaluate the predicate against a raw JSON object
    pub fn evaluate(&self, object: &RawObject) -> bool {
        (self.0)(object)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}
