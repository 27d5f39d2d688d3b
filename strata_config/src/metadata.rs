//! Per-node metadata carried alongside evaluated values.
//!
//! Metadata is how extensions signal the evaluator (flatten, merge, override,
//! rewrite a key) and how consumers tag nodes (for example values that came
//! from a secrets layer). Maps are only ever extended into fresh copies; a
//! node already handed to a caller keeps the metadata it was built with.

use serde_json::{Map, Value};

use crate::merge::merge_value;

/// Well-known metadata keys understood by the evaluator and the built-in
/// extensions.
pub mod keys {
    /// Replace the parent object with this node.
    pub const SHOULD_FLATTEN: &str = "should_flatten";
    /// Deep-merge this object under its parent; the parent wins conflicts.
    pub const SHOULD_MERGE: &str = "should_merge";
    /// Deep-merge this object over its parent; this node wins conflicts.
    pub const SHOULD_OVERRIDE: &str = "should_override";
    /// Insert this node into the parent under a different key (string).
    pub const REWRITE_KEY: &str = "rewrite_key";
    /// The node's key was written with a doubled directive marker.
    pub const FROM_ESCAPED_DIRECTIVE: &str = "from_escaped_directive";
    /// The node was read from a secrets layer.
    pub const FROM_SECRETS: &str = "from_secrets";

    /// Keys consumed by the object step of the evaluator.
    pub(crate) const INSTRUCTIONS: [&str; 4] =
        [SHOULD_FLATTEN, SHOULD_MERGE, SHOULD_OVERRIDE, REWRITE_KEY];
}

/// Open-ended map of flags and values attached to a node.
///
/// # Examples
///
/// ```
/// use strata_config::{Metadata, metadata::keys};
///
/// let meta = Metadata::new().with(keys::FROM_SECRETS, true);
/// assert!(meta.flag(keys::FROM_SECRETS));
/// assert!(!meta.flag(keys::SHOULD_FLATTEN));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// Create an empty metadata map.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Return a copy with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` only when `key` holds the boolean `true`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(Value::Bool(true)))
    }

    /// Remove `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Whether the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Shallow overlay: entries from `overrides` replace ours key by key.
    #[must_use]
    pub fn extended(&self, overrides: &Self) -> Self {
        let mut next = self.0.clone();
        next.extend(overrides.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(next)
    }

    /// Deep merge: nested objects combine recursively and `other` wins
    /// conflicts.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut target = Value::Object(self.0.clone());
        merge_value(&mut target, Value::Object(other.0.clone()));
        match target {
            Value::Object(map) => Self(map),
            _ => other.clone(),
        }
    }

    /// Return a copy without the evaluator's instruction keys.
    pub(crate) fn without_instructions(mut self) -> Self {
        for key in keys::INSTRUCTIONS {
            self.0.shift_remove(key);
        }
        self
    }

    pub(crate) fn has_instructions(&self) -> bool {
        keys::INSTRUCTIONS.iter().any(|key| self.0.contains_key(*key))
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
