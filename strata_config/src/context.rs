//! Ambient state threaded top-down through evaluation.

use std::sync::Arc;

use serde_json::{Map, Value};

/// Read-only mapping passed from a node to its descendants.
///
/// Cloning is cheap. Extending a context always produces a new copy, so a
/// directive can hand its children an overridden view without affecting the
/// context seen by its siblings.
///
/// # Examples
///
/// ```
/// use strata_config::ParsingContext;
///
/// let base = ParsingContext::new().with("environment", "production");
/// let child = base.with("environment", "staging");
/// assert_eq!(base.get("environment").and_then(|v| v.as_str()), Some("production"));
/// assert_eq!(child.get("environment").and_then(|v| v.as_str()), Some("staging"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsingContext(Arc<Map<String, Value>>);

impl ParsingContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Return a copy with `key` set to `value`.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.0.as_ref().clone();
        next.insert(key.into(), value.into());
        Self(Arc::new(next))
    }

    /// Return a copy overlaid with every entry of `overrides`.
    #[must_use]
    pub fn extended(&self, overrides: &Self) -> Self {
        if overrides.is_empty() {
            return self.clone();
        }
        let mut next = self.0.as_ref().clone();
        next.extend(overrides.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(Arc::new(next))
    }

    /// Whether the context holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for ParsingContext {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}
