//! The evaluated configuration tree.
//!
//! A [`ParsedValue`] pairs the raw JSON found at a position with its evaluated
//! representation, per-node [`Metadata`] and the sources that produced it.

mod access;

use indexmap::IndexMap;
use serde_json::Value;

use crate::metadata::Metadata;
use crate::source::SourceRef;

/// Evaluated representation of a node.
#[derive(Clone, Debug)]
pub enum NodeValue {
    /// A JSON primitive, including `null`.
    Primitive(Value),
    /// An ordered list of evaluated children.
    Array(Vec<ParsedValue>),
    /// A mapping of evaluated children.
    Object(IndexMap<String, ParsedValue>),
}

/// One node of an evaluated configuration tree.
///
/// Nodes are built by evaluation, by [`ParsedValue::literal`] or by
/// [`crate::merge`], and are not mutated afterwards: the metadata builders
/// consume the node and return a new one.
#[derive(Clone, Debug)]
pub struct ParsedValue {
    sources: Vec<SourceRef>,
    raw: Value,
    value: NodeValue,
    meta: Metadata,
}

impl ParsedValue {
    /// Wrap plain JSON without evaluating directives, attributing every node
    /// to `source`.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use strata_config::{LiteralSource, ParsedValue, SourceRef};
    ///
    /// let source = SourceRef::new(LiteralSource::default());
    /// let node = ParsedValue::literal(json!({"port": 8080}), source);
    /// assert_eq!(node.to_json(), json!({"port": 8080}));
    /// ```
    #[must_use]
    pub fn literal(raw: Value, source: SourceRef) -> Self {
        Self::literal_with_meta(raw, source, &Metadata::new())
    }

    /// Like [`ParsedValue::literal`], tagging every node with `meta`.
    #[must_use]
    pub fn literal_with_meta(raw: Value, source: SourceRef, meta: &Metadata) -> Self {
        let value = match &raw {
            Value::Array(items) => NodeValue::Array(
                items
                    .iter()
                    .map(|item| Self::literal_with_meta(item.clone(), source.clone(), meta))
                    .collect(),
            ),
            Value::Object(map) => NodeValue::Object(
                map.iter()
                    .map(|(key, item)| {
                        (
                            key.clone(),
                            Self::literal_with_meta(item.clone(), source.clone(), meta),
                        )
                    })
                    .collect(),
            ),
            primitive => NodeValue::Primitive(primitive.clone()),
        };
        Self {
            sources: vec![source],
            raw,
            value,
            meta: meta.clone(),
        }
    }

    /// Build a node from an already evaluated representation.
    ///
    /// Extensions use this to return values they computed themselves.
    #[must_use]
    pub fn new(source: SourceRef, raw: Value, value: NodeValue) -> Self {
        Self::from_parts(vec![source], raw, value, Metadata::new())
    }

    pub(crate) fn leaf(source: SourceRef, primitive: Value, meta: Metadata) -> Self {
        Self::from_parts(
            vec![source],
            primitive.clone(),
            NodeValue::Primitive(primitive),
            meta,
        )
    }

    pub(crate) const fn from_parts(
        sources: Vec<SourceRef>,
        raw: Value,
        value: NodeValue,
        meta: Metadata,
    ) -> Self {
        Self {
            sources,
            raw,
            value,
            meta,
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<SourceRef>, Value, NodeValue, Metadata) {
        (self.sources, self.raw, self.value, self.meta)
    }

    /// Sources that produced this node, in contribution order.
    #[must_use]
    pub fn sources(&self) -> &[SourceRef] {
        &self.sources
    }

    /// The JSON found at this position before any directive was applied.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    /// The evaluated representation.
    #[must_use]
    pub const fn value(&self) -> &NodeValue {
        &self.value
    }

    /// Metadata attached to this node.
    #[must_use]
    pub const fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// Children keyed by name, if this node is an object.
    #[must_use]
    pub const fn as_object(&self) -> Option<&IndexMap<String, Self>> {
        match &self.value {
            NodeValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Ordered children, if this node is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match &self.value {
            NodeValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The primitive value, if this node is a leaf.
    #[must_use]
    pub const fn as_primitive(&self) -> Option<&Value> {
        match &self.value {
            NodeValue::Primitive(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the evaluated value is an object.
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self.value, NodeValue::Object(_))
    }

    /// Return this node with `meta` laid over its metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: &Metadata) -> Self {
        self.meta = self.meta.extended(meta);
        self
    }

    /// Return this node without the metadata entry `key`.
    #[must_use]
    pub fn without_meta(mut self, key: &str) -> Self {
        self.meta.remove(key);
        self
    }

    pub(crate) fn without_instructions(mut self) -> Self {
        if self.meta.has_instructions() {
            self.meta = self.meta.without_instructions();
        }
        self
    }

    /// Combine with `other`, which takes precedence. See [`crate::merge`].
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        crate::merge::merge(self, other)
    }
}

#[cfg(test)]
mod tests;
