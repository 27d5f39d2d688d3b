//! Navigation, traversal and export for [`ParsedValue`] trees.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{NodeValue, ParsedValue};
use crate::extension::Position;
use crate::source::SourceRef;
use crate::{ConfigError, ConfigResult};

impl ParsedValue {
    /// Navigate nested keys (or array indices written as numbers).
    ///
    /// Empty segments are skipped. Traversal stops at the first segment the
    /// current container does not hold and returns that container: asking
    /// for `["a", "z"]` when `a` exists but has no `z` yields the node at `a`.
    /// Schema selection by pointer relies on this partial match, so it is
    /// intended rather than a not-found condition.
    ///
    /// Stepping into a primitive with segments remaining yields `None`. A
    /// missing key means "this container has nothing more specific", while a
    /// primitive cannot hold the requested path at all; returning the
    /// primitive would let a lookup for `a.b.c.d` silently read the value of
    /// `a.b.c` as if it were the answer.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use strata_config::{LiteralSource, ParsedValue, SourceRef};
    ///
    /// let tree = ParsedValue::literal(
    ///     json!({"a": {"b": {"c": true}}}),
    ///     SourceRef::new(LiteralSource::default()),
    /// );
    /// let leaf = tree.property(["a", "b", "c"]).and_then(|n| n.as_primitive());
    /// assert_eq!(leaf, Some(&json!(true)));
    /// let partial = tree.property(["a", "z"]).map(|n| n.to_json());
    /// assert_eq!(partial, Some(json!({"b": {"c": true}})));
    /// assert!(tree.property(["a", "b", "c", "d"]).is_none());
    /// ```
    #[must_use]
    pub fn property<I, S>(&self, path: I) -> Option<&Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = self;
        for segment in path {
            let name = segment.as_ref();
            if name.is_empty() {
                continue;
            }
            let next = match &current.value {
                NodeValue::Object(map) => map.get(name),
                NodeValue::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i)),
                NodeValue::Primitive(_) => return None,
            };
            let Some(child) = next else {
                return Some(current);
            };
            current = child;
        }
        Some(current)
    }

    /// Look up a node by a JSON-pointer-like reference such as `#/a/b`.
    ///
    /// The leading `#` is optional and `~1`/`~0` decode to `/` and `~`.
    /// Resolution follows [`ParsedValue::property`].
    #[must_use]
    pub fn select(&self, pointer: &str) -> Option<&Self> {
        let trimmed = pointer.strip_prefix('#').unwrap_or(pointer);
        self.property(
            trimmed
                .split('/')
                .map(|segment| segment.replace("~1", "/").replace("~0", "~")),
        )
    }

    /// Depth-first pre-order traversal: the node itself, then its children
    /// in key or index order.
    pub fn visit_all<F>(&self, mut visitor: F)
    where
        F: FnMut(&Self),
    {
        self.visit_entries(|_, node| visitor(node));
    }

    /// Like [`ParsedValue::visit_all`], also passing the position path of
    /// each node (starting with [`Position::Root`]).
    pub fn visit_entries<F>(&self, mut visitor: F)
    where
        F: FnMut(&[Position], &Self),
    {
        let mut path = vec![Position::Root];
        self.walk(&mut path, &mut visitor);
    }

    fn walk(&self, path: &mut Vec<Position>, visitor: &mut dyn FnMut(&[Position], &Self)) {
        visitor(path.as_slice(), self);
        match &self.value {
            NodeValue::Object(map) => {
                for (key, child) in map {
                    path.push(Position::Key(key.clone()));
                    child.walk(path, visitor);
                    path.pop();
                }
            }
            NodeValue::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    path.push(Position::Index(index));
                    child.walk(path, visitor);
                    path.pop();
                }
            }
            NodeValue::Primitive(_) => {}
        }
    }

    /// Rebuild the tree keeping only the nodes for which `predicate` holds.
    ///
    /// Removed keys and elements are pruned from `raw` as well, so a filtered
    /// export cannot leak through introspection.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Internal`] when `predicate` rejects the node the
    /// clone was requested on.
    pub fn clone_where<P>(&self, predicate: P) -> ConfigResult<Self>
    where
        P: Fn(&Self) -> bool,
    {
        if !predicate(self) {
            return Err(Arc::new(ConfigError::internal(
                "clone_where cannot filter out the node it was called on",
            )));
        }
        Ok(self.clone_filtered(&predicate))
    }

    fn clone_filtered(&self, predicate: &dyn Fn(&Self) -> bool) -> Self {
        let mut raw = self.raw.clone();
        let value = match &self.value {
            NodeValue::Object(map) => {
                let mut kept = IndexMap::with_capacity(map.len());
                for (key, child) in map {
                    if predicate(child) {
                        kept.insert(key.clone(), child.clone_filtered(predicate));
                    } else if let Value::Object(raw_map) = &mut raw {
                        raw_map.shift_remove(key);
                    }
                }
                NodeValue::Object(kept)
            }
            NodeValue::Array(items) => {
                let mask: Vec<bool> = items.iter().map(predicate).collect();
                if let Value::Array(raw_items) = &mut raw
                    && raw_items.len() == mask.len()
                {
                    let mut keep = mask.iter();
                    raw_items.retain(|_| keep.next().copied().unwrap_or(false));
                }
                NodeValue::Array(
                    items
                        .iter()
                        .zip(&mask)
                        .filter(|(_, keep)| **keep)
                        .map(|(child, _)| child.clone_filtered(predicate))
                        .collect(),
                )
            }
            NodeValue::Primitive(value) => NodeValue::Primitive(value.clone()),
        };
        Self::from_parts(self.sources.clone(), raw, value, self.meta.clone())
    }

    /// Strip the wrapper, producing plain JSON. Metadata is dropped.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match &self.value {
            NodeValue::Primitive(value) => value.clone(),
            NodeValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            NodeValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, child)| (key.clone(), child.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// Every source that contributed anywhere in this subtree, first-seen
    /// order, without duplicates.
    #[must_use]
    pub fn all_sources(&self) -> Vec<SourceRef> {
        let mut seen: Vec<SourceRef> = Vec::new();
        self.visit_all(|node| {
            for source in &node.sources {
                if !seen.iter().any(|known| known.same_as(source)) {
                    seen.push(source.clone());
                }
            }
        });
        seen
    }
}
