//! Merge algebra shared by the evaluator and layered loading.
//!
//! [`merge`] combines two evaluated trees with the right-hand side taking
//! precedence. Only two objects merge key by key; any other pairing resolves
//! to the right-hand node wholesale.
//!
//! Layers are folded left-to-right ([`merge_all`]), and that order is the
//! contract. Regrouping the fold gives the same result only while no layer
//! replaces an object with a non-object at a key where a later layer holds an
//! object again: with `a = {"x": {"p": 1}}`, `b = {"x": 5}` and
//! `c = {"x": {"q": 2}}`, `(a + b) + c` drops `p` because `b` replaced it,
//! whereas `a + (b + c)` keeps it.

use indexmap::IndexMap;
use serde_json::Value;

use crate::value::{NodeValue, ParsedValue};

/// Combine `a` and `b`, with `b` winning wherever they conflict.
///
/// - Metadata is deep-merged with `b`'s entries taking precedence.
/// - Unless both nodes are objects, the result is `b` (carrying the merged
///   metadata and only `b`'s sources).
/// - Two objects produce the union of their keys; shared keys merge
///   recursively, the raw values merge as plain JSON, and the sources are
///   `a`'s followed by `b`'s.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata_config::{LiteralSource, ParsedValue, SourceRef, merge};
///
/// let source = SourceRef::new(LiteralSource::default());
/// let a = ParsedValue::literal(json!({"k": 1, "shared": {"x": 1}}), source.clone());
/// let b = ParsedValue::literal(json!({"k": 2, "shared": {"y": 2}}), source);
/// assert_eq!(merge(a, b).to_json(), json!({"k": 2, "shared": {"x": 1, "y": 2}}));
/// ```
#[must_use]
pub fn merge(a: ParsedValue, b: ParsedValue) -> ParsedValue {
    let meta = a.meta().merged(b.meta());
    let (a_sources, mut raw, a_value, _) = a.into_parts();
    let (b_sources, b_raw, b_value, _) = b.into_parts();
    match (a_value, b_value) {
        (NodeValue::Object(a_map), NodeValue::Object(b_map)) => {
            merge_value(&mut raw, b_raw);
            let mut sources = a_sources;
            sources.extend(b_sources);
            ParsedValue::from_parts(sources, raw, NodeValue::Object(merge_maps(a_map, b_map)), meta)
        }
        (_, b_value) => ParsedValue::from_parts(b_sources, b_raw, b_value, meta),
    }
}

/// Fold `layers` left-to-right with [`merge`]; later layers win.
///
/// Equivalent to `merge(merge(a, b), c)` for `[a, b, c]`.
///
/// Returns `None` when `layers` is empty.
#[must_use]
pub fn merge_all<I>(layers: I) -> Option<ParsedValue>
where
    I: IntoIterator<Item = ParsedValue>,
{
    layers.into_iter().reduce(merge)
}

fn merge_maps(
    a_map: IndexMap<String, ParsedValue>,
    mut b_map: IndexMap<String, ParsedValue>,
) -> IndexMap<String, ParsedValue> {
    let mut merged = IndexMap::with_capacity(a_map.len() + b_map.len());
    for (key, a_child) in a_map {
        let child = match b_map.shift_remove(&key) {
            Some(b_child) => merge(a_child, b_child),
            None => a_child,
        };
        merged.insert(key, child);
    }
    merged.extend(b_map);
    merged
}

/// Overlay plain JSON `layer` onto `target`, updating `target` in place.
///
/// Behaviour:
/// - Two objects merge recursively: keys are added or overwritten and nested
///   objects are overlaid.
/// - Any other pairing replaces `target` with `layer` wholesale, so arrays are
///   never concatenated and an object never merges into a scalar.
///
/// # Examples
///
/// ```rust
/// use strata_config::merge_value;
/// use serde_json::json;
///
/// let mut acc = json!({"a": 1, "b": {"x": 1}});
/// merge_value(&mut acc, json!({"b": {"y": 2}, "c": 3}));
/// assert_eq!(acc, json!({"a": 1, "b": {"x": 1, "y": 2}, "c": 3}));
///
/// // Arrays replace existing values.
/// merge_value(&mut acc, json!({"b": [1, 2, 3]}));
/// assert_eq!(acc["b"], json!([1, 2, 3]));
/// ```
pub fn merge_value(target: &mut Value, layer: Value) {
    match (target, layer) {
        (Value::Object(target_map), Value::Object(map)) => {
            for (key, value) in map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target, layer) => *target = layer,
    }
}

#[cfg(test)]
mod tests;
