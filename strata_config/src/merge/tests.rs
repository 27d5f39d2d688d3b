//! Unit tests for the merge algebra.

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::{merge, merge_all, merge_value};
use crate::metadata::Metadata;
use crate::source::{LiteralSource, SourceRef};
use crate::value::ParsedValue;

#[fixture]
fn source() -> SourceRef {
    SourceRef::new(LiteralSource::default())
}

fn node(raw: Value, source: &SourceRef) -> ParsedValue {
    ParsedValue::literal(raw, source.clone())
}

#[rstest]
fn later_layer_wins_and_objects_union(source: SourceRef) {
    let a = node(json!({"k": 1, "shared": {"x": 1}}), &source);
    let b = node(json!({"k": 2, "shared": {"y": 2}}), &source);
    let merged = merge(a, b);
    assert_eq!(merged.to_json(), json!({"k": 2, "shared": {"x": 1, "y": 2}}));
    assert_eq!(merged.raw(), &json!({"k": 2, "shared": {"x": 1, "y": 2}}));
}

#[rstest]
fn keeps_left_key_order_then_appends(source: SourceRef) {
    let a = node(json!({"z": 1, "a": 1}), &source);
    let b = node(json!({"b": 2, "z": 2}), &source);
    let merged = merge(a, b);
    let keys: Vec<&str> = merged
        .as_object()
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default();
    assert_eq!(keys, ["z", "a", "b"]);
}

#[rstest]
#[case(json!(1), json!({"a": 1}))]
#[case(json!({"a": 1}), json!([1, 2]))]
#[case(json!([1]), json!([2, 3]))]
#[case(json!({"a": 1}), json!(null))]
fn non_object_pairing_resolves_to_right(source: SourceRef, #[case] left: Value, #[case] right: Value) {
    let other = SourceRef::new(LiteralSource::default());
    let merged = merge(node(left, &source), node(right.clone(), &other));
    assert_eq!(merged.to_json(), right);
    assert_eq!(merged.sources(), [other]);
}

#[rstest]
fn object_sources_concatenate(source: SourceRef) {
    let other = SourceRef::new(LiteralSource::default());
    let merged = merge(node(json!({"a": 1}), &source), node(json!({"b": 2}), &other));
    assert_eq!(merged.sources(), [source, other]);
}

#[rstest]
fn metadata_merges_deeply_with_right_precedence(source: SourceRef) {
    let a = ParsedValue::literal_with_meta(
        json!(1),
        source.clone(),
        &Metadata::new().with("tags", json!({"a": true, "c": 1})),
    );
    let b = ParsedValue::literal_with_meta(
        json!(2),
        source,
        &Metadata::new().with("tags", json!({"b": true, "c": 2})),
    );
    let merged = merge(a, b);
    assert_eq!(
        merged.meta().get("tags"),
        Some(&json!({"a": true, "c": 2, "b": true}))
    );
}

#[rstest]
#[case::objects_and_scalars(
    json!({"a": {"x": 1}, "list": [1], "s": "one"}),
    json!({"a": {"y": 2}, "list": [2, 3], "s": {"nested": true}}),
    json!({"a": {"x": 3}, "s": "three"}),
)]
#[case::scalar_middle_layer(
    json!({"x": {"p": 1}}),
    json!({"x": 5}),
    json!({"x": {"q": 2}}),
)]
fn merge_all_is_the_left_fold(
    source: SourceRef,
    #[case] first: Value,
    #[case] second: Value,
    #[case] third: Value,
) {
    let [a, b, c] = [first, second, third].map(|raw| node(raw, &source));
    let left = merge(merge(a.clone(), b.clone()), c.clone());
    let Some(folded) = merge_all([a, b, c]) else {
        panic!("three layers fold to a value");
    };
    assert_eq!(folded.to_json(), left.to_json());
    assert_eq!(folded.raw(), left.raw());
}

#[rstest]
fn grouping_is_irrelevant_without_scalar_replacement(source: SourceRef) {
    let layers = [
        json!({"a": {"x": 1}, "list": [1], "s": "one"}),
        json!({"a": {"y": 2}, "list": [2, 3], "s": {"nested": true}}),
        json!({"a": {"x": 3}, "s": "three"}),
    ];
    let [a, b, c] = layers.map(|raw| node(raw, &source));
    let left = merge(merge(a.clone(), b.clone()), c.clone());
    let right = merge(a, merge(b, c));
    assert_eq!(left.to_json(), right.to_json());
    assert_eq!(left.raw(), right.raw());
}

#[rstest]
fn scalar_middle_layer_makes_grouping_matter(source: SourceRef) {
    let [a, b, c] = [
        json!({"x": {"p": 1}}),
        json!({"x": 5}),
        json!({"x": {"q": 2}}),
    ]
    .map(|raw| node(raw, &source));
    let left = merge(merge(a.clone(), b.clone()), c.clone());
    let right = merge(a, merge(b, c));
    assert_eq!(left.to_json(), json!({"x": {"q": 2}}));
    assert_eq!(right.to_json(), json!({"x": {"p": 1, "q": 2}}));
}

#[rstest]
fn merge_all_folds_in_order(source: SourceRef) {
    let merged = merge_all([
        node(json!({"port": 1}), &source),
        node(json!({"port": 2, "host": "a"}), &source),
        node(json!({"host": "b"}), &source),
    ]);
    assert_eq!(
        merged.map(|tree| tree.to_json()),
        Some(json!({"port": 2, "host": "b"}))
    );
    assert!(merge_all(Vec::new()).is_none());
}

#[test]
fn merge_value_replaces_arrays_and_scalars() {
    let mut target = json!({"list": [1, 2], "obj": {"a": 1}, "scalar": 1});
    merge_value(
        &mut target,
        json!({"list": [3], "obj": {"b": 2}, "scalar": {"now": "object"}}),
    );
    assert_eq!(
        target,
        json!({"list": [3], "obj": {"a": 1, "b": 2}, "scalar": {"now": "object"}})
    );
}
