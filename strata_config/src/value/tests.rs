//! Unit tests for navigation, traversal and filtering of evaluated trees.

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::ParsedValue;
use crate::extension::{Position, render_path};
use crate::metadata::{Metadata, keys};
use crate::source::{LiteralSource, SourceRef};
use crate::ConfigError;

#[fixture]
fn tree() -> ParsedValue {
    ParsedValue::literal(
        json!({"a": {"b": {"c": true}}, "list": [10, {"deep": "x"}], "a/b": 1, "t~": 2}),
        SourceRef::new(LiteralSource::default()),
    )
}

#[rstest]
fn literal_keeps_raw_and_evaluated_in_step(tree: ParsedValue) {
    assert_eq!(tree.to_json(), tree.raw().clone());
    assert!(tree.is_object());
    assert!(tree.meta().is_empty());
}

#[rstest]
#[case(&["a", "b", "c"], Some(json!(true)))]
#[case(&["a", "z"], Some(json!({"b": {"c": true}})))]
#[case(&["", "a", "", "b"], Some(json!({"c": true})))]
#[case(&["list", "1", "deep"], Some(json!("x")))]
#[case(&["list", "7"], Some(json!([10, {"deep": "x"}])))]
#[case(&["a", "b", "c", "d"], None)]
#[case(&[], Some(json!({"a": {"b": {"c": true}}, "list": [10, {"deep": "x"}], "a/b": 1, "t~": 2})))]
fn property_navigates(tree: ParsedValue, #[case] path: &[&str], #[case] expected: Option<Value>) {
    assert_eq!(tree.property(path).map(ParsedValue::to_json), expected);
}

#[rstest]
#[case("#/a/b", json!({"c": true}))]
#[case("a/b/c", json!(true))]
#[case("#/a~1b", json!(1))]
#[case("#/t~0", json!(2))]
#[case("#", json!({"a": {"b": {"c": true}}, "list": [10, {"deep": "x"}], "a/b": 1, "t~": 2}))]
fn select_decodes_pointers(tree: ParsedValue, #[case] pointer: &str, #[case] expected: Value) {
    assert_eq!(tree.select(pointer).map(ParsedValue::to_json), Some(expected));
}

#[rstest]
fn visits_depth_first_pre_order(tree: ParsedValue) {
    let mut paths = Vec::new();
    tree.visit_entries(|path, _| paths.push(render_path(path)));
    assert_eq!(
        paths,
        [
            "#",
            "#/a",
            "#/a/b",
            "#/a/b/c",
            "#/list",
            "#/list/0",
            "#/list/1",
            "#/list/1/deep",
            "#/a/b",
            "#/t~",
        ]
    );
}

#[rstest]
fn visit_all_sees_every_node(tree: ParsedValue) {
    let mut count = 0_usize;
    tree.visit_all(|_| count += 1);
    assert_eq!(count, 10);
}

#[rstest]
fn visit_entries_starts_at_root(tree: ParsedValue) {
    let mut first = None;
    tree.visit_entries(|path, _| {
        if first.is_none() {
            first = Some(path.to_vec());
        }
    });
    assert_eq!(first, Some(vec![Position::Root]));
}

fn secret_free(node: &ParsedValue) -> bool {
    !node.meta().flag(keys::FROM_SECRETS)
}

#[test]
fn clone_where_prunes_raw_too() {
    let source = SourceRef::new(LiteralSource::default());
    let secret = Metadata::new().with(keys::FROM_SECRETS, true);
    let plain = ParsedValue::literal(json!({"base": true, "list": [1]}), source.clone());
    let hidden = ParsedValue::literal_with_meta(
        json!({"token": "s3cr3t", "list": [2]}),
        source,
        &secret,
    )
    .without_meta(keys::FROM_SECRETS);
    let merged = plain.merge(hidden);
    let Ok(filtered) = merged.clone_where(secret_free) else {
        panic!("root is not a secret");
    };
    assert_eq!(filtered.to_json(), json!({"base": true}));
    assert_eq!(filtered.raw(), &json!({"base": true}));
}

#[test]
fn clone_where_filters_array_elements() {
    let source = SourceRef::new(LiteralSource::default());
    let marked = Metadata::new().with("drop", true);
    let raw = json!([1, 2, 3]);
    let items = vec![
        ParsedValue::literal(json!(1), source.clone()),
        ParsedValue::literal_with_meta(json!(2), source.clone(), &marked),
        ParsedValue::literal(json!(3), source.clone()),
    ];
    let list = ParsedValue::new(source, raw, super::NodeValue::Array(items));
    let Ok(filtered) = list.clone_where(|node| !node.meta().flag("drop")) else {
        panic!("root should be kept");
    };
    assert_eq!(filtered.to_json(), json!([1, 3]));
    assert_eq!(filtered.raw(), &json!([1, 3]));
}

#[rstest]
fn clone_where_rejecting_root_is_an_error(tree: ParsedValue) {
    let Err(err) = tree.clone_where(|_| false) else {
        panic!("expected an error");
    };
    assert!(matches!(*err, ConfigError::Internal { .. }), "got {err:?}");
}

#[test]
fn all_sources_deduplicates_in_first_seen_order() {
    let first = SourceRef::new(LiteralSource::default());
    let second = SourceRef::new(LiteralSource::default());
    let merged = ParsedValue::literal(json!({"a": 1}), first.clone())
        .merge(ParsedValue::literal(json!({"b": {"c": 2}}), second.clone()))
        .merge(ParsedValue::literal(json!({"a": 3}), first.clone()));
    assert_eq!(merged.all_sources(), [first, second]);
}

#[test]
fn metadata_builders_return_new_nodes() {
    let source = SourceRef::new(LiteralSource::default());
    let node = ParsedValue::literal(json!(1), source)
        .with_meta(&Metadata::new().with("a", 1).with("b", 2))
        .without_meta("a");
    assert!(node.meta().get("a").is_none());
    assert_eq!(node.meta().get("b"), Some(&json!(2)));
}
