//! Unit tests for the tree evaluator.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use std::time::Duration;

use anyhow::{Result, ensure};
use futures::channel::oneshot;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::{Evaluator, ParseOverrides, evaluate};
use crate::context::ParsingContext;
use crate::extension::{
    ExtensionRef, Extensions, MarkAllValues, Transform, extension_fn, key_directive, named,
};
use crate::metadata::{Metadata, keys};
use crate::source::{LiteralSource, SourceRef};
use crate::value::ParsedValue;
use crate::ConfigError;

#[fixture]
fn source() -> SourceRef {
    SourceRef::new(LiteralSource::default())
}

/// Key directive re-parsing its value with `meta`.
fn directive(name: &str, meta: Metadata) -> ExtensionRef {
    key_directive(name, move |value, input| {
        input
            .parse
            .parse_with(value, ParseOverrides::new().with_metadata(meta.clone()))
    })
}

fn flag(key: &str) -> Metadata {
    Metadata::new().with(key, true)
}

/// Key directive answering with `answer` without looking at its value.
fn constant(name: &str, answer: &'static str) -> ExtensionRef {
    key_directive(name, move |_, input| async move {
        Ok(ParsedValue::literal(json!(answer), input.source))
    })
}

#[rstest]
#[case(json!(null))]
#[case(json!("text"))]
#[case(json!([1, [2, {"three": 3}], []]))]
#[case(json!({"z": 1, "a": {"nested": [true, false]}, "m": {}}))]
#[tokio::test]
async fn literal_round_trips(source: SourceRef, #[case] raw: Value) -> Result<()> {
    let wrapped = ParsedValue::literal(raw.clone(), source.clone());
    let tree = evaluate(wrapped.to_json(), source, Extensions::default()).await?;
    ensure!(tree.to_json() == raw, "round trip changed {raw}");
    ensure!(tree.raw() == &raw);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn preserves_source_key_order(source: SourceRef) -> Result<()> {
    let raw = json!({"zeta": 1, "alpha": 2, "mid": {"y": 1, "b": 2}});
    let tree = evaluate(raw, source, Extensions::default()).await?;
    let keys: Vec<&String> = tree.as_object().map(|m| m.keys().collect()).unwrap_or_default();
    ensure!(keys == ["zeta", "alpha", "mid"], "unexpected order {keys:?}");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn first_registered_extension_wins(source: SourceRef) -> Result<()> {
    let extensions = vec![constant("$dup", "first"), constant("$dup", "second")];
    for _ in 0..5 {
        let tree = evaluate(json!({"$dup": null}), source.clone(), extensions.clone()).await?;
        ensure!(tree.to_json() == json!({"$dup": "first"}));
    }
    Ok(())
}

#[rstest]
#[tokio::test]
async fn skipped_branches_never_run_their_extensions(source: SourceRef) -> Result<()> {
    let tripped = Arc::new(AtomicBool::new(false));
    let tripwire = {
        let tripped = Arc::clone(&tripped);
        extension_fn(move |_, position, _, _| {
            if !position.is_key("$y") {
                return None;
            }
            tripped.store(true, Ordering::SeqCst);
            Some(Transform::new(|_| async {
                Err(ConfigError::extension("$y", "skipped branch was evaluated"))
            }))
        })
    };
    let pick = key_directive("$pick", |value, input| {
        let chosen = value.get("a").cloned().unwrap_or(Value::Null);
        input
            .parse
            .parse_with(chosen, ParseOverrides::new().with_metadata(flag(keys::SHOULD_FLATTEN)))
    });
    let raw = json!({"$pick": {"a": {"$x": 1}, "b": {"$y": 2}}});
    let extensions = vec![pick, directive("$x", flag(keys::SHOULD_FLATTEN)), tripwire];
    let tree = evaluate(raw, source, extensions).await?;
    ensure!(tree.to_json() == json!(1), "got {}", tree.to_json());
    ensure!(!tripped.load(Ordering::SeqCst), "tripwire extension ran");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn flatten_replaces_parent(source: SourceRef) -> Result<()> {
    let raw = json!({"foo": {"$flattenTest": "bar"}});
    let extensions = vec![directive("$flattenTest", flag(keys::SHOULD_FLATTEN))];
    let tree = evaluate(raw, source, extensions).await?;
    ensure!(tree.to_json() == json!({"foo": "bar"}));
    let foo = tree.property(["foo"]).map(ParsedValue::meta);
    ensure!(
        foo.is_some_and(|meta| !meta.flag(keys::SHOULD_FLATTEN)),
        "flatten instruction leaked: {foo:?}"
    );
    Ok(())
}

#[rstest]
fn flatten_wins_over_merge_with_warning(source: SourceRef) -> Result<()> {
    let raw = json!({"$merge": {"x": 1}, "$flatten": 5});
    let extensions = vec![
        constant_json("$merge", json!({"x": 1}), keys::SHOULD_MERGE),
        constant_json("$flatten", json!(5), keys::SHOULD_FLATTEN),
    ];
    let (tree, logs) = test_helpers::logs::capture(|| {
        futures::executor::block_on(evaluate(raw, source, extensions))
    });
    let value = tree?.to_json();
    ensure!(value == json!(5), "got {value}");
    ensure!(logs.contains("WARN"), "expected a warning, got {logs}");
    ensure!(logs.contains("other keys are discarded"), "logs: {logs}");
    Ok(())
}

/// Key directive answering with `answer` tagged with the instruction `key`.
fn constant_json(name: &str, answer: Value, key: &'static str) -> ExtensionRef {
    key_directive(name, move |_, input| {
        input
            .parse
            .parse_with(answer.clone(), ParseOverrides::new().with_metadata(flag(key)))
    })
}

#[rstest]
fn competing_flattens_take_the_first(source: SourceRef) -> Result<()> {
    let raw = json!({"$one": "a", "$two": "b"});
    let extensions = vec![
        directive("$one", flag(keys::SHOULD_FLATTEN)),
        directive("$two", flag(keys::SHOULD_FLATTEN)),
    ];
    let (tree, logs) = test_helpers::logs::capture(|| {
        futures::executor::block_on(evaluate(raw, source, extensions))
    });
    ensure!(tree?.to_json() == json!("a"));
    ensure!(logs.contains("several members requested to flatten"), "logs: {logs}");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn rewrite_key_moves_member(source: SourceRef) -> Result<()> {
    let rename = directive("orig", Metadata::new().with(keys::REWRITE_KEY, "renamed"));
    let tree = evaluate(json!({"orig": 1, "other": 2}), source, vec![rename]).await?;
    ensure!(tree.to_json() == json!({"renamed": 1, "other": 2}));
    ensure!(tree.as_object().is_some_and(|m| !m.contains_key("orig")));
    let renamed = tree.as_object().and_then(|m| m.get("renamed"));
    ensure!(renamed.is_some_and(|node| node.meta().get(keys::REWRITE_KEY).is_none()));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn non_string_rewrite_key_is_internal_error(source: SourceRef) -> Result<()> {
    let broken = directive("orig", Metadata::new().with(keys::REWRITE_KEY, 42));
    let Err(err) = evaluate(json!({"orig": 1}), source, vec![broken]).await else {
        anyhow::bail!("non-string rewrite key was accepted");
    };
    ensure!(
        matches!(err.as_ref(), ConfigError::Internal { .. }),
        "got {err:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn merge_bucket_sits_under_siblings(source: SourceRef) -> Result<()> {
    let raw = json!({"$defaults": {"port": 1, "host": "d"}, "port": 2});
    let extensions = vec![directive("$defaults", flag(keys::SHOULD_MERGE))];
    let tree = evaluate(raw, source, extensions).await?;
    ensure!(tree.to_json() == json!({"port": 2, "host": "d"}), "got {}", tree.to_json());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn override_bucket_sits_over_siblings(source: SourceRef) -> Result<()> {
    let raw = json!({"port": 2, "$force": {"port": 9}, "host": "h"});
    let extensions = vec![directive("$force", flag(keys::SHOULD_OVERRIDE))];
    let tree = evaluate(raw, source, extensions).await?;
    ensure!(tree.to_json() == json!({"port": 9, "host": "h"}), "got {}", tree.to_json());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn override_beats_merge_whatever_the_key_order(source: SourceRef) -> Result<()> {
    let raw = json!({"$force": {"v": "override"}, "v": "own", "$defaults": {"v": "merge"}});
    let extensions = vec![
        directive("$defaults", flag(keys::SHOULD_MERGE)),
        directive("$force", flag(keys::SHOULD_OVERRIDE)),
    ];
    let tree = evaluate(raw, source, extensions).await?;
    ensure!(tree.to_json() == json!({"v": "override"}));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn merge_flag_wins_when_override_is_also_set(source: SourceRef) -> Result<()> {
    let both = Metadata::new()
        .with(keys::SHOULD_OVERRIDE, true)
        .with(keys::SHOULD_MERGE, true);
    let raw = json!({"$both": {"v": "directive", "extra": 1}, "v": "own"});
    let tree = evaluate(raw, source, vec![directive("$both", both)]).await?;
    ensure!(
        tree.to_json() == json!({"v": "own", "extra": 1}),
        "got {}",
        tree.to_json()
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn sibling_directives_keep_source_order(source: SourceRef) -> Result<()> {
    let (sender, receiver) = oneshot::channel::<Value>();
    let receiver = Arc::new(Mutex::new(Some(receiver)));
    let sender = Arc::new(Mutex::new(Some(sender)));
    // `$wait` comes first and only finishes once `$send` has run.
    let wait = key_directive("$wait", move |_, input| {
        let pending = receiver.lock().ok().and_then(|mut slot| slot.take());
        async move {
            let Some(pending) = pending else {
                return Err(ConfigError::extension("$wait", "receiver already taken"));
            };
            let value = pending
                .await
                .map_err(|_| ConfigError::extension("$wait", "sender dropped"))?;
            Ok(ParsedValue::literal(value, input.source))
        }
    });
    let send = key_directive("$send", move |_, input| {
        let pending = sender.lock().ok().and_then(|mut slot| slot.take());
        async move {
            let Some(pending) = pending else {
                return Err(ConfigError::extension("$send", "sender already taken"));
            };
            pending
                .send(json!("released"))
                .map_err(|_| ConfigError::extension("$send", "receiver dropped"))?;
            Ok(ParsedValue::literal(json!("sent"), input.source))
        }
    });

    let raw = json!({"$wait": null, "$send": null});
    let tree = tokio::time::timeout(
        Duration::from_secs(5),
        evaluate(raw, source, vec![wait, send]),
    )
    .await??;
    let keys: Vec<&String> = tree.as_object().map(|m| m.keys().collect()).unwrap_or_default();
    ensure!(keys == ["$wait", "$send"], "unexpected order {keys:?}");
    ensure!(tree.to_json() == json!({"$wait": "released", "$send": "sent"}));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn non_object_merge_is_demoted_to_flatten(source: SourceRef) -> Result<()> {
    let raw = json!({"$defaults": 3, "a": 1});
    let extensions = vec![directive("$defaults", flag(keys::SHOULD_MERGE))];
    let tree = evaluate(raw, source, extensions).await?;
    ensure!(tree.to_json() == json!(3));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn self_reparsing_extension_terminates(source: SourceRef) -> Result<()> {
    let raw = json!({"a": [1, {"b": "c"}]});
    let tree = evaluate(raw.clone(), source, vec![
        Arc::new(MarkAllValues::secrets()) as ExtensionRef,
    ])
    .await?;
    ensure!(tree.to_json() == raw);
    ensure!(!tree.meta().flag(keys::FROM_SECRETS), "root must stay unmarked");
    let mut unmarked = 0_usize;
    tree.visit_entries(|path, node| {
        if path.len() > 1 && !node.meta().flag(keys::FROM_SECRETS) {
            unmarked += 1;
        }
    });
    ensure!(unmarked == 0, "{unmarked} nodes were not marked");
    Ok(())
}

fn counting(hits: &Arc<AtomicUsize>) -> ExtensionRef {
    let hits = Arc::clone(hits);
    extension_fn(move |value, _, _, _| {
        hits.fetch_add(1, Ordering::SeqCst);
        let value = value.clone();
        Some(Transform::new(move |input| input.parse.parse(value)))
    })
}

#[rstest]
#[case::shared_identity(true, 0)]
#[case::anonymous(false, 1)]
#[tokio::test]
async fn identity_deduplicates_instances(
    source: SourceRef,
    #[case] share_identity: bool,
    #[case] expected_second: usize,
) -> Result<()> {
    let first_hits = Arc::new(AtomicUsize::new(0));
    let second_hits = Arc::new(AtomicUsize::new(0));
    let (first, second) = if share_identity {
        (
            named("marker", counting(&first_hits)),
            named("marker", counting(&second_hits)),
        )
    } else {
        (counting(&first_hits), counting(&second_hits))
    };
    let tree = evaluate(json!("leaf"), source, vec![first, second]).await?;
    ensure!(tree.to_json() == json!("leaf"));
    ensure!(first_hits.load(Ordering::SeqCst) == 1);
    ensure!(second_hits.load(Ordering::SeqCst) == expected_second);
    Ok(())
}

fn profile_lookup() -> ExtensionRef {
    extension_fn(|value, _, _, context| {
        if value.as_str()? != "${profile}" {
            return None;
        }
        let resolved = context.get("profile")?.clone();
        Some(Transform::new(move |input| async move {
            Ok(ParsedValue::literal(resolved, input.source))
        }))
    })
}

#[rstest]
#[tokio::test]
async fn context_flows_down_but_not_across(source: SourceRef) -> Result<()> {
    let scope = key_directive("$scope", |value, input| {
        let overrides = ParseOverrides::new()
            .with_metadata(flag(keys::SHOULD_FLATTEN))
            .with_context(ParsingContext::new().with("profile", "inner"));
        input.parse.parse_with(value, overrides)
    });
    let raw = json!({"a": {"$scope": {"x": "${profile}"}}, "b": "${profile}"});
    let tree = Evaluator::new()
        .with_extensions(vec![scope, profile_lookup()])
        .with_context(ParsingContext::new().with("profile", "outer"))
        .evaluate(raw, source)
        .await?;
    ensure!(
        tree.to_json() == json!({"a": {"x": "inner"}, "b": "outer"}),
        "got {}",
        tree.to_json()
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn extension_errors_propagate_unchanged(source: SourceRef) -> Result<()> {
    let fail = key_directive("$fail", |_, _| async {
        Err(ConfigError::extension("$fail", "boom"))
    });
    let raw = json!({"ok": 1, "list": [0, {"$fail": true}]});
    let outcome = evaluate(raw, source, vec![fail]).await;
    let Err(err) = outcome else {
        anyhow::bail!("expected failure");
    };
    ensure!(
        matches!(err.as_ref(), ConfigError::Extension { name, .. } if name == "$fail"),
        "got {err:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn transforms_see_their_surroundings(source: SourceRef) -> Result<()> {
    let probe = key_directive("$where", |_, input| async move {
        let parent_keys: Vec<String> = input
            .parent
            .as_deref()
            .and_then(Value::as_object)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        let report = json!({
            "path": input.parse.path(),
            "parent": parent_keys,
            "root_has_list": input.root.get("list").is_some(),
        });
        Ok(ParsedValue::literal(report, input.source))
    });
    let raw = json!({"list": [{"$where": null, "sibling": 1}]});
    let tree = evaluate(raw, source, vec![probe]).await?;
    let report = tree.select("#/list/0/$where").map(ParsedValue::to_json);
    ensure!(
        report
            == Some(json!({
                "path": "#/list/0/$where",
                "parent": ["$where", "sibling"],
                "root_has_list": true,
            })),
        "got {report:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn parse_overrides_replace_the_source(source: SourceRef) -> Result<()> {
    let other = SourceRef::new(LiteralSource::default());
    let attributed = other.clone();
    let reattribute = key_directive("$from", move |value, input| {
        input
            .parse
            .parse_with(value, ParseOverrides::new().with_source(attributed.clone()))
    });
    let tree = evaluate(json!({"$from": {"k": 1}}), source.clone(), vec![reattribute]).await?;
    let child = tree.select("#/$from/k");
    ensure!(child.is_some_and(|node| node.sources() == [other.clone()]));
    ensure!(tree.sources() == [source]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn root_metadata_is_attached(source: SourceRef) -> Result<()> {
    let tree = Evaluator::new()
        .with_metadata(flag("root"))
        .evaluate(json!({"a": 1}), source)
        .await?;
    ensure!(tree.meta().flag("root"));
    ensure!(tree.property(["a"]).is_some_and(|a| !a.meta().flag("root")));
    Ok(())
}
