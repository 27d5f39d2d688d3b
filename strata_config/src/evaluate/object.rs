//! Object step of the evaluator: evaluate members, then reconcile them.
//!
//! Each evaluated member lands in one bucket according to the instructions in
//! its metadata:
//!
//! - kept under its key (or under the key named by `rewrite_key`);
//! - `should_flatten`: replaces the whole object;
//! - `should_merge`: deep-merged under the kept members;
//! - `should_override`: deep-merged over the kept members.
//!
//! Merge and override requests that did not resolve to an object are
//! demoted to flatten. Buckets are applied in that order regardless of where
//! the key appeared, so directive results win deterministically.

use std::sync::Arc;

use futures::future::try_join_all;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use super::{Frame, evaluate_node};
use crate::extension::Position;
use crate::merge::merge;
use crate::metadata::keys;
use crate::value::{NodeValue, ParsedValue};
use crate::{ConfigError, ConfigResult};

pub(super) async fn evaluate_object(
    map: Map<String, Value>,
    frame: Frame,
) -> ConfigResult<ParsedValue> {
    let key_count = map.len();
    let entries: Vec<(String, Value)> = map
        .iter()
        .map(|(key, item)| (key.clone(), item.clone()))
        .collect();
    let parent = Arc::new(Value::Object(map));
    let names: Vec<String> = entries.iter().map(|(key, _)| key.clone()).collect();
    let children = try_join_all(entries.into_iter().map(|(key, item)| {
        evaluate_node(item, frame.child(Position::Key(key), Arc::clone(&parent)))
    }))
    .await?;

    let mut buckets = Buckets::default();
    for (key, child) in names.into_iter().zip(children) {
        buckets.place(key, child, &frame)?;
    }
    Ok(buckets.assemble(Arc::unwrap_or_clone(parent), key_count, frame))
}

#[derive(Default)]
struct Buckets {
    kept: IndexMap<String, ParsedValue>,
    flatten: Vec<ParsedValue>,
    merging: Vec<ParsedValue>,
    overriding: Vec<ParsedValue>,
}

impl Buckets {
    fn place(&mut self, key: String, child: ParsedValue, frame: &Frame) -> ConfigResult<()> {
        let meta = child.meta();
        if meta.flag(keys::SHOULD_MERGE) {
            self.place_combined(&key, child, frame, false);
        } else if meta.flag(keys::SHOULD_OVERRIDE) {
            self.place_combined(&key, child, frame, true);
        } else if meta.flag(keys::SHOULD_FLATTEN) {
            trace!(path = %frame.path(), %key, "member flattens its parent");
            self.flatten.push(child.without_instructions());
        } else if let Some(rewrite) = meta.get(keys::REWRITE_KEY) {
            let target = match rewrite {
                Value::String(name) => name.clone(),
                other => {
                    return Err(Arc::new(ConfigError::internal(format!(
                        "rewrite key for '{key}' at {} must be a string, got {other}",
                        frame.path()
                    ))));
                }
            };
            trace!(path = %frame.path(), %key, rewritten_to = %target, "member rewrites its key");
            self.kept.insert(target, child.without_instructions());
        } else {
            self.kept.insert(key, child);
        }
        Ok(())
    }

    fn place_combined(&mut self, key: &str, member: ParsedValue, frame: &Frame, overriding: bool) {
        let child = member.without_instructions();
        if !child.is_object() {
            trace!(path = %frame.path(), %key, "non-object merge demoted to flatten");
            self.flatten.push(child);
        } else if overriding {
            self.overriding.push(child);
        } else {
            self.merging.push(child);
        }
    }

    fn assemble(self, raw: Value, key_count: usize, frame: Frame) -> ParsedValue {
        let mut flatten = self.flatten.into_iter();
        if let Some(first) = flatten.next() {
            let path = frame.path();
            if key_count > 1 {
                warn!(
                    %path,
                    discarded = key_count - 1,
                    "object was flattened; its other keys are discarded"
                );
            }
            let extra = flatten.count();
            if extra > 0 {
                warn!(
                    %path,
                    candidates = extra + 1,
                    "several members requested to flatten the same object; using the first"
                );
            }
            return first.with_meta(&frame.metadata);
        }

        let mut output = ParsedValue::from_parts(
            vec![frame.source],
            raw,
            NodeValue::Object(self.kept),
            frame.metadata,
        );
        for item in self.merging {
            output = merge(item, output);
        }
        for item in self.overriding {
            output = merge(output, item);
        }
        output
    }
}
