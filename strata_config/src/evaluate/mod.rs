//! The tree evaluator.
//!
//! Evaluation is top-down: at every node the registered extensions are tried
//! in order before any child is looked at, so a directive can decide which
//! branches get evaluated at all. Without a matching extension, arrays and
//! objects recurse into their children concurrently and primitives become
//! leaves.

mod object;

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use serde_json::Value;
use tracing::debug;

use crate::context::ParsingContext;
use crate::extension::{
    ExtensionRef, Extensions, Position, Transform, TransformInput, render_path,
};
use crate::merge::merge_all;
use crate::metadata::Metadata;
use crate::source::SourceRef;
use crate::value::{NodeValue, ParsedValue};
use crate::{ConfigError, ConfigResult};

/// Extensions that already matched along the current re-entry chain.
///
/// Never mutated in place: matching an extension produces an extended copy
/// for the transform's `parse` calls, and children start from an empty set.
#[derive(Clone, Default)]
struct Visited(Arc<Vec<ExtensionRef>>);

impl Visited {
    fn contains(&self, candidate: &ExtensionRef) -> bool {
        self.0.iter().any(|seen| {
            Arc::ptr_eq(seen, candidate)
                || matches!(
                    (seen.identity(), candidate.identity()),
                    (Some(a), Some(b)) if a == b
                )
        })
    }

    fn with(&self, extension: &ExtensionRef) -> Self {
        let mut next = self.0.as_ref().clone();
        next.push(Arc::clone(extension));
        Self(Arc::new(next))
    }
}

/// State of one call into the evaluator.
#[derive(Clone)]
struct Frame {
    source: SourceRef,
    extensions: Extensions,
    metadata: Metadata,
    context: ParsingContext,
    positions: Vec<Position>,
    root: Arc<Value>,
    parent: Option<Arc<Value>>,
    visited: Visited,
}

impl Frame {
    /// Frame for a child at `position` inside `parent`.
    fn child(&self, position: Position, parent: Arc<Value>) -> Self {
        let mut positions = self.positions.clone();
        positions.push(position);
        Self {
            source: self.source.clone(),
            extensions: self.extensions.clone(),
            metadata: Metadata::new(),
            context: self.context.clone(),
            positions,
            root: Arc::clone(&self.root),
            parent: Some(parent),
            visited: Visited::default(),
        }
    }

    fn path(&self) -> String {
        render_path(&self.positions)
    }

    fn find_transform(&self, value: &Value) -> Option<(ExtensionRef, Transform)> {
        let (current, ancestors) = self.positions.split_last()?;
        self.extensions
            .iter()
            .filter(|extension| !self.visited.contains(extension))
            .find_map(|extension| {
                extension
                    .applies(value, current, ancestors, &self.context)
                    .map(|transform| (Arc::clone(extension), transform))
            })
    }
}

fn evaluate_node(value: Value, frame: Frame) -> BoxFuture<'static, ConfigResult<ParsedValue>> {
    async move {
        if let Some((extension, transform)) = frame.find_transform(&value) {
            debug!(
                path = %frame.path(),
                extension = extension.identity().unwrap_or("<anonymous>"),
                "extension matched"
            );
            let visited = frame.visited.with(&extension);
            let input = TransformInput {
                parent: frame.parent.clone(),
                source: frame.source.clone(),
                extensions: frame.extensions.clone(),
                root: Arc::clone(&frame.root),
                parse: Parser {
                    frame: Frame { visited, ..frame },
                },
            };
            return transform.run(input).await;
        }
        match value {
            Value::Array(items) => evaluate_array(items, frame).await,
            Value::Object(map) => object::evaluate_object(map, frame).await,
            primitive => Ok(ParsedValue::leaf(frame.source, primitive, frame.metadata)),
        }
    }
    .boxed()
}

async fn evaluate_array(items: Vec<Value>, frame: Frame) -> ConfigResult<ParsedValue> {
    let parent = Arc::new(Value::Array(items.clone()));
    let children = try_join_all(items.into_iter().enumerate().map(|(index, item)| {
        evaluate_node(
            item,
            frame.child(Position::Index(index), Arc::clone(&parent)),
        )
    }))
    .await?;
    Ok(ParsedValue::from_parts(
        vec![frame.source],
        Arc::unwrap_or_clone(parent),
        NodeValue::Array(children),
        frame.metadata,
    ))
}

/// Re-entry into the evaluator handed to a [`crate::Transform`].
///
/// Parsing through it evaluates a replacement value at the position where the
/// extension matched, with the same parent and root, and with that extension
/// excluded so it cannot match its own output again.
#[derive(Clone)]
pub struct Parser {
    frame: Frame,
}

impl Parser {
    /// Evaluate `value` with the current settings.
    pub fn parse(&self, value: Value) -> BoxFuture<'static, ConfigResult<ParsedValue>> {
        self.parse_with(value, ParseOverrides::default())
    }

    /// Evaluate `value`, overriding some of the current settings.
    ///
    /// Metadata and context overrides are laid over the current ones; source
    /// and extension overrides replace them.
    pub fn parse_with(
        &self,
        value: Value,
        overrides: ParseOverrides,
    ) -> BoxFuture<'static, ConfigResult<ParsedValue>> {
        let mut frame = self.frame.clone();
        if let Some(metadata) = overrides.metadata {
            frame.metadata = frame.metadata.extended(&metadata);
        }
        if let Some(source) = overrides.source {
            frame.source = source;
        }
        if let Some(extensions) = overrides.extensions {
            frame.extensions = extensions;
        }
        if let Some(context) = overrides.context {
            frame.context = frame.context.extended(&context);
        }
        evaluate_node(value, frame)
    }

    /// Positions from the root down to the current node.
    #[must_use]
    pub fn positions(&self) -> &[Position] {
        &self.frame.positions
    }

    /// The current position rendered as `#/a/b`.
    #[must_use]
    pub fn path(&self) -> String {
        self.frame.path()
    }

    /// Context visible at the current node.
    #[must_use]
    pub const fn context(&self) -> &ParsingContext {
        &self.frame.context
    }

    /// Metadata that evaluation at the current node will attach.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.frame.metadata
    }
}

/// Settings to change for one [`Parser::parse_with`] call.
#[derive(Clone, Debug, Default)]
pub struct ParseOverrides {
    metadata: Option<Metadata>,
    source: Option<SourceRef>,
    extensions: Option<Extensions>,
    context: Option<ParsingContext>,
}

impl ParseOverrides {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay `metadata` over the current metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attribute the result to `source`.
    #[must_use]
    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.source = Some(source);
        self
    }

    /// Evaluate with `extensions` instead of the active list.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Lay `context` over the current context.
    #[must_use]
    pub fn with_context(mut self, context: ParsingContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Evaluation settings: the extensions to apply, metadata for the root and
/// the initial context.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata_config::{Evaluator, LiteralSource, SourceRef};
///
/// let source = SourceRef::new(LiteralSource::default());
/// let tree = futures::executor::block_on(
///     Evaluator::new().evaluate(json!({"a": [1, 2]}), source),
/// )?;
/// assert_eq!(tree.to_json(), json!({"a": [1, 2]}));
/// # Ok::<_, std::sync::Arc<strata_config::ConfigError>>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Evaluator {
    extensions: Extensions,
    metadata: Metadata,
    context: ParsingContext,
}

impl Evaluator {
    /// Evaluator without extensions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `extension` to the list tried at every node.
    #[must_use]
    pub fn with_extension(mut self, extension: ExtensionRef) -> Self {
        self.extensions = self.extensions.with(extension);
        self
    }

    /// Replace the extension list.
    #[must_use]
    pub fn with_extensions(mut self, extensions: impl Into<Extensions>) -> Self {
        self.extensions = extensions.into();
        self
    }

    /// Metadata attached to the root node.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Context visible from the root down.
    #[must_use]
    pub fn with_context(mut self, context: ParsingContext) -> Self {
        self.context = context;
        self
    }

    /// Evaluate `raw`, attributing it to `source`.
    ///
    /// # Errors
    ///
    /// Propagates the first failure raised by an extension or by a malformed
    /// instruction; nothing is retried or swallowed.
    pub fn evaluate(
        &self,
        raw: Value,
        source: SourceRef,
    ) -> BoxFuture<'static, ConfigResult<ParsedValue>> {
        let frame = Frame {
            source,
            extensions: self.extensions.clone(),
            metadata: self.metadata.clone(),
            context: self.context.clone(),
            positions: vec![Position::Root],
            root: Arc::new(raw.clone()),
            parent: None,
            visited: Visited::default(),
        };
        evaluate_node(raw, frame)
    }

    /// Read `source` and evaluate its value.
    ///
    /// Provenance is the concrete origin reported by the source, so a
    /// [`crate::FallbackSource`] attributes values to the member that
    /// produced them.
    ///
    /// # Errors
    ///
    /// Returns the source's read failure or any evaluation failure.
    pub async fn load(&self, source: &SourceRef) -> ConfigResult<ParsedValue> {
        let (raw, origin) = source.read()?;
        debug!(source = %origin, "loaded configuration source");
        self.evaluate(raw, origin).await
    }

    /// Load each source independently and fold the results with
    /// [`crate::merge`]; later sources win.
    ///
    /// Missing sources are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first failure other than a missing source, or the last
    /// not-found error when no source produced a value.
    pub async fn load_layers<I>(&self, sources: I) -> ConfigResult<ParsedValue>
    where
        I: IntoIterator<Item = SourceRef>,
    {
        let mut layers = Vec::new();
        let mut missing = None;
        for source in sources {
            match self.load(&source).await {
                Ok(layer) => layers.push(layer),
                Err(err) if err.is_not_found() => {
                    debug!(source = %source, "skipping missing layer");
                    missing = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        merge_all(layers).ok_or_else(|| {
            missing.unwrap_or_else(|| ConfigError::not_found("layers", "no sources were supplied"))
        })
    }
}

/// Evaluate `raw` from `source` against `extensions`.
///
/// Shortcut for [`Evaluator::evaluate`] with no root metadata and an empty
/// context.
///
/// # Errors
///
/// See [`Evaluator::evaluate`].
pub fn evaluate(
    raw: Value,
    source: SourceRef,
    extensions: impl Into<Extensions>,
) -> BoxFuture<'static, ConfigResult<ParsedValue>> {
    Evaluator::new().with_extensions(extensions).evaluate(raw, source)
}

#[cfg(test)]
mod tests;
