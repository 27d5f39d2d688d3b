//! The protocol through which directives are given meaning.
//!
//! An extension inspects a value and its position before the evaluator
//! descends into it. When it applies it hands back a [`Transform`], and the
//! evaluator delegates the whole node to that transform. The transform can
//! re-enter evaluation through [`crate::Parser`] on whatever replacement value
//! it likes.

mod builtin;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::context::ParsingContext;
use crate::evaluate::Parser;
use crate::source::SourceRef;
use crate::value::ParsedValue;
use crate::ConfigResult;

pub use builtin::{MarkAllValues, key_directive, unescape_directives};

/// Where a node sits in the tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Position {
    /// The root of the evaluated value.
    Root,
    /// A member of an object, with its key.
    Key(String),
    /// A member of an array, with its index.
    Index(usize),
}

impl Position {
    /// The key, for object members.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            _ => None,
        }
    }

    /// The index, for array members.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            _ => None,
        }
    }

    /// Whether this is the object member named exactly `name`.
    #[must_use]
    pub fn is_key(&self, name: &str) -> bool {
        self.key() == Some(name)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("#"),
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Render a position stack as `#/a/0/b`.
#[must_use]
pub fn render_path(positions: &[Position]) -> String {
    let segments: Vec<String> = positions.iter().map(ToString::to_string).collect();
    match segments.first().map(String::as_str) {
        Some("#") => segments.join("/"),
        _ => format!("#/{}", segments.join("/")),
    }
}

/// Everything a [`Transform`] receives when it runs.
#[non_exhaustive]
pub struct TransformInput {
    /// Re-entry into the evaluator at the current position.
    pub parse: Parser,
    /// Raw object or array holding the current value; `None` at the root.
    pub parent: Option<Arc<Value>>,
    /// Source the current value came from.
    pub source: SourceRef,
    /// Extensions active for this evaluation.
    pub extensions: Extensions,
    /// Raw root of the whole evaluation.
    pub root: Arc<Value>,
}

type TransformFn =
    Box<dyn FnOnce(TransformInput) -> BoxFuture<'static, ConfigResult<ParsedValue>> + Send>;

/// The work an applicable extension performs on a node.
pub struct Transform(TransformFn);

impl Transform {
    /// Wrap an async callback.
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: FnOnce(TransformInput) -> Fut + Send + 'static,
        Fut: Future<Output = ConfigResult<ParsedValue>> + Send + 'static,
    {
        Self(Box::new(move |input| callback(input).boxed()))
    }

    pub(crate) fn run(self, input: TransformInput) -> BoxFuture<'static, ConfigResult<ParsedValue>> {
        (self.0)(input)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// A pluggable directive implementation.
///
/// Closures with the signature of [`ParsingExtension::applies`] implement the
/// trait directly; see [`extension_fn`].
pub trait ParsingExtension: Send + Sync {
    /// Stable identity. Two extensions sharing an identity count as the same
    /// extension for the re-entrancy guard.
    fn identity(&self) -> Option<&str> {
        None
    }

    /// Decide whether the extension applies to `value` at `position`.
    ///
    /// `ancestors` lists the positions above the current one, root first.
    /// Returning `None` lets the evaluator try the next extension and then
    /// fall back to structural recursion.
    fn applies(
        &self,
        value: &Value,
        position: &Position,
        ancestors: &[Position],
        context: &ParsingContext,
    ) -> Option<Transform>;
}

impl<F> ParsingExtension for F
where
    F: Fn(&Value, &Position, &[Position], &ParsingContext) -> Option<Transform> + Send + Sync,
{
    fn applies(
        &self,
        value: &Value,
        position: &Position,
        ancestors: &[Position],
        context: &ParsingContext,
    ) -> Option<Transform> {
        self(value, position, ancestors, context)
    }
}

/// Shared handle to an extension.
pub type ExtensionRef = Arc<dyn ParsingExtension>;

/// Build an anonymous extension from a closure.
///
/// # Examples
///
/// ```
/// use strata_config::{Transform, extension_fn};
///
/// let upper = extension_fn(|value, _position, _ancestors, _context| {
///     let text = value.as_str()?.to_uppercase();
///     Some(Transform::new(move |input| async move {
///         input.parse.parse(text.into()).await
///     }))
/// });
/// # let _ = upper;
/// ```
pub fn extension_fn<F>(applies: F) -> ExtensionRef
where
    F: Fn(&Value, &Position, &[Position], &ParsingContext) -> Option<Transform>
        + Send
        + Sync
        + 'static,
{
    Arc::new(applies)
}

struct Named {
    identity: String,
    inner: ExtensionRef,
}

impl ParsingExtension for Named {
    fn identity(&self) -> Option<&str> {
        Some(&self.identity)
    }

    fn applies(
        &self,
        value: &Value,
        position: &Position,
        ancestors: &[Position],
        context: &ParsingContext,
    ) -> Option<Transform> {
        self.inner.applies(value, position, ancestors, context)
    }
}

/// Give `extension` a stable identity.
pub fn named(identity: impl Into<String>, extension: ExtensionRef) -> ExtensionRef {
    Arc::new(Named {
        identity: identity.into(),
        inner: extension,
    })
}

/// Ordered, cheaply cloned list of extensions. Registration order is the
/// order in which they are tried.
#[derive(Clone, Default)]
pub struct Extensions(Arc<[ExtensionRef]>);

impl Extensions {
    /// Create a list from `extensions`.
    #[must_use]
    pub fn new(extensions: Vec<ExtensionRef>) -> Self {
        Self(extensions.into())
    }

    /// Return a copy with `extension` appended.
    #[must_use]
    pub fn with(&self, extension: ExtensionRef) -> Self {
        self.iter().cloned().chain(std::iter::once(extension)).collect()
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ExtensionRef> {
        self.0.iter()
    }

    /// Number of extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ExtensionRef> for Extensions {
    fn from_iter<I: IntoIterator<Item = ExtensionRef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<ExtensionRef>> for Extensions {
    fn from(extensions: Vec<ExtensionRef>) -> Self {
        Self::new(extensions)
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|e| e.identity().unwrap_or("<anonymous>")))
            .finish()
    }
}
