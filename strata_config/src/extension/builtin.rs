//! Protocol utilities that carry no directive semantics of their own.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use super::{ExtensionRef, ParsingExtension, Position, Transform, TransformInput};
use crate::context::ParsingContext;
use crate::evaluate::ParseOverrides;
use crate::metadata::{Metadata, keys};
use crate::value::ParsedValue;
use crate::ConfigResult;

struct KeyDirective<F> {
    name: String,
    handler: Arc<F>,
}

impl<F, Fut> ParsingExtension for KeyDirective<F>
where
    F: Fn(Value, TransformInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ConfigResult<ParsedValue>> + Send + 'static,
{
    fn identity(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn applies(
        &self,
        value: &Value,
        position: &Position,
        _ancestors: &[Position],
        _context: &ParsingContext,
    ) -> Option<Transform> {
        if !position.is_key(&self.name) {
            return None;
        }
        let handler = Arc::clone(&self.handler);
        let value = value.clone();
        Some(Transform::new(move |input| handler(value, input)))
    }
}

/// Build an extension that acts only on the object key literally equal to
/// `name`, handing the key's value and the transform input to `handler`.
///
/// The extension's identity is `name`.
///
/// # Examples
///
/// ```
/// use strata_config::{Metadata, ParseOverrides, key_directive, metadata::keys};
///
/// // `{"$inline": {...}}` resolves to the value of `$inline`.
/// let inline = key_directive("$inline", |value, input| {
///     let overrides =
///         ParseOverrides::new().with_metadata(Metadata::new().with(keys::SHOULD_FLATTEN, true));
///     input.parse.parse_with(value, overrides)
/// });
/// # let _ = inline;
/// ```
pub fn key_directive<F, Fut>(name: impl Into<String>, handler: F) -> ExtensionRef
where
    F: Fn(Value, TransformInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ConfigResult<ParsedValue>> + Send + 'static,
{
    Arc::new(KeyDirective {
        name: name.into(),
        handler: Arc::new(handler),
    })
}

struct UnescapeDirectives {
    marker: String,
}

impl ParsingExtension for UnescapeDirectives {
    fn identity(&self) -> Option<&str> {
        Some("unescape-directives")
    }

    fn applies(
        &self,
        value: &Value,
        position: &Position,
        _ancestors: &[Position],
        _context: &ParsingContext,
    ) -> Option<Transform> {
        let key = position.key()?;
        let literal = key.strip_prefix(self.marker.as_str())?;
        if self.marker.is_empty() || !literal.starts_with(self.marker.as_str()) {
            return None;
        }
        let metadata = Metadata::new()
            .with(keys::REWRITE_KEY, literal)
            .with(keys::FROM_ESCAPED_DIRECTIVE, true);
        let value = value.clone();
        Some(Transform::new(move |input| {
            input
                .parse
                .parse_with(value, ParseOverrides::new().with_metadata(metadata))
        }))
    }
}

/// Build an extension turning keys written with a doubled `marker` into
/// literal keys with a single marker (`$$schema` becomes `$schema`).
///
/// Rewritten nodes carry `from_escaped_directive`, which
/// [`crate::validate_reserved_keys`] honours.
pub fn unescape_directives(marker: impl Into<String>) -> ExtensionRef {
    Arc::new(UnescapeDirectives {
        marker: marker.into(),
    })
}

/// Extension attaching the same metadata to every value below the root.
///
/// Each node is re-parsed with the metadata laid over its own, and children
/// start with a fresh re-entrancy guard so the extension matches again below.
/// The evaluation root is a container for the layer rather than a value and
/// stays unmarked, so a filter on the marking can still be applied to a tree
/// the layer was merged into. Register it before directive extensions so it
/// sees every node first.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use strata_config::MarkAllValues;
///
/// let secrets = Arc::new(MarkAllValues::secrets());
/// # let _ = secrets;
/// ```
#[derive(Clone, Debug)]
pub struct MarkAllValues {
    metadata: Metadata,
}

impl MarkAllValues {
    /// Mark every node with `metadata`.
    #[must_use]
    pub const fn new(metadata: Metadata) -> Self {
        Self { metadata }
    }

    /// Mark every node with `from_secrets = true`.
    #[must_use]
    pub fn secrets() -> Self {
        Self::new(Metadata::new().with(keys::FROM_SECRETS, true))
    }
}

impl ParsingExtension for MarkAllValues {
    fn applies(
        &self,
        value: &Value,
        position: &Position,
        _ancestors: &[Position],
        _context: &ParsingContext,
    ) -> Option<Transform> {
        if *position == Position::Root {
            return None;
        }
        let metadata = self.metadata.clone();
        let value = value.clone();
        Some(Transform::new(move |input| {
            input
                .parse
                .parse_with(value, ParseOverrides::new().with_metadata(metadata))
        }))
    }
}
