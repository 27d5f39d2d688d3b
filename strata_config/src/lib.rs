//! Layered configuration with an extensible directive interpreter.
//!
//! Raw JSON read from a [`ConfigSource`] is evaluated top-down against a list
//! of [`ParsingExtension`]s. Extensions give meaning to directive keys (keys
//! starting with [`DIRECTIVE_MARKER`]) and may re-enter evaluation through a
//! [`Parser`]. The result is a [`ParsedValue`] tree that remembers which
//! sources produced every node. Trees from independent layers combine with
//! [`merge`], where later layers win.
//!
//! ```
//! use serde_json::json;
//! use strata_config::{
//!     LiteralSource, Metadata, ParseOverrides, SourceRef, evaluate, key_directive,
//!     metadata::keys,
//! };
//!
//! let inline = key_directive("$inline", |value, input| {
//!     let flatten = Metadata::new().with(keys::SHOULD_FLATTEN, true);
//!     input.parse.parse_with(value, ParseOverrides::new().with_metadata(flatten))
//! });
//! let source = SourceRef::new(LiteralSource::default());
//! let raw = json!({"server": {"$inline": {"port": 8080}}});
//! let tree = futures::executor::block_on(evaluate(raw, source, vec![inline]))?;
//! assert_eq!(tree.to_json(), json!({"server": {"port": 8080}}));
//! # Ok::<_, std::sync::Arc<strata_config::ConfigError>>(())
//! ```

mod context;
mod error;
mod evaluate;
pub mod extension;
mod merge;
pub mod metadata;
mod result_ext;
pub mod source;
mod validate;
mod value;

use std::sync::Arc;

pub use context::ParsingContext;
pub use error::{AggregatedErrors, ConfigError};
pub use evaluate::{Evaluator, ParseOverrides, Parser, evaluate};
pub use extension::{
    ExtensionRef, Extensions, MarkAllValues, ParsingExtension, Position, Transform,
    TransformInput, extension_fn, key_directive, named, render_path, unescape_directives,
};
pub use merge::{merge, merge_all, merge_value};
pub use metadata::Metadata;
pub use result_ext::IntoConfigResult;
pub use source::{
    CombinedSource, ConfigSource, EnvFormat, EnvPrefixSource, EnvVarSource, FallbackSource,
    FileSource, LiteralSource, SourceRef,
};
pub use validate::{DIRECTIVE_MARKER, validate_reserved_keys};
pub use value::{NodeValue, ParsedValue};

/// Result type used throughout the crate.
///
/// Errors are shared so that a failure raised in one concurrently evaluated
/// branch can be propagated without cloning.
pub type ConfigResult<T> = Result<T, Arc<ConfigError>>;
