//! Post-evaluation check for directive keys that nothing consumed.

use std::sync::Arc;

use crate::extension::render_path;
use crate::metadata::keys;
use crate::value::ParsedValue;
use crate::{ConfigError, ConfigResult};

/// Marker that introduces a directive key.
pub const DIRECTIVE_MARKER: &str = "$";

/// Reject object keys starting with `marker` that survived evaluation.
///
/// Keys written with a doubled marker and unescaped by
/// [`crate::unescape_directives`] carry `from_escaped_directive` and pass. An
/// empty marker disables the check.
///
/// # Errors
///
/// Returns [`ConfigError::ReservedKey`] for a single offending key and
/// [`ConfigError::Aggregate`] when there are several.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use strata_config::{
///     DIRECTIVE_MARKER, LiteralSource, ParsedValue, SourceRef, validate_reserved_keys,
/// };
///
/// let source = SourceRef::new(LiteralSource::default());
/// let clean = ParsedValue::literal(json!({"port": 1}), source.clone());
/// assert!(validate_reserved_keys(&clean, DIRECTIVE_MARKER).is_ok());
///
/// let stray = ParsedValue::literal(json!({"nested": {"$typo": 1}}), source);
/// assert!(validate_reserved_keys(&stray, DIRECTIVE_MARKER).is_err());
/// ```
pub fn validate_reserved_keys(value: &ParsedValue, marker: &str) -> ConfigResult<()> {
    if marker.is_empty() {
        return Ok(());
    }
    let mut violations = Vec::new();
    value.visit_entries(|path, node| {
        let Some(members) = node.as_object() else {
            return;
        };
        for (key, child) in members {
            if key.starts_with(marker) && !child.meta().flag(keys::FROM_ESCAPED_DIRECTIVE) {
                violations.push(ConfigError::ReservedKey {
                    key: key.clone(),
                    path: render_path(path),
                });
            }
        }
    });
    ConfigError::try_aggregate(violations).map_or(Ok(()), |err| Err(Arc::new(err)))
}
