//! Source holding a fixed value.

use serde_json::Value;

use super::ConfigSource;
use crate::ConfigResult;

/// Source returning a value supplied in code.
///
/// Used for defaults, programmatically built merge operands and tests.
#[derive(Clone, Debug, Default)]
pub struct LiteralSource {
    value: Value,
}

impl LiteralSource {
    /// Create a source returning `value`.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self { value }
    }
}

impl ConfigSource for LiteralSource {
    fn describe(&self) -> String {
        "literal value".to_owned()
    }

    fn read_value(&self) -> ConfigResult<Value> {
        Ok(self.value.clone())
    }
}
