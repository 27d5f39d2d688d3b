//! Sources composed from other sources.

use serde_json::Value;
use tracing::debug;

use super::{ConfigSource, SourceRef};
use crate::merge::merge_value;
use crate::{ConfigError, ConfigResult};

/// Source trying each inner source in turn; the first one that is not
/// missing wins.
///
/// Only [`ConfigError::NotFound`] moves on to the next source; any other
/// failure is returned immediately.
#[derive(Clone, Debug)]
pub struct FallbackSource {
    sources: Vec<SourceRef>,
}

impl FallbackSource {
    /// Create a chain over `sources`, highest priority first.
    #[must_use]
    pub const fn new(sources: Vec<SourceRef>) -> Self {
        Self { sources }
    }
}

impl ConfigSource for FallbackSource {
    fn describe(&self) -> String {
        let names: Vec<String> = self.sources.iter().map(SourceRef::describe).collect();
        format!("first of [{}]", names.join(", "))
    }

    fn read_value(&self) -> ConfigResult<Value> {
        self.first_available().map(|(value, _)| value)
    }

    fn read_with_origin(&self, _this: &SourceRef) -> ConfigResult<(Value, SourceRef)> {
        self.first_available()
    }
}

impl FallbackSource {
    fn first_available(&self) -> ConfigResult<(Value, SourceRef)> {
        for source in &self.sources {
            match source.read() {
                Ok(found) => return Ok(found),
                Err(err) if err.is_not_found() => {
                    debug!(source = %source, "source missing, trying next");
                }
                Err(err) => return Err(err),
            }
        }
        Err(ConfigError::not_found(
            self.describe(),
            "no source in the chain produced a value",
        ))
    }
}

/// Source deep-merging the values of every inner source in order; later
/// sources win.
#[derive(Clone, Debug)]
pub struct CombinedSource {
    sources: Vec<SourceRef>,
}

impl CombinedSource {
    /// Create a combination of `sources`, lowest precedence first.
    #[must_use]
    pub const fn new(sources: Vec<SourceRef>) -> Self {
        Self { sources }
    }
}

impl ConfigSource for CombinedSource {
    fn describe(&self) -> String {
        let names: Vec<String> = self.sources.iter().map(SourceRef::describe).collect();
        format!("combination of [{}]", names.join(", "))
    }

    fn read_value(&self) -> ConfigResult<Value> {
        let mut sources = self.sources.iter();
        let Some(first) = sources.next() else {
            return Err(ConfigError::not_found(self.describe(), "no sources to combine"));
        };
        let mut combined = first.read_value()?;
        for source in sources {
            merge_value(&mut combined, source.read_value()?);
        }
        Ok(combined)
    }
}
