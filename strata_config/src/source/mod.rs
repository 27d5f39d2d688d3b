//! Configuration sources and the provenance handles attached to values.
//!
//! A source reads plain JSON; the evaluator only needs to tell sources apart,
//! which [`SourceRef`] does by reference.

mod chain;
mod env;
mod file;
mod literal;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::ConfigResult;

pub use chain::{CombinedSource, FallbackSource};
pub use env::{EnvFormat, EnvPrefixSource, EnvVarSource};
pub use file::FileSource;
pub use literal::LiteralSource;

/// Something that can produce a plain JSON configuration value.
pub trait ConfigSource: Any + fmt::Debug + Send + Sync {
    /// Human-readable description used in diagnostics.
    fn describe(&self) -> String;

    /// Read the value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::NotFound`] when there is nothing to read
    /// and a parse or file error when the content is unusable.
    fn read_value(&self) -> ConfigResult<Value>;

    /// Read the value together with the source that actually produced it.
    ///
    /// `this` is the handle wrapping `self`. Sources delegating to other
    /// sources override this to report the concrete origin.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`ConfigSource::read_value`].
    fn read_with_origin(&self, this: &SourceRef) -> ConfigResult<(Value, SourceRef)> {
        Ok((self.read_value()?, this.clone()))
    }
}

/// Shared provenance handle for a [`ConfigSource`].
///
/// Two handles are equal when they point at the same source instance.
#[derive(Clone)]
pub struct SourceRef(Arc<dyn ConfigSource>);

impl SourceRef {
    /// Wrap `source` in a new handle.
    pub fn new<S: ConfigSource>(source: S) -> Self {
        Self(Arc::new(source))
    }

    /// Whether both handles refer to the same source instance.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Description of the underlying source.
    #[must_use]
    pub fn describe(&self) -> String {
        self.0.describe()
    }

    /// Read the underlying value.
    ///
    /// # Errors
    ///
    /// Propagates the source's read failure.
    pub fn read_value(&self) -> ConfigResult<Value> {
        self.0.read_value()
    }

    /// Read the value and the concrete origin that produced it.
    ///
    /// # Errors
    ///
    /// Propagates the source's read failure.
    pub fn read(&self) -> ConfigResult<(Value, Self)> {
        self.0.read_with_origin(self)
    }

    /// Access the concrete source type, if it is a `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_config::{FileSource, LiteralSource, SourceRef};
    ///
    /// let source = SourceRef::new(LiteralSource::default());
    /// assert!(source.downcast_ref::<LiteralSource>().is_some());
    /// assert!(source.downcast_ref::<FileSource>().is_none());
    /// ```
    #[must_use]
    pub fn downcast_ref<T: ConfigSource>(&self) -> Option<&T> {
        let any: &dyn Any = &*self.0;
        any.downcast_ref::<T>()
    }
}

impl PartialEq for SourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for SourceRef {}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SourceRef").field(&self.0).finish()
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
