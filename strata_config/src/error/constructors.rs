//! Constructors and classification helpers for `ConfigError`.

use std::sync::Arc;

use super::{AggregatedErrors, ConfigError};

impl ConfigError {
    /// Tries to build a [`ConfigError`] from an iterator of errors.
    ///
    /// Returns `None` for an empty iterator, the inner error when a single
    /// uniquely owned [`Arc`] is supplied, and [`Self::Aggregate`] otherwise.
    #[must_use]
    pub fn try_aggregate<I, E>(errors: I) -> Option<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        let mut arcs: Vec<Arc<Self>> = errors.into_iter().map(Into::into).collect();
        if arcs.len() > 1 {
            return Some(Self::Aggregate(Box::new(AggregatedErrors::new(arcs))));
        }
        let last = arcs.pop()?;
        Some(Arc::try_unwrap(last).unwrap_or_else(|shared| {
            Self::Aggregate(Box::new(AggregatedErrors::new(vec![shared])))
        }))
    }

    /// Build a [`ConfigError`] from at least one error.
    ///
    /// # Panics
    ///
    /// Panics if `errors` is empty. Use [`ConfigError::try_aggregate`] when the
    /// list may be empty.
    #[must_use]
    #[track_caller]
    pub fn aggregate<I, E>(errors: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        Self::try_aggregate(errors).map_or_else(
            || panic!("aggregate requires at least one error"),
            |err| err,
        )
    }

    /// Construct a not-found error for `origin`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_config::ConfigError;
    /// let e = ConfigError::not_found("env var APP_CONFIG", "variable is not set");
    /// assert!(e.is_not_found());
    /// ```
    #[must_use]
    pub fn not_found(origin: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::NotFound {
            origin: origin.into(),
            message: message.into(),
        })
    }

    /// Construct an internal consistency error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Construct a parse error for content described by `origin`.
    #[must_use]
    pub fn parse(
        origin: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Arc<Self> {
        Arc::new(Self::Parse {
            origin: origin.into(),
            source: source.into(),
        })
    }

    /// Wrap a failure raised by the extension called `name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_config::ConfigError;
    /// let e = ConfigError::extension("$env", "no environment selected");
    /// assert_eq!(e.to_string(), "Extension '$env' failed: no environment selected");
    /// ```
    #[must_use]
    pub fn extension(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Arc<Self> {
        Arc::new(Self::Extension {
            name: name.into(),
            source: source.into(),
        })
    }

    /// Returns `true` when the error only reports a missing source.
    ///
    /// Fallback chains treat this kind as recoverable.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
