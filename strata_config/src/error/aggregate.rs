//! Several `ConfigError`s reported as one failure.

use std::{error::Error, fmt, slice, sync::Arc};

use super::ConfigError;

/// Failures collected by a pass that keeps going after the first problem,
/// such as reserved-key validation.
///
/// Rendered as one line per error, each prefixed with its position in the
/// list.
///
/// # Examples
///
/// ```
/// use strata_config::ConfigError;
///
/// let err = ConfigError::aggregate(vec![
///     ConfigError::internal("first"),
///     ConfigError::internal("second"),
/// ]);
/// let ConfigError::Aggregate(all) = err else { panic!("two errors aggregate") };
/// assert_eq!(all.len(), 2);
/// assert!(all.to_string().starts_with("1: "));
/// ```
#[derive(Debug, Default)]
pub struct AggregatedErrors {
    errors: Vec<Arc<ConfigError>>,
}

impl AggregatedErrors {
    /// Collect `errors`, keeping their order.
    #[must_use]
    pub const fn new(errors: Vec<Arc<ConfigError>>) -> Self {
        Self { errors }
    }

    /// The collected errors in report order.
    #[must_use]
    pub fn as_slice(&self) -> &[Arc<ConfigError>] {
        &self.errors
    }

    /// Iterate over the collected errors.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigError> {
        self.errors.iter().map(Arc::as_ref)
    }

    /// Number of collected errors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether nothing was collected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for AggregatedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = self.errors.iter().zip(1_usize..);
        if let Some((err, number)) = lines.next() {
            write!(f, "{number}: {err}")?;
        }
        for (err, number) in lines {
            write!(f, "\n{number}: {err}")?;
        }
        Ok(())
    }
}

impl Error for AggregatedErrors {}

impl FromIterator<Arc<ConfigError>> for AggregatedErrors {
    fn from_iter<I: IntoIterator<Item = Arc<ConfigError>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AggregatedErrors {
    type Item = &'a Arc<ConfigError>;
    type IntoIter = slice::Iter<'a, Arc<ConfigError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
