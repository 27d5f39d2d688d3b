//! Primary error enum for configuration loading and evaluation.

use camino::Utf8PathBuf;
use figment::Error as FigmentError;
use thiserror::Error;

use super::aggregate::AggregatedErrors;

/// Errors that can occur while loading or evaluating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A source had nothing to read, such as a missing file or an unset
    /// environment variable.
    #[error("{origin} not found: {message}")]
    NotFound {
        /// Description of the source that came up empty.
        origin: String,
        /// Human-readable explanation.
        message: String,
    },

    /// Raw content could not be interpreted as JSON-compatible data.
    #[error("Failed to parse {origin}: {source}")]
    Parse {
        /// Description of the content being parsed.
        origin: String,
        /// Underlying parser error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error originating from a configuration file.
    #[error("Configuration file error in '{path}': {source}")]
    File {
        /// Path that triggered the failure.
        path: Utf8PathBuf,
        /// Underlying error reported by the file reader.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error while gathering values through a Figment provider.
    #[error("Failed to gather configuration: {0}")]
    Gathering(#[from] Box<FigmentError>),

    /// A directive-prefixed key survived evaluation without being escaped.
    #[error("Reserved key '{key}' found at {path}; escape it by doubling the marker")]
    ReservedKey {
        /// Offending key.
        key: String,
        /// Path of the object holding the key.
        path: String,
    },

    /// An extension emitted a malformed instruction or an operation was
    /// misused.
    #[error("Internal consistency error: {message}")]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },

    /// Failure raised by an extension; opaque to the evaluator.
    #[error("Extension '{name}' failed: {source}")]
    Extension {
        /// Name of the failing extension.
        name: String,
        /// Underlying error reported by the extension.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Multiple errors reported together.
    #[error("multiple configuration errors:\n{0}")]
    Aggregate(Box<AggregatedErrors>),
}
