//! Error types produced while reading, evaluating and validating configuration.

mod aggregate;
mod constructors;
mod conversions;
mod types;

pub use aggregate::AggregatedErrors;
pub use types::ConfigError;
