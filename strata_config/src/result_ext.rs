//! Extension for mapping foreign errors into `ConfigResult` concisely.
//!
//! Reduces repetitive `.map_err(|e| Arc::new(ConfigError::from(e)))` chains
//! when converting error types that implement `Into<ConfigError>` (for
//! example `serde_json::Error` or `figment::Error`).
//!
//! # Examples
//!
//! ```
//! use strata_config::{ConfigResult, IntoConfigResult};
//!
//! fn parse() -> ConfigResult<serde_json::Value> {
//!     serde_json::from_str("{\"port\": 8080}").into_config()
//! }
//! # assert!(parse().is_ok());
//! ```

use std::sync::Arc;

use crate::{ConfigError, ConfigResult};

/// Generic extension for mapping any `Result<T, E>` with `E: Into<ConfigError>`
/// into a [`ConfigResult<T>`].
pub trait IntoConfigResult<T> {
    /// Convert `Result<T, E>` into `ConfigResult<T>` using `Into<ConfigError>`.
    ///
    /// # Errors
    ///
    /// Propagates the original error after conversion into `Arc<ConfigError>`.
    fn into_config(self) -> ConfigResult<T>;
}

impl<T, E> IntoConfigResult<T> for Result<T, E>
where
    E: Into<ConfigError>,
{
    fn into_config(self) -> ConfigResult<T> {
        self.map_err(|e| Arc::new(e.into()))
    }
}
