//! Sources backed by environment variables.

use std::env;

use figment::Figment;
use figment::providers::Env;
use serde_json::Value;

use super::ConfigSource;
use crate::{ConfigError, ConfigResult, IntoConfigResult};

/// How the content of a single environment variable is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvFormat {
    /// Parse as JSON.
    #[default]
    Json,
    /// Parse as TOML (needs the `toml` feature).
    Toml,
    /// Use the text verbatim as a JSON string.
    Raw,
}

/// Source reading one environment variable that holds a whole document.
#[derive(Clone, Debug)]
pub struct EnvVarSource {
    name: String,
    format: EnvFormat,
}

impl EnvVarSource {
    /// Create a source reading `name` as JSON.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: EnvFormat::Json,
        }
    }

    /// Interpret the variable with `format`.
    #[must_use]
    pub const fn with_format(mut self, format: EnvFormat) -> Self {
        self.format = format;
        self
    }
}

impl ConfigSource for EnvVarSource {
    fn describe(&self) -> String {
        format!("environment variable {}", self.name)
    }

    fn read_value(&self) -> ConfigResult<Value> {
        let text = match env::var(&self.name) {
            Ok(text) => text,
            Err(env::VarError::NotPresent) => {
                return Err(ConfigError::not_found(self.describe(), "variable is not set"));
            }
            Err(err @ env::VarError::NotUnicode(_)) => {
                return Err(ConfigError::parse(self.describe(), err));
            }
        };
        match self.format {
            EnvFormat::Json => {
                serde_json::from_str(&text).map_err(|e| ConfigError::parse(self.describe(), e))
            }
            EnvFormat::Toml => parse_toml(&self.describe(), &text),
            EnvFormat::Raw => Ok(Value::String(text)),
        }
    }
}

#[cfg(feature = "toml")]
fn parse_toml(origin: &str, text: &str) -> ConfigResult<Value> {
    toml::from_str(text).map_err(|e| ConfigError::parse(origin, e))
}

#[cfg(not(feature = "toml"))]
fn parse_toml(origin: &str, _text: &str) -> ConfigResult<Value> {
    Err(ConfigError::parse(
        origin,
        "toml feature disabled: enable the 'toml' feature to parse TOML",
    ))
}

/// Source collecting every variable that starts with a prefix.
///
/// Keys are lower-cased with the prefix stripped; with a separator,
/// `APP_DB__PORT=5432` becomes `{"db": {"port": 5432}}`. Values are parsed
/// the way Figment parses environment values.
#[derive(Clone, Debug)]
pub struct EnvPrefixSource {
    prefix: String,
    separator: Option<String>,
}

impl EnvPrefixSource {
    /// Create a source for variables starting with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: None,
        }
    }

    /// Nest keys at `separator`.
    #[must_use]
    pub fn split(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    fn provider(&self) -> Env {
        let mut provider = Env::prefixed(&self.prefix);
        if let Some(separator) = &self.separator {
            provider = provider.split(separator.clone());
        }
        provider
    }
}

impl ConfigSource for EnvPrefixSource {
    fn describe(&self) -> String {
        format!("environment variables prefixed {}", self.prefix)
    }

    fn read_value(&self) -> ConfigResult<Value> {
        let provider = self.provider();
        if provider.iter().next().is_none() {
            return Err(ConfigError::not_found(
                self.describe(),
                "no variable carries the prefix",
            ));
        }
        Figment::from(provider).extract::<Value>().into_config()
    }
}
