//! Conversions from external error types into `ConfigError`.

use figment::Error as FigmentError;

use super::ConfigError;

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse {
            origin: format!("JSON at line {}, column {}", e.line(), e.column()),
            source: Box::new(e),
        }
    }
}

#[cfg(feature = "toml")]
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse {
            origin: "TOML".to_owned(),
            source: Box::new(e),
        }
    }
}

impl From<FigmentError> for ConfigError {
    fn from(e: FigmentError) -> Self {
        Self::Gathering(Box::new(e))
    }
}
