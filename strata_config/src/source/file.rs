//! Source reading a JSON or TOML file.

use std::error::Error;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use tracing::debug;

use super::ConfigSource;
use crate::{ConfigError, ConfigResult};

/// Source reading a configuration file, choosing the parser by extension.
///
/// `.json` files are always supported; `.toml` files need the `toml`
/// feature (enabled by default). A missing file reports
/// [`ConfigError::NotFound`].
#[derive(Clone, Debug)]
pub struct FileSource {
    path: Utf8PathBuf,
}

impl FileSource {
    /// Create a source for `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this source reads.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path)
    }

    fn read_value(&self) -> ConfigResult<Value> {
        if !self.path.is_file() {
            return Err(ConfigError::not_found(self.describe(), "file does not exist"));
        }
        debug!(path = %self.path, "reading configuration file");
        let data = std::fs::read_to_string(&self.path).map_err(|e| file_error(&self.path, e))?;
        parse_by_format(&self.path, &data)
    }
}

fn file_error(path: &Utf8Path, err: impl Into<Box<dyn Error + Send + Sync>>) -> Arc<ConfigError> {
    Arc::new(ConfigError::File {
        path: path.to_path_buf(),
        source: err.into(),
    })
}

/// Parse `data` according to the extension of `path`.
fn parse_by_format(path: &Utf8Path, data: &str) -> ConfigResult<Value> {
    let ext = path.extension().map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => serde_json::from_str(data).map_err(|e| file_error(path, e)),
        Some("toml") => {
            #[cfg(feature = "toml")]
            {
                toml::from_str(data).map_err(|e| file_error(path, e))
            }
            #[cfg(not(feature = "toml"))]
            {
                Err(file_error(
                    path,
                    std::io::Error::other(
                        "toml feature disabled: enable the 'toml' feature to support this file format",
                    ),
                ))
            }
        }
        _ => Err(file_error(
            path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "unsupported configuration file extension",
            ),
        )),
    }
}
