use std::path::Path;

use serde_json::Value;

use super::{FormatDecoder, LoadFileOptions, read_text};
use crate::config_store::ConfigError;

/// Decodes `.json` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl FormatDecoder for JsonDecoder {
    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn decode(&self, path: &Path, options: &LoadFileOptions) -> Result<Option<Value>, ConfigError> {
        let content = read_text(path, options)?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::JsonParse {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Decodes `.yml` and `.yaml` files. Tags are never executed.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDecoder;

impl FormatDecoder for YamlDecoder {
    fn extensions(&self) -> &[&'static str] {
        &["yml", "yaml"]
    }

    fn decode(&self, path: &Path, options: &LoadFileOptions) -> Result<Option<Value>, ConfigError> {
        let content = read_text(path, options)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::YamlParse {
                path: path.to_path_buf(),
                source,
            })
    }
}
