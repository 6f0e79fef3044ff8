use std::{path::PathBuf, time::Instant};

use serde_json::Value;

/// A configuration update reported to subscribers.
///
/// Emitted after a write that changed the stored value at `key`. Writes that
/// store an equal value produce no event.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEvent {
    /// Dotted path of the updated key (e.g. "server.port").
    pub key: String,
    /// The value now stored at `key`.
    pub value: Value,
    /// The value previously stored at `key`, `None` if the key was absent.
    pub old_value: Option<Value>,
    /// When the write happened.
    pub timestamp: Instant,
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No decoder is registered for the file's extension.
    #[error("can not load config from '{path}', only [{supported}] files are supported")]
    UnsupportedFormat {
        /// The file that was requested
        path: PathBuf,
        /// Extensions accepted by the loader, comma separated
        supported: String,
    },

    /// The requested text encoding is not known.
    #[error("unsupported encoding '{encoding}'")]
    UnsupportedEncoding {
        /// The encoding name as given in the load options
        encoding: String,
    },

    /// The file could not be read.
    #[error("I/O error on '{path}': {source}")]
    IoError {
        /// Path where the I/O error occurred
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("failed to parse JSON from '{path}': {source}")]
    JsonParse {
        /// Path of the malformed file
        path: PathBuf,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// The file is not valid YAML.
    #[error("failed to parse YAML from '{path}': {source}")]
    YamlParse {
        /// Path of the malformed file
        path: PathBuf,
        /// Parser error
        #[source]
        source: serde_yaml::Error,
    },

    /// A script source failed to compile or threw while running.
    #[error("failed to evaluate script '{path}': {details}")]
    ScriptError {
        /// Path of the script
        path: PathBuf,
        /// Error reported by the script engine
        details: String,
    },

    /// A sandboxed script tried to reach a host resource.
    #[error("script '{path}' tried to access '{resource}' from inside the sandbox")]
    SandboxViolation {
        /// Path of the script
        path: PathBuf,
        /// The module or resource the script asked for
        resource: String,
    },

    /// An event name that is neither "update" nor "update:<pattern>".
    #[error("invalid event name '{0}', expected \"update\" or \"update:<pattern>\"")]
    InvalidEventName(String),

    /// The value type does not match the expected type.
    #[error("Type mismatch at {path}: Expected {expected_type}, got {actual_value}")]
    TypeMismatch {
        /// The path where the type mismatch occurred.
        path: String,
        /// The expected type name.
        expected_type: &'static str,
        /// The actual value found at the path.
        actual_value: Value,
    },
}

impl UpdateEvent {
    /// Creates a new update event stamped with the current time.
    ///
    /// # Arguments
    ///
    /// * `key` - The dot-separated path that was written
    /// * `value` - The value now stored
    /// * `old_value` - The value that was replaced, if any
    pub fn new(key: String, value: Value, old_value: Option<Value>) -> Self {
        Self {
            key,
            value,
            old_value,
            timestamp: Instant::now(),
        }
    }

    /// Extracts the new value as a specific type.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TypeMismatch` if the value cannot be deserialized
    /// into the requested type.
    pub fn extract<T>(&self) -> Result<T, ConfigError>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(&self.value).map_err(|_| ConfigError::TypeMismatch {
            path: self.key.clone(),
            expected_type: std::any::type_name::<T>(),
            actual_value: self.value.clone(),
        })
    }

    /// Returns the new value if it is a string.
    pub fn as_string(&self) -> Option<String> {
        match &self.value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Returns the new value as a string, or `default` when it is not one.
    pub fn as_string_or(&self, default: &str) -> String {
        self.as_string().unwrap_or_else(|| default.to_string())
    }
}
