//! File ingestion for the configuration store.
//!
//! A [`FileLoader`] picks a [`FormatDecoder`] by file extension and turns the
//! file into a plain `serde_json::Value`. JSON and YAML are always available;
//! `.js` scripts are decoded by [`ScriptDecoder`] when the `script` feature is
//! enabled.

mod encoding;
mod structured;

#[cfg(feature = "script")]
mod script;

use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config_store::ConfigError;

pub use encoding::Encoding;
#[cfg(feature = "script")]
pub use script::ScriptDecoder;
pub use structured::{JsonDecoder, YamlDecoder};

/// Per-call options for [`ConfigStore::load_from_file_with`](crate::ConfigStore::load_from_file_with).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadFileOptions {
    /// Namespace prepended (with a `.`) to every top-level key of the file.
    pub prefix_key: Option<String>,
    /// Text encoding of the file, see [`Encoding`].
    pub encoding: String,
    /// Run `.js` sources inside the sandbox. When `false` the host runtime
    /// evaluates them with full access.
    pub load_js_file_with_vm: bool,
}

impl Default for LoadFileOptions {
    fn default() -> Self {
        Self {
            prefix_key: None,
            encoding: "utf8".to_string(),
            load_js_file_with_vm: true,
        }
    }
}

impl LoadFileOptions {
    /// Sets the namespace for the loaded keys.
    pub fn with_prefix_key(mut self, prefix_key: impl Into<String>) -> Self {
        self.prefix_key = Some(prefix_key.into());
        self
    }

    /// Sets the text encoding.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Chooses between sandboxed and host evaluation of `.js` sources.
    pub fn with_js_sandbox(mut self, sandboxed: bool) -> Self {
        self.load_js_file_with_vm = sandboxed;
        self
    }
}

/// Decodes one family of file formats into a plain value.
pub trait FormatDecoder {
    /// File extensions (without the dot) this decoder handles.
    fn extensions(&self) -> &[&'static str];

    /// Reads and decodes `path`.
    ///
    /// Returns `Ok(None)` when the file holds no value at all.
    ///
    /// # Errors
    /// Returns the I/O, parse or script error that prevented decoding.
    fn decode(&self, path: &Path, options: &LoadFileOptions) -> Result<Option<Value>, ConfigError>;
}

/// Extension-dispatched registry of decoders.
pub struct FileLoader {
    decoders: Vec<Box<dyn FormatDecoder>>,
}

impl Default for FileLoader {
    /// JSON, YAML and, with the `script` feature, sandboxed `.js` using a
    /// snapshot of the host environment.
    fn default() -> Self {
        let mut loader = Self::empty();
        loader.register(Box::new(JsonDecoder));
        loader.register(Box::new(YamlDecoder));
        #[cfg(feature = "script")]
        loader.register(Box::new(ScriptDecoder::from_host_env()));
        loader
    }
}

impl FileLoader {
    /// Creates a loader with the built-in decoders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader that accepts no formats until decoders are registered.
    pub fn empty() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }

    /// Adds a decoder. Extensions it claims take precedence over decoders
    /// registered earlier.
    pub fn register(&mut self, decoder: Box<dyn FormatDecoder>) -> &mut Self {
        self.decoders.insert(0, decoder);
        self
    }

    /// Extensions currently accepted, in lookup order without duplicates.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = Vec::new();
        for ext in self.decoders.iter().flat_map(|d| d.extensions().iter()) {
            if !extensions.contains(ext) {
                extensions.push(ext);
            }
        }
        extensions
    }

    /// Decodes `path` with the decoder registered for its extension.
    ///
    /// # Errors
    /// * `ConfigError::UnsupportedFormat` - No decoder handles the extension
    /// * `ConfigError::UnsupportedEncoding` - `options.encoding` is unknown
    /// * Any error the decoder reports
    pub fn load(&self, path: &Path, options: &LoadFileOptions) -> Result<Option<Value>, ConfigError> {
        let file_name = path.file_name().and_then(|name| name.to_str());
        let decoder = file_name.and_then(|name| {
            self.decoders.iter().find(|decoder| {
                decoder
                    .extensions()
                    .iter()
                    .any(|ext| has_extension(name, ext))
            })
        });

        let Some(decoder) = decoder else {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
                supported: self
                    .supported_extensions()
                    .iter()
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(" "),
            });
        };

        options.encoding.parse::<Encoding>()?;
        debug!(path = %path.display(), "Decoding config file");
        decoder.decode(path, options)
    }
}

impl fmt::Debug for FileLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileLoader")
            .field("extensions", &self.supported_extensions())
            .finish()
    }
}

/// Checks whether `file_name` ends in `.{ext}`. A bare dotfile such as
/// `.json` counts, unlike with [`Path::extension`].
fn has_extension(file_name: &str, ext: &str) -> bool {
    file_name
        .strip_suffix(ext)
        .is_some_and(|stem| stem.ends_with('.'))
}

/// Reads `path` and decodes it with the encoding named in `options`.
pub(crate) fn read_text(path: &Path, options: &LoadFileOptions) -> Result<String, ConfigError> {
    let encoding: Encoding = options.encoding.parse()?;
    let bytes = fs::read(path).map_err(|source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(encoding.decode(&bytes))
}
