use std::{collections::BTreeMap, env, fs, path::Path, process::Command};

use boa_engine::{Context, Source};
use serde_json::Value;
use tracing::{debug, warn};

use super::{FormatDecoder, LoadFileOptions, read_text};
use crate::config_store::ConfigError;

const SANDBOX_MARKER: &str = "__cfgtree_sandbox_denied__:";

const HOST_LOADER: &str = "const file = process.argv[process.argv.length - 1];\
    const value = require(file);\
    process.stdout.write(JSON.stringify(value === undefined ? null : value));";

/// Decodes `.js` sources that assign their configuration to `module.exports`.
///
/// Sandboxed evaluation runs the script in an embedded engine that has no
/// host bindings. The script sees:
/// * `module` / `exports` in CommonJS shape,
/// * `process.env`, a frozen copy of the decoder's environment snapshot,
/// * `require`, which always throws and fails the load with
///   `ConfigError::SandboxViolation`.
///
/// With the sandbox disabled the file is handed to the host JavaScript
/// runtime in a fresh process, so every load sees the file as it is now.
#[derive(Debug, Clone)]
pub struct ScriptDecoder {
    env: BTreeMap<String, String>,
    host_runtime: String,
}

impl Default for ScriptDecoder {
    fn default() -> Self {
        Self::from_host_env()
    }
}

impl ScriptDecoder {
    /// Creates a decoder whose sandbox sees a snapshot of the current process
    /// environment. Variables that are not valid UTF-8 are skipped.
    pub fn from_host_env() -> Self {
        let snapshot = env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        });
        Self::with_env(snapshot)
    }

    /// Creates a decoder whose sandbox sees exactly `vars` as `process.env`.
    pub fn with_env<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            env: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            host_runtime: "node".to_string(),
        }
    }

    /// Sets the executable used when the sandbox is disabled.
    pub fn with_host_runtime(mut self, program: impl Into<String>) -> Self {
        self.host_runtime = program.into();
        self
    }

    fn evaluate_sandboxed(&self, path: &Path, source: &str) -> Result<Option<Value>, ConfigError> {
        let env_json = serde_json::to_string(&self.env).map_err(|e| ConfigError::ScriptError {
            path: path.to_path_buf(),
            details: format!("failed to serialize environment: {e}"),
        })?;

        // Kept on one line so script line numbers only shift by one.
        let program = format!(
            "var process = Object.freeze({{ env: Object.freeze({env_json}) }}); \
             var module = {{ exports: {{}} }}; var exports = module.exports; \
             var require = function (name) {{ throw \"{SANDBOX_MARKER}\" + String(name); }};\n\
             {source}\n;module.exports;"
        );

        let mut context = Context::default();
        let exported = context
            .eval(Source::from_bytes(&program))
            .map_err(|e| classify_script_error(path, &e.to_string()))?;

        if exported.is_undefined() || exported.is_null() {
            return Ok(None);
        }

        exported
            .to_json(&mut context)
            .map(|value| Some(integral_numbers(value)))
            .map_err(|e| ConfigError::ScriptError {
                path: path.to_path_buf(),
                details: format!("module.exports is not plain data: {e}"),
            })
    }

    fn evaluate_on_host(&self, path: &Path) -> Result<Option<Value>, ConfigError> {
        let io_error = |source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        };
        let absolute = fs::canonicalize(path).map_err(io_error)?;

        debug!(runtime = %self.host_runtime, path = %absolute.display(), "Evaluating script on host");
        let output = Command::new(&self.host_runtime)
            .arg("-e")
            .arg(HOST_LOADER)
            .arg(&absolute)
            .output()
            .map_err(io_error)?;

        if !output.status.success() {
            return Err(ConfigError::ScriptError {
                path: path.to_path_buf(),
                details: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&stdout) {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(ConfigError::ScriptError {
                path: path.to_path_buf(),
                details: format!("host runtime produced invalid output: {e}"),
            }),
        }
    }
}

impl FormatDecoder for ScriptDecoder {
    fn extensions(&self) -> &[&'static str] {
        &["js"]
    }

    fn decode(&self, path: &Path, options: &LoadFileOptions) -> Result<Option<Value>, ConfigError> {
        if options.load_js_file_with_vm {
            let source = read_text(path, options)?;
            self.evaluate_sandboxed(path, &source)
        } else {
            self.evaluate_on_host(path)
        }
    }
}

/// JavaScript has a single number type; integral results are stored as
/// integers so they compare and print the same as JSON or YAML input.
fn integral_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
                Value::from(f as i64)
            }
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(integral_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, integral_numbers(v)))
                .collect(),
        ),
        other => other,
    }
}

fn classify_script_error(path: &Path, message: &str) -> ConfigError {
    match message.find(SANDBOX_MARKER) {
        Some(start) => {
            let resource = message[start + SANDBOX_MARKER.len()..]
                .trim_end_matches('"')
                .to_string();
            warn!(path = %path.display(), %resource, "Sandboxed script tried to reach host resource");
            ConfigError::SandboxViolation {
                path: path.to_path_buf(),
                resource,
            }
        }
        None => ConfigError::ScriptError {
            path: path.to_path_buf(),
            details: message.to_string(),
        },
    }
}
