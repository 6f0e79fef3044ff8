use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::{
    ConfigError, UpdateEvent,
    broadcast::{EventRouter, SubscriptionId},
    path_ops::{navigate_path, set_value_at_path, values_equal},
};
use crate::loading::{FileLoader, LoadFileOptions};

/// An in-memory configuration tree addressed by dotted paths.
///
/// Values are assembled with [`set`](Self::set), [`merge`](Self::merge) and
/// [`load_from_file`](Self::load_from_file), read back with [`get`](Self::get)
/// and the typed accessors, and observed through the [`EventRouter`].
///
/// Every write that changes a value is reported once as an [`UpdateEvent`];
/// writing a value equal to the stored one does nothing.
///
/// ```
/// use cfgtree::ConfigStore;
/// use serde_json::json;
///
/// let mut store = ConfigStore::new();
/// store.set("server.port", 8080);
/// store.merge(json!({ "level": "debug" }), Some("log"));
///
/// assert_eq!(store.get("server.port"), Some(&json!(8080)));
/// assert_eq!(store.get_as_string("log.level", None).as_deref(), Some("debug"));
/// ```
#[derive(Debug)]
pub struct ConfigStore {
    tree: Value,
    router: EventRouter,
    loader: FileLoader,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Creates an empty store with its own router and the default file loader.
    pub fn new() -> Self {
        Self::with_router(EventRouter::new())
    }

    /// Creates an empty store that reports updates through `router`.
    pub fn with_router(router: EventRouter) -> Self {
        Self {
            tree: Value::Object(Map::new()),
            router,
            loader: FileLoader::new(),
        }
    }

    /// Replaces the file loader, e.g. to register extra formats or to give
    /// scripts a specific environment snapshot.
    pub fn with_loader(mut self, loader: FileLoader) -> Self {
        self.loader = loader;
        self
    }

    /// The router that delivers update events.
    pub fn events(&self) -> &EventRouter {
        &self.router
    }

    /// Mutable access to the router, for registering handlers.
    pub fn events_mut(&mut self) -> &mut EventRouter {
        &mut self.router
    }

    /// Registers an update handler, see [`EventRouter::on`].
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidEventName` for names other than
    /// `"update"` and `"update:<pattern>"`.
    pub fn on<F>(&mut self, event: &str, handler: F) -> Result<SubscriptionId, ConfigError>
    where
        F: FnMut(&UpdateEvent) + 'static,
    {
        self.router.on(event, handler)
    }

    /// Removes an update handler. Returns `false` if it was already gone.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.router.off(id)
    }

    /// Stores `value` at `key`, creating intermediate mappings as needed.
    ///
    /// If the value differs from what is stored (an absent key always
    /// differs), the tree is updated and one [`UpdateEvent`] is emitted.
    /// Handlers run before this returns. A handler that needs to write back
    /// into the same store must arrange that itself and is responsible for
    /// not recursing forever.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        debug!(key, %value, "Setting config value");

        let old_value = navigate_path(&self.tree, key);
        if old_value.is_some_and(|old| values_equal(old, &value)) {
            return self;
        }

        let old_value = old_value.cloned();
        set_value_at_path(&mut self.tree, key, value.clone());
        self.router
            .emit(&UpdateEvent::new(key.to_string(), value, old_value));
        self
    }

    /// Returns the value stored at `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        navigate_path(&self.tree, key)
    }

    /// Returns the value stored at `key`, or `default` if there is none.
    ///
    /// Stored `null`, `false`, `0` and `""` are returned as they are.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    /// Deserializes the value stored at `key`.
    ///
    /// # Errors
    /// Returns `ConfigError::TypeMismatch` if the stored value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.get(key)
            .map(|value| {
                T::deserialize(value).map_err(|_| ConfigError::TypeMismatch {
                    path: key.to_string(),
                    expected_type: std::any::type_name::<T>(),
                    actual_value: value.clone(),
                })
            })
            .transpose()
    }

    /// Whether a value is stored at `key`.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets every top-level entry of `obj`, optionally below `prefix_key`.
    ///
    /// Entries are visited in order and written with [`set`](Self::set), so
    /// a nested mapping replaces whatever was stored under its key. Trailing
    /// dots on the prefix are ignored. Sequences contribute their indices as
    /// keys; scalars have no entries and merge nothing.
    pub fn merge(&mut self, obj: Value, prefix_key: Option<&str>) -> &mut Self {
        debug!(prefix_key = prefix_key.unwrap_or(""), "Merging config values");

        let entries: Vec<(String, Value)> = match obj {
            Value::Object(map) => map.into_iter().collect(),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item))
                .collect(),
            other => {
                warn!(value = %other, "Merge source has no keys, nothing merged");
                Vec::new()
            }
        };

        for (key, value) in entries {
            let key = match prefix_key {
                Some(prefix) if !prefix.is_empty() => {
                    format!("{}.{key}", prefix.trim_end_matches('.'))
                }
                _ => key,
            };
            self.set(&key, value);
        }

        self
    }

    /// Returns the value at `key` as a string.
    ///
    /// Strings are returned as is; numbers, booleans and sequences use the
    /// JavaScript rendering, mappings are rendered as JSON. Absent and `null`
    /// values yield `default`.
    pub fn get_as_string(&self, key: &str, default: Option<&str>) -> Option<String> {
        match self.get(key) {
            None | Some(Value::Null) => default.map(str::to_string),
            Some(value) => Some(stringify(value)),
        }
    }

    /// Returns the value at `key` as a number.
    ///
    /// Numbers pass through; anything else is read like JavaScript's
    /// `parseFloat` reads its string form. Absent and `null` values yield
    /// `default`; values with no numeric reading yield `None`.
    pub fn get_as_number(&self, key: &str, default: Option<f64>) -> Option<f64> {
        match self.get(key) {
            None | Some(Value::Null) => default,
            Some(value) => to_number(value),
        }
    }

    /// Returns the floor of [`get_as_number`](Self::get_as_number).
    pub fn get_as_integer(&self, key: &str, default: Option<i64>) -> Option<i64> {
        match self.get(key) {
            None | Some(Value::Null) => default,
            Some(value) => to_number(value).and_then(floor_to_i64),
        }
    }

    /// Loads `path` with default [`LoadFileOptions`] and merges it.
    ///
    /// # Errors
    /// See [`load_from_file_with`](Self::load_from_file_with).
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.load_from_file_with(path, &LoadFileOptions::default())
    }

    /// Decodes `path` and merges its top-level entries below
    /// `options.prefix_key`.
    ///
    /// The format is chosen by extension (`.json`, `.yml`, `.yaml`, `.js`).
    /// A file that decodes to nothing, `null`, `false`, `0` or `""` leaves the
    /// store untouched. On error nothing is merged.
    ///
    /// # Errors
    /// * `ConfigError::UnsupportedFormat` - Unknown extension
    /// * `ConfigError::UnsupportedEncoding` - Unknown `options.encoding`
    /// * `ConfigError::IoError` - The file cannot be read
    /// * `ConfigError::JsonParse` / `ConfigError::YamlParse` - Malformed content
    /// * `ConfigError::ScriptError` - A script failed to run
    /// * `ConfigError::SandboxViolation` - A sandboxed script reached for host resources
    #[instrument(skip(self, path, options), fields(path = %path.as_ref().display()))]
    pub fn load_from_file_with(
        &mut self,
        path: impl AsRef<Path>,
        options: &LoadFileOptions,
    ) -> Result<(), ConfigError> {
        let path = path.as_ref();
        debug!(
            prefix_key = options.prefix_key.as_deref().unwrap_or(""),
            "Loading config file"
        );

        let decoded = self.loader.load(path, options)?;
        match decoded {
            Some(value) if !is_falsy(&value) => {
                self.merge(value, options.prefix_key.as_deref());
            }
            _ => debug!("Config file holds no values"),
        }

        Ok(())
    }

    /// The whole configuration tree.
    pub fn to_json(&self) -> &Value {
        &self.tree
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_float(f),
            _ => n.to_string(),
        },
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let rendered = if f > 0.0 { "Infinity" } else { "-Infinity" };
        rendered.to_string()
    } else {
        // Display prints the shortest round-trip form, with no ".0" for integral values.
        f.to_string()
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(_) | Value::Object(_) => None,
        other => parse_float(&stringify(other)),
    }
}

/// Floors `n` into an `i64`; infinities and out-of-range values have no
/// integer reading.
fn floor_to_i64(n: f64) -> Option<i64> {
    let floored = n.floor();
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive.
    (floored >= i64::MIN as f64 && floored < i64::MAX as f64).then(|| floored as i64)
}

/// Reads the longest leading decimal literal of `s`, like JavaScript's
/// `parseFloat`. Returns `None` where `parseFloat` returns `NaN`.
fn parse_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let unsigned = s.trim_start_matches(['+', '-']);
    let sign_len = s.len() - unsigned.len();
    if sign_len > 1 {
        return None;
    }
    if unsigned.starts_with("Infinity") {
        return Some(if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let bytes = unsigned.as_bytes();
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let int_len = digits(0);
    let mut end = int_len;
    let mut frac_len = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_len = digits(end + 1);
        end += 1 + frac_len;
    }
    if int_len == 0 && frac_len == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..sign_len + end].parse().ok()
}
