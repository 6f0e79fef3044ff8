//! cfgtree - dotted-path configuration store.
//!
//! Applications assemble configuration from several sources and read it
//! back by dotted path:
//!
//! - Nested value tree addressed as `"server.tls.cert"`
//! - Ordered merges of whole files, optionally under a namespace
//! - JSON, YAML and sandboxed JavaScript sources
//! - Synchronous update notifications with `*` / `**` key patterns
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cfgtree::{ConfigStore, LoadFileOptions};
//!
//! let mut store = ConfigStore::new();
//! store.set("server.port", 8080);
//!
//! store.on("update:server.**", |event| {
//!     println!("{} is now {}", event.key, event.value);
//! })?;
//!
//! store.load_from_file_with("defaults.yaml", &LoadFileOptions::default().with_prefix_key("app"))?;
//! let port = store.get_as_integer("server.port", Some(80));
//! # Ok::<(), cfgtree::ConfigError>(())
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Configuration tree, path access and update routing.
pub mod config_store;

/// File decoding for the store.
pub mod loading;

/// Tracing subscriber setup for applications embedding the store.
pub mod tracing_config;

pub use config_store::{ConfigError, ConfigStore, EventRouter, SubscriptionId, UpdateEvent};
pub use loading::{FileLoader, FormatDecoder, LoadFileOptions};
