//! Dotted-path configuration store with change notification.
//!
//! Holds one nested value tree, reads and writes it through `.`-separated
//! paths, merges whole files into it, and tells subscribers which keys
//! changed.

mod broadcast;
mod changes;
mod path_ops;
mod store;

#[cfg(test)]
mod tests;

pub use broadcast::{EventRouter, SubscriptionId};
pub use changes::{ConfigError, UpdateEvent};
pub use store::ConfigStore;
