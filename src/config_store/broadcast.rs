use std::fmt;

use tracing::trace;

use super::{ConfigError, UpdateEvent, path_ops::path_matches};

const UPDATE_EVENT: &str = "update";
const UPDATE_PREFIX: &str = "update:";

/// Handle returned by [`EventRouter::on`], used to remove the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

/// Where a subscription listens
#[derive(Debug, Clone, PartialEq, Eq)]
enum Channel {
    /// Every update, whatever the key
    Any,
    /// Updates whose key matches the pattern
    Key(String),
}

impl Channel {
    fn parse(event: &str) -> Result<Self, ConfigError> {
        if event == UPDATE_EVENT {
            return Ok(Self::Any);
        }

        match event.strip_prefix(UPDATE_PREFIX) {
            Some(pattern) if !pattern.is_empty() => Ok(Self::Key(pattern.to_string())),
            _ => Err(ConfigError::InvalidEventName(event.to_string())),
        }
    }
}

type Handler = Box<dyn FnMut(&UpdateEvent)>;

struct RouterSubscription {
    id: SubscriptionId,
    channel: Channel,
    handler: Handler,
}

/// Synchronous publish/subscribe for configuration updates.
///
/// Handlers register under `"update"` to see every change, or under
/// `"update:<pattern>"` to see changes whose key matches `pattern`. Patterns
/// are dotted paths where `*` stands for one segment and `**` for any number
/// of segments, so `"update:server.**"` sees every key below `server`.
///
/// Delivery happens on the caller's stack: catch-all handlers first, then
/// pattern handlers, each group in registration order.
#[derive(Default)]
pub struct EventRouter {
    subscriptions: Vec<RouterSubscription>,
    next_id: usize,
}

impl EventRouter {
    /// Creates a router with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `event`.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidEventName` unless `event` is `"update"` or
    /// `"update:<pattern>"` with a non-empty pattern.
    pub fn on<F>(&mut self, event: &str, handler: F) -> Result<SubscriptionId, ConfigError>
    where
        F: FnMut(&UpdateEvent) + 'static,
    {
        let channel = Channel::parse(event)?;
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        trace!(?id, event, "Registering update handler");
        self.subscriptions.push(RouterSubscription {
            id,
            channel,
            handler: Box::new(handler),
        });

        Ok(id)
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.id != id);
        before != self.subscriptions.len()
    }

    /// Delivers `event` to every catch-all handler, then to every handler
    /// whose pattern matches `event.key`.
    pub fn emit(&mut self, event: &UpdateEvent) {
        for sub in &mut self.subscriptions {
            if sub.channel == Channel::Any {
                (sub.handler)(event);
            }
        }

        for sub in &mut self.subscriptions {
            if let Channel::Key(pattern) = &sub.channel {
                if path_matches(&event.key, pattern) {
                    trace!(key = %event.key, %pattern, "Delivering update");
                    (sub.handler)(event);
                }
            }
        }
    }

    /// Number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels: Vec<&Channel> = self.subscriptions.iter().map(|s| &s.channel).collect();
        f.debug_struct("EventRouter")
            .field("subscriptions", &channels)
            .finish()
    }
}
