//! Real-time notification store configuration.

use serde::{Deserialize, Serialize};

/// Real-time engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Notification store settings.
    #[serde(default)]
    pub notifications: NotificationStoreConfig,
}

/// Settings for the notification store actor and its subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationStoreConfig {
    /// Capacity of the command queue feeding the store actor.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    /// Capacity of each insert-event subscription channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Capacity of the broadcast channel carrying store events.
    #[serde(default = "default_announcement_buffer")]
    pub announcement_buffer: usize,
    /// How long shutdown waits for in-flight persistence requests, in seconds.
    #[serde(default = "default_persist_drain")]
    pub persist_drain_seconds: u64,
}

impl Default for NotificationStoreConfig {
    fn default() -> Self {
        Self {
            command_buffer: default_command_buffer(),
            event_buffer: default_event_buffer(),
            announcement_buffer: default_announcement_buffer(),
            persist_drain_seconds: default_persist_drain(),
        }
    }
}

fn default_command_buffer() -> usize {
    64
}

fn default_event_buffer() -> usize {
    256
}

fn default_announcement_buffer() -> usize {
    128
}

fn default_persist_drain() -> u64 {
    10
}
