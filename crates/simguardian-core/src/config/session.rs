//! Session configuration for the notifier daemon.

use serde::{Deserialize, Serialize};

/// Session settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// User id (UUID) to sign in as when the daemon starts.
    ///
    /// When absent the daemon starts signed out and the store stays
    /// uninitialized.
    #[serde(default)]
    pub identity: Option<String>,
}
