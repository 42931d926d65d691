//! Holder of the currently signed-in identity.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use simguardian_core::types::id::UserId;

/// Publishes sign-in and sign-out transitions to any number of watchers.
#[derive(Debug, Clone)]
pub struct SessionGate {
    identity: Arc<watch::Sender<Option<UserId>>>,
}

impl SessionGate {
    /// Create a signed-out gate.
    pub fn new() -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            identity: Arc::new(identity),
        }
    }

    /// Sign `owner` in, replacing any current identity.
    ///
    /// Returns `false` if `owner` was already signed in.
    pub fn sign_in(&self, owner: UserId) -> bool {
        let changed = self.identity.send_if_modified(|current| {
            if *current == Some(owner) {
                return false;
            }
            *current = Some(owner);
            true
        });
        if changed {
            info!(owner = %owner, "Signed in");
        }
        changed
    }

    /// Sign out and return the identity that was signed in.
    pub fn sign_out(&self) -> Option<UserId> {
        let mut previous = None;
        self.identity.send_if_modified(|current| {
            previous = current.take();
            previous.is_some()
        });
        if let Some(owner) = previous {
            info!(owner = %owner, "Signed out");
        }
        previous
    }

    /// Currently signed-in identity.
    pub fn current(&self) -> Option<UserId> {
        *self.identity.borrow()
    }

    /// Receiver notified on every identity change.
    pub fn watch(&self) -> watch::Receiver<Option<UserId>> {
        self.identity.subscribe()
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}
