//! Drives the notification store from session transitions.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use simguardian_core::types::id::UserId;

use crate::notification::store::NotificationStore;

use super::gate::SessionGate;

/// Keeps a [`NotificationStore`] initialized for whoever is signed in at the
/// [`SessionGate`], and torn down while nobody is.
#[derive(Debug)]
pub struct SessionBinding {
    gate: SessionGate,
    store: NotificationStore,
    /// Identity the store was last successfully initialized for
    bound: Option<UserId>,
}

impl SessionBinding {
    /// Creates a new binding. Nothing happens until [`run`](Self::run).
    pub fn new(gate: SessionGate, store: NotificationStore) -> Self {
        Self {
            gate,
            store,
            bound: None,
        }
    }

    /// Run on a background task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Follow the gate until `shutdown` flips to `true`, then tear the store down.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut identity = self.gate.watch();
        let current = *identity.borrow_and_update();
        self.apply(current).await;

        if !*shutdown.borrow() {
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Session binding received shutdown signal");
                            break;
                        }
                    }
                    changed = identity.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = *identity.borrow_and_update();
                        self.apply(next).await;
                    }
                }
            }
        }

        if self.bound.take().is_some() {
            if let Err(e) = self.store.teardown().await {
                warn!(error = %e, "Failed to tear down notification store on exit");
            }
        }
        info!("Session binding stopped");
    }

    async fn apply(&mut self, identity: Option<UserId>) {
        if identity == self.bound {
            return;
        }

        match identity {
            Some(owner) => {
                // A previous binding is torn down by `initialize` itself.
                self.bound = None;
                match self.store.initialize(Some(owner)).await {
                    Ok(unread) => {
                        self.bound = Some(owner);
                        info!(owner = %owner, unread, "Notifications bound to session");
                    }
                    Err(e) => {
                        error!(owner = %owner, error = %e, "Failed to load notifications for session");
                    }
                }
            }
            None => {
                self.bound = None;
                if let Err(e) = self.store.teardown().await {
                    warn!(error = %e, "Failed to tear down notification store");
                }
            }
        }
    }
}
