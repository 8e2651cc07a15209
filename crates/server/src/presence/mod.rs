//! Presence tracking
//!
//! Online/offline state is derived from registry membership and mirrored to
//! the persisted status column. The registry epoch guards the disconnect
//! path: a disconnect for a superseded connection must not undo the state
//! set by a newer one.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::auth::AuthManager;
use crate::models::{PresenceStatus, ServerEvent, UserInfo};
use crate::registry::ConnectionRegistry;

pub struct PresenceTracker {
    auth: Arc<AuthManager>,
    registry: Arc<ConnectionRegistry>,
}

impl PresenceTracker {
    pub fn new(auth: Arc<AuthManager>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { auth, registry }
    }

    /// Register a fresh connection and mark the user online.
    ///
    /// Returns the registration epoch; the caller hands it back to
    /// [`on_disconnect`](Self::on_disconnect) when the connection closes.
    pub async fn on_connect(&self, user: &UserInfo, tx: UnboundedSender<ServerEvent>) -> u64 {
        let epoch = self.registry.register(&user.id, tx);

        if let Err(e) = self.auth.set_status(&user.id, PresenceStatus::Online).await {
            warn!("failed to persist online status for {}: {}", user.username, e);
        }

        epoch
    }

    /// Unregister a closing connection and mark the user offline, unless a
    /// newer connection already replaced this epoch.
    pub async fn on_disconnect(&self, user_id: &str, epoch: u64) {
        if !self.registry.unregister(user_id, epoch) {
            return;
        }

        if let Err(e) = self.auth.set_status(user_id, PresenceStatus::Offline).await {
            warn!("failed to persist offline status for {}: {}", user_id, e);
        }
    }
}
