//! Connection Registry
//!
//! Live mapping from user id to that user's single active connection,
//! last-connect-wins. Each registration gets a monotonically increasing
//! epoch; a disconnect only evicts the entry whose epoch it carries, so a
//! stale disconnect can never undo a newer registration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::models::ServerEvent;

/// Handle to one live connection's outbound channel.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub epoch: u64,
    pub tx: UnboundedSender<ServerEvent>,
}

/// Registry of live connections, one entry per user.
///
/// Mutations are short synchronous critical sections; nothing awaits while
/// holding the lock.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionHandle>>,
    next_epoch: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_epoch: AtomicU64::new(1),
        }
    }

    /// Insert or replace the connection for a user and return its epoch.
    ///
    /// A replaced connection is told to close via a `superseded` event; its
    /// later disconnect will carry a stale epoch and be ignored.
    pub fn register(&self, user_id: &str, tx: UnboundedSender<ServerEvent>) -> u64 {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let old = self
            .connections
            .write()
            .insert(user_id.to_string(), ConnectionHandle { epoch, tx });

        if let Some(old) = old {
            debug!(
                "superseding connection for {} (epoch {} -> {})",
                user_id, old.epoch, epoch
            );
            let _ = old.tx.send(ServerEvent::Superseded);
        }

        epoch
    }

    /// Remove the mapping only if it still belongs to the given epoch.
    /// Returns whether an entry was actually removed.
    pub fn unregister(&self, user_id: &str, epoch: u64) -> bool {
        let mut connections = self.connections.write();
        match connections.get(user_id) {
            Some(handle) if handle.epoch == epoch => {
                connections.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Current connection for a user, if any.
    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.connections.read().get(user_id).cloned()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.connections.read().contains_key(user_id)
    }

    /// Snapshot of all currently connected user ids.
    pub fn online_users(&self) -> Vec<String> {
        self.connections.read().keys().cloned().collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
