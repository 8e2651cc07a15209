//! Chat server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::AuthManager;
use crate::chat::{MessageRouter, TypingRelay};
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;
use crate::store::MessageStore;

/// Configuration for the NexTalk server
#[derive(Clone, Debug)]
pub struct ChatServerConfig {
    /// Base data directory
    pub base_dir: PathBuf,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Socket address to bind
    pub bind_addr: SocketAddr,
    /// Session lifetime in days
    pub session_ttl_days: i64,
}

impl Default for ChatServerConfig {
    fn default() -> Self {
        // NEXTALK_ROOT and NEXTALK_BIND override the defaults.
        let base_dir = std::env::var("NEXTALK_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("nextalk_data"));

        let bind_addr = std::env::var("NEXTALK_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3001)));

        Self {
            db_path: base_dir.join("nextalk.sqlite"),
            base_dir,
            bind_addr,
            session_ttl_days: 30,
        }
    }
}

impl ChatServerConfig {
    /// Create config with a custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            db_path: base_dir.join("nextalk.sqlite"),
            base_dir,
            ..Default::default()
        }
    }

    /// Ensure the data directory exists
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        Ok(())
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub store: Arc<MessageStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub presence: Arc<PresenceTracker>,
    pub router: Arc<MessageRouter>,
    pub typing: Arc<TypingRelay>,
}
