//! Message routing and typing relay
//!
//! The router persists first and acks on durability; the live push to the
//! recipient is best-effort and can never fail a send. Typing signals skip
//! persistence entirely.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Message, ServerEvent, UserInfo};
use crate::registry::ConnectionRegistry;
use crate::store::MessageStore;

/// Errors on the send path. Any of these nacks the sender and leaves the
/// recipient untouched.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Failed to store message: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Routes point-to-point messages between users.
pub struct MessageRouter {
    store: Arc<MessageStore>,
    registry: Arc<ConnectionRegistry>,
}

impl MessageRouter {
    pub fn new(store: Arc<MessageStore>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { store, registry }
    }

    /// Validate, persist, and deliver one message.
    ///
    /// The returned `Message` is the sender's delivery receipt: it is in
    /// history by the time this returns. Whether the recipient was reachable
    /// live does not affect the result.
    pub async fn send(
        &self,
        sender: &UserInfo,
        recipient_id: &str,
        text: &str,
    ) -> Result<Message, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::EmptyMessage);
        }

        let message = Message::new(&sender.id, &sender.username, recipient_id, text);
        self.store.append(&message).await?;

        self.try_deliver(
            recipient_id,
            ServerEvent::ChatMessage {
                message: message.clone(),
            },
        );

        Ok(message)
    }

    /// Push an event to a user's live connection, if there is one.
    ///
    /// Never errors: the message is already durable, and a missed push is
    /// recovered from history on the next fetch.
    fn try_deliver(&self, recipient_id: &str, event: ServerEvent) {
        let Some(handle) = self.registry.lookup(recipient_id) else {
            debug!("recipient {} not connected, skipping live push", recipient_id);
            return;
        };

        if handle.tx.send(event).is_err() {
            warn!("live push to {} failed, connection closing", recipient_id);
        }
    }
}

/// Forwards ephemeral typing signals to the addressed peer.
pub struct TypingRelay {
    registry: Arc<ConnectionRegistry>,
}

impl TypingRelay {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Forward a typing signal if the peer is connected; otherwise drop it
    /// silently. No persistence, no ack.
    pub fn notify_typing(&self, sender: &UserInfo, recipient_id: &str) {
        if let Some(handle) = self.registry.lookup(recipient_id) {
            let _ = handle.tx.send(ServerEvent::UserTyping {
                username: sender.username.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::PresenceStatus;
    use chrono::Utc;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    fn test_user(id: &str, username: &str) -> UserInfo {
        UserInfo {
            id: id.into(),
            email: format!("{username}@example.com"),
            username: username.into(),
            profile_pic: String::new(),
            status: PresenceStatus::Online,
            created_at: Utc::now(),
        }
    }

    async fn test_router(
        dir: &std::path::Path,
    ) -> (MessageRouter, Arc<MessageStore>, Arc<ConnectionRegistry>) {
        let pool = db::connect(&dir.join("test.sqlite")).await.unwrap();
        let store = Arc::new(MessageStore::new(pool).await.unwrap());
        let registry = Arc::new(ConnectionRegistry::new());
        let router = MessageRouter::new(store.clone(), registry.clone());
        (router, store, registry)
    }

    #[tokio::test]
    async fn test_send_persists_before_receipt() {
        let dir = tempdir().unwrap();
        let (router, store, _registry) = test_router(dir.path()).await;
        let alice = test_user("a1", "alice");

        let message = router.send(&alice, "b1", "hi bob").await.unwrap();
        assert_eq!(message.text, "hi bob");

        let history = store.history("a1", "b1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, message.id);
        assert_eq!(history[0].sender.username, "alice");
    }

    #[tokio::test]
    async fn test_empty_message_rejected_and_not_stored() {
        let dir = tempdir().unwrap();
        let (router, store, _registry) = test_router(dir.path()).await;
        let alice = test_user("a1", "alice");

        let result = router.send(&alice, "b1", "   \t ").await;
        assert!(matches!(result, Err(SendError::EmptyMessage)));

        assert!(store.history("a1", "b1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_delivery_to_connected_recipient() {
        let dir = tempdir().unwrap();
        let (router, _store, registry) = test_router(dir.path()).await;
        let alice = test_user("a1", "alice");

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("b1", tx);

        let sent = router.send(&alice, "b1", "hi").await.unwrap();

        match rx.try_recv() {
            Ok(ServerEvent::ChatMessage { message }) => {
                assert_eq!(message.id, sent.id);
                assert_eq!(message.sender.username, "alice");
            }
            other => panic!("expected live ChatMessage, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_offline_recipient_still_gets_receipt() {
        let dir = tempdir().unwrap();
        let (router, store, _registry) = test_router(dir.path()).await;
        let alice = test_user("a1", "alice");

        // Nobody is connected; the send must still succeed.
        router.send(&alice, "c1", "hello carol").await.unwrap();

        let history = store.history("a1", "c1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "hello carol");
    }

    #[tokio::test]
    async fn test_typing_relay_delivers_when_online() {
        let dir = tempdir().unwrap();
        let (_router, _store, registry) = test_router(dir.path()).await;
        let relay = TypingRelay::new(registry.clone());
        let alice = test_user("a1", "alice");

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("b1", tx);

        relay.notify_typing(&alice, "b1");

        match rx.try_recv() {
            Ok(ServerEvent::UserTyping { username }) => assert_eq!(username, "alice"),
            other => panic!("expected UserTyping, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_typing_relay_drops_when_offline() {
        let dir = tempdir().unwrap();
        let (_router, _store, registry) = test_router(dir.path()).await;
        let relay = TypingRelay::new(registry);
        let alice = test_user("a1", "alice");

        // Peer not connected: nothing happens, nothing panics.
        relay.notify_typing(&alice, "nobody");
    }
}
