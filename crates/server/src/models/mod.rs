//! Domain and wire types for the NexTalk server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Online/offline state derived from live connection membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Offline => "offline",
        }
    }

    /// Parse a stored status column; anything unrecognized reads as offline.
    pub fn from_db(s: &str) -> Self {
        match s {
            "online" => PresenceStatus::Online,
            _ => PresenceStatus::Offline,
        }
    }
}

/// Public user info (no sensitive data). The password hash never leaves the
/// auth manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub username: String,
    pub profile_pic: String,
    pub status: PresenceStatus,
    pub created_at: DateTime<Utc>,
}

/// Session token for authenticated requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A single chat message between two users. Immutable once appended to
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: MessageSender,
    pub recipient_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Sender identity embedded in a delivered message, so clients can label
/// messages without a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSender {
    pub id: String,
    pub username: String,
}

impl Message {
    pub fn new(
        sender_id: impl Into<String>,
        sender_username: impl Into<String>,
        recipient_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: MessageSender {
                id: sender_id.into(),
                username: sender_username.into(),
            },
            recipient_id: recipient_id.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Events a client may send over its socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Send a message; `seq` correlates the eventual ack.
    ChatMessage {
        seq: u64,
        recipient_id: String,
        text: String,
    },
    /// Ephemeral typing signal addressed to a peer.
    Typing { recipient_id: String },
}

/// Events the server pushes to a connected client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Handshake: tells the client which identity this connection resolved to.
    Ready { user: UserInfo },
    /// Delivery receipt for a `chatMessage`, correlated by `seq`.
    Ack {
        seq: u64,
        status: AckStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<Message>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Live delivery to the recipient.
    ChatMessage { message: Message },
    /// A peer is composing a message.
    UserTyping { username: String },
    /// A newer login replaced this connection; the socket closes after this.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

impl ServerEvent {
    pub fn ack_ok(seq: u64, message: Message) -> Self {
        ServerEvent::Ack {
            seq,
            status: AckStatus::Ok,
            message: Some(message),
            error: None,
        }
    }

    pub fn ack_error(seq: u64, error: impl Into<String>) -> Self {
        ServerEvent::Ack {
            seq,
            status: AckStatus::Error,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_shape() {
        let msg = Message::new("u1", "alice", "u2", "hello");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["sender"]["username"], "alice");
        assert_eq!(json["recipientId"], "u2");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_client_event_parsing() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"chatMessage","seq":7,"recipientId":"u2","text":"hi"}"#,
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::ChatMessage { seq: 7, .. }));

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"typing","recipientId":"u2"}"#).unwrap();
        assert!(matches!(event, ClientEvent::Typing { .. }));
    }

    #[test]
    fn test_ack_tagging() {
        let ack = ServerEvent::ack_error(3, "message cannot be empty");
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["type"], "ack");
        assert_eq!(json["status"], "error");
        assert!(json.get("message").is_none());
    }
}
