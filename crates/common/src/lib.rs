// ================
// crates/common/src/lib.rs
// ================
//! Shared types for the taskchat client/server wire protocol.
//! Event tags and field names match what the browser client emits over the
//! socket: `joinConversation`, `sendMessage`, `receiveMessage`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "msgType", rename_all = "camelCase")]
pub enum ClientToServer {
    /// Subscribe this connection to a conversation room.
    /// Rooms are created implicitly; joining an unknown id is not an error.
    #[serde(rename_all = "camelCase")]
    JoinConversation { conversation_id: String },
    /// Unsubscribe this connection from a conversation room.
    #[serde(rename_all = "camelCase")]
    LeaveConversation { conversation_id: String },
    /// Send a chat message into a conversation.
    /// # Fields
    /// * `conversation_id` - Room the message belongs to
    /// * `sender` - User identifier of the author
    /// * `text` - Message body
    #[serde(rename_all = "camelCase")]
    SendMessage {
        conversation_id: String,
        sender: String,
        text: String,
    },
}

/// Messages sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "msgType", rename_all = "camelCase")]
pub enum ServerToClient {
    /// A persisted message fanned out to every member of its conversation,
    /// sender included. The payload is always the stored record, never the
    /// raw client input.
    ReceiveMessage { message: MessageRecord },
    /// The frame could not be parsed as a known event.
    #[serde(rename_all = "camelCase")]
    MalformedMessage { err_msg: String },
    /// A handled failure: validation rejection or persistence error.
    Error { code: String, message: String },
}

/// Persisted chat message, as stored and as broadcast.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub conversation_id: String,
    pub sender: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Durable user record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Durable todo record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TodoRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Durable conversation record. Distinct from a live room: the participant
/// list here is independent of who is currently subscribed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_serialization() {
        let send = ClientToServer::SendMessage {
            conversation_id: "conv1".to_string(),
            sender: "u1".to_string(),
            text: "hi".to_string(),
        };

        let json = serde_json::to_string(&send).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["msgType"], "sendMessage");
        assert_eq!(parsed["conversationId"], "conv1");
        assert_eq!(parsed["sender"], "u1");
        assert_eq!(parsed["text"], "hi");

        let roundtrip: ClientToServer = serde_json::from_str(&json).unwrap();
        match roundtrip {
            ClientToServer::SendMessage {
                conversation_id,
                sender,
                text,
            } => {
                assert_eq!(conversation_id, "conv1");
                assert_eq!(sender, "u1");
                assert_eq!(text, "hi");
            },
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_join_event_tag() {
        let json = r#"{"msgType":"joinConversation","conversationId":"conv1"}"#;
        let parsed: ClientToServer = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parsed,
            ClientToServer::JoinConversation { conversation_id } if conversation_id == "conv1"
        ));
    }

    #[test]
    fn test_message_record_wire_field_names() {
        let record = MessageRecord {
            id: "abc".to_string(),
            conversation_id: "conv1".to_string(),
            sender: "u1".to_string(),
            text: "hello".to_string(),
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["_id"], "abc");
        assert_eq!(value["conversationId"], "conv1");
        assert!(value.get("createdAt").is_some());

        let event = ServerToClient::ReceiveMessage { message: record };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["msgType"], "receiveMessage");
        assert_eq!(value["message"]["text"], "hello");
    }

    #[test]
    fn test_missing_field_fails_parse() {
        // sendMessage without a conversationId must not deserialize
        let json = r#"{"msgType":"sendMessage","sender":"u1","text":"hi"}"#;
        assert!(serde_json::from_str::<ClientToServer>(json).is_err());
    }
}
