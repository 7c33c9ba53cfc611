// ============================
// taskchat-backend-lib/src/fanout.rs
// ============================
//! Chat Fan-out Engine
//!
//! `handle_send` is the write path of the chat core: validate the payload,
//! persist the message, then broadcast the *persisted* record to every
//! current member of the conversation's room, sender included. The local
//! echo gives every client, originator included, the server's ordering.
//!
//! Failure semantics:
//! - Validation failure: rejected before persistence, nothing reaches a room.
//! - Persistence failure: fail-closed. No broadcast happens; the error is
//!   logged and returned so the socket layer can report it to the sender.
//! - Delivery failure to a single member (closed mid-broadcast): dropped for
//!   that member only, the rest of the room still receives the message.

use std::sync::Arc;

use metrics::counter;
use serde_json::json;

use taskchat_common::{MessageRecord, ServerToClient};

use crate::error::AppError;
use crate::gateway::ConnectionGateway;
use crate::metrics as keys;
use crate::rooms::{ConnectionId, RoomRegistry};
use crate::store::{RecordKind, RecordStore};
use crate::validation;

pub struct FanoutEngine<S> {
    store: S,
    rooms: Arc<RoomRegistry>,
    gateway: Arc<ConnectionGateway>,
}

impl<S: RecordStore> FanoutEngine<S> {
    pub fn new(store: S, rooms: Arc<RoomRegistry>, gateway: Arc<ConnectionGateway>) -> Self {
        Self {
            store,
            rooms,
            gateway,
        }
    }

    /// Persist a message and broadcast it to its conversation room.
    ///
    /// Returns the stored record. Per-room delivery order is the order in
    /// which persistence completed; there is no ordering guarantee across
    /// rooms and no delivery guarantee for members disconnecting mid-send.
    pub async fn handle_send(
        &self,
        _sender_conn: ConnectionId,
        conversation_id: &str,
        sender: &str,
        text: &str,
    ) -> Result<MessageRecord, AppError> {
        if let Err(err) = validation::validate_send_message(conversation_id, sender, text) {
            counter!(keys::MESSAGES_REJECTED).increment(1);
            return Err(err.into());
        }

        // persist first; any storage error aborts before a single delivery
        let stored = self
            .store
            .insert(
                RecordKind::Message,
                json!({
                    "conversationId": conversation_id,
                    "sender": sender,
                    "text": text,
                }),
            )
            .await
            .inspect_err(|err| {
                tracing::error!(%conversation_id, error = %err, "message persistence failed, send dropped");
            })?;
        counter!(keys::MESSAGES_PERSISTED).increment(1);

        let message: MessageRecord = serde_json::from_value(stored)?;

        let members = self.rooms.members_of(conversation_id);
        tracing::debug!(
            %conversation_id,
            message_id = %message.id,
            members = members.len(),
            "broadcasting message"
        );

        for member in members {
            self.gateway.send(
                member,
                ServerToClient::ReceiveMessage {
                    message: message.clone(),
                },
            );
            counter!(keys::MESSAGES_FANNED_OUT).increment(1);
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FlatFileStore;
    use serde_json::Value;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn engine(
        store: FlatFileStore,
    ) -> (
        FanoutEngine<FlatFileStore>,
        Arc<RoomRegistry>,
        Arc<ConnectionGateway>,
    ) {
        let rooms = Arc::new(RoomRegistry::new());
        let gateway = Arc::new(ConnectionGateway::new(Arc::clone(&rooms)));
        let engine = FanoutEngine::new(store, Arc::clone(&rooms), Arc::clone(&gateway));
        (engine, rooms, gateway)
    }

    #[tokio::test]
    async fn test_broadcast_payload_is_the_stored_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path()).unwrap();
        let (engine, _rooms, gateway) = engine(store.clone());

        let (tx, mut rx) = mpsc::channel(8);
        let conn = gateway.register(tx);
        gateway.join(conn, "conv1");

        let stored = engine.handle_send(conn, "conv1", "u1", "hi").await.unwrap();
        assert!(!stored.id.is_empty());

        match rx.recv().await.unwrap() {
            ServerToClient::ReceiveMessage { message } => assert_eq!(message, stored),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validation_failure_persists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path()).unwrap();
        let (engine, _rooms, gateway) = engine(store.clone());

        let (tx, mut rx) = mpsc::channel(8);
        let conn = gateway.register(tx);
        gateway.join(conn, "conv1");

        let result = engine.handle_send(conn, "", "u1", "hi").await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let messages = store.find(RecordKind::Message, None).await.unwrap();
        assert!(messages.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_broadcast_to_empty_room() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path()).unwrap();
        let (engine, _rooms, gateway) = engine(store.clone());

        let (tx, mut rx) = mpsc::channel(8);
        let conn = gateway.register(tx);
        // conn never joins conv1

        let stored = engine.handle_send(conn, "conv1", "u1", "hi").await.unwrap();

        // persisted but delivered to nobody, not even the sender
        let found = store
            .find(RecordKind::Message, Some(&serde_json::json!({"_id": stored.id})))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    /// Store that fails every insert, for exercising the fail-closed path.
    #[derive(Clone)]
    struct FailingStore;

    #[async_trait::async_trait]
    impl RecordStore for FailingStore {
        async fn insert(&self, _kind: RecordKind, _fields: Value) -> Result<Value, AppError> {
            Err(AppError::Storage("injected write failure".to_string()))
        }

        async fn find(
            &self,
            _kind: RecordKind,
            _filter: Option<&Value>,
        ) -> Result<Vec<Value>, AppError> {
            Ok(Vec::new())
        }

        async fn update_by_id(
            &self,
            _kind: RecordKind,
            _id: &str,
            _fields: Value,
        ) -> Result<Option<Value>, AppError> {
            Ok(None)
        }

        async fn delete_by_id(&self, _kind: RecordKind, _id: &str) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_is_fail_closed() {
        let rooms = Arc::new(RoomRegistry::new());
        let gateway = Arc::new(ConnectionGateway::new(Arc::clone(&rooms)));
        let engine = FanoutEngine::new(FailingStore, Arc::clone(&rooms), Arc::clone(&gateway));

        let (tx, mut rx) = mpsc::channel(8);
        let conn = gateway.register(tx);
        gateway.join(conn, "conv1");

        let (tx2, mut rx2) = mpsc::channel(8);
        let other = gateway.register(tx2);
        gateway.join(other, "conv1");

        let result = engine.handle_send(conn, "conv1", "u1", "hi").await;
        assert!(matches!(result, Err(AppError::Storage(_))));

        // no partial broadcast on a failed write
        assert!(rx.try_recv().is_err());
        assert!(rx2.try_recv().is_err());
    }
}
