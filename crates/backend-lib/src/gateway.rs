// ============================
// taskchat-backend-lib/src/gateway.rs
// ============================
//! Connection gateway: allocates connection handles and owns the per-connection
//! outbound channels. `send` is best-effort by contract; a connection that
//! closed between a membership snapshot and delivery is silently skipped.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use taskchat_common::ServerToClient;

use crate::rooms::{ConnectionId, RoomRegistry};

pub struct ConnectionGateway {
    /// connection id -> outbound event channel
    connections: DashMap<ConnectionId, mpsc::Sender<ServerToClient>>,
    rooms: Arc<RoomRegistry>,
}

impl ConnectionGateway {
    pub fn new(rooms: Arc<RoomRegistry>) -> Self {
        Self {
            connections: DashMap::new(),
            rooms,
        }
    }

    /// Allocate a connection handle. A fresh connection has no joined rooms.
    pub fn register(&self, tx: mpsc::Sender<ServerToClient>) -> ConnectionId {
        let conn = Uuid::new_v4();
        self.connections.insert(conn, tx);
        conn
    }

    /// Subscribe a connection to a conversation room.
    pub fn join(&self, conn: ConnectionId, room_id: &str) {
        self.rooms.join(conn, room_id);
    }

    /// Unsubscribe a connection from a conversation room.
    pub fn leave(&self, conn: ConnectionId, room_id: &str) {
        self.rooms.leave(conn, room_id);
    }

    /// Deliver an event to exactly this connection if it is still live.
    /// A closed or backed-up connection drops the event; broadcast never
    /// stalls or fails because one recipient went away.
    pub fn send(&self, conn: ConnectionId, event: ServerToClient) {
        let tx = self.connections.get(&conn).map(|entry| entry.clone());
        if let Some(tx) = tx {
            if let Err(err) = tx.try_send(event) {
                tracing::debug!(%conn, error = %err, "dropped outbound event");
            }
        }
    }

    /// Release a connection handle and remove it from every room.
    pub fn disconnect(&self, conn: ConnectionId) {
        self.connections.remove(&conn);
        self.rooms.leave_all(conn);
    }

    pub fn is_connected(&self, conn: ConnectionId) -> bool {
        self.connections.contains_key(&conn)
    }

    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }
}
