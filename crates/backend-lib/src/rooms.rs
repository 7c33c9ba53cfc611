// ============================
// taskchat-backend-lib/src/rooms.rs
// ============================
//! In-memory room membership.
//!
//! A room is the live set of connections subscribed to a conversation id.
//! Rooms exist implicitly: the first join creates the entry, and membership
//! is ephemeral (reset on restart). The registry owns both directions of the
//! mapping; nothing else mutates them.

use std::collections::HashSet;

use dashmap::DashMap;
use uuid::Uuid;

/// Opaque identifier for one live client connection.
pub type ConnectionId = Uuid;

#[derive(Default)]
pub struct RoomRegistry {
    /// conversation id -> member connections
    rooms: DashMap<String, HashSet<ConnectionId>>,
    /// connection -> joined conversation ids
    joined: DashMap<ConnectionId, HashSet<String>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Idempotent; unknown rooms are created.
    pub fn join(&self, conn: ConnectionId, room_id: &str) {
        self.rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(conn);
        self.joined
            .entry(conn)
            .or_default()
            .insert(room_id.to_string());
    }

    /// Remove a connection from a room. Idempotent.
    pub fn leave(&self, conn: ConnectionId, room_id: &str) {
        if let Some(mut members) = self.rooms.get_mut(room_id) {
            members.remove(&conn);
        }
        if let Some(mut rooms) = self.joined.get_mut(&conn) {
            rooms.remove(room_id);
        }
    }

    /// Remove a connection from every room it belongs to. Called once, on
    /// disconnect.
    pub fn leave_all(&self, conn: ConnectionId) {
        if let Some((_, rooms)) = self.joined.remove(&conn) {
            for room_id in rooms {
                if let Some(mut members) = self.rooms.get_mut(&room_id) {
                    members.remove(&conn);
                }
            }
        }
    }

    /// Snapshot of a room's members at time of call.
    pub fn members_of(&self, room_id: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Rooms a connection is currently joined to.
    pub fn rooms_of(&self, conn: ConnectionId) -> Vec<String> {
        self.joined
            .get(&conn)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }
}
