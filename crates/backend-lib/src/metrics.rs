// ==============
// taskchat-backend-lib/src/metrics.rs
// ==============
//! Central place for metric keys
pub const WS_CONNECTIONS: &str = "ws_connections_total";
pub const WS_DISCONNECTIONS: &str = "ws_disconnections_total";
pub const WS_ACTIVE: &str = "ws_active";
pub const ROOM_JOINS: &str = "room_joins_total";
pub const MESSAGES_PERSISTED: &str = "messages_persisted_total";
pub const MESSAGES_FANNED_OUT: &str = "messages_fanned_out_total";
pub const MESSAGES_REJECTED: &str = "messages_rejected_total";
