// ============================
// taskchat-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the taskchat real-time server.

pub mod config;
pub mod error;
pub mod fanout;
pub mod gateway;
pub mod metrics;
pub mod records;
pub mod rooms;
pub mod store;
pub mod validation;
pub mod ws_router;

use std::sync::Arc;

use crate::config::Settings;
use crate::fanout::FanoutEngine;
use crate::gateway::ConnectionGateway;
use crate::rooms::RoomRegistry;
use crate::store::RecordStore;

/// Application state shared across all handlers.
///
/// Everything the fan-out path needs is constructed once here and passed by
/// reference; there is no ambient global socket or registry lookup.
#[derive(Clone)]
pub struct AppState<S> {
    /// Record store backend
    pub store: S,
    /// Live room membership
    pub rooms: Arc<RoomRegistry>,
    /// Connection registry with per-connection send
    pub gateway: Arc<ConnectionGateway>,
    /// Persist-then-broadcast engine
    pub fanout: Arc<FanoutEngine<S>>,
    /// Settings
    pub settings: Arc<Settings>,
}

impl<S: RecordStore + Clone + Send + Sync + 'static> AppState<S> {
    /// Create a new application state
    pub fn new(store: S, settings: Settings) -> Self {
        let rooms = Arc::new(RoomRegistry::new());
        let gateway = Arc::new(ConnectionGateway::new(Arc::clone(&rooms)));
        let fanout = Arc::new(FanoutEngine::new(
            store.clone(),
            Arc::clone(&rooms),
            Arc::clone(&gateway),
        ));

        Self {
            store,
            rooms,
            gateway,
            fanout,
            settings: Arc::new(settings),
        }
    }
}
