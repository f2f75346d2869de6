//! Hub tying the registry, router and transport together.

use crate::error::{Result, TransceiverError};
use crate::notifications::{NotificationRouter, Partition};
use crate::session::Session;
use crate::subscriptions::SubscriptionRegistry;
use crate::transport::{ChannelTransport, ConnectionHandle, Transport};
use crate::types::{ConnectionId, RoomName};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Hub configuration.
#[derive(Clone, Debug)]
pub struct TransceiverConfig {
    /// Prefix prepended to every room name.
    /// Default: "transceiver_"
    pub room_prefix: String,
}

impl Default for TransceiverConfig {
    fn default() -> Self {
        Self {
            room_prefix: "transceiver_".to_string(),
        }
    }
}

/// The subscription engine bound to one transport.
///
/// Provides a unified interface for:
/// - Tracking which connections are live
/// - Handing out per-connection [`Session`]s
/// - Routing item lifecycle events to subscribed rooms
/// - Cleaning up exactly once when a connection goes away
pub struct Transceiver<T: Transport> {
    config: TransceiverConfig,
    registry: Arc<SubscriptionRegistry>,
    transport: Arc<T>,
    router: NotificationRouter<T>,
    connections: Mutex<HashSet<ConnectionId>>,
}

impl<T: Transport> Transceiver<T> {
    pub fn new(config: TransceiverConfig, transport: Arc<T>) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let router =
            NotificationRouter::new(registry.clone(), transport.clone(), config.room_prefix.clone());
        Self {
            config,
            registry,
            transport,
            router,
            connections: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &TransceiverConfig {
        &self.config
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn router(&self) -> &NotificationRouter<T> {
        &self.router
    }

    // --- Connection lifecycle ---

    /// Mark a connection as live. Returns false if it already was.
    pub fn connect(&self, id: &ConnectionId) -> bool {
        let added = self.connections.lock().insert(id.clone());
        if added {
            tracing::debug!(connection = %id, "connection registered");
        }
        added
    }

    /// Handle a connection teardown.
    ///
    /// Only the first call for a live connection removes its subscriptions;
    /// repeated deliveries return false and touch nothing. Rooms are left to
    /// the transport, which tears them down with the connection.
    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        if !self.connections.lock().remove(id) {
            tracing::debug!(connection = %id, "duplicate disconnect ignored");
            return false;
        }
        let removed = self.registry.remove_connection(id);
        tracing::debug!(connection = %id, groups = removed.len(), "connection disconnected");
        true
    }

    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.connections.lock().contains(id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Subscription interface for a live connection.
    ///
    /// The session stops accepting subscriptions once the connection is
    /// disconnected.
    pub fn session(&self, id: &ConnectionId) -> Result<Session<'_, T>> {
        if !self.is_connected(id) {
            return Err(TransceiverError::ConnectionNotFound(id.clone()));
        }
        Ok(Session::new(
            id.clone(),
            &self.registry,
            &*self.transport,
            &self.config.room_prefix,
        )
        .bound_to(&self.connections))
    }

    // --- Notifications ---

    /// Rooms a create or destroy of `item` would reach.
    pub fn rooms_for(&self, collection: &str, item: &Value) -> Vec<RoomName> {
        self.router.rooms_for(collection, item)
    }

    pub fn notify_created(&self, collection: &str, item: &Value) -> Result<usize> {
        self.router.notify_created(collection, item)
    }

    pub fn notify_updated(
        &self,
        collection: &str,
        old_item: &Value,
        new_item: &Value,
    ) -> Result<Partition> {
        self.router.notify_updated(collection, old_item, new_item)
    }

    pub fn notify_deleted(&self, collection: &str, item: &Value) -> Result<usize> {
        self.router.notify_deleted(collection, item)
    }
}

impl Transceiver<ChannelTransport> {
    /// Hub over a fresh in-process transport.
    pub fn in_process(config: TransceiverConfig) -> Self {
        Self::new(config, Arc::new(ChannelTransport::new()))
    }

    /// Open a transport connection and register it with the hub.
    pub fn open(&self, id: impl Into<ConnectionId>) -> ConnectionHandle {
        let handle = self.transport.connect(id);
        self.connect(&handle.id);
        handle
    }

    /// Tear down a connection on both sides. Returns false if already closed.
    pub fn close(&self, id: &ConnectionId) -> bool {
        self.transport.disconnect(id);
        self.disconnect(id)
    }
}
