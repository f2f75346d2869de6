//! Transport boundary and an in-process channel transport.
//!
//! The engine only needs three primitives from a real-time transport:
//! joining a room, leaving a room, and broadcasting an event to a room.
//! [`ChannelTransport`] implements them over bounded crossbeam channels, one
//! per connection, for embedders without a network layer and for tests.

use crate::error::{Result, TransceiverError};
use crate::types::{ConnectionId, Notification, NotificationKind, RoomName};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Primitives the engine requires from a transport.
pub trait Transport: Send + Sync {
    /// Add a connection to a room. Joining twice is a no-op.
    fn join(&self, connection: &ConnectionId, room: &RoomName) -> Result<()>;

    /// Remove a connection from a room. Leaving a room not joined is a no-op.
    fn leave(&self, connection: &ConnectionId, room: &RoomName) -> Result<()>;

    /// Deliver an event to every connection currently in a room.
    fn broadcast(
        &self,
        room: &RoomName,
        event: NotificationKind,
        payload: &Notification,
    ) -> Result<()>;
}

/// A delivered event as seen by one connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub room: RoomName,
    pub event: NotificationKind,
    pub payload: Notification,
}

/// Configuration for [`ChannelTransport`].
#[derive(Clone, Debug)]
pub struct ChannelTransportConfig {
    /// Max buffered events per connection before new events are dropped.
    /// Default: 1000
    pub buffer_size: usize,
}

impl Default for ChannelTransportConfig {
    fn default() -> Self {
        Self { buffer_size: 1000 }
    }
}

/// Receiving end of one connection.
pub struct ConnectionHandle {
    pub id: ConnectionId,
    /// Channel to receive events.
    pub receiver: Receiver<Envelope>,
}

impl ConnectionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> std::result::Result<Envelope, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<Envelope, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> std::result::Result<Envelope, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<Envelope> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Default)]
struct ChannelState {
    senders: HashMap<ConnectionId, Sender<Envelope>>,
    rooms: HashMap<RoomName, HashSet<ConnectionId>>,
}

impl ChannelState {
    fn leave_all(&mut self, connection: &ConnectionId) {
        self.rooms.retain(|_, members| {
            members.remove(connection);
            !members.is_empty()
        });
    }
}

/// In-process transport backed by one bounded channel per connection.
pub struct ChannelTransport {
    config: ChannelTransportConfig,
    state: RwLock<ChannelState>,
}

impl ChannelTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Self {
        Self::with_config(ChannelTransportConfig::default())
    }

    pub fn with_config(config: ChannelTransportConfig) -> Self {
        Self {
            config,
            state: RwLock::new(ChannelState::default()),
        }
    }

    /// Open a connection and return its receiving end.
    ///
    /// Reusing an id replaces the previous channel; the old handle stops
    /// receiving.
    pub fn connect(&self, id: impl Into<ConnectionId>) -> ConnectionHandle {
        let id = id.into();
        let (sender, receiver) = bounded(self.config.buffer_size);
        self.state.write().senders.insert(id.clone(), sender);
        tracing::debug!(connection = %id, "transport connection opened");
        ConnectionHandle { id, receiver }
    }

    /// Close a connection and drop it from every room.
    /// Returns false if it was not connected.
    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        let mut state = self.state.write();
        let existed = state.senders.remove(id).is_some();
        state.leave_all(id);
        existed
    }

    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.state.read().senders.contains_key(id)
    }

    /// Rooms a connection is in, sorted.
    pub fn rooms_of(&self, id: &ConnectionId) -> Vec<RoomName> {
        let state = self.state.read();
        let mut rooms: Vec<RoomName> = state
            .rooms
            .iter()
            .filter(|(_, members)| members.contains(id))
            .map(|(room, _)| room.clone())
            .collect();
        rooms.sort();
        rooms
    }

    /// Connections in a room, sorted.
    pub fn members_of(&self, room: &RoomName) -> Vec<ConnectionId> {
        let state = self.state.read();
        let mut members: Vec<ConnectionId> = state
            .rooms
            .get(room)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn connection_count(&self) -> usize {
        self.state.read().senders.len()
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ChannelTransport {
    fn join(&self, connection: &ConnectionId, room: &RoomName) -> Result<()> {
        let mut state = self.state.write();
        if !state.senders.contains_key(connection) {
            return Err(TransceiverError::ConnectionNotFound(connection.clone()));
        }
        if state
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(connection.clone())
        {
            tracing::debug!(connection = %connection, room = %room, "joined room");
        }
        Ok(())
    }

    fn leave(&self, connection: &ConnectionId, room: &RoomName) -> Result<()> {
        let mut state = self.state.write();
        let now_empty = match state.rooms.get_mut(room) {
            Some(members) => {
                if members.remove(connection) {
                    tracing::debug!(connection = %connection, room = %room, "left room");
                }
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            state.rooms.remove(room);
        }
        Ok(())
    }

    fn broadcast(
        &self,
        room: &RoomName,
        event: NotificationKind,
        payload: &Notification,
    ) -> Result<()> {
        let envelope = Envelope {
            room: room.clone(),
            event,
            payload: payload.clone(),
        };
        let mut closed = Vec::new();

        {
            let state = self.state.read();
            let Some(members) = state.rooms.get(room) else {
                return Ok(());
            };
            for id in members {
                let Some(sender) = state.senders.get(id) else {
                    continue;
                };
                match sender.try_send(envelope.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(connection = %id, room = %room, event = %event, "buffer full, event dropped");
                    }
                    Err(TrySendError::Disconnected(_)) => closed.push(id.clone()),
                }
            }
        }

        // Receivers that went away are treated as disconnected.
        if !closed.is_empty() {
            let mut state = self.state.write();
            for id in closed {
                tracing::warn!(connection = %id, room = %room, "receiver closed, dropping connection");
                state.senders.remove(&id);
                state.leave_all(&id);
            }
        }

        Ok(())
    }
}
