//! Per-connection subscription interface.
//!
//! A [`Session`] binds one connection to the registry and transport. It keeps
//! the two in step: every registry membership has a joined room, and the
//! room name is handed back so callers can surface it to clients.

use crate::error::{Result, TransceiverError};
use crate::subscriptions::{Filter, Membership, SubscriptionRegistry};
use crate::transport::Transport;
use crate::types::{ConnectionId, RoomName};
use parking_lot::Mutex;
use std::collections::HashSet;

pub struct Session<'a, T: Transport> {
    connection: ConnectionId,
    registry: &'a SubscriptionRegistry,
    transport: &'a T,
    room_prefix: &'a str,
    /// Live connection set of the owning hub, if any.
    live: Option<&'a Mutex<HashSet<ConnectionId>>>,
}

impl<'a, T: Transport> Session<'a, T> {
    pub fn new(
        connection: ConnectionId,
        registry: &'a SubscriptionRegistry,
        transport: &'a T,
        room_prefix: &'a str,
    ) -> Self {
        Self {
            connection,
            registry,
            transport,
            room_prefix,
            live: None,
        }
    }

    /// Refuse new subscriptions once the connection leaves `live`.
    pub(crate) fn bound_to(mut self, live: &'a Mutex<HashSet<ConnectionId>>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn connection(&self) -> &ConnectionId {
        &self.connection
    }

    /// Register interest and join the matching room.
    ///
    /// If the room cannot be joined, a membership added by this call is
    /// removed again before the error is returned.
    pub fn subscribe(&self, collection: &str, filter: Option<&Filter>) -> Result<RoomName> {
        // Held until the room is joined so a concurrent disconnect either sees
        // this membership or makes the call fail.
        let _live = match self.live {
            Some(live) => {
                let guard = live.lock();
                if !guard.contains(&self.connection) {
                    return Err(TransceiverError::ConnectionNotFound(self.connection.clone()));
                }
                Some(guard)
            }
            None => None,
        };

        let (key, added) = self.registry.insert(collection, &self.connection, filter)?;
        let room = RoomName::for_group(self.room_prefix, collection, &key);
        if let Err(e) = self.transport.join(&self.connection, &room) {
            if added {
                self.registry.unsubscribe(collection, &self.connection, filter)?;
            }
            tracing::debug!(connection = %self.connection, room = %room, error = %e, "join failed");
            return Err(e);
        }
        Ok(room)
    }

    /// Drop interest and leave the matching room.
    pub fn unsubscribe(&self, collection: &str, filter: Option<&Filter>) -> Result<RoomName> {
        let key = self.registry.unsubscribe(collection, &self.connection, filter)?;
        let room = RoomName::for_group(self.room_prefix, collection, &key);
        self.transport.leave(&self.connection, &room)?;
        Ok(room)
    }

    /// Subscribe to each filter in turn, stopping at the first failure.
    pub fn subscribe_all(&self, collection: &str, filters: &[Filter]) -> Result<Vec<RoomName>> {
        filters
            .iter()
            .map(|filter| self.subscribe(collection, Some(filter)))
            .collect()
    }

    /// Unsubscribe from each filter in turn, stopping at the first failure.
    pub fn unsubscribe_all(&self, collection: &str, filters: &[Filter]) -> Result<Vec<RoomName>> {
        filters
            .iter()
            .map(|filter| self.unsubscribe(collection, Some(filter)))
            .collect()
    }

    /// Remove every membership this connection holds and leave their rooms.
    pub fn clear_rooms(&self) -> Result<Vec<RoomName>> {
        let removed = self.registry.remove_connection(&self.connection);
        let mut rooms = Vec::with_capacity(removed.len());
        for Membership { collection, key } in removed {
            let room = RoomName::for_group(self.room_prefix, &collection, &key);
            self.transport.leave(&self.connection, &room)?;
            rooms.push(room);
        }
        Ok(rooms)
    }

    /// Memberships currently held, sorted.
    pub fn subscriptions(&self) -> Vec<Membership> {
        self.registry.subscriptions_of(&self.connection)
    }
}
