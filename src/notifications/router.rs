//! Notification router: turns item lifecycle events into room broadcasts.

use crate::error::{validate_collection, Result};
use crate::subscriptions::{FilterKey, SubscriptionRegistry};
use crate::transport::Transport;
use crate::types::{Notification, NotificationKind, RoomName};
use serde_json::Value;
use std::sync::Arc;

use super::partition::Partition;

/// Routes create/update/delete events to the rooms of matching groups.
///
/// Reads the registry, never mutates it.
pub struct NotificationRouter<T: Transport> {
    registry: Arc<SubscriptionRegistry>,
    transport: Arc<T>,
    room_prefix: String,
}

impl<T: Transport> NotificationRouter<T> {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        transport: Arc<T>,
        room_prefix: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            transport,
            room_prefix: room_prefix.into(),
        }
    }

    pub fn room_prefix(&self) -> &str {
        &self.room_prefix
    }

    /// Room name for one group of `collection`.
    pub fn room_for(&self, collection: &str, key: &FilterKey) -> RoomName {
        RoomName::for_group(&self.room_prefix, collection, key)
    }

    /// Rooms a create or destroy of `item` would be broadcast to.
    pub fn rooms_for(&self, collection: &str, item: &Value) -> Vec<RoomName> {
        self.registry
            .list_groups(collection, Some(item))
            .iter()
            .map(|key| self.room_for(collection, key))
            .collect()
    }

    /// Broadcast `create` to every group matching `item`.
    /// Returns the number of rooms notified.
    pub fn notify_created(&self, collection: &str, item: &Value) -> Result<usize> {
        validate_collection(collection)?;
        let keys = self.registry.list_groups(collection, Some(item));
        let payload = Notification::new(collection, item);
        self.fanout(collection, &keys, NotificationKind::Create, &payload)?;
        Ok(keys.len())
    }

    /// Broadcast `destroy` to every group matching the deleted `item`.
    /// Returns the number of rooms notified.
    pub fn notify_deleted(&self, collection: &str, item: &Value) -> Result<usize> {
        validate_collection(collection)?;
        let keys = self.registry.list_groups(collection, Some(item));
        let payload = Notification::new(collection, item);
        self.fanout(collection, &keys, NotificationKind::Destroy, &payload)?;
        Ok(keys.len())
    }

    /// Classify every matching group by the before/after snapshots and
    /// broadcast `exit` (old item), `update` (new item) and `enter`
    /// (new item) accordingly.
    pub fn notify_updated(
        &self,
        collection: &str,
        old_item: &Value,
        new_item: &Value,
    ) -> Result<Partition> {
        validate_collection(collection)?;
        let old_keys = self.registry.list_groups(collection, Some(old_item));
        let new_keys = self.registry.list_groups(collection, Some(new_item));
        let partition = Partition::compute(&old_keys, &new_keys);

        tracing::trace!(
            collection,
            leaving = partition.leaving.len(),
            staying = partition.staying.len(),
            entering = partition.entering.len(),
            "update partitioned"
        );

        if !partition.leaving.is_empty() {
            let old_payload = Notification::new(collection, old_item);
            self.fanout(collection, &partition.leaving, NotificationKind::Exit, &old_payload)?;
        }
        let new_payload = Notification::new(collection, new_item);
        self.fanout(collection, &partition.staying, NotificationKind::Update, &new_payload)?;
        self.fanout(collection, &partition.entering, NotificationKind::Enter, &new_payload)?;

        Ok(partition)
    }

    fn fanout(
        &self,
        collection: &str,
        keys: &[FilterKey],
        kind: NotificationKind,
        payload: &Notification,
    ) -> Result<()> {
        for key in keys {
            let room = self.room_for(collection, key);
            tracing::debug!(room = %room, event = %kind, "broadcast");
            self.transport.broadcast(&room, kind, payload)?;
        }
        Ok(())
    }
}
