//! Core types shared by the registry, router and transports.

use crate::subscriptions::FilterKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one transport connection.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        ConnectionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        ConnectionId(s.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        ConnectionId(s)
    }
}

/// Name of a transport broadcast group.
///
/// Each interest group maps to exactly one room:
/// `prefix + collection` for the unfiltered root group, otherwise
/// `prefix + collection + ":" + filter_key`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomName(pub String);

impl RoomName {
    /// Derive the room for an interest group.
    pub fn for_group(prefix: &str, collection: &str, key: &FilterKey) -> Self {
        if key.is_root() {
            RoomName(format!("{}{}", prefix, collection))
        } else {
            RoomName(format!("{}{}:{}", prefix, collection, key.as_str()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomName({})", self.0)
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The five notification kinds a connection can receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Create,
    Update,
    Destroy,
    /// An update made the item start matching a group's filter.
    Enter,
    /// An update made the item stop matching a group's filter.
    Exit,
}

impl NotificationKind {
    /// Wire event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Create => "create",
            NotificationKind::Update => "update",
            NotificationKind::Destroy => "destroy",
            NotificationKind::Enter => "enter",
            NotificationKind::Exit => "exit",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound message payload: `{ collection, id, data }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub collection: String,
    /// The item's `id` field, or `null` when the item has none.
    pub id: serde_json::Value,
    /// The item snapshot, passed through unmodified.
    pub data: serde_json::Value,
}

impl Notification {
    pub fn new(collection: &str, item: &serde_json::Value) -> Self {
        Self {
            collection: collection.to_string(),
            id: item.get("id").cloned().unwrap_or(serde_json::Value::Null),
            data: item.clone(),
        }
    }
}
