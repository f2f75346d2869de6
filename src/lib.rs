//! # Transceiver
//!
//! Filtered subscriptions and change-notification fanout for real-time
//! collections.
//!
//! ## Core Concepts
//!
//! - **Collections**: Named classes of items whose lifecycle is observable
//! - **Filters**: Equality constraints narrowing interest to a subset of items
//! - **Interest groups**: Connections sharing the same (collection, filter)
//! - **Rooms**: Transport broadcast channels, one per interest group
//! - **Transitions**: `create`, `update`, `destroy`, plus `enter`/`exit` when
//!   an update moves an item into or out of a filter
//!
//! ## Example
//!
//! ```ignore
//! use transceiver::{Filter, Transceiver, TransceiverConfig};
//!
//! let hub = Transceiver::in_process(TransceiverConfig::default());
//! let conn = hub.open("socket-1");
//!
//! // Subscribe to blue models only
//! hub.session(&conn.id)?
//!     .subscribe("model", Some(&Filter::new().with("color", "blue")))?;
//!
//! // A green model turned blue: the filtered room gets "enter"
//! hub.notify_updated(
//!     "model",
//!     &json!({"id": 4, "color": "green"}),
//!     &json!({"id": 4, "color": "blue"}),
//! )?;
//!
//! let envelope = conn.recv()?;
//! ```

pub mod error;
pub mod hub;
pub mod notifications;
pub mod session;
pub mod subscriptions;
pub mod transport;
pub mod types;

// Re-exports
pub use error::{Result, TransceiverError};
pub use hub::{Transceiver, TransceiverConfig};
pub use notifications::{NotificationRouter, Partition};
pub use session::Session;
pub use subscriptions::{Filter, FilterKey, Membership, SubscriptionRegistry};
pub use transport::{
    ChannelTransport, ChannelTransportConfig, ConnectionHandle, Envelope, Transport,
};
pub use types::*;
