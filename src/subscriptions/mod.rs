//! Subscription registry for filtered collection interest.
//!
//! Connections declare interest in a named collection, optionally narrowed
//! by a set of equality constraints. Connections sharing the same
//! (collection, filter) form an interest group:
//! - Groups are created on first subscribe
//! - Groups are pruned the moment their last connection leaves
//! - Membership is a set, so repeated subscribes are idempotent
//!
//! # Example
//!
//! ```ignore
//! let registry = SubscriptionRegistry::new();
//! let conn = ConnectionId::from("socket-1");
//!
//! let blue = Filter::new().with("color", "blue");
//! let key = registry.subscribe("model", &conn, Some(&blue))?;
//!
//! // Which groups does this item reach?
//! let keys = registry.list_groups("model", Some(&json!({"id": 4, "color": "blue"})));
//! assert!(keys.contains(&key));
//!
//! // On disconnect
//! registry.remove_connection(&conn);
//! ```

mod filter;
mod registry;

pub use filter::{Filter, FilterKey};
pub use registry::{Membership, SubscriptionRegistry};
