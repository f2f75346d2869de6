//! Change-notification fanout.
//!
//! Given the snapshot(s) of an item involved in a lifecycle event, the router
//! asks the registry which groups match and broadcasts to their rooms:
//! - `create` / `destroy` go to every group matching the item
//! - an update is split per group into `exit`, `update` and `enter`
//!
//! The split is a set difference/intersection over the groups matching the
//! old and new snapshots, so a group never sees both `exit` and `enter` for
//! the same change.

mod partition;
mod router;

pub use partition::Partition;
pub use router::NotificationRouter;
