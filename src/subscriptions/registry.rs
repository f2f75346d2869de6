//! Subscription registry: which connections are interested in which
//! (collection, filter) groups.

use crate::error::{validate_collection, Result};
use crate::types::ConnectionId;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::filter::{Filter, FilterKey};

/// One (collection, filter key) pair a connection belongs to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Membership {
    pub collection: String,
    pub key: FilterKey,
}

/// Connections sharing the same collection and filter.
///
/// Never empty while stored in the registry.
struct InterestGroup {
    filter: Filter,
    connections: HashSet<ConnectionId>,
}

#[derive(Default)]
struct RegistryState {
    /// collection -> filter key -> group.
    collections: HashMap<String, BTreeMap<FilterKey, InterestGroup>>,
    /// Reverse index used for disconnect cleanup.
    memberships: HashMap<ConnectionId, HashSet<Membership>>,
}

impl RegistryState {
    /// Remove one membership, pruning the group and collection if they empty.
    /// Returns true if the connection was a member.
    fn detach(&mut self, collection: &str, connection: &ConnectionId, key: &FilterKey) -> bool {
        let Some(groups) = self.collections.get_mut(collection) else {
            return false;
        };
        let Some(group) = groups.get_mut(key) else {
            return false;
        };
        if !group.connections.remove(connection) {
            return false;
        }

        if group.connections.is_empty() {
            groups.remove(key);
            tracing::debug!(collection, key = %key, "interest group pruned");
        }
        if groups.is_empty() {
            self.collections.remove(collection);
        }
        true
    }
}

/// Process-wide registry of interest groups.
///
/// All entry points go through a single lock, so every call observes and
/// leaves behind a consistent state.
pub struct SubscriptionRegistry {
    state: RwLock<RegistryState>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Register `connection` in the group for `(collection, filter)`.
    ///
    /// `None` or an empty filter selects the unfiltered root group.
    /// Subscribing twice is a no-op the second time; the same key is returned.
    pub fn subscribe(
        &self,
        collection: &str,
        connection: &ConnectionId,
        filter: Option<&Filter>,
    ) -> Result<FilterKey> {
        self.insert(collection, connection, filter)
            .map(|(key, _)| key)
    }

    /// Like [`subscribe`](Self::subscribe), also reporting whether the
    /// membership is new (false when the connection was already a member).
    pub(crate) fn insert(
        &self,
        collection: &str,
        connection: &ConnectionId,
        filter: Option<&Filter>,
    ) -> Result<(FilterKey, bool)> {
        validate_collection(collection)?;
        let filter = filter.cloned().unwrap_or_default();
        let key = filter.key();

        let mut state = self.state.write();
        let groups = state.collections.entry(collection.to_string()).or_default();
        let group = groups.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(collection, key = %key, "interest group created");
            InterestGroup {
                filter,
                connections: HashSet::new(),
            }
        });

        let added = group.connections.insert(connection.clone());
        if added {
            state
                .memberships
                .entry(connection.clone())
                .or_default()
                .insert(Membership {
                    collection: collection.to_string(),
                    key: key.clone(),
                });
            tracing::debug!(collection, key = %key, connection = %connection, "subscribed");
        }

        Ok((key, added))
    }

    /// Remove `connection` from the group for `(collection, filter)`.
    ///
    /// Not being a member is not an error. The group is pruned as soon as its
    /// last connection leaves.
    pub fn unsubscribe(
        &self,
        collection: &str,
        connection: &ConnectionId,
        filter: Option<&Filter>,
    ) -> Result<FilterKey> {
        validate_collection(collection)?;
        let key = filter.map(Filter::key).unwrap_or_default();

        let mut state = self.state.write();
        if state.detach(collection, connection, &key) {
            let now_empty = match state.memberships.get_mut(connection) {
                Some(set) => {
                    set.remove(&Membership {
                        collection: collection.to_string(),
                        key: key.clone(),
                    });
                    set.is_empty()
                }
                None => false,
            };
            if now_empty {
                state.memberships.remove(connection);
            }
            tracing::debug!(collection, key = %key, connection = %connection, "unsubscribed");
        }

        Ok(key)
    }

    /// Remove `connection` from every group in every collection.
    ///
    /// Returns the memberships that were dropped, ordered by collection then
    /// key. Calling it again, or for an unknown connection, returns nothing.
    pub fn remove_connection(&self, connection: &ConnectionId) -> Vec<Membership> {
        let mut state = self.state.write();
        let Some(memberships) = state.memberships.remove(connection) else {
            return Vec::new();
        };

        let mut removed: Vec<Membership> = memberships
            .into_iter()
            .filter(|m| state.detach(&m.collection, connection, &m.key))
            .collect();
        removed.sort();

        tracing::debug!(
            connection = %connection,
            groups = removed.len(),
            "connection removed from registry"
        );
        removed
    }

    /// Keys of the live groups for `collection`, in key order.
    ///
    /// With an item, only groups whose filter matches it are returned (the
    /// root group always matches). Without one, every live group is returned.
    pub fn list_groups(&self, collection: &str, item: Option<&Value>) -> Vec<FilterKey> {
        let state = self.state.read();
        let Some(groups) = state.collections.get(collection) else {
            return Vec::new();
        };

        groups
            .iter()
            .filter(|(_, group)| item.map_or(true, |item| group.filter.matches(item)))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Connections in one group, sorted.
    pub fn group_members(&self, collection: &str, key: &FilterKey) -> Vec<ConnectionId> {
        let state = self.state.read();
        let mut members: Vec<ConnectionId> = state
            .collections
            .get(collection)
            .and_then(|groups| groups.get(key))
            .map(|group| group.connections.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Whether `connection` is in the group for `(collection, filter)`.
    pub fn is_subscribed(
        &self,
        collection: &str,
        connection: &ConnectionId,
        filter: Option<&Filter>,
    ) -> bool {
        let key = filter.map(Filter::key).unwrap_or_default();
        let state = self.state.read();
        state
            .collections
            .get(collection)
            .and_then(|groups| groups.get(&key))
            .is_some_and(|group| group.connections.contains(connection))
    }

    /// Every membership held by `connection`, sorted.
    pub fn subscriptions_of(&self, connection: &ConnectionId) -> Vec<Membership> {
        let state = self.state.read();
        let mut memberships: Vec<Membership> = state
            .memberships
            .get(connection)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        memberships.sort();
        memberships
    }

    /// Collections with at least one live group, sorted.
    pub fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of live groups across all collections.
    pub fn group_count(&self) -> usize {
        self.state
            .read()
            .collections
            .values()
            .map(BTreeMap::len)
            .sum()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
