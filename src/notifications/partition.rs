//! Before/after classification of interest groups for an update.

use crate::subscriptions::FilterKey;
use crate::types::NotificationKind;
use std::collections::BTreeSet;

/// How an update looks from each matching group's point of view.
///
/// Every key that matched the old or the new snapshot lands in exactly one
/// of the three sets. [`Partition::compute`] yields sorted sets free of
/// duplicates; lookups do not rely on that ordering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Matched before, not after: receive `exit` with the old item.
    pub leaving: Vec<FilterKey>,
    /// Matched after, not before: receive `enter` with the new item.
    pub entering: Vec<FilterKey>,
    /// Matched both: receive `update` with the new item.
    pub staying: Vec<FilterKey>,
}

impl Partition {
    /// Split the groups matching the old and new snapshots.
    pub fn compute(old: &[FilterKey], new: &[FilterKey]) -> Self {
        let old: BTreeSet<&FilterKey> = old.iter().collect();
        let new: BTreeSet<&FilterKey> = new.iter().collect();

        Self {
            leaving: old.difference(&new).map(|k| (*k).clone()).collect(),
            entering: new.difference(&old).map(|k| (*k).clone()).collect(),
            staying: old.intersection(&new).map(|k| (*k).clone()).collect(),
        }
    }

    /// The notification a group receives, if it is affected at all.
    pub fn kind_of(&self, key: &FilterKey) -> Option<NotificationKind> {
        if self.leaving.contains(key) {
            Some(NotificationKind::Exit)
        } else if self.entering.contains(key) {
            Some(NotificationKind::Enter)
        } else if self.staying.contains(key) {
            Some(NotificationKind::Update)
        } else {
            None
        }
    }

    /// Total number of affected groups.
    pub fn len(&self) -> usize {
        self.leaving.len() + self.entering.len() + self.staying.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
