use crate::entity::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of entity ids with unique membership.
///
/// Iteration order is ascending by id, which keeps query results and grid
/// snapshots deterministic from one run to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    ids: BTreeSet<EntityId>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an id, returning false if it was already present.
    pub fn add(&mut self, id: EntityId) -> bool {
        self.ids.insert(id)
    }

    /// Removes an id, returning false if it was absent.
    pub fn remove(&mut self, id: EntityId) -> bool {
        self.ids.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    /// Adds every member of `other` to this set.
    pub fn union(&mut self, other: &EntitySet) {
        self.ids.extend(other.ids.iter().copied());
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<EntityId> for EntitySet {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a EntitySet {
    type Item = EntityId;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, EntityId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter().copied()
    }
}
