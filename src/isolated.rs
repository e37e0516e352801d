//! Isolated (child) entity relation
//!
//! An isolated entity shares its parent's classification but has its own
//! raw measurement stream. Its deltas are folded into the parent; it never
//! owns buckets.

use crate::error::{LedgerError, Result};
use crate::EntityId;
use std::collections::{BTreeMap, BTreeSet};

/// Parent -> children mapping, one parent per child
#[derive(Debug, Clone, Default)]
pub struct IsolatedEntities {
    parent_of: BTreeMap<EntityId, EntityId>,
    children_of: BTreeMap<EntityId, BTreeSet<EntityId>>,
}

impl IsolatedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `child` under `parent`
    ///
    /// A child already registered elsewhere moves to the new parent.
    /// Returns the previous parent, if any. The relation stays one level
    /// deep: an entity cannot be its own child, a child cannot adopt, and a
    /// parent cannot become a child.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<Option<EntityId>> {
        let reason = if parent == child {
            Some("entity cannot be its own child")
        } else if self.is_child(parent) {
            Some("parent is itself isolated")
        } else if self.children_of.contains_key(&child) {
            Some("child has isolated entities of its own")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(LedgerError::InvalidIsolation {
                parent,
                child,
                reason,
            });
        }

        let previous = self.parent_of.insert(child, parent);
        if let Some(old) = previous {
            if old != parent {
                self.detach(old, child);
            }
        }
        self.children_of.entry(parent).or_default().insert(child);
        Ok(previous)
    }

    /// Unregister `child`, returning the parent it belonged to
    pub fn remove_child(&mut self, child: EntityId) -> Option<EntityId> {
        let parent = self.parent_of.remove(&child)?;
        self.detach(parent, child);
        Some(parent)
    }

    fn detach(&mut self, parent: EntityId, child: EntityId) {
        if let Some(set) = self.children_of.get_mut(&parent) {
            set.remove(&child);
            if set.is_empty() {
                self.children_of.remove(&parent);
            }
        }
    }

    pub fn parent_of(&self, child: EntityId) -> Option<EntityId> {
        self.parent_of.get(&child).copied()
    }

    pub fn is_child(&self, entity: EntityId) -> bool {
        self.parent_of.contains_key(&entity)
    }

    /// Children of `parent` in ascending order
    pub fn children_of(&self, parent: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.children_of
            .get(&parent)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.parent_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent_of.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut iso = IsolatedEntities::new();
        assert_eq!(iso.add_child(10048, 99099).unwrap(), None);
        assert_eq!(iso.add_child(10048, 99100).unwrap(), None);

        assert_eq!(iso.parent_of(99099), Some(10048));
        assert!(iso.is_child(99100));
        assert!(!iso.is_child(10048));
        assert_eq!(iso.children_of(10048).collect::<Vec<_>>(), vec![99099, 99100]);
        assert_eq!(iso.len(), 2);
    }

    #[test]
    fn test_readd_moves_child() {
        let mut iso = IsolatedEntities::new();
        iso.add_child(1, 50).unwrap();
        assert_eq!(iso.add_child(2, 50).unwrap(), Some(1));

        assert_eq!(iso.parent_of(50), Some(2));
        assert_eq!(iso.children_of(1).count(), 0);
        assert_eq!(iso.children_of(2).collect::<Vec<_>>(), vec![50]);
        assert_eq!(iso.len(), 1);
    }

    #[test]
    fn test_readd_same_parent_is_idempotent() {
        let mut iso = IsolatedEntities::new();
        iso.add_child(1, 50).unwrap();
        assert_eq!(iso.add_child(1, 50).unwrap(), Some(1));
        assert_eq!(iso.children_of(1).collect::<Vec<_>>(), vec![50]);
    }

    #[test]
    fn test_remove_child() {
        let mut iso = IsolatedEntities::new();
        iso.add_child(1, 50).unwrap();
        assert_eq!(iso.remove_child(50), Some(1));
        assert_eq!(iso.remove_child(50), None);
        assert!(iso.is_empty());
        assert_eq!(iso.children_of(1).count(), 0);
    }

    #[test]
    fn test_self_isolation_rejected() {
        let mut iso = IsolatedEntities::new();
        let err = iso.add_child(5, 5).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidIsolation {
                parent: 5,
                child: 5,
                ..
            }
        ));
        assert!(iso.is_empty());
    }

    #[test]
    fn test_relation_stays_one_level_deep() {
        let mut iso = IsolatedEntities::new();
        iso.add_child(10, 20).unwrap();

        // A child cannot adopt
        assert!(iso.add_child(20, 30).is_err());
        assert!(!iso.is_child(30));

        // A parent cannot become a child
        assert!(iso.add_child(40, 10).is_err());
        assert!(!iso.is_child(10));
        assert_eq!(iso.children_of(10).collect::<Vec<_>>(), vec![20]);

        // Once detached, the former child may adopt
        iso.remove_child(20);
        assert!(iso.add_child(20, 30).is_ok());
    }
}
