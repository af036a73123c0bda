use std::collections::HashSet;

use uuid::Uuid;

use crate::store::RelationshipIds;

/// Users a viewer must never be shown in discovery: the viewer, anyone
/// blocked in either direction, friends, and both sides of pending requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionSet {
    ids: HashSet<Uuid>,
}

impl ExclusionSet {
    pub fn build(viewer_id: Uuid, relations: &RelationshipIds) -> Self {
        let ids = std::iter::once(viewer_id)
            .chain(relations.blocked.iter().copied())
            .chain(relations.blocked_by.iter().copied())
            .chain(relations.friends.iter().copied())
            .chain(relations.requests_sent.iter().copied())
            .chain(relations.requests_received.iter().copied())
            .collect();
        Self { ids }
    }

    pub fn contains(&self, user_id: &Uuid) -> bool {
        self.ids.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sorted for deterministic query parameters.
    pub fn to_sorted_vec(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.ids.iter().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_relations_exclude_only_self() {
        let viewer = Uuid::now_v7();
        let set = ExclusionSet::build(viewer, &RelationshipIds::default());
        assert_eq!(set.len(), 1);
        assert!(set.contains(&viewer));
    }

    #[test]
    fn union_covers_every_edge_kind_and_dedupes() {
        let viewer = Uuid::now_v7();
        let [blocked, blocker, friend, sent, received] = [(); 5].map(|_| Uuid::now_v7());
        let relations = RelationshipIds {
            blocked: vec![blocked],
            blocked_by: vec![blocker, blocked],
            friends: vec![friend],
            requests_sent: vec![sent],
            requests_received: vec![received, friend],
        };

        let set = ExclusionSet::build(viewer, &relations);
        assert_eq!(set.len(), 6);
        for id in [viewer, blocked, blocker, friend, sent, received] {
            assert!(set.contains(&id));
        }
        assert!(!set.contains(&Uuid::now_v7()));
        assert_eq!(set.to_sorted_vec().len(), 6);
    }
}
