//! Ephemeral cursor and selection state of remote collaborators.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// What a collaborator has selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub object_id: Uuid,
    /// Entity kind, e.g. `wall`, `room`, `placement`.
    pub object_type: String,
}

impl Selection {
    pub fn new(object_id: Uuid, object_type: impl Into<String>) -> Self {
        Self {
            object_id,
            object_type: object_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PresenceState {
    pub user_id: String,
    pub cursor: Option<Point>,
    pub selection: Option<Selection>,
}

/// Presence of every remote collaborator, keyed by user id.
///
/// Updates carrying the local user's own id are ignored.
#[derive(Debug, Clone)]
pub struct PresenceMap {
    local_user: String,
    peers: HashMap<String, PresenceState>,
}

impl PresenceMap {
    pub fn new(local_user: impl Into<String>) -> Self {
        Self {
            local_user: local_user.into(),
            peers: HashMap::new(),
        }
    }

    pub fn local_user(&self) -> &str {
        &self.local_user
    }

    fn entry(&mut self, user_id: &str) -> &mut PresenceState {
        self.peers
            .entry(user_id.to_string())
            .or_insert_with(|| PresenceState {
                user_id: user_id.to_string(),
                ..PresenceState::default()
            })
    }

    /// Returns false if the update was ignored.
    pub fn update_cursor(&mut self, user_id: &str, cursor: Point) -> bool {
        if user_id == self.local_user {
            return false;
        }
        self.entry(user_id).cursor = Some(cursor);
        true
    }

    /// A `None` selection removes the peer's entry entirely.
    pub fn update_selection(&mut self, user_id: &str, selection: Option<Selection>) -> bool {
        if user_id == self.local_user {
            return false;
        }
        match selection {
            Some(selection) => self.entry(user_id).selection = Some(selection),
            None => {
                self.peers.remove(user_id);
            }
        }
        true
    }

    pub fn remove(&mut self, user_id: &str) -> Option<PresenceState> {
        self.peers.remove(user_id)
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn get(&self, user_id: &str) -> Option<&PresenceState> {
        self.peers.get(user_id)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PresenceState> {
        self.peers.values()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Peers that currently have `object_id` selected.
    pub fn selecting(&self, object_id: Uuid) -> impl Iterator<Item = &str> {
        self.peers
            .values()
            .filter(move |p| p.selection.as_ref().is_some_and(|s| s.object_id == object_id))
            .map(|p| p.user_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_updates_ignored() {
        let mut presence = PresenceMap::new("alice");
        assert!(!presence.update_cursor("alice", Point::new(1.0, 2.0)));
        assert!(!presence.update_selection("alice", Some(Selection::new(Uuid::new_v4(), "wall"))));
        assert!(presence.is_empty());
    }

    #[test]
    fn test_cursor_and_selection_tracked() {
        let mut presence = PresenceMap::new("alice");
        let wall = Uuid::new_v4();
        presence.update_cursor("bob", Point::new(10.0, 20.0));
        presence.update_selection("bob", Some(Selection::new(wall, "wall")));

        let bob = presence.get("bob").unwrap();
        assert_eq!(bob.cursor, Some(Point::new(10.0, 20.0)));
        assert_eq!(bob.selection.as_ref().map(|s| s.object_id), Some(wall));
        assert_eq!(presence.selecting(wall).collect::<Vec<_>>(), vec!["bob"]);
    }

    #[test]
    fn test_null_selection_removes_entry() {
        let mut presence = PresenceMap::new("alice");
        presence.update_cursor("bob", Point::new(10.0, 20.0));
        presence.update_selection("bob", Some(Selection::new(Uuid::new_v4(), "room")));

        presence.update_selection("bob", None);
        assert!(presence.get("bob").is_none());
    }

    #[test]
    fn test_remove_peer() {
        let mut presence = PresenceMap::new("alice");
        presence.update_cursor("bob", Point::ZERO);
        presence.update_cursor("carol", Point::ZERO);
        assert!(presence.remove("bob").is_some());
        assert_eq!(presence.len(), 1);
    }
}
