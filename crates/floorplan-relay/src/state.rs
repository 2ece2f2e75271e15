//! Room registry shared by all connections.

use dashmap::DashMap;
use floorplan_core::ProjectSnapshot;
use floorplan_core::protocol::{ChatEntry, ServerMessage};
use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tracing::{debug, error};
use uuid::Uuid;

/// Chat lines replayed to joiners.
pub const MAX_ROOM_HISTORY: usize = 100;
const CHANNEL_CAPACITY: usize = 256;

/// Identifies one WebSocket connection.
pub type ConnectionId = Uuid;

/// A serialized message and the connection it came from.
pub type Envelope = (ConnectionId, String);

/// Room state
struct Room {
    tx: broadcast::Sender<Envelope>,
    /// Connected peers and their user ids
    peers: HashMap<ConnectionId, String>,
    /// Latest geometry, handed to new joiners
    last_state: Option<ProjectSnapshot>,
    history: VecDeque<ChatEntry>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashMap::new(),
            last_state: None,
            history: VecDeque::new(),
        }
    }
}

/// What a connection learns when it joins.
pub struct Joined {
    pub rx: broadcast::Receiver<Envelope>,
    pub message: ServerMessage,
}

/// Shared application state
#[derive(Default)]
pub struct AppState {
    rooms: DashMap<String, Room>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join_room(&self, room_id: &str, conn: ConnectionId, user_id: &str) -> Joined {
        let mut room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(Room::new);
        room.peers.insert(conn, user_id.to_string());
        Joined {
            rx: room.tx.subscribe(),
            message: ServerMessage::Joined {
                room: room_id.to_string(),
                peer_count: room.peers.len(),
                state: room.last_state.clone(),
                history: room.history.iter().cloned().collect(),
            },
        }
    }

    /// Remove a connection, returning its user id. Empty rooms are dropped.
    pub fn leave_room(&self, room_id: &str, conn: ConnectionId) -> Option<String> {
        let mut room = self.rooms.get_mut(room_id)?;
        let user_id = room.peers.remove(&conn);
        if room.peers.is_empty() {
            drop(room);
            self.rooms.remove(room_id);
            debug!("Room {} is empty, removed", room_id);
        }
        user_id
    }

    pub fn set_last_state(&self, room_id: &str, state: ProjectSnapshot) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.last_state = Some(state);
        }
    }

    /// Record a chat line and return it stamped with the current time.
    pub fn push_chat(&self, room_id: &str, from: &str, text: String) -> ChatEntry {
        let entry = ChatEntry {
            from: from.to_string(),
            text,
            sent_at: unix_millis(),
        };
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.history.push_back(entry.clone());
            while room.history.len() > MAX_ROOM_HISTORY {
                room.history.pop_front();
            }
        }
        entry
    }

    /// Send to everyone in the room; receivers skip their own messages.
    pub fn broadcast(&self, room_id: &str, from: ConnectionId, msg: &ServerMessage) {
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode message: {}", e);
                return;
            }
        };
        if let Some(room) = self.rooms.get(room_id) {
            let _ = room.tx.send((from, json));
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use floorplan_core::Project;

    #[test]
    fn test_join_reports_peer_count_and_state() {
        let state = AppState::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let first = state.join_room("house", a, "alice");
        assert!(matches!(
            first.message,
            ServerMessage::Joined { peer_count: 1, state: None, .. }
        ));

        let snapshot = Project::new("House").snapshot();
        state.set_last_state("house", snapshot.clone());
        let second = state.join_room("house", b, "bob");
        match second.message {
            ServerMessage::Joined { peer_count, state, .. } => {
                assert_eq!(peer_count, 2);
                assert_eq!(state, Some(snapshot));
            }
            other => panic!("Expected joined, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_rooms_removed() {
        let state = AppState::new();
        let a = Uuid::new_v4();
        state.join_room("house", a, "alice");
        assert_eq!(state.leave_room("house", a), Some("alice".to_string()));
        assert_eq!(state.room_count(), 0);
        assert_eq!(state.leave_room("house", a), None);
    }

    #[test]
    fn test_chat_history_bounded() {
        let state = AppState::new();
        let a = Uuid::new_v4();
        state.join_room("house", a, "alice");
        for i in 0..(MAX_ROOM_HISTORY + 5) {
            state.push_chat("house", "alice", format!("message {}", i));
        }
        match state.join_room("house", Uuid::new_v4(), "bob").message {
            ServerMessage::Joined { history, .. } => {
                assert_eq!(history.len(), MAX_ROOM_HISTORY);
                assert_eq!(history[0].text, "message 5");
            }
            other => panic!("Expected joined, got {:?}", other),
        }
    }

    #[test]
    fn test_broadcast_reaches_subscribers() {
        let state = AppState::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        state.join_room("house", a, "alice");
        let mut bob = state.join_room("house", b, "bob").rx;

        state.broadcast("house", a, &ServerMessage::PeerLeft { user_id: "carol".into() });
        let (from, json) = bob.try_recv().unwrap();
        assert_eq!(from, a);
        assert!(json.contains("peer_left"));
    }
}
