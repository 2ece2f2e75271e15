//! In-process relay for tests and single-process embedding.
//!
//! [`MemoryHub`] behaves like the WebSocket relay: it groups clients into
//! rooms, forwards messages to everyone in the room except the sender, and
//! hands joiners the room's latest geometry and chat history.

use super::{ConnectionState, Transport, TransportError, TransportEvent, apply_event_state};
use crate::model::ProjectSnapshot;
use crate::protocol::{ChatEntry, ClientMessage, ServerMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum chat entries kept per room.
const MAX_ROOM_HISTORY: usize = 100;

#[derive(Default)]
struct ClientSlot {
    inbox: Vec<TransportEvent>,
    /// (room, user id) once joined
    membership: Option<(String, String)>,
}

#[derive(Default)]
struct RoomState {
    members: Vec<u64>,
    last_state: Option<ProjectSnapshot>,
    history: Vec<ChatEntry>,
}

#[derive(Default)]
struct HubState {
    next_client: u64,
    clients: HashMap<u64, ClientSlot>,
    rooms: HashMap<String, RoomState>,
}

impl HubState {
    fn deliver(&mut self, client: u64, message: &ServerMessage) {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to encode relay message: {}", e);
                return;
            }
        };
        if let Some(slot) = self.clients.get_mut(&client) {
            slot.inbox.push(TransportEvent::Message(json));
        }
    }

    /// Send to every member of `room` except `sender`.
    fn broadcast(&mut self, room: &str, sender: u64, message: &ServerMessage) {
        let members = self
            .rooms
            .get(room)
            .map(|r| r.members.clone())
            .unwrap_or_default();
        for member in members.into_iter().filter(|m| *m != sender) {
            self.deliver(member, message);
        }
    }

    fn leave(&mut self, client: u64) {
        let Some((room, user_id)) = self
            .clients
            .get_mut(&client)
            .and_then(|slot| slot.membership.take())
        else {
            return;
        };
        let now_empty = match self.rooms.get_mut(&room) {
            Some(state) => {
                state.members.retain(|m| *m != client);
                state.members.is_empty()
            }
            None => false,
        };
        self.broadcast(&room, client, &ServerMessage::PeerLeft { user_id });
        if now_empty {
            log::debug!("Removing empty room {}", room);
            self.rooms.remove(&room);
        }
    }

    fn handle(&mut self, client: u64, message: ClientMessage) {
        if let ClientMessage::Join { room, user_id } = message {
            self.leave(client);
            let state = self.rooms.entry(room.clone()).or_default();
            state.members.push(client);
            let joined = ServerMessage::Joined {
                room: room.clone(),
                peer_count: state.members.len(),
                state: state.last_state.clone(),
                history: state.history.clone(),
            };
            if let Some(slot) = self.clients.get_mut(&client) {
                slot.membership = Some((room.clone(), user_id.clone()));
            }
            self.deliver(client, &joined);
            self.broadcast(&room, client, &ServerMessage::PeerJoined { user_id });
            return;
        }
        if matches!(message, ClientMessage::Leave) {
            self.leave(client);
            return;
        }

        let Some((room, from)) = self.clients.get(&client).and_then(|s| s.membership.clone()) else {
            self.deliver(
                client,
                &ServerMessage::Error {
                    message: "Not in a room".to_string(),
                },
            );
            return;
        };

        let outgoing = match message {
            ClientMessage::GeometryUpdate { state } => {
                if let Some(room_state) = self.rooms.get_mut(&room) {
                    room_state.last_state = Some(state.clone());
                }
                ServerMessage::GeometryUpdate { from, state }
            }
            ClientMessage::CursorMove { x, y } => ServerMessage::CursorMove { from, x, y },
            ClientMessage::ObjectSelection { selection } => {
                ServerMessage::ObjectSelection { from, selection }
            }
            ClientMessage::ChatMessage { text } => {
                let entry = ChatEntry {
                    from,
                    text,
                    sent_at: unix_millis(),
                };
                if let Some(room_state) = self.rooms.get_mut(&room) {
                    room_state.history.push(entry.clone());
                    if room_state.history.len() > MAX_ROOM_HISTORY {
                        let excess = room_state.history.len() - MAX_ROOM_HISTORY;
                        room_state.history.drain(..excess);
                    }
                }
                ServerMessage::ChatMessage {
                    from: entry.from,
                    text: entry.text,
                    sent_at: entry.sent_at,
                }
            }
            ClientMessage::Join { .. } | ClientMessage::Leave => return,
        };
        self.broadcast(&room, client, &outgoing);
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Shared in-process relay. Cloning yields another handle to the same hub.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HubState>, TransportError> {
        self.inner
            .lock()
            .map_err(|e| TransportError::Send(format!("Lock error: {}", e)))
    }

    /// Open a new client connection. It reports `Connected` on first poll.
    pub fn connect(&self) -> MemoryTransport {
        let id = match self.lock() {
            Ok(mut hub) => {
                let id = hub.next_client;
                hub.next_client += 1;
                hub.clients.insert(
                    id,
                    ClientSlot {
                        inbox: vec![TransportEvent::Connected],
                        membership: None,
                    },
                );
                Some(id)
            }
            Err(e) => {
                log::error!("Memory hub unavailable: {}", e);
                None
            }
        };
        MemoryTransport {
            hub: self.clone(),
            id,
            state: ConnectionState::Connecting,
        }
    }

    /// Number of clients currently in `room`.
    pub fn room_size(&self, room: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|hub| hub.rooms.get(room).map(|r| r.members.len()))
            .unwrap_or(0)
    }
}

/// One client's connection to a [`MemoryHub`].
pub struct MemoryTransport {
    hub: MemoryHub,
    id: Option<u64>,
    state: ConnectionState,
}

impl MemoryTransport {
    /// Drop the connection, leaving any room.
    pub fn disconnect(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Ok(mut hub) = self.hub.lock() {
            hub.leave(id);
            hub.clients.remove(&id);
        }
        self.state = ConnectionState::Disconnected;
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, message: &str) -> Result<(), TransportError> {
        let id = self.id.ok_or(TransportError::NotConnected)?;
        let mut hub = self.hub.lock()?;
        match serde_json::from_str::<ClientMessage>(message) {
            Ok(parsed) => hub.handle(id, parsed),
            Err(e) => {
                log::warn!("Memory hub: invalid client message: {}", e);
                hub.deliver(
                    id,
                    &ServerMessage::Error {
                        message: format!("Invalid message: {}", e),
                    },
                );
            }
        }
        Ok(())
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        let Some(id) = self.id else {
            return Vec::new();
        };
        let events = match self.hub.lock() {
            Ok(mut hub) => hub
                .clients
                .get_mut(&id)
                .map(|slot| std::mem::take(&mut slot.inbox))
                .unwrap_or_default(),
            Err(e) => {
                log::error!("Memory hub unavailable: {}", e);
                return Vec::new();
            }
        };
        for event in &events {
            apply_event_state(&mut self.state, event);
        }
        events
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(transport: &mut MemoryTransport) -> Vec<ServerMessage> {
        transport
            .poll()
            .into_iter()
            .filter_map(|e| match e {
                TransportEvent::Message(json) => ServerMessage::from_json(&json).ok(),
                _ => None,
            })
            .collect()
    }

    fn join(transport: &mut MemoryTransport, room: &str, user: &str) {
        let msg = ClientMessage::Join {
            room: room.to_string(),
            user_id: user.to_string(),
        };
        transport.send(&msg.to_json().unwrap()).unwrap();
    }

    #[test]
    fn test_connect_reports_connected() {
        let hub = MemoryHub::new();
        let mut client = hub.connect();
        assert_eq!(client.poll(), vec![TransportEvent::Connected]);
        assert!(client.is_connected());
    }

    #[test]
    fn test_messages_not_echoed_to_sender() {
        let hub = MemoryHub::new();
        let mut alice = hub.connect();
        let mut bob = hub.connect();
        join(&mut alice, "p1", "alice");
        join(&mut bob, "p1", "bob");
        messages(&mut alice);
        messages(&mut bob);

        let cursor = ClientMessage::CursorMove { x: 1.0, y: 2.0 };
        alice.send(&cursor.to_json().unwrap()).unwrap();

        assert!(messages(&mut alice).is_empty());
        assert_eq!(
            messages(&mut bob),
            vec![ServerMessage::CursorMove {
                from: "alice".to_string(),
                x: 1.0,
                y: 2.0
            }]
        );
    }

    #[test]
    fn test_rooms_are_isolated() {
        let hub = MemoryHub::new();
        let mut alice = hub.connect();
        let mut bob = hub.connect();
        join(&mut alice, "p1", "alice");
        join(&mut bob, "p2", "bob");
        messages(&mut bob);

        let chat = ClientMessage::ChatMessage { text: "hi".to_string() };
        alice.send(&chat.to_json().unwrap()).unwrap();
        assert!(messages(&mut bob).is_empty());
    }

    #[test]
    fn test_joiner_receives_history_and_peer_left() {
        let hub = MemoryHub::new();
        let mut alice = hub.connect();
        join(&mut alice, "p1", "alice");
        let chat = ClientMessage::ChatMessage { text: "hello".to_string() };
        alice.send(&chat.to_json().unwrap()).unwrap();

        let mut bob = hub.connect();
        join(&mut bob, "p1", "bob");
        let joined = messages(&mut bob);
        match &joined[0] {
            ServerMessage::Joined { peer_count, history, state, .. } => {
                assert_eq!(*peer_count, 2);
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].text, "hello");
                assert!(state.is_none());
            }
            other => panic!("Expected joined, got {:?}", other),
        }

        drop(bob);
        let alice_msgs = messages(&mut alice);
        assert!(alice_msgs.contains(&ServerMessage::PeerJoined { user_id: "bob".to_string() }));
        assert!(alice_msgs.contains(&ServerMessage::PeerLeft { user_id: "bob".to_string() }));
        assert_eq!(hub.room_size("p1"), 1);
    }

    #[test]
    fn test_send_before_join_is_error() {
        let hub = MemoryHub::new();
        let mut alice = hub.connect();
        alice.poll();
        let chat = ClientMessage::ChatMessage { text: "hi".to_string() };
        alice.send(&chat.to_json().unwrap()).unwrap();
        assert!(matches!(messages(&mut alice)[0], ServerMessage::Error { .. }));
    }
}
