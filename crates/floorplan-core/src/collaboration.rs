//! Real-time collaboration over a [`Transport`].
//!
//! Geometry is shared as whole-project snapshots with last-write-wins
//! semantics: whichever `geometry_update` a client receives last replaces
//! its state entirely, and concurrent edits from other peers are lost.
//! Cursor and selection presence ride alongside and are never persisted.

use crate::model::ProjectSnapshot;
use crate::presence::{PresenceMap, Selection};
use crate::protocol::{ChatEntry, ClientMessage, ServerMessage};
use crate::transport::{Transport, TransportError, TransportEvent};
use kurbo::Point;
use std::time::{Duration, Instant};

/// Default minimum spacing between cursor broadcasts (about 20 per second).
pub const DEFAULT_CURSOR_INTERVAL: Duration = Duration::from_millis(50);

/// Chat lines kept locally.
const MAX_CHAT_HISTORY: usize = 100;

/// Events surfaced to the owner of a [`Synchronizer`].
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Connected,
    Disconnected,
    /// Joined a room; `state` is the room's latest geometry, if any
    Joined {
        room: String,
        peer_count: usize,
        state: Option<ProjectSnapshot>,
    },
    PeerJoined { user_id: String },
    PeerLeft { user_id: String },
    /// A peer replaced the shared geometry
    RemoteGeometry { from: String, state: ProjectSnapshot },
    /// A peer's cursor or selection changed
    PresenceChanged { user_id: String },
    Chat(ChatEntry),
    Error { message: String },
}

/// Bridges the local editor and a relay connection.
pub struct Synchronizer<T: Transport> {
    transport: T,
    user_id: String,
    room: Option<String>,
    presence: PresenceMap,
    cursor_interval: Duration,
    last_cursor_sent: Option<Instant>,
    pending_cursor: Option<Point>,
    chat: Vec<ChatEntry>,
}

impl<T: Transport> Synchronizer<T> {
    pub fn new(transport: T, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            transport,
            presence: PresenceMap::new(user_id.clone()),
            user_id,
            room: None,
            cursor_interval: DEFAULT_CURSOR_INTERVAL,
            last_cursor_sent: None,
            pending_cursor: None,
            chat: Vec::new(),
        }
    }

    pub fn with_cursor_interval(mut self, interval: Duration) -> Self {
        self.cursor_interval = interval;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn presence(&self) -> &PresenceMap {
        &self.presence
    }

    pub fn chat_history(&self) -> &[ChatEntry] {
        &self.chat
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn send_message(&mut self, message: &ClientMessage) -> Result<(), TransportError> {
        let json = message
            .to_json()
            .map_err(|e| TransportError::Send(format!("Serialization failed: {}", e)))?;
        self.transport.send(&json)
    }

    /// Join a project room. Joining the room already joined is a no-op.
    pub fn join(&mut self, room: impl Into<String>) -> Result<(), TransportError> {
        let room = room.into();
        if self.room.as_deref() == Some(room.as_str()) {
            return Ok(());
        }
        log::info!("Joining room {} as {}", room, self.user_id);
        self.send_message(&ClientMessage::Join {
            room: room.clone(),
            user_id: self.user_id.clone(),
        })?;
        self.room = Some(room);
        self.presence.clear();
        Ok(())
    }

    pub fn leave(&mut self) -> Result<(), TransportError> {
        if self.room.take().is_none() {
            return Ok(());
        }
        self.presence.clear();
        self.send_message(&ClientMessage::Leave)
    }

    /// Send the entire current geometry. Does nothing outside a room.
    pub fn broadcast_geometry(&mut self, state: &ProjectSnapshot) -> Result<(), TransportError> {
        if self.room.is_none() {
            return Ok(());
        }
        self.send_message(&ClientMessage::GeometryUpdate {
            state: state.clone(),
        })
    }

    /// Report the local pointer position, throttled to the cursor interval.
    ///
    /// A position arriving too early is held back and sent by [`flush`](Self::flush).
    /// Returns whether a message went out.
    pub fn set_cursor(&mut self, position: Point, now: Instant) -> Result<bool, TransportError> {
        if self.room.is_none() {
            return Ok(false);
        }
        if self.cursor_due(now) {
            self.send_cursor(position, now)?;
            return Ok(true);
        }
        self.pending_cursor = Some(position);
        Ok(false)
    }

    /// Send a held-back cursor position once the interval has elapsed.
    pub fn flush(&mut self, now: Instant) -> Result<bool, TransportError> {
        match self.pending_cursor {
            Some(position) if self.room.is_some() && self.cursor_due(now) => {
                self.send_cursor(position, now)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn cursor_due(&self, now: Instant) -> bool {
        self.last_cursor_sent
            .is_none_or(|last| now.saturating_duration_since(last) >= self.cursor_interval)
    }

    fn send_cursor(&mut self, position: Point, now: Instant) -> Result<(), TransportError> {
        self.send_message(&ClientMessage::CursorMove {
            x: position.x,
            y: position.y,
        })?;
        self.last_cursor_sent = Some(now);
        self.pending_cursor = None;
        Ok(())
    }

    /// Broadcast the local selection immediately. `None` clears it for peers.
    pub fn set_selection(&mut self, selection: Option<Selection>) -> Result<(), TransportError> {
        if self.room.is_none() {
            return Ok(());
        }
        self.send_message(&ClientMessage::ObjectSelection { selection })
    }

    pub fn send_chat(&mut self, text: impl Into<String>) -> Result<(), TransportError> {
        if self.room.is_none() {
            return Err(TransportError::NotConnected);
        }
        self.send_message(&ClientMessage::ChatMessage { text: text.into() })
    }

    fn push_chat(&mut self, entry: ChatEntry) {
        self.chat.push(entry);
        if self.chat.len() > MAX_CHAT_HISTORY {
            let excess = self.chat.len() - MAX_CHAT_HISTORY;
            self.chat.drain(..excess);
        }
    }

    /// Drain the transport, update presence, and report what happened.
    pub fn poll(&mut self) -> Vec<SyncEvent> {
        let mut out = Vec::new();
        for event in self.transport.poll() {
            match event {
                TransportEvent::Connected => out.push(SyncEvent::Connected),
                TransportEvent::Disconnected => {
                    self.presence.clear();
                    out.push(SyncEvent::Disconnected);
                }
                TransportEvent::Error { message } => out.push(SyncEvent::Error { message }),
                TransportEvent::Message(json) => match ServerMessage::from_json(&json) {
                    Ok(message) => out.extend(self.handle_message(message)),
                    Err(e) => log::warn!("Dropping malformed relay message: {}", e),
                },
            }
        }
        out
    }

    fn handle_message(&mut self, message: ServerMessage) -> Option<SyncEvent> {
        match message {
            ServerMessage::Joined {
                room,
                peer_count,
                state,
                history,
            } => {
                log::info!("Joined room {} ({} peers)", room, peer_count);
                self.presence.clear();
                self.chat = history;
                Some(SyncEvent::Joined {
                    room,
                    peer_count,
                    state,
                })
            }
            ServerMessage::PeerJoined { user_id } => Some(SyncEvent::PeerJoined { user_id }),
            ServerMessage::PeerLeft { user_id } => {
                self.presence.remove(&user_id);
                Some(SyncEvent::PeerLeft { user_id })
            }
            ServerMessage::GeometryUpdate { from, state } => {
                if from == self.user_id {
                    return None;
                }
                Some(SyncEvent::RemoteGeometry { from, state })
            }
            ServerMessage::CursorMove { from, x, y } => self
                .presence
                .update_cursor(&from, Point::new(x, y))
                .then_some(SyncEvent::PresenceChanged { user_id: from }),
            ServerMessage::ObjectSelection { from, selection } => self
                .presence
                .update_selection(&from, selection)
                .then_some(SyncEvent::PresenceChanged { user_id: from }),
            ServerMessage::ChatMessage {
                from,
                text,
                sent_at,
            } => {
                let entry = ChatEntry {
                    from,
                    text,
                    sent_at,
                };
                self.push_chat(entry.clone());
                Some(SyncEvent::Chat(entry))
            }
            ServerMessage::Error { message } => {
                log::warn!("Relay error: {}", message);
                Some(SyncEvent::Error { message })
            }
        }
    }
}
