//! Message transports connecting a client to a project room.
//!
//! Transports move opaque JSON text. They never touch the project model;
//! callers drain received text with [`Transport::poll`] on their own thread
//! and decide what to do with it.

mod memory;
mod websocket;

pub use memory::{MemoryHub, MemoryTransport};
pub use websocket::NativeWebSocket;

use thiserror::Error;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events produced by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    /// A text frame from the relay
    Message(String),
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Send failed: {0}")]
    Send(String),
}

/// A bidirectional text channel to a relay.
pub trait Transport {
    /// Queue a text message for delivery.
    fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Drain pending events (non-blocking).
    fn poll(&mut self) -> Vec<TransportEvent>;

    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, message: &str) -> Result<(), TransportError> {
        (**self).send(message)
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        (**self).poll()
    }

    fn state(&self) -> ConnectionState {
        (**self).state()
    }
}

/// Track connection state from the events a transport reports.
pub(crate) fn apply_event_state(state: &mut ConnectionState, event: &TransportEvent) {
    match event {
        TransportEvent::Connected => *state = ConnectionState::Connected,
        TransportEvent::Disconnected => *state = ConnectionState::Disconnected,
        TransportEvent::Error { .. } => *state = ConnectionState::Error,
        TransportEvent::Message(_) => {}
    }
}
