//! JSON messages exchanged between clients and the relay.
//!
//! Every message is an object tagged by its `event` name. Geometry is sent
//! as the full [`ProjectSnapshot`]; there are no diffs.

use crate::model::ProjectSnapshot;
use crate::presence::Selection;
use serde::{Deserialize, Serialize};

/// Messages sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a project room
    Join { room: String, user_id: String },
    /// Leave the current room
    Leave,
    /// Entire current geometric state
    GeometryUpdate { state: ProjectSnapshot },
    /// Pointer position in project coordinates
    CursorMove { x: f64, y: f64 },
    /// Current selection, `null` when cleared
    ObjectSelection { selection: Option<Selection> },
    ChatMessage { text: String },
}

/// A chat line as stored and replayed by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub from: String,
    pub text: String,
    /// Unix milliseconds, stamped by the relay.
    pub sent_at: u64,
}

/// Messages received from the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm room join with the latest known state
    Joined {
        room: String,
        peer_count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<ProjectSnapshot>,
        #[serde(default)]
        history: Vec<ChatEntry>,
    },
    PeerJoined { user_id: String },
    PeerLeft { user_id: String },
    GeometryUpdate { from: String, state: ProjectSnapshot },
    CursorMove { from: String, x: f64, y: f64 },
    ObjectSelection { from: String, selection: Option<Selection> },
    ChatMessage { from: String, text: String, sent_at: u64 },
    Error { message: String },
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_client_message_serialize() {
        let msg = ClientMessage::Join {
            room: "project-1".to_string(),
            user_id: "alice".to_string(),
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""event":"join""#));
        assert!(json.contains("project-1"));
    }

    #[test]
    fn test_cleared_selection_serializes_as_null() {
        let json = ClientMessage::ObjectSelection { selection: None }.to_json().unwrap();
        assert_eq!(json, r#"{"event":"object_selection","selection":null}"#);
    }

    #[test]
    fn test_server_message_deserialize() {
        let json = r#"{"event":"joined","room":"test","peer_count":2}"#;
        match ServerMessage::from_json(json).unwrap() {
            ServerMessage::Joined { room, peer_count, state, history } => {
                assert_eq!(room, "test");
                assert_eq!(peer_count, 2);
                assert!(state.is_none());
                assert!(history.is_empty());
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_selection_message_deserialize() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"event":"object_selection","from":"bob","selection":{{"object_id":"{}","object_type":"wall"}}}}"#,
            id
        );
        let msg = ServerMessage::from_json(&json).unwrap();
        assert_eq!(
            msg,
            ServerMessage::ObjectSelection {
                from: "bob".to_string(),
                selection: Some(Selection::new(id, "wall")),
            }
        );
    }
}
