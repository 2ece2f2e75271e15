//! Drawing layers and review comments.

use super::{CommentId, LayerId};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named drawing layer. Every drawable entity references exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub name: String,
    pub is_visible: bool,
    pub is_locked: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_visible: true,
            is_locked: false,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::new("Default")
    }
}

/// A pinned review note on a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub(crate) id: CommentId,
    pub position: Point,
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub resolved: bool,
}

impl Comment {
    pub fn new(position: Point, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            author: author.into(),
            text: text.into(),
            resolved: false,
        }
    }

    pub fn id(&self) -> CommentId {
        self.id
    }
}
