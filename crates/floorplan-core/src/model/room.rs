//! Rooms derived from closed wall loops.

use super::{RoomId, WallId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    #[default]
    Generic,
    Living,
    Bedroom,
    Kitchen,
    Bathroom,
    Hallway,
    Office,
    Storage,
    Utility,
    Outdoor,
}

/// A room inferred from one elementary cycle of walls.
///
/// Rooms are regenerated whenever the wall topology changes. `id`, `name`
/// and `room_type` survive regeneration as long as the set of boundary
/// walls stays the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub(crate) id: RoomId,
    pub name: String,
    pub room_type: RoomType,
    /// Boundary walls in traversal order.
    pub wall_ids: Vec<WallId>,
    /// Floor area in square centimeters.
    pub calculated_area: f64,
}

impl Room {
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Order- and direction-independent identity of the boundary.
    pub fn key(&self) -> RoomKey {
        RoomKey::new(&self.wall_ids)
    }

    /// Area in square meters.
    pub fn area_m2(&self) -> f64 {
        self.calculated_area / 10_000.0
    }
}

/// Sorted, deduplicated wall-id set identifying a room boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomKey(Vec<WallId>);

impl RoomKey {
    pub fn new(wall_ids: &[WallId]) -> Self {
        let mut ids = wall_ids.to_vec();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    pub fn wall_ids(&self) -> &[WallId] {
        &self.0
    }
}

/// Parse the number out of an auto-generated `Room <N>` name.
pub(crate) fn default_name_number(name: &str) -> Option<u32> {
    name.strip_prefix("Room ")?.trim().parse().ok()
}
