//! Doors and windows anchored to walls.

use super::{LayerId, PlacementId, Wall, WallId};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    Door,
    Window,
}

/// An opening placed at a ratio along a wall.
///
/// The referenced wall may not exist (for example after a concurrent delete
/// by another collaborator); such placements are orphaned and consumers skip
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub(crate) id: PlacementId,
    pub wall_id: WallId,
    pub kind: PlacementKind,
    /// Position of the opening's center along the wall, in [0, 1].
    pub position_ratio: f64,
    pub width: f64,
    pub height: f64,
    /// Height of the opening's bottom edge above the floor.
    #[serde(default)]
    pub sill_height: f64,
    pub layer_id: LayerId,
}

impl Placement {
    pub fn door(wall_id: WallId, position_ratio: f64, layer_id: LayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            wall_id,
            kind: PlacementKind::Door,
            position_ratio: position_ratio.clamp(0.0, 1.0),
            width: 90.0,
            height: 210.0,
            sill_height: 0.0,
            layer_id,
        }
    }

    pub fn window(wall_id: WallId, position_ratio: f64, layer_id: LayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            wall_id,
            kind: PlacementKind::Window,
            position_ratio: position_ratio.clamp(0.0, 1.0),
            width: 120.0,
            height: 120.0,
            sill_height: 90.0,
            layer_id,
        }
    }

    pub fn id(&self) -> PlacementId {
        self.id
    }

    /// World position of the opening's center on its host wall.
    pub fn position_on(&self, wall: &Wall) -> Point {
        wall.point_at(self.position_ratio)
    }

    /// Whether the opening is wider than its host wall.
    pub fn overflows(&self, wall: &Wall) -> bool {
        self.width > wall.length()
    }

    /// Apply a partial update. Returns true if any field changed.
    pub fn apply(&mut self, patch: &PlacementPatch) -> bool {
        let before = self.clone();
        if let Some(wall_id) = patch.wall_id {
            self.wall_id = wall_id;
        }
        if let Some(ratio) = patch.position_ratio {
            self.position_ratio = ratio.clamp(0.0, 1.0);
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(sill) = patch.sill_height {
            self.sill_height = sill;
        }
        *self != before
    }
}

/// Partial placement update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementPatch {
    pub wall_id: Option<WallId>,
    pub position_ratio: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub sill_height: Option<f64>,
}
