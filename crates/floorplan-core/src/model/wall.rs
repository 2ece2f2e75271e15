//! Wall entity.

use super::{LayerId, WallId};
use kurbo::{Line, Point};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A straight wall segment on one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub(crate) id: WallId,
    pub start: Point,
    pub end: Point,
    /// Thickness in centimeters.
    pub thickness: f64,
    /// Height in centimeters.
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    pub layer_id: LayerId,
}

impl Wall {
    pub const DEFAULT_THICKNESS: f64 = 15.0;
    pub const DEFAULT_HEIGHT: f64 = 270.0;

    /// Create a new wall with default thickness and height.
    pub fn new(start: Point, end: Point, layer_id: LayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            thickness: Self::DEFAULT_THICKNESS,
            height: Self::DEFAULT_HEIGHT,
            material: None,
            layer_id,
        }
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn id(&self) -> WallId {
        self.id
    }

    pub fn line(&self) -> Line {
        Line::new(self.start, self.end)
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    pub fn midpoint(&self) -> Point {
        self.start.midpoint(self.end)
    }

    /// Point at `ratio` along the wall (0 = start, 1 = end), clamped.
    pub fn point_at(&self, ratio: f64) -> Point {
        self.start.lerp(self.end, ratio.clamp(0.0, 1.0))
    }

    /// Whether the wall collapses to a single point.
    pub fn is_degenerate(&self) -> bool {
        self.length() < f64::EPSILON
    }

    /// Apply a partial update. Returns true if any field changed.
    pub fn apply(&mut self, patch: &WallPatch) -> bool {
        let before = self.clone();
        if let Some(start) = patch.start {
            self.start = start;
        }
        if let Some(end) = patch.end {
            self.end = end;
        }
        if let Some(thickness) = patch.thickness {
            self.thickness = thickness;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(material) = &patch.material {
            self.material = material.clone();
        }
        if let Some(layer_id) = patch.layer_id {
            self.layer_id = layer_id;
        }
        *self != before
    }

    /// Whether both walls run between the same two points.
    pub fn same_endpoints(&self, other: &Wall) -> bool {
        self.start == other.start && self.end == other.end
    }
}

/// Partial wall update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WallPatch {
    pub start: Option<Point>,
    pub end: Option<Point>,
    pub thickness: Option<f64>,
    pub height: Option<f64>,
    /// `Some(None)` clears the material.
    pub material: Option<Option<String>>,
    pub layer_id: Option<LayerId>,
}

impl WallPatch {
    pub fn endpoints(start: Point, end: Point) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_geometry() {
        let wall = Wall::new(Point::new(0.0, 0.0), Point::new(300.0, 400.0), Uuid::new_v4());
        assert_eq!(wall.length(), 500.0);
        assert_eq!(wall.midpoint(), Point::new(150.0, 200.0));
        assert_eq!(wall.point_at(0.25), Point::new(75.0, 100.0));
        assert_eq!(wall.point_at(3.0), wall.end);
        assert!(!wall.is_degenerate());
    }

    #[test]
    fn test_zero_length_wall_is_degenerate() {
        let p = Point::new(10.0, 10.0);
        assert!(Wall::new(p, p, Uuid::new_v4()).is_degenerate());
    }

    #[test]
    fn test_apply_patch_reports_any_change() {
        let mut wall = Wall::new(Point::ZERO, Point::new(100.0, 0.0), Uuid::new_v4());
        let cosmetic = WallPatch {
            thickness: Some(30.0),
            material: Some(Some("brick".into())),
            ..WallPatch::default()
        };
        let before = wall.clone();
        assert!(wall.apply(&cosmetic));
        assert!(wall.same_endpoints(&before));
        assert_eq!(wall.thickness, 30.0);
        assert_eq!(wall.material.as_deref(), Some("brick"));

        // Same values again change nothing.
        assert!(!wall.apply(&cosmetic));
        assert!(!wall.apply(&WallPatch::endpoints(Point::ZERO, Point::new(100.0, 0.0))));

        assert!(wall.apply(&WallPatch::endpoints(Point::ZERO, Point::new(200.0, 0.0))));
        assert!(!wall.same_endpoints(&before));
        assert_eq!(wall.length(), 200.0);

        let clear = WallPatch {
            material: Some(None),
            ..WallPatch::default()
        };
        wall.apply(&clear);
        assert!(wall.material.is_none());
    }
}
