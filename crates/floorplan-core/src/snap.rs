//! Point snapping for interactive wall drawing.

use crate::model::Wall;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Default grid spacing in centimeters.
pub const GRID_SIZE: f64 = 10.0;

/// Angle snap increment in degrees.
pub const ANGLE_SNAP_INCREMENT: f64 = 15.0;

/// Capture radius for endpoint snapping (in project units).
pub const ENDPOINT_SNAP_THRESHOLD: f64 = 15.0;

/// What a drawn point snaps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapMode {
    None,
    #[default]
    Grid,
    /// Existing wall endpoints and midpoints.
    Endpoints,
    /// Endpoints first, grid otherwise.
    All,
}

impl SnapMode {
    /// Cycle to the next snap mode.
    pub fn next(self) -> Self {
        match self {
            SnapMode::None => SnapMode::Grid,
            SnapMode::Grid => SnapMode::Endpoints,
            SnapMode::Endpoints => SnapMode::All,
            SnapMode::All => SnapMode::None,
        }
    }

    pub fn snaps_to_grid(self) -> bool {
        matches!(self, SnapMode::Grid | SnapMode::All)
    }

    pub fn snaps_to_endpoints(self) -> bool {
        matches!(self, SnapMode::Endpoints | SnapMode::All)
    }
}

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    pub snapped_x: bool,
    pub snapped_y: bool,
}

impl SnapResult {
    /// A result that leaves the point untouched.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// Round each coordinate to the nearest multiple of `grid_size`.
///
/// Idempotent. A grid size that is not a positive finite number leaves the
/// point unchanged.
pub fn snap_to_grid(point: Point, grid_size: f64) -> SnapResult {
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return SnapResult::none(point);
    }
    SnapResult {
        point: Point::new(
            (point.x / grid_size).round() * grid_size,
            (point.y / grid_size).round() * grid_size,
        ),
        snapped_x: true,
        snapped_y: true,
    }
}

/// Snap an angle to the nearest increment, normalized to [0, 360).
pub fn snap_angle(angle_degrees: f64, increment: f64) -> f64 {
    let snapped = (angle_degrees / increment).round() * increment;
    snapped.rem_euclid(360.0)
}

/// Result of snapping a wall's free end to an angle increment.
#[derive(Debug, Clone, Copy)]
pub struct AngleSnapResult {
    pub point: Point,
    /// Snapped angle in degrees, [0, 360).
    pub angle_degrees: f64,
    pub original_angle_degrees: f64,
    pub snapped: bool,
    /// Length from the fixed end, preserved from the input.
    pub length: f64,
}

/// Snap the free end of a wall being drawn so the wall runs at a multiple of
/// [`ANGLE_SNAP_INCREMENT`], keeping its length.
pub fn snap_wall_endpoint(start: Point, end: Point, enabled: bool) -> AngleSnapResult {
    let delta = end - start;
    let length = delta.hypot();

    if length < 0.001 {
        return AngleSnapResult {
            point: end,
            angle_degrees: 0.0,
            original_angle_degrees: 0.0,
            snapped: false,
            length: 0.0,
        };
    }

    let original = delta.y.atan2(delta.x).to_degrees().rem_euclid(360.0);
    if !enabled {
        return AngleSnapResult {
            point: end,
            angle_degrees: original,
            original_angle_degrees: original,
            snapped: false,
            length,
        };
    }

    let angle = snap_angle(original, ANGLE_SNAP_INCREMENT);
    let radians = angle.to_radians();
    AngleSnapResult {
        point: Point::new(start.x + length * radians.cos(), start.y + length * radians.sin()),
        angle_degrees: angle,
        original_angle_degrees: original,
        snapped: true,
        length,
    }
}

/// A point on an existing wall that drawing can lock onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTarget {
    pub point: Point,
    pub kind: SnapTargetKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapTargetKind {
    Endpoint,
    Midpoint,
}

/// Endpoints and midpoints of the given walls.
pub fn targets_from_walls<'a>(walls: impl IntoIterator<Item = &'a Wall>) -> Vec<SnapTarget> {
    let mut targets = Vec::new();
    for wall in walls {
        targets.push(SnapTarget { point: wall.start, kind: SnapTargetKind::Endpoint });
        targets.push(SnapTarget { point: wall.end, kind: SnapTargetKind::Endpoint });
        targets.push(SnapTarget { point: wall.midpoint(), kind: SnapTargetKind::Midpoint });
    }
    targets
}

/// Snap to the nearest target within `threshold`. Endpoints win ties over
/// midpoints at equal distance.
pub fn snap_to_targets(point: Point, targets: &[SnapTarget], threshold: f64) -> SnapResult {
    let mut best: Option<&SnapTarget> = None;
    let mut best_dist_sq = threshold * threshold;

    for target in targets {
        let dist_sq = point.distance_squared(target.point);
        let better = dist_sq < best_dist_sq
            || (dist_sq == best_dist_sq
                && target.kind == SnapTargetKind::Endpoint
                && best.is_some_and(|b| b.kind == SnapTargetKind::Midpoint));
        if better {
            best_dist_sq = dist_sq;
            best = Some(target);
        }
    }

    match best {
        Some(target) => SnapResult {
            point: target.point,
            snapped_x: true,
            snapped_y: true,
        },
        None => SnapResult::none(point),
    }
}

/// Snap a point according to `mode`.
pub fn snap_point_with_targets(
    point: Point,
    mode: SnapMode,
    grid_size: f64,
    targets: &[SnapTarget],
) -> SnapResult {
    match mode {
        SnapMode::None => SnapResult::none(point),
        SnapMode::Grid => snap_to_grid(point, grid_size),
        SnapMode::Endpoints => snap_to_targets(point, targets, ENDPOINT_SNAP_THRESHOLD),
        SnapMode::All => {
            let result = snap_to_targets(point, targets, ENDPOINT_SNAP_THRESHOLD);
            if result.is_snapped() {
                result
            } else {
                snap_to_grid(point, grid_size)
            }
        }
    }
}
