//! Geometry kernel: polygon area, angular ordering and vertex keys.
//!
//! All functions are pure and operate on `kurbo::Point` in project units
//! (centimeters).

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed polygon area (Shoelace formula).
///
/// Positive for counter-clockwise vertex order in a y-up frame. Fewer than
/// three vertices yield zero.
pub fn signed_area(vertices: &[Point]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..vertices.len() {
        let a = vertices[i];
        let b = vertices[(i + 1) % vertices.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Unsigned area of a cyclic vertex list.
///
/// The polygon must be simple (non-self-intersecting); this is not checked
/// and the result is meaningless otherwise.
pub fn polygon_area(vertices: &[Point]) -> f64 {
    signed_area(vertices).abs()
}

/// Arithmetic mean of a point set, `None` when empty.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

/// Order points by angle around their centroid.
///
/// Turns an unordered set of corner points into a boundary usable for
/// drawing and measuring. Only correct for star-shaped outlines.
pub fn centroid_sort(points: &[Point]) -> Vec<Point> {
    let Some(c) = centroid(points) else {
        return Vec::new();
    };
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| {
        let ta = (a.y - c.y).atan2(a.x - c.x);
        let tb = (b.y - c.y).atan2(b.x - c.x);
        ta.total_cmp(&tb)
    });
    sorted
}

/// Remove points closer than `tolerance` to an earlier point.
///
/// First occurrence wins, order is otherwise preserved.
pub fn dedup_vertices(points: &[Point], tolerance: f64) -> Vec<Point> {
    let tol_sq = tolerance * tolerance;
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if !out.iter().any(|q| q.distance_squared(p) <= tol_sq) {
            out.push(p);
        }
    }
    out
}

/// Canonical vertex identity: coordinates rounded to whole units.
///
/// Two wall endpoints that round to the same key are the same graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointKey {
    pub x: i64,
    pub y: i64,
}

impl PointKey {
    pub fn from_point(p: Point) -> Self {
        Self {
            x: p.x.round() as i64,
            y: p.y.round() as i64,
        }
    }

    pub fn to_point(self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }
}

impl From<Point> for PointKey {
    fn from(p: Point) -> Self {
        Self::from_point(p)
    }
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}
