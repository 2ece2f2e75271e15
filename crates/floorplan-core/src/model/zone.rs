//! Site zones and infrastructure lines. Independent of the wall graph.

use super::{InfrastructureId, LayerId, ZoneId};
use crate::geometry::polygon_area;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Residential,
    Commercial,
    Green,
    Road,
}

/// A polygonal land-use zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub(crate) id: ZoneId,
    pub zone_type: ZoneType,
    #[serde(default)]
    pub name: String,
    pub points: Vec<Point>,
    pub layer_id: LayerId,
}

impl Zone {
    pub fn new(zone_type: ZoneType, points: Vec<Point>, layer_id: LayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            zone_type,
            name: String::new(),
            points,
            layer_id,
        }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfrastructureKind {
    Road,
    Water,
    Power,
    Sewer,
}

/// A polyline utility or road run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureLine {
    pub(crate) id: InfrastructureId,
    pub kind: InfrastructureKind,
    pub points: Vec<Point>,
    pub width: f64,
    pub layer_id: LayerId,
}

impl InfrastructureLine {
    pub fn new(kind: InfrastructureKind, points: Vec<Point>, layer_id: LayerId) -> Self {
        let width = match kind {
            InfrastructureKind::Road => 600.0,
            _ => 30.0,
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            points,
            width,
            layer_id,
        }
    }

    pub fn id(&self) -> InfrastructureId {
        self.id
    }

    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_area() {
        let zone = Zone::new(
            ZoneType::Green,
            vec![
                Point::new(0.0, 0.0),
                Point::new(1000.0, 0.0),
                Point::new(1000.0, 500.0),
                Point::new(0.0, 500.0),
            ],
            Uuid::new_v4(),
        );
        assert_eq!(zone.area(), 500_000.0);
    }

    #[test]
    fn test_infrastructure_length() {
        let line = InfrastructureLine::new(
            InfrastructureKind::Water,
            vec![Point::new(0.0, 0.0), Point::new(300.0, 400.0), Point::new(300.0, 900.0)],
            Uuid::new_v4(),
        );
        assert_eq!(line.length(), 1000.0);
        assert_eq!(line.width, 30.0);
    }
}
