//! Project-wide site data shared by all levels.

use super::CameraViewId;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A surveyed property boundary segment chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyLine {
    pub points: Vec<Point>,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub enabled: bool,
    /// Ground elevation relative to level 0, in centimeters.
    pub base_elevation: f64,
    /// Grade in percent along `slope_direction`.
    pub slope_percent: f64,
    /// Degrees clockwise from north.
    pub slope_direction: f64,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_elevation: 0.0,
            slope_percent: 0.0,
            slope_direction: 0.0,
        }
    }
}

/// Furnishing/presentation toggles for staged renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingSettings {
    pub enabled: bool,
    pub style: String,
    pub show_furniture: bool,
}

impl Default for StagingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            style: "modern".to_string(),
            show_furniture: true,
        }
    }
}

/// A saved 3D viewpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub(crate) id: CameraViewId,
    pub name: String,
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub fov_degrees: f64,
}

impl CameraView {
    pub fn new(name: impl Into<String>, position: [f64; 3], target: [f64; 3]) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            position,
            target,
            fov_degrees: 50.0,
        }
    }

    pub fn id(&self) -> CameraViewId {
        self.id
    }
}

/// One step of a presentation walkthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryboardFrame {
    pub camera_view_id: CameraViewId,
    #[serde(default)]
    pub caption: String,
    /// Seconds.
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    /// Degrees clockwise from the plan's +y axis.
    pub north_direction: f64,
    pub property_lines: Vec<PropertyLine>,
    pub terrain: TerrainSettings,
    pub staging: StagingSettings,
    pub camera_views: Vec<CameraView>,
    pub storyboard: Vec<StoryboardFrame>,
}
