//! Editor configuration.

use crate::history::MAX_UNDO_HISTORY;
use crate::rooms::RoomDetection;
use crate::snap::{GRID_SIZE, SnapMode};
use crate::storage::DEFAULT_AUTOSAVE_INTERVAL_SECS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for a [`ProjectEditor`](crate::editor::ProjectEditor).
///
/// Every field has a default, so a partial JSON object is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Drawing grid spacing in centimeters.
    pub grid_size: f64,
    pub snap_mode: SnapMode,
    /// Snap new walls to 15° increments.
    pub angle_snap: bool,
    pub max_undo_depth: usize,
    /// Minimum milliseconds between cursor broadcasts, and between
    /// geometry broadcasts while a drag is in progress.
    pub cursor_throttle_ms: u64,
    pub room_detection: RoomDetection,
    pub autosave_interval_secs: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            snap_mode: SnapMode::default(),
            angle_snap: true,
            max_undo_depth: MAX_UNDO_HISTORY,
            cursor_throttle_ms: 50,
            room_detection: RoomDetection::default(),
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            return Err(ConfigError::Invalid {
                field: "grid_size",
                reason: format!("must be a positive number, got {}", self.grid_size),
            });
        }
        if self.max_undo_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_undo_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.room_detection.max_cycle_length < 3 {
            return Err(ConfigError::Invalid {
                field: "room_detection.max_cycle_length",
                reason: "a room needs at least 3 walls".to_string(),
            });
        }
        Ok(())
    }

    pub fn cursor_interval(&self) -> Duration {
        Duration::from_millis(self.cursor_throttle_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::CycleStrategy;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EditorConfig::from_json(r#"{"grid_size": 5.0}"#).unwrap();
        assert_eq!(config.grid_size, 5.0);
        assert_eq!(config.max_undo_depth, 50);
        assert_eq!(config.cursor_interval(), Duration::from_millis(50));
        assert_eq!(config.room_detection.strategy, CycleStrategy::PlanarFaces);
    }

    #[test]
    fn test_nested_room_detection() {
        let json = r#"{"room_detection": {"strategy": "enumerate", "max_cycles": 10}}"#;
        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.room_detection.strategy, CycleStrategy::Enumerate);
        assert_eq!(config.room_detection.max_cycles, 10);
        assert_eq!(config.room_detection.max_cycle_length, 64);
    }

    #[test]
    fn test_rejects_bad_grid() {
        let err = EditorConfig::from_json(r#"{"grid_size": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "grid_size", .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        std::fs::write(&path, r#"{"snap_mode": "all", "max_undo_depth": 10}"#).unwrap();
        let config = EditorConfig::load(&path).unwrap();
        assert_eq!(config.snap_mode, SnapMode::All);
        assert_eq!(config.max_undo_depth, 10);
    }
}
