//! Project model: levels and everything drawn on them.

mod layer;
mod level;
mod placement;
mod project;
mod room;
mod site;
mod wall;
mod zone;

pub use layer::{Comment, Layer};
pub use level::Level;
pub use placement::{Placement, PlacementKind, PlacementPatch};
pub use project::{Project, ProjectSnapshot, SavedProject};
pub use room::{Room, RoomKey, RoomType};
pub use site::{CameraView, PropertyLine, Site, StagingSettings, StoryboardFrame, TerrainSettings};
pub use wall::{Wall, WallPatch};
pub use zone::{InfrastructureKind, InfrastructureLine, Zone, ZoneType};

pub(crate) use room::default_name_number;

use thiserror::Error;
use uuid::Uuid;

pub type WallId = Uuid;
pub type PlacementId = Uuid;
pub type RoomId = Uuid;
pub type ZoneId = Uuid;
pub type InfrastructureId = Uuid;
pub type LayerId = Uuid;
pub type CommentId = Uuid;
pub type LevelId = Uuid;
pub type CameraViewId = Uuid;
pub type ProjectId = Uuid;

/// Edits rejected because they would break a model invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Cannot delete the last layer of a level")]
    LastLayer,
    #[error("Cannot delete the last level of a project")]
    LastLevel,
    #[error("Layer {0} is locked")]
    LayerLocked(LayerId),
    #[error("Level not found: {0}")]
    LevelNotFound(LevelId),
    #[error("Layer not found: {0}")]
    LayerNotFound(LayerId),
    #[error("Level has no layers")]
    NoLayers,
}

/// Loaded or received state that breaks a structural invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Project has no levels")]
    NoLevels,
    #[error("Level {0} has no layers")]
    NoLayers(LevelId),
}
