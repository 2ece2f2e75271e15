//! The project root and its snapshot form.

use super::{
    EditError, InfrastructureId, InfrastructureLine, Level, LevelId, ModelError, Placement,
    PlacementId, PlacementPatch, ProjectId, Site, Wall, WallId, WallPatch, Zone, ZoneId,
};
use crate::rooms::RoomDetection;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Immutable copy of all editable project state.
///
/// Levels and site data sit behind `Arc`, so taking a snapshot copies
/// pointers only. Mutating the live project through [`Arc::make_mut`]
/// clones just the level (or site) being edited, leaving every snapshot
/// that shares it untouched.
///
/// Deserializing a snapshot without levels fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRecord")]
pub struct ProjectSnapshot {
    pub levels: Vec<Arc<Level>>,
    pub site: Arc<Site>,
}

#[derive(Deserialize)]
struct SnapshotRecord {
    levels: Vec<Arc<Level>>,
    site: Arc<Site>,
}

impl TryFrom<SnapshotRecord> for ProjectSnapshot {
    type Error = ModelError;

    fn try_from(record: SnapshotRecord) -> Result<Self, Self::Error> {
        let snapshot = Self {
            levels: record.levels,
            site: record.site,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl ProjectSnapshot {
    /// Check that there is at least one level and every level has a layer.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.levels.is_empty() {
            return Err(ModelError::NoLevels);
        }
        match self.levels.iter().find(|l| l.layers().is_empty()) {
            Some(level) => Err(ModelError::NoLayers(level.id())),
            None => Ok(()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Persisted form of a [`Project`]: its identity plus a snapshot of its
/// editable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProject {
    pub id: ProjectId,
    pub name: String,
    pub active_level: LevelId,
    pub state: ProjectSnapshot,
}

/// A floor-plan project: ordered levels, one of them active, plus site data.
///
/// There is always at least one level. Serializes as [`SavedProject`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "SavedProject", try_from = "SavedProject")]
pub struct Project {
    pub(crate) id: ProjectId,
    pub name: String,
    levels: Vec<Arc<Level>>,
    site: Arc<Site>,
    active_level: LevelId,
    detection: RoomDetection,
}

impl TryFrom<SavedProject> for Project {
    type Error = ModelError;

    /// Room detection settings are not persisted; the default applies.
    fn try_from(saved: SavedProject) -> Result<Self, Self::Error> {
        saved.state.validate()?;
        let mut project = Self {
            id: saved.id,
            name: saved.name,
            levels: Vec::new(),
            site: Arc::new(Site::default()),
            active_level: saved.active_level,
            detection: RoomDetection::default(),
        };
        project.adopt(saved.state);
        Ok(project)
    }
}

impl From<Project> for SavedProject {
    fn from(project: Project) -> Self {
        project.to_saved()
    }
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let ground = Level::new("Ground Floor", 0.0);
        let active_level = ground.id();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            levels: vec![Arc::new(ground)],
            site: Arc::new(Site::default()),
            active_level,
            detection: RoomDetection::default(),
        }
    }

    pub fn with_detection(mut self, detection: RoomDetection) -> Self {
        self.detection = detection;
        self
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn detection(&self) -> &RoomDetection {
        &self.detection
    }

    pub fn set_detection(&mut self, detection: RoomDetection) {
        self.detection = detection;
    }

    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter().map(Arc::as_ref)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, id: LevelId) -> Option<&Level> {
        self.levels.iter().find(|l| l.id() == id).map(Arc::as_ref)
    }

    pub fn active_level_id(&self) -> LevelId {
        self.active_level
    }

    pub fn active_level(&self) -> &Level {
        // Every constructor and `restore` guarantee a level.
        let index = self.active_index();
        &self.levels[index]
    }

    /// Mutable access to the active level, cloning it out of any snapshot
    /// that still shares it.
    pub fn active_level_mut(&mut self) -> &mut Level {
        let index = self.active_index();
        Arc::make_mut(&mut self.levels[index])
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn site_mut(&mut self) -> &mut Site {
        Arc::make_mut(&mut self.site)
    }

    /// Index of the active level, falling back to the first one.
    fn active_index(&self) -> usize {
        self.levels
            .iter()
            .position(|l| l.id() == self.active_level)
            .unwrap_or(0)
    }

    // --- Levels ---

    pub fn add_level(&mut self, level: Level) -> LevelId {
        let id = level.id();
        self.levels.push(Arc::new(level));
        id
    }

    /// Remove a level. The last level cannot be removed; if the active level
    /// is removed the first remaining level becomes active.
    pub fn remove_level(&mut self, id: LevelId) -> Result<Level, EditError> {
        let index = self
            .levels
            .iter()
            .position(|l| l.id() == id)
            .ok_or(EditError::LevelNotFound(id))?;
        if self.levels.len() == 1 {
            return Err(EditError::LastLevel);
        }
        let removed = self.levels.remove(index);
        if self.active_level == id {
            self.active_level = self.levels[0].id();
        }
        Ok(Arc::unwrap_or_clone(removed))
    }

    pub fn set_active_level(&mut self, id: LevelId) -> Result<(), EditError> {
        if self.level(id).is_none() {
            return Err(EditError::LevelNotFound(id));
        }
        self.active_level = id;
        Ok(())
    }

    // --- Mutations on the active level ---

    pub fn add_wall(&mut self, wall: Wall) -> Result<WallId, EditError> {
        let detection = self.detection;
        self.active_level_mut().add_wall(wall, &detection)
    }

    pub fn update_wall(&mut self, id: WallId, patch: &WallPatch) -> Result<bool, EditError> {
        let detection = self.detection;
        self.active_level_mut().update_wall(id, patch, &detection)
    }

    pub fn remove_wall(&mut self, id: WallId) -> Result<Option<Wall>, EditError> {
        let detection = self.detection;
        self.active_level_mut().remove_wall(id, &detection)
    }

    pub fn move_corner(&mut self, from: Point, to: Point) -> usize {
        let detection = self.detection;
        self.active_level_mut().move_corner(from, to, &detection)
    }

    pub fn add_placement(&mut self, placement: Placement) -> Result<PlacementId, EditError> {
        self.active_level_mut().add_placement(placement)
    }

    pub fn update_placement(
        &mut self,
        id: PlacementId,
        patch: &PlacementPatch,
    ) -> Result<bool, EditError> {
        self.active_level_mut().update_placement(id, patch)
    }

    pub fn remove_placement(&mut self, id: PlacementId) -> Result<Option<Placement>, EditError> {
        self.active_level_mut().remove_placement(id)
    }

    pub fn add_zone(&mut self, zone: Zone) -> Result<ZoneId, EditError> {
        self.active_level_mut().add_zone(zone)
    }

    pub fn remove_zone(&mut self, id: ZoneId) -> Result<Option<Zone>, EditError> {
        self.active_level_mut().remove_zone(id)
    }

    pub fn add_infrastructure(&mut self, line: InfrastructureLine) -> Result<InfrastructureId, EditError> {
        self.active_level_mut().add_infrastructure(line)
    }

    pub fn remove_infrastructure(
        &mut self,
        id: InfrastructureId,
    ) -> Result<Option<InfrastructureLine>, EditError> {
        self.active_level_mut().remove_infrastructure(id)
    }

    // --- Snapshots ---

    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            levels: self.levels.clone(),
            site: Arc::clone(&self.site),
        }
    }

    /// Replace all editable state with `snapshot`.
    ///
    /// Snapshots that fail [`ProjectSnapshot::validate`] are refused.
    /// Returns whether the state was replaced.
    pub fn restore(&mut self, snapshot: ProjectSnapshot) -> bool {
        if let Err(e) = snapshot.validate() {
            log::warn!("Refusing to restore snapshot: {}", e);
            return false;
        }
        self.adopt(snapshot);
        true
    }

    /// Take over a validated snapshot, keeping the active level if it survives.
    fn adopt(&mut self, snapshot: ProjectSnapshot) {
        self.levels = snapshot.levels;
        self.site = snapshot.site;
        if self.level(self.active_level).is_none() {
            if let Some(first) = self.levels.first() {
                self.active_level = first.id();
            }
        }
    }

    /// Identity plus snapshot, ready for a storage backend.
    pub fn to_saved(&self) -> SavedProject {
        SavedProject {
            id: self.id,
            name: self.name.clone(),
            active_level: self.active_level,
            state: self.snapshot(),
        }
    }

    /// Re-run room inference on every level.
    ///
    /// Used after accepting state from elsewhere, whose rooms may have been
    /// computed with different settings or be stale.
    pub fn refresh_all_rooms(&mut self) {
        let detection = self.detection;
        for level in &mut self.levels {
            Arc::make_mut(level).refresh_rooms(&detection);
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
