//! One storey of the building and everything drawn on it.

use super::{
    Comment, CommentId, EditError, InfrastructureId, InfrastructureLine, Layer, LayerId, LevelId,
    ModelError, Placement, PlacementId, PlacementPatch, Room, RoomId, RoomType, Wall, WallId, WallPatch, Zone,
    ZoneId,
};
use crate::geometry::{PointKey, centroid_sort, dedup_vertices};
use crate::rooms::{RoomDetection, detect_cycles, sync_rooms};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A building storey. Owns its walls, derived rooms, openings, site
/// entities, comments and layers.
///
/// Collections are read through accessors; all topology changes go through
/// methods that re-run room inference before returning, so `rooms()` never
/// references a wall that does not exist. A level always has at least one
/// layer; deserializing one without layers fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LevelRecord")]
pub struct Level {
    pub(crate) id: LevelId,
    pub name: String,
    /// Floor elevation in centimeters.
    pub elevation: f64,
    /// Floor-to-floor height in centimeters.
    pub height: f64,
    #[serde(default)]
    walls: Vec<Wall>,
    #[serde(default)]
    rooms: Vec<Room>,
    #[serde(default)]
    placements: Vec<Placement>,
    #[serde(default)]
    zones: Vec<Zone>,
    #[serde(default)]
    infrastructure: Vec<InfrastructureLine>,
    #[serde(default)]
    comments: Vec<Comment>,
    layers: Vec<Layer>,
}

/// Wire form of [`Level`], checked on the way in.
#[derive(Deserialize)]
struct LevelRecord {
    id: LevelId,
    name: String,
    elevation: f64,
    height: f64,
    #[serde(default)]
    walls: Vec<Wall>,
    #[serde(default)]
    rooms: Vec<Room>,
    #[serde(default)]
    placements: Vec<Placement>,
    #[serde(default)]
    zones: Vec<Zone>,
    #[serde(default)]
    infrastructure: Vec<InfrastructureLine>,
    #[serde(default)]
    comments: Vec<Comment>,
    layers: Vec<Layer>,
}

impl TryFrom<LevelRecord> for Level {
    type Error = ModelError;

    fn try_from(record: LevelRecord) -> Result<Self, Self::Error> {
        if record.layers.is_empty() {
            return Err(ModelError::NoLayers(record.id));
        }
        Ok(Self {
            id: record.id,
            name: record.name,
            elevation: record.elevation,
            height: record.height,
            walls: record.walls,
            rooms: record.rooms,
            placements: record.placements,
            zones: record.zones,
            infrastructure: record.infrastructure,
            comments: record.comments,
            layers: record.layers,
        })
    }
}

impl Level {
    pub const DEFAULT_HEIGHT: f64 = 300.0;

    /// Create an empty level with a single default layer.
    pub fn new(name: impl Into<String>, elevation: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            elevation,
            height: Self::DEFAULT_HEIGHT,
            walls: Vec::new(),
            rooms: Vec::new(),
            placements: Vec::new(),
            zones: Vec::new(),
            infrastructure: Vec::new(),
            comments: Vec::new(),
            layers: vec![Layer::default()],
        }
    }

    pub fn id(&self) -> LevelId {
        self.id
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn infrastructure(&self) -> &[InfrastructureLine] {
        &self.infrastructure
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn wall(&self, id: WallId) -> Option<&Wall> {
        self.walls.iter().find(|w| w.id == id)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn placement(&self, id: PlacementId) -> Option<&Placement> {
        self.placements.iter().find(|p| p.id == id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Layer that new entities land on by default.
    pub fn default_layer_id(&self) -> Option<LayerId> {
        self.layers.first().map(|l| l.id)
    }

    #[cfg(test)]
    pub(crate) fn strip_layers(&mut self) {
        self.layers.clear();
    }

    /// Unknown layers count as unlocked.
    fn ensure_unlocked(&self, layer_id: LayerId) -> Result<(), EditError> {
        match self.layer(layer_id) {
            Some(layer) if layer.is_locked => Err(EditError::LayerLocked(layer_id)),
            _ => Ok(()),
        }
    }

    // --- Walls ---

    pub fn add_wall(&mut self, wall: Wall, detection: &RoomDetection) -> Result<WallId, EditError> {
        self.ensure_unlocked(wall.layer_id)?;
        let id = wall.id;
        self.walls.push(wall);
        self.refresh_rooms(detection);
        Ok(id)
    }

    /// Returns `Ok(false)` if the wall does not exist.
    pub fn update_wall(
        &mut self,
        id: WallId,
        patch: &WallPatch,
        detection: &RoomDetection,
    ) -> Result<bool, EditError> {
        let Some(index) = self.walls.iter().position(|w| w.id == id) else {
            log::debug!("update_wall: no wall {}", id);
            return Ok(false);
        };
        self.ensure_unlocked(self.walls[index].layer_id)?;
        if let Some(layer_id) = patch.layer_id {
            self.ensure_unlocked(layer_id)?;
        }
        let before = self.walls[index].clone();
        if !self.walls[index].apply(patch) {
            return Ok(false);
        }
        if !self.walls[index].same_endpoints(&before) {
            self.refresh_rooms(detection);
        }
        Ok(true)
    }

    /// Remove a wall together with the openings hosted on it.
    pub fn remove_wall(
        &mut self,
        id: WallId,
        detection: &RoomDetection,
    ) -> Result<Option<Wall>, EditError> {
        let Some(index) = self.walls.iter().position(|w| w.id == id) else {
            return Ok(None);
        };
        self.ensure_unlocked(self.walls[index].layer_id)?;
        let wall = self.walls.remove(index);
        self.placements.retain(|p| p.wall_id != id);
        self.refresh_rooms(detection);
        Ok(Some(wall))
    }

    /// Move every unlocked wall endpoint at `from` (by vertex key) to `to`.
    ///
    /// Rooms are refreshed once after all endpoints moved, so a corner drag
    /// that keeps the loop closed keeps the room's identity and name.
    /// Returns the number of endpoints moved.
    pub fn move_corner(&mut self, from: Point, to: Point, detection: &RoomDetection) -> usize {
        let key = PointKey::from_point(from);
        let locked: Vec<LayerId> = self
            .layers
            .iter()
            .filter(|l| l.is_locked)
            .map(|l| l.id)
            .collect();

        let mut moved = 0;
        for wall in self.walls.iter_mut().filter(|w| !locked.contains(&w.layer_id)) {
            if PointKey::from_point(wall.start) == key {
                wall.start = to;
                moved += 1;
            }
            if PointKey::from_point(wall.end) == key {
                wall.end = to;
                moved += 1;
            }
        }
        if moved > 0 {
            self.refresh_rooms(detection);
        }
        moved
    }

    /// Re-run room inference and reconcile the room list.
    pub fn refresh_rooms(&mut self, detection: &RoomDetection) {
        let cycles = detect_cycles(&self.walls, detection);
        self.rooms = sync_rooms(&self.rooms, cycles);
    }

    // --- Rooms ---

    pub fn rename_room(&mut self, id: RoomId, name: impl Into<String>) -> bool {
        match self.rooms.iter_mut().find(|r| r.id == id) {
            Some(room) => {
                room.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn set_room_type(&mut self, id: RoomId, room_type: RoomType) -> bool {
        match self.rooms.iter_mut().find(|r| r.id == id) {
            Some(room) => {
                room.room_type = room_type;
                true
            }
            None => false,
        }
    }

    /// Ordered outline of a room for drawing.
    ///
    /// Chains the boundary walls end to end; if they do not chain (stale or
    /// foreign data), falls back to the angular order of their distinct
    /// endpoints.
    pub fn room_outline(&self, room: &Room) -> Vec<Point> {
        let walls: Vec<&Wall> = room.wall_ids.iter().filter_map(|id| self.wall(*id)).collect();
        if walls.is_empty() {
            return Vec::new();
        }
        if let Some(chain) = chain_walls(&walls) {
            return chain;
        }
        let endpoints: Vec<Point> = walls.iter().flat_map(|w| [w.start, w.end]).collect();
        centroid_sort(&dedup_vertices(&endpoints, 0.5))
    }

    // --- Placements ---

    pub fn add_placement(&mut self, placement: Placement) -> Result<PlacementId, EditError> {
        self.ensure_unlocked(placement.layer_id)?;
        if self.wall(placement.wall_id).is_none() {
            log::warn!(
                "Placement {} references missing wall {}; it will be ignored until the wall exists",
                placement.id,
                placement.wall_id
            );
        }
        let id = placement.id;
        self.placements.push(placement);
        Ok(id)
    }

    pub fn update_placement(
        &mut self,
        id: PlacementId,
        patch: &PlacementPatch,
    ) -> Result<bool, EditError> {
        let Some(index) = self.placements.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        self.ensure_unlocked(self.placements[index].layer_id)?;
        Ok(self.placements[index].apply(patch))
    }

    pub fn remove_placement(&mut self, id: PlacementId) -> Result<Option<Placement>, EditError> {
        let Some(index) = self.placements.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        self.ensure_unlocked(self.placements[index].layer_id)?;
        Ok(Some(self.placements.remove(index)))
    }

    /// Placements paired with their host wall. Orphans are skipped.
    pub fn resolved_placements(&self) -> impl Iterator<Item = (&Placement, &Wall)> {
        self.placements
            .iter()
            .filter_map(|p| self.wall(p.wall_id).map(|w| (p, w)))
    }

    /// Placements whose host wall no longer exists.
    pub fn orphaned_placements(&self) -> impl Iterator<Item = &Placement> {
        self.placements.iter().filter(|p| self.wall(p.wall_id).is_none())
    }

    // --- Zones and infrastructure ---

    pub fn add_zone(&mut self, zone: Zone) -> Result<ZoneId, EditError> {
        self.ensure_unlocked(zone.layer_id)?;
        let id = zone.id;
        self.zones.push(zone);
        Ok(id)
    }

    pub fn remove_zone(&mut self, id: ZoneId) -> Result<Option<Zone>, EditError> {
        let Some(index) = self.zones.iter().position(|z| z.id == id) else {
            return Ok(None);
        };
        self.ensure_unlocked(self.zones[index].layer_id)?;
        Ok(Some(self.zones.remove(index)))
    }

    pub fn add_infrastructure(&mut self, line: InfrastructureLine) -> Result<InfrastructureId, EditError> {
        self.ensure_unlocked(line.layer_id)?;
        let id = line.id;
        self.infrastructure.push(line);
        Ok(id)
    }

    pub fn remove_infrastructure(
        &mut self,
        id: InfrastructureId,
    ) -> Result<Option<InfrastructureLine>, EditError> {
        let Some(index) = self.infrastructure.iter().position(|l| l.id == id) else {
            return Ok(None);
        };
        self.ensure_unlocked(self.infrastructure[index].layer_id)?;
        Ok(Some(self.infrastructure.remove(index)))
    }

    // --- Comments ---

    pub fn add_comment(&mut self, comment: Comment) -> CommentId {
        let id = comment.id;
        self.comments.push(comment);
        id
    }

    pub fn resolve_comment(&mut self, id: CommentId) -> bool {
        match self.comments.iter_mut().find(|c| c.id == id) {
            Some(comment) => {
                comment.resolved = true;
                true
            }
            None => false,
        }
    }

    pub fn remove_comment(&mut self, id: CommentId) -> Option<Comment> {
        let index = self.comments.iter().position(|c| c.id == id)?;
        Some(self.comments.remove(index))
    }

    // --- Layers ---

    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = layer.id;
        self.layers.push(layer);
        id
    }

    pub fn set_layer_visibility(&mut self, id: LayerId, visible: bool) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                layer.is_visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn set_layer_locked(&mut self, id: LayerId, locked: bool) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                layer.is_locked = locked;
                true
            }
            None => false,
        }
    }

    /// Delete a layer, moving its entities onto the first remaining layer.
    ///
    /// The last layer of a level cannot be deleted.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer, EditError> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(EditError::LayerNotFound(id))?;
        if self.layers.len() == 1 {
            return Err(EditError::LastLayer);
        }
        let removed = self.layers.remove(index);
        let fallback = self.layers[0].id;

        let mut moved = 0usize;
        let mut reassign = |layer_id: &mut LayerId| {
            if *layer_id == id {
                *layer_id = fallback;
                moved += 1;
            }
        };
        self.walls.iter_mut().for_each(|w| reassign(&mut w.layer_id));
        self.placements.iter_mut().for_each(|p| reassign(&mut p.layer_id));
        self.zones.iter_mut().for_each(|z| reassign(&mut z.layer_id));
        self.infrastructure.iter_mut().for_each(|l| reassign(&mut l.layer_id));
        if moved > 0 {
            log::info!(
                "Moved {} entities from deleted layer '{}' to '{}'",
                moved,
                removed.name,
                self.layers[0].name
            );
        }
        Ok(removed)
    }

    /// Total floor area of all rooms, in square centimeters.
    pub fn floor_area(&self) -> f64 {
        self.rooms.iter().map(|r| r.calculated_area).sum()
    }
}

/// Walk walls end to end starting from the first one.
fn chain_walls(walls: &[&Wall]) -> Option<Vec<Point>> {
    let first = walls.first()?;
    let mut outline = vec![first.start];
    let mut current = first.end;
    let mut remaining: Vec<&Wall> = walls[1..].to_vec();

    while !remaining.is_empty() {
        let key = PointKey::from_point(current);
        let index = remaining.iter().position(|w| {
            PointKey::from_point(w.start) == key || PointKey::from_point(w.end) == key
        })?;
        let wall = remaining.swap_remove(index);
        outline.push(current);
        current = if PointKey::from_point(wall.start) == key { wall.end } else { wall.start };
    }

    (PointKey::from_point(current) == PointKey::from_point(first.start)).then_some(outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon_area;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn level_with_rectangle() -> (Level, Vec<WallId>) {
        let mut level = Level::new("Ground", 0.0);
        let layer = level.default_layer_id().unwrap();
        let detection = RoomDetection::default();
        let corners = [p(0.0, 0.0), p(400.0, 0.0), p(400.0, 300.0), p(0.0, 300.0)];
        let ids = (0..4)
            .map(|i| {
                level
                    .add_wall(Wall::new(corners[i], corners[(i + 1) % 4], layer), &detection)
                    .unwrap()
            })
            .collect();
        (level, ids)
    }

    #[test]
    fn test_rectangle_creates_room() {
        let (level, ids) = level_with_rectangle();
        assert_eq!(level.rooms().len(), 1);
        let room = &level.rooms()[0];
        assert_eq!(room.name, "Room 1");
        assert_eq!(room.calculated_area, 120_000.0);
        let mut wall_ids = room.wall_ids.clone();
        wall_ids.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(wall_ids, expected);
    }

    #[test]
    fn test_refresh_is_stable() {
        let (mut level, _) = level_with_rectangle();
        let before = level.rooms().to_vec();
        level.refresh_rooms(&RoomDetection::default());
        level.refresh_rooms(&RoomDetection::default());
        assert_eq!(level.rooms().len(), 1);
        assert_eq!(level.rooms()[0].id(), before[0].id());
        assert_eq!(level.rooms()[0].name, before[0].name);
        assert_eq!(level.rooms()[0].key(), before[0].key());
    }

    #[test]
    fn test_rename_survives_corner_move() {
        let (mut level, _) = level_with_rectangle();
        let room_id = level.rooms()[0].id();
        assert!(level.rename_room(room_id, "Kitchen"));

        let moved = level.move_corner(p(400.0, 300.0), p(500.0, 300.0), &RoomDetection::default());
        assert_eq!(moved, 2);
        assert_eq!(level.rooms().len(), 1);
        let room = &level.rooms()[0];
        assert_eq!(room.id(), room_id);
        assert_eq!(room.name, "Kitchen");
        assert_eq!(room.calculated_area, 135_000.0);
    }

    #[test]
    fn test_breaking_the_loop_drops_room() {
        let (mut level, ids) = level_with_rectangle();
        level.remove_wall(ids[2], &RoomDetection::default()).unwrap();
        assert!(level.rooms().is_empty());
        assert_eq!(level.walls().len(), 3);
    }

    #[test]
    fn test_new_rooms_avoid_name_collisions() {
        let (mut level, _) = level_with_rectangle();
        let detection = RoomDetection::default();
        let first = level.rooms()[0].id();
        level.rename_room(first, "Room 4");

        let layer = level.default_layer_id().unwrap();
        let corners = [p(1000.0, 0.0), p(1200.0, 0.0), p(1200.0, 200.0), p(1000.0, 200.0)];
        for i in 0..4 {
            level
                .add_wall(Wall::new(corners[i], corners[(i + 1) % 4], layer), &detection)
                .unwrap();
        }
        let names: Vec<&str> = level.rooms().iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"Room 4"));
        assert!(names.contains(&"Room 5"));
    }

    #[test]
    fn test_remove_wall_cascades_placements() {
        let (mut level, ids) = level_with_rectangle();
        let layer = level.default_layer_id().unwrap();
        level.add_placement(Placement::door(ids[0], 0.5, layer)).unwrap();
        level.add_placement(Placement::window(ids[1], 0.5, layer)).unwrap();

        level.remove_wall(ids[0], &RoomDetection::default()).unwrap();
        assert_eq!(level.placements().len(), 1);
        assert_eq!(level.placements()[0].wall_id, ids[1]);
    }

    #[test]
    fn test_orphaned_placements_are_skipped() {
        let (mut level, ids) = level_with_rectangle();
        let layer = level.default_layer_id().unwrap();
        level.add_placement(Placement::door(ids[0], 0.5, layer)).unwrap();
        let orphan = level.add_placement(Placement::door(Uuid::new_v4(), 0.5, layer)).unwrap();

        let resolved: Vec<_> = level.resolved_placements().collect();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0.position_on(resolved[0].1), p(200.0, 0.0));
        let orphans: Vec<_> = level.orphaned_placements().map(Placement::id).collect();
        assert_eq!(orphans, vec![orphan]);
    }

    #[test]
    fn test_cannot_remove_last_layer() {
        let mut level = Level::new("Ground", 0.0);
        let only = level.default_layer_id().unwrap();
        assert_eq!(level.remove_layer(only), Err(EditError::LastLayer));
        assert_eq!(level.layers().len(), 1);
    }

    #[test]
    fn test_remove_layer_reassigns_entities() {
        let (mut level, ids) = level_with_rectangle();
        let default_layer = level.default_layer_id().unwrap();
        let furniture = level.add_layer(Layer::new("Furniture"));
        level
            .update_wall(ids[0], &WallPatch { layer_id: Some(furniture), ..WallPatch::default() }, &RoomDetection::default())
            .unwrap();

        let removed = level.remove_layer(furniture).unwrap();
        assert_eq!(removed.name, "Furniture");
        assert_eq!(level.wall(ids[0]).unwrap().layer_id, default_layer);
        assert_eq!(level.layers().len(), 1);
    }

    #[test]
    fn test_locked_layer_rejects_edits() {
        let (mut level, ids) = level_with_rectangle();
        let layer = level.default_layer_id().unwrap();
        level.set_layer_locked(layer, true);

        let detection = RoomDetection::default();
        let patch = WallPatch::endpoints(p(0.0, 0.0), p(500.0, 0.0));
        assert_eq!(level.update_wall(ids[0], &patch, &detection), Err(EditError::LayerLocked(layer)));
        assert_eq!(level.remove_wall(ids[0], &detection), Err(EditError::LayerLocked(layer)));
        assert_eq!(level.move_corner(p(0.0, 0.0), p(10.0, 10.0), &detection), 0);
        assert_eq!(level.walls().len(), 4);
    }

    #[test]
    fn test_room_outline_follows_walls() {
        let (level, _) = level_with_rectangle();
        let outline = level.room_outline(&level.rooms()[0]);
        assert_eq!(outline.len(), 4);
        assert_eq!(polygon_area(&outline), 120_000.0);
    }

    #[test]
    fn test_room_outline_falls_back_to_angular_order() {
        let (level, ids) = level_with_rectangle();
        // Walls 0 and 2 are opposite sides and do not chain.
        let room = Room {
            id: Uuid::new_v4(),
            name: "Broken".into(),
            room_type: RoomType::Generic,
            wall_ids: vec![ids[0], ids[2]],
            calculated_area: 0.0,
        };
        let outline = level.room_outline(&room);
        assert_eq!(outline.len(), 4);
        assert_eq!(polygon_area(&outline), 120_000.0);
    }
}
