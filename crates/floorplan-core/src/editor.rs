//! The editing session: project, undo history and collaboration in one place.

use crate::collaboration::{SyncEvent, Synchronizer};
use crate::config::EditorConfig;
use crate::history::UndoManager;
use crate::model::{
    CameraView, CameraViewId, Comment, CommentId, EditError, InfrastructureId, InfrastructureLine,
    Layer, LayerId, Level, LevelId, Placement, PlacementId, PlacementPatch, Project,
    ProjectSnapshot, RoomId, RoomType, SavedProject, Wall, WallId, WallPatch, Zone, ZoneId,
};
use crate::presence::Selection;
use crate::snap::{
    ENDPOINT_SNAP_THRESHOLD, SnapResult, snap_point_with_targets, snap_to_grid, snap_to_targets,
    snap_wall_endpoint, targets_from_walls,
};
use crate::transport::{Transport, TransportError};
use kurbo::Point;
use std::time::Instant;

/// Owns the project, its undo history and an optional collaboration link.
///
/// Every logical edit follows the same sequence: capture a snapshot,
/// mutate the model (which re-runs room inference when topology changes),
/// record the snapshot for undo, then broadcast the full new state.
/// Edits that turn out to be no-ops record nothing.
pub struct ProjectEditor {
    project: Project,
    history: UndoManager<ProjectSnapshot>,
    sync: Option<Synchronizer<Box<dyn Transport>>>,
    config: EditorConfig,
    unsaved: bool,
    gesture: Option<Gesture>,
}

/// A drag in progress.
struct Gesture {
    /// State before the drag started; the single undo entry it produces.
    before: ProjectSnapshot,
    /// When peers last received an intermediate state.
    last_broadcast: Option<Instant>,
    /// Changes made since that broadcast.
    pending: bool,
}

impl ProjectEditor {
    pub fn new(project: Project, config: EditorConfig) -> Self {
        let project = project.with_detection(config.room_detection);
        Self {
            project,
            history: UndoManager::new(config.max_undo_depth),
            sync: None,
            config,
            unsaved: false,
            gesture: None,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn active_level(&self) -> &Level {
        self.project.active_level()
    }

    pub fn snapshot(&self) -> ProjectSnapshot {
        self.project.snapshot()
    }

    /// The project in the form handed to storage. Call
    /// [`mark_saved`](Self::mark_saved) once it is written.
    pub fn saved_state(&self) -> SavedProject {
        self.project.to_saved()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Recording ---

    /// Record a completed edit whose pre-edit state is `before`.
    fn record(&mut self, before: ProjectSnapshot) {
        self.unsaved = true;
        if let Some(gesture) = self.gesture.as_mut() {
            // Folded into the gesture's undo entry; peers get throttled updates.
            gesture.pending = true;
            self.flush_gesture(Instant::now());
            return;
        }
        self.history.push(before);
        self.broadcast();
    }

    /// Broadcast in-gesture changes unless peers saw an update less than
    /// one throttle interval ago. Returns whether it sent.
    fn flush_gesture(&mut self, now: Instant) -> bool {
        let interval = self.config.cursor_interval();
        let Some(gesture) = self.gesture.as_mut() else {
            return false;
        };
        let throttled = gesture
            .last_broadcast
            .is_some_and(|last| now.saturating_duration_since(last) < interval);
        if !gesture.pending || throttled {
            return false;
        }
        gesture.pending = false;
        gesture.last_broadcast = Some(now);
        self.broadcast();
        true
    }

    fn broadcast(&mut self) {
        let state = self.project.snapshot();
        if let Some(sync) = self.sync.as_mut() {
            if let Err(e) = sync.broadcast_geometry(&state) {
                log::warn!("Failed to broadcast geometry: {}", e);
            }
        }
    }

    // --- Walls ---

    pub fn add_wall(&mut self, wall: Wall) -> Result<WallId, EditError> {
        let before = self.project.snapshot();
        let id = self.project.add_wall(wall)?;
        self.record(before);
        Ok(id)
    }

    /// Draw a wall on the default layer, snapping both ends per the config.
    pub fn draw_wall(&mut self, start: Point, end: Point) -> Result<WallId, EditError> {
        let level = self.project.active_level();
        let targets = targets_from_walls(level.walls());
        let mode = self.config.snap_mode;
        let grid = self.config.grid_size;

        let start = snap_point_with_targets(start, mode, grid, &targets).point;
        let on_target = if mode.snaps_to_endpoints() {
            snap_to_targets(end, &targets, ENDPOINT_SNAP_THRESHOLD)
        } else {
            SnapResult::none(end)
        };
        let end = if on_target.is_snapped() {
            on_target.point
        } else {
            let angled = snap_wall_endpoint(start, end, self.config.angle_snap).point;
            if mode.snaps_to_grid() {
                snap_to_grid(angled, grid).point
            } else {
                angled
            }
        };

        let layer = level.default_layer_id().ok_or(EditError::NoLayers)?;
        let wall = Wall::new(start, end, layer);
        self.add_wall(wall)
    }

    pub fn update_wall(&mut self, id: WallId, patch: WallPatch) -> Result<bool, EditError> {
        let before = self.project.snapshot();
        let changed = self.project.update_wall(id, &patch)?;
        if changed {
            self.record(before);
        }
        Ok(changed)
    }

    /// Remove a wall and the doors and windows on it.
    pub fn remove_wall(&mut self, id: WallId) -> Result<bool, EditError> {
        let before = self.project.snapshot();
        let removed = self.project.remove_wall(id)?.is_some();
        if removed {
            self.record(before);
        }
        Ok(removed)
    }

    // --- Placements ---

    pub fn add_placement(&mut self, placement: Placement) -> Result<PlacementId, EditError> {
        let before = self.project.snapshot();
        let id = self.project.add_placement(placement)?;
        self.record(before);
        Ok(id)
    }

    pub fn update_placement(
        &mut self,
        id: PlacementId,
        patch: PlacementPatch,
    ) -> Result<bool, EditError> {
        let before = self.project.snapshot();
        let changed = self.project.update_placement(id, &patch)?;
        if changed {
            self.record(before);
        }
        Ok(changed)
    }

    pub fn remove_placement(&mut self, id: PlacementId) -> Result<bool, EditError> {
        let before = self.project.snapshot();
        let removed = self.project.remove_placement(id)?.is_some();
        if removed {
            self.record(before);
        }
        Ok(removed)
    }

    // --- Zones and infrastructure ---

    pub fn add_zone(&mut self, zone: Zone) -> Result<ZoneId, EditError> {
        let before = self.project.snapshot();
        let id = self.project.add_zone(zone)?;
        self.record(before);
        Ok(id)
    }

    pub fn remove_zone(&mut self, id: ZoneId) -> Result<bool, EditError> {
        let before = self.project.snapshot();
        let removed = self.project.remove_zone(id)?.is_some();
        if removed {
            self.record(before);
        }
        Ok(removed)
    }

    pub fn add_infrastructure(&mut self, line: InfrastructureLine) -> Result<InfrastructureId, EditError> {
        let before = self.project.snapshot();
        let id = self.project.add_infrastructure(line)?;
        self.record(before);
        Ok(id)
    }

    pub fn remove_infrastructure(&mut self, id: InfrastructureId) -> Result<bool, EditError> {
        let before = self.project.snapshot();
        let removed = self.project.remove_infrastructure(id)?.is_some();
        if removed {
            self.record(before);
        }
        Ok(removed)
    }

    // --- Rooms ---

    pub fn rename_room(&mut self, id: RoomId, name: impl Into<String>) -> bool {
        let before = self.project.snapshot();
        let renamed = self.project.active_level_mut().rename_room(id, name);
        if renamed {
            self.record(before);
        }
        renamed
    }

    pub fn set_room_type(&mut self, id: RoomId, room_type: RoomType) -> bool {
        let before = self.project.snapshot();
        let changed = self.project.active_level_mut().set_room_type(id, room_type);
        if changed {
            self.record(before);
        }
        changed
    }

    // --- Levels ---

    pub fn add_level(&mut self, name: impl Into<String>, elevation: f64) -> LevelId {
        let before = self.project.snapshot();
        let id = self.project.add_level(Level::new(name, elevation));
        self.record(before);
        id
    }

    pub fn remove_level(&mut self, id: LevelId) -> Result<Level, EditError> {
        let before = self.project.snapshot();
        let removed = self.project.remove_level(id)?;
        self.record(before);
        Ok(removed)
    }

    /// Switch the level being edited. Not an undoable edit.
    pub fn set_active_level(&mut self, id: LevelId) -> Result<(), EditError> {
        self.project.set_active_level(id)
    }

    // --- Layers ---

    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let before = self.project.snapshot();
        let id = self.project.active_level_mut().add_layer(Layer::new(name));
        self.record(before);
        id
    }

    pub fn set_layer_visibility(&mut self, id: LayerId, visible: bool) -> bool {
        let before = self.project.snapshot();
        let changed = self.project.active_level_mut().set_layer_visibility(id, visible);
        if changed {
            self.record(before);
        }
        changed
    }

    pub fn set_layer_locked(&mut self, id: LayerId, locked: bool) -> bool {
        let before = self.project.snapshot();
        let changed = self.project.active_level_mut().set_layer_locked(id, locked);
        if changed {
            self.record(before);
        }
        changed
    }

    /// Delete a layer on the active level. Its entities move to the first
    /// remaining layer; the last layer is refused.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer, EditError> {
        let before = self.project.snapshot();
        let removed = self.project.active_level_mut().remove_layer(id)?;
        self.record(before);
        Ok(removed)
    }

    // --- Comments ---

    pub fn add_comment(
        &mut self,
        position: Point,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> CommentId {
        let before = self.project.snapshot();
        let id = self
            .project
            .active_level_mut()
            .add_comment(Comment::new(position, author, text));
        self.record(before);
        id
    }

    pub fn resolve_comment(&mut self, id: CommentId) -> bool {
        let before = self.project.snapshot();
        let resolved = self.project.active_level_mut().resolve_comment(id);
        if resolved {
            self.record(before);
        }
        resolved
    }

    pub fn remove_comment(&mut self, id: CommentId) -> bool {
        let before = self.project.snapshot();
        let removed = self.project.active_level_mut().remove_comment(id).is_some();
        if removed {
            self.record(before);
        }
        removed
    }

    // --- Site ---

    pub fn set_north_direction(&mut self, degrees: f64) {
        let before = self.project.snapshot();
        self.project.site_mut().north_direction = degrees.rem_euclid(360.0);
        self.record(before);
    }

    pub fn add_camera_view(&mut self, view: CameraView) -> CameraViewId {
        let before = self.project.snapshot();
        let id = view.id();
        self.project.site_mut().camera_views.push(view);
        self.record(before);
        id
    }

    // --- Gestures ---

    /// Start a continuous edit such as a drag. Everything until
    /// [`end_gesture`](Self::end_gesture) becomes one undo step. Peers see
    /// intermediate states at most once per cursor throttle interval, and
    /// the final state when the gesture ends.
    pub fn begin_gesture(&mut self) {
        if self.gesture.is_none() {
            self.gesture = Some(Gesture {
                before: self.project.snapshot(),
                last_broadcast: None,
                pending: false,
            });
        }
    }

    pub fn in_gesture(&self) -> bool {
        self.gesture.is_some()
    }

    /// Move a wall during a drag. Outside a gesture this is a normal update.
    pub fn drag_wall(&mut self, id: WallId, start: Point, end: Point) -> Result<bool, EditError> {
        self.update_wall(id, WallPatch::endpoints(start, end))
    }

    /// Move every wall endpoint at a corner. Rooms keep their identity while
    /// the corner stays shared.
    pub fn drag_corner(&mut self, from: Point, to: Point) -> usize {
        let before = self.project.snapshot();
        let moved = self.project.move_corner(from, to);
        if moved > 0 {
            self.record(before);
        }
        moved
    }

    /// Finish the current gesture. Returns whether it changed anything.
    pub fn end_gesture(&mut self) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        if gesture.before == self.project.snapshot() {
            // Dragged back to the start; peers may still hold a midway state.
            if gesture.last_broadcast.is_some() {
                self.broadcast();
            }
            return false;
        }
        self.history.push(gesture.before);
        self.broadcast();
        true
    }

    // --- History ---

    /// Step back one edit. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.end_gesture();
        let Some(previous) = self.history.undo(self.project.snapshot()) else {
            return false;
        };
        self.project.restore(previous);
        self.unsaved = true;
        self.broadcast();
        true
    }

    pub fn redo(&mut self) -> bool {
        self.end_gesture();
        let Some(next) = self.history.redo(self.project.snapshot()) else {
            return false;
        };
        self.project.restore(next);
        self.unsaved = true;
        self.broadcast();
        true
    }

    // --- Collaboration ---

    /// Connect to a project room over `transport` as `user_id`.
    pub fn attach(
        &mut self,
        transport: impl Transport + 'static,
        user_id: impl Into<String>,
        room: impl Into<String>,
    ) -> Result<(), TransportError> {
        let transport: Box<dyn Transport> = Box::new(transport);
        let mut sync =
            Synchronizer::new(transport, user_id).with_cursor_interval(self.config.cursor_interval());
        sync.join(room)?;
        self.sync = Some(sync);
        Ok(())
    }

    pub fn detach(&mut self) {
        if let Some(mut sync) = self.sync.take() {
            if let Err(e) = sync.leave() {
                log::debug!("Leave failed: {}", e);
            }
        }
    }

    pub fn sync(&self) -> Option<&Synchronizer<Box<dyn Transport>>> {
        self.sync.as_ref()
    }

    /// Replace the whole state with a peer's.
    ///
    /// Not undoable and not re-broadcast. Rooms are re-derived locally. An
    /// in-progress gesture is abandoned since its starting point is gone.
    pub fn apply_remote_state(&mut self, state: ProjectSnapshot) -> bool {
        if !self.project.restore(state) {
            return false;
        }
        if self.gesture.take().is_some() {
            log::debug!("Remote update interrupted a gesture");
        }
        self.project.refresh_all_rooms();
        self.unsaved = true;
        true
    }

    /// Drain network events and apply remote geometry.
    ///
    /// Also sends any drag changes held back by throttling. The first
    /// client in a room seeds it with its own state.
    pub fn poll_network(&mut self, now: Instant) -> Vec<SyncEvent> {
        self.flush_gesture(now);
        let Some(sync) = self.sync.as_mut() else {
            return Vec::new();
        };
        if let Err(e) = sync.flush(now) {
            log::warn!("Failed to flush cursor: {}", e);
        }
        let events = sync.poll();

        for event in &events {
            match event {
                SyncEvent::RemoteGeometry { from, state } => {
                    log::debug!("Applying geometry from {}", from);
                    self.apply_remote_state(state.clone());
                }
                SyncEvent::Joined { state: Some(state), .. } => {
                    self.apply_remote_state(state.clone());
                }
                SyncEvent::Joined { state: None, .. } => self.broadcast(),
                _ => {}
            }
        }
        events
    }

    pub fn set_cursor(&mut self, position: Point, now: Instant) {
        if let Some(sync) = self.sync.as_mut() {
            if let Err(e) = sync.set_cursor(position, now) {
                log::warn!("Failed to send cursor: {}", e);
            }
        }
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        if let Some(sync) = self.sync.as_mut() {
            if let Err(e) = sync.set_selection(selection) {
                log::warn!("Failed to send selection: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::SnapMode;
    use crate::transport::MemoryHub;
    use std::sync::Arc;
    use std::time::Duration;

    fn editor() -> ProjectEditor {
        ProjectEditor::new(Project::new("House"), EditorConfig::default())
    }

    fn rectangle(editor: &mut ProjectEditor) -> Vec<WallId> {
        let c = [
            Point::new(0.0, 0.0),
            Point::new(400.0, 0.0),
            Point::new(400.0, 300.0),
            Point::new(0.0, 300.0),
        ];
        (0..4)
            .map(|i| editor.draw_wall(c[i], c[(i + 1) % 4]).unwrap())
            .collect()
    }

    #[test]
    fn test_each_edit_is_one_undo_step() {
        let mut editor = editor();
        rectangle(&mut editor);
        assert_eq!(editor.active_level().rooms().len(), 1);
        assert!(editor.has_unsaved_changes());

        assert!(editor.undo());
        assert_eq!(editor.active_level().walls().len(), 3);
        assert!(editor.active_level().rooms().is_empty());

        assert!(editor.redo());
        assert_eq!(editor.active_level().rooms().len(), 1);
    }

    #[test]
    fn test_undo_redo_restore_exact_states() {
        let mut editor = editor();
        rectangle(&mut editor);
        let before = editor.snapshot();
        let room = editor.active_level().rooms()[0].id();
        editor.rename_room(room, "Living");
        let after = editor.snapshot();

        editor.undo();
        assert_eq!(editor.snapshot(), before);
        editor.redo();
        assert_eq!(editor.snapshot(), after);
    }

    #[test]
    fn test_new_edit_invalidates_redo() {
        let mut editor = editor();
        rectangle(&mut editor);
        editor.undo();
        assert!(editor.can_redo());

        editor.set_north_direction(90.0);
        assert!(!editor.can_redo());
        assert!(!editor.redo());
    }

    #[test]
    fn test_noop_edits_record_nothing() {
        let mut editor = editor();
        assert!(!editor.rename_room(uuid::Uuid::new_v4(), "Ghost"));
        assert!(!editor.remove_wall(uuid::Uuid::new_v4()).unwrap());
        assert!(!editor.can_undo());
        assert!(!editor.has_unsaved_changes());
        assert!(!editor.undo());
    }

    #[test]
    fn test_unchanged_wall_patch_records_nothing() {
        let mut editor = editor();
        let ids = rectangle(&mut editor);
        let depth = editor.history.undo_len();
        let patch = WallPatch {
            thickness: Some(Wall::DEFAULT_THICKNESS),
            ..WallPatch::default()
        };

        assert!(!editor.update_wall(ids[0], patch).unwrap());
        assert_eq!(editor.history.undo_len(), depth);

        let patch = WallPatch {
            thickness: Some(25.0),
            ..WallPatch::default()
        };
        assert!(editor.update_wall(ids[0], patch).unwrap());
        assert_eq!(editor.history.undo_len(), depth + 1);
    }

    #[test]
    fn test_draw_wall_snaps_to_grid_and_angle() {
        let mut editor = editor();
        let id = editor
            .draw_wall(Point::new(2.0, -3.0), Point::new(398.0, 4.0))
            .unwrap();
        let wall = editor.active_level().wall(id).unwrap();
        assert_eq!(wall.start, Point::new(0.0, 0.0));
        assert_eq!(wall.end, Point::new(400.0, 0.0));
    }

    #[test]
    fn test_draw_wall_closes_on_existing_endpoint() {
        let mut config = EditorConfig::default();
        config.snap_mode = SnapMode::All;
        let mut editor = ProjectEditor::new(Project::new("House"), config);
        editor.draw_wall(Point::new(0.0, 0.0), Point::new(400.0, 0.0)).unwrap();
        editor.draw_wall(Point::new(400.0, 0.0), Point::new(400.0, 300.0)).unwrap();
        editor.draw_wall(Point::new(400.0, 300.0), Point::new(0.0, 300.0)).unwrap();
        editor.draw_wall(Point::new(1.0, 298.0), Point::new(4.0, 6.0)).unwrap();

        let rooms = editor.active_level().rooms();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].calculated_area, 120_000.0);
    }

    #[test]
    fn test_gesture_is_single_undo_step() {
        let mut editor = editor();
        rectangle(&mut editor);
        let room = editor.active_level().rooms()[0].id();
        editor.rename_room(room, "Study");
        let depth = editor.history.undo_len();
        let before = editor.snapshot();

        editor.begin_gesture();
        let mut corner = Point::new(400.0, 300.0);
        for x in [420.0, 450.0, 500.0] {
            let next = Point::new(x, 300.0);
            assert_eq!(editor.drag_corner(corner, next), 2);
            corner = next;
        }
        assert!(editor.in_gesture());
        assert!(editor.end_gesture());

        assert_eq!(editor.history.undo_len(), depth + 1);
        let rooms = editor.active_level().rooms();
        assert_eq!(rooms[0].name, "Study");
        assert_eq!(rooms[0].calculated_area, 135_000.0);

        editor.undo();
        assert_eq!(editor.snapshot(), before);
    }

    #[test]
    fn test_drag_updates_peers_at_throttled_rate() {
        let hub = MemoryHub::new();
        let mut config = EditorConfig::default();
        config.cursor_throttle_ms = 60_000;
        let mut alice = ProjectEditor::new(Project::new("House"), config);
        alice.attach(hub.connect(), "alice", "house").unwrap();
        alice.poll_network(Instant::now());
        rectangle(&mut alice);
        let mut bob = editor();
        bob.attach(hub.connect(), "bob", "house").unwrap();
        bob.poll_network(Instant::now());

        let updates = |events: &[SyncEvent]| {
            events
                .iter()
                .filter(|e| matches!(e, SyncEvent::RemoteGeometry { .. }))
                .count()
        };
        let corner_at = |editor: &ProjectEditor, x: f64| {
            let p = Point::new(x, 300.0);
            editor
                .active_level()
                .walls()
                .iter()
                .filter(|w| w.start == p || w.end == p)
                .count()
        };

        alice.begin_gesture();
        let mut corner = Point::new(400.0, 300.0);
        for x in [420.0, 450.0, 500.0] {
            let next = Point::new(x, 300.0);
            alice.drag_corner(corner, next);
            corner = next;
        }

        // The first step goes out at once, the rest wait for the interval.
        assert_eq!(updates(&bob.poll_network(Instant::now())), 1);
        assert_eq!(corner_at(&bob, 420.0), 2);

        alice.poll_network(Instant::now() + Duration::from_secs(61));
        assert_eq!(updates(&bob.poll_network(Instant::now())), 1);
        assert_eq!(corner_at(&bob, 500.0), 2);

        assert!(alice.end_gesture());
        bob.poll_network(Instant::now());
        assert_eq!(bob.snapshot(), alice.snapshot());
        assert!(!bob.can_undo());
    }

    #[test]
    fn test_empty_gesture_records_nothing() {
        let mut editor = editor();
        editor.begin_gesture();
        assert!(!editor.end_gesture());
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_last_layer_and_level_rejected() {
        let mut editor = editor();
        let layer = editor.active_level().default_layer_id().unwrap();
        assert_eq!(editor.remove_layer(layer), Err(EditError::LastLayer));
        let level = editor.project().active_level_id();
        assert_eq!(editor.remove_level(level).map(|l| l.id()), Err(EditError::LastLevel));
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_remote_state_not_undoable() {
        let mut source = editor();
        rectangle(&mut source);

        let mut target = editor();
        target.set_north_direction(45.0);
        target.mark_saved();
        let depth = target.history.undo_len();

        assert!(target.apply_remote_state(source.snapshot()));
        assert_eq!(target.history.undo_len(), depth);
        assert!(target.has_unsaved_changes());
        assert_eq!(target.active_level().rooms().len(), 1);
        assert_eq!(target.snapshot(), source.snapshot());
    }

    #[test]
    fn test_layerless_remote_state_is_refused() {
        let hub = MemoryHub::new();
        let mut alice = editor();
        alice.attach(hub.connect(), "alice", "house").unwrap();
        alice.poll_network(Instant::now());
        let before = alice.snapshot();

        let mut peer = hub.connect();
        peer.send(r#"{"event":"join","room":"house","user_id":"carol"}"#).unwrap();
        let mut state = serde_json::to_value(&before).unwrap();
        state["levels"][0]["layers"] = serde_json::json!([]);
        let update = serde_json::json!({ "event": "geometry_update", "state": state });
        peer.send(&update.to_string()).unwrap();

        alice.poll_network(Instant::now());
        assert_eq!(alice.snapshot(), before);
        assert!(alice.draw_wall(Point::new(0.0, 0.0), Point::new(100.0, 0.0)).is_ok());

        let mut stripped = alice.snapshot();
        Arc::make_mut(&mut stripped.levels[0]).strip_layers();
        assert!(!alice.apply_remote_state(stripped));
        assert!(alice.active_level().default_layer_id().is_some());
    }

    #[test]
    fn test_edits_broadcast_to_peers() {
        let hub = MemoryHub::new();
        let mut alice = editor();
        let mut bob = editor();
        alice.attach(hub.connect(), "alice", "house").unwrap();
        alice.poll_network(Instant::now());
        bob.attach(hub.connect(), "bob", "house").unwrap();
        bob.poll_network(Instant::now());

        rectangle(&mut alice);
        bob.poll_network(Instant::now());
        assert_eq!(bob.snapshot(), alice.snapshot());
        assert!(!bob.can_undo());
    }
}
