//! Room inference from the wall graph.
//!
//! Wall endpoints are merged into graph nodes by [`PointKey`]; each wall is an
//! undirected edge. Two strategies extract closed loops:
//!
//! - [`CycleStrategy::PlanarFaces`] walks half-edges, always turning to the
//!   next clockwise neighbour, and reports every bounded face. Linear in the
//!   number of walls; adjacent rooms come out as separate faces.
//! - [`CycleStrategy::Enumerate`] enumerates elementary cycles by DFS and
//!   deduplicates them by node set. Worst case exponential, so path length and
//!   cycle count are capped. Adjacent rooms also produce their merged outline.
//!
//! Neither validates planarity: crossing walls without a shared endpoint are
//! not split, and distinct corners that round to the same key merge.

use crate::geometry::{PointKey, polygon_area, signed_area};
use crate::model::{Room, RoomKey, RoomType, Wall, WallId, default_name_number};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Faces with less area than this (cm²) are discarded.
const MIN_FACE_AREA: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStrategy {
    Enumerate,
    #[default]
    PlanarFaces,
}

/// Room detection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomDetection {
    pub strategy: CycleStrategy,
    /// Longest cycle (in walls) the enumerator will follow.
    pub max_cycle_length: usize,
    /// Stop enumerating after this many distinct cycles.
    pub max_cycles: usize,
}

impl Default for RoomDetection {
    fn default() -> Self {
        Self {
            strategy: CycleStrategy::default(),
            max_cycle_length: 64,
            max_cycles: 512,
        }
    }
}

/// A closed loop of walls.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    /// Walls in traversal order.
    pub wall_ids: Vec<WallId>,
    /// Corner positions in traversal order.
    pub vertices: Vec<Point>,
}

impl Cycle {
    pub fn area(&self) -> f64 {
        polygon_area(&self.vertices)
    }

    pub fn key(&self) -> RoomKey {
        RoomKey::new(&self.wall_ids)
    }
}

/// Undirected multigraph over canonicalized wall endpoints.
struct WallGraph {
    /// Position of each node (first endpoint seen for its key).
    positions: Vec<Point>,
    /// Distinct neighbour nodes per node, in insertion order.
    adjacency: Vec<Vec<usize>>,
    /// Walls joining an unordered node pair, keyed `(min, max)`.
    edge_walls: HashMap<(usize, usize), Vec<WallId>>,
    /// `(wall, from, to)` for every non-degenerate wall.
    edges: Vec<(WallId, usize, usize)>,
}

impl WallGraph {
    fn build(walls: &[Wall]) -> Self {
        let mut index: HashMap<PointKey, usize> = HashMap::new();
        let mut graph = Self {
            positions: Vec::new(),
            adjacency: Vec::new(),
            edge_walls: HashMap::new(),
            edges: Vec::new(),
        };

        for wall in walls {
            let finite = |p: Point| p.x.is_finite() && p.y.is_finite();
            if !(finite(wall.start) && finite(wall.end)) {
                log::debug!("Skipping wall {} with non-finite endpoints", wall.id());
                continue;
            }
            let a = graph.node(&mut index, wall.start);
            let b = graph.node(&mut index, wall.end);
            if a == b {
                log::debug!("Skipping zero-length wall {} in room inference", wall.id());
                continue;
            }
            if !graph.adjacency[a].contains(&b) {
                graph.adjacency[a].push(b);
                graph.adjacency[b].push(a);
            }
            graph
                .edge_walls
                .entry((a.min(b), a.max(b)))
                .or_default()
                .push(wall.id());
            graph.edges.push((wall.id(), a, b));
        }
        graph
    }

    fn node(&mut self, index: &mut HashMap<PointKey, usize>, p: Point) -> usize {
        *index.entry(PointKey::from_point(p)).or_insert_with(|| {
            self.positions.push(p);
            self.adjacency.push(Vec::new());
            self.positions.len() - 1
        })
    }

    fn wall_between(&self, a: usize, b: usize) -> Option<WallId> {
        self.edge_walls
            .get(&(a.min(b), a.max(b)))
            .and_then(|walls| walls.first().copied())
    }

    fn cycle_from_nodes(&self, nodes: &[usize]) -> Option<Cycle> {
        let mut wall_ids = Vec::with_capacity(nodes.len());
        for i in 0..nodes.len() {
            wall_ids.push(self.wall_between(nodes[i], nodes[(i + 1) % nodes.len()])?);
        }
        Some(Cycle {
            wall_ids,
            vertices: nodes.iter().map(|&n| self.positions[n]).collect(),
        })
    }

    /// DFS enumeration of elementary cycles.
    ///
    /// Each search only visits nodes above its start index, so every cycle is
    /// found from its lowest node. Both traversal directions are then folded
    /// together by the sorted-node key.
    fn enumerate_cycles(&self, config: &RoomDetection) -> Vec<Cycle> {
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut found: Vec<Vec<usize>> = Vec::new();
        let mut on_path = vec![false; self.positions.len()];

        for start in 0..self.positions.len() {
            if found.len() >= config.max_cycles {
                log::warn!(
                    "Room inference stopped after {} cycles; some rooms may be missing",
                    config.max_cycles
                );
                break;
            }
            let mut path = vec![start];
            on_path[start] = true;
            self.extend_path(&mut path, &mut on_path, &mut seen, &mut found, config);
            on_path[start] = false;
        }

        found
            .iter()
            .filter_map(|nodes| self.cycle_from_nodes(nodes))
            .collect()
    }

    fn extend_path(
        &self,
        path: &mut Vec<usize>,
        on_path: &mut [bool],
        seen: &mut HashSet<Vec<usize>>,
        found: &mut Vec<Vec<usize>>,
        config: &RoomDetection,
    ) {
        let start = path[0];
        let Some(&current) = path.last() else {
            return;
        };

        for &next in &self.adjacency[current] {
            if found.len() >= config.max_cycles {
                return;
            }
            if next == start && path.len() > 2 {
                let mut key = path.clone();
                key.sort_unstable();
                if seen.insert(key) {
                    found.push(path.clone());
                }
            } else if next > start && !on_path[next] && path.len() < config.max_cycle_length {
                path.push(next);
                on_path[next] = true;
                self.extend_path(path, on_path, seen, found, config);
                on_path[next] = false;
                path.pop();
            }
        }
    }

    /// Bounded faces of the planar embedding.
    fn planar_faces(&self) -> Vec<Cycle> {
        // Half-edge 2k runs from -> to of edge k, 2k+1 the reverse.
        let half_count = self.edges.len() * 2;
        let origin = |he: usize| {
            let (_, a, b) = self.edges[he / 2];
            if he % 2 == 0 { a } else { b }
        };
        let target = |he: usize| origin(he ^ 1);

        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); self.positions.len()];
        for he in 0..half_count {
            outgoing[origin(he)].push(he);
        }
        let angle = |he: usize| {
            let d = self.positions[target(he)] - self.positions[origin(he)];
            d.y.atan2(d.x)
        };
        let mut slot = vec![0usize; half_count];
        for list in &mut outgoing {
            list.sort_by(|&a, &b| angle(a).total_cmp(&angle(b)).then(a.cmp(&b)));
            for (i, &he) in list.iter().enumerate() {
                slot[he] = i;
            }
        }

        let mut used = vec![false; half_count];
        let mut faces = Vec::new();
        for first in 0..half_count {
            if used[first] {
                continue;
            }
            let mut face = Vec::new();
            let mut he = first;
            while !used[he] {
                used[he] = true;
                face.push(he);
                let twin = he ^ 1;
                let around = &outgoing[origin(twin)];
                he = around[(slot[twin] + around.len() - 1) % around.len()];
            }

            let vertices: Vec<Point> = face.iter().map(|&he| self.positions[origin(he)]).collect();
            let area = signed_area(&vertices);
            if area.is_nan() || area <= MIN_FACE_AREA {
                continue;
            }

            // A wall walked on both sides inside one face is a spur, not a boundary.
            let mut counts: HashMap<WallId, usize> = HashMap::new();
            for &he in &face {
                *counts.entry(self.edges[he / 2].0).or_default() += 1;
            }
            let wall_ids: Vec<WallId> = face
                .iter()
                .map(|&he| self.edges[he / 2].0)
                .filter(|id| counts[id] == 1)
                .collect();
            if wall_ids.len() < 3 {
                continue;
            }
            faces.push(Cycle { wall_ids, vertices });
        }
        faces
    }
}

/// Find closed wall loops on one level.
pub fn detect_cycles(walls: &[Wall], config: &RoomDetection) -> Vec<Cycle> {
    let graph = WallGraph::build(walls);
    let mut cycles = match config.strategy {
        CycleStrategy::Enumerate => graph.enumerate_cycles(config),
        CycleStrategy::PlanarFaces => graph.planar_faces(),
    };
    cycles.sort_by_cached_key(Cycle::key);
    cycles
}

/// Next number for an auto-generated `Room <N>` name.
pub fn next_room_number(rooms: &[Room]) -> u32 {
    rooms
        .iter()
        .filter_map(|r| default_name_number(&r.name))
        .max()
        .map_or(1, |n| n + 1)
}

/// Rebuild the room list from freshly detected cycles.
///
/// A cycle whose wall set matches an existing room keeps that room's id, name
/// and type; only its boundary order and area are refreshed. Unmatched cycles
/// become new rooms named `Room N`. Rooms without a cycle are dropped.
pub fn sync_rooms(existing: &[Room], cycles: Vec<Cycle>) -> Vec<Room> {
    let mut by_key: HashMap<RoomKey, &Room> = HashMap::new();
    for room in existing {
        by_key.entry(room.key()).or_insert(room);
    }

    let mut next_number = next_room_number(existing);
    let mut rooms = Vec::with_capacity(cycles.len());
    for cycle in cycles {
        let calculated_area = cycle.area();
        let room = match by_key.remove(&cycle.key()) {
            Some(prev) => Room {
                id: prev.id,
                name: prev.name.clone(),
                room_type: prev.room_type,
                wall_ids: cycle.wall_ids,
                calculated_area,
            },
            None => {
                let name = format!("Room {next_number}");
                next_number += 1;
                Room {
                    id: Uuid::new_v4(),
                    name,
                    room_type: RoomType::default(),
                    wall_ids: cycle.wall_ids,
                    calculated_area,
                }
            }
        };
        rooms.push(room);
    }
    rooms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walls_through(corners: &[(f64, f64)]) -> Vec<Wall> {
        let layer = Uuid::new_v4();
        (0..corners.len())
            .map(|i| {
                let (x1, y1) = corners[i];
                let (x2, y2) = corners[(i + 1) % corners.len()];
                Wall::new(Point::new(x1, y1), Point::new(x2, y2), layer)
            })
            .collect()
    }

    fn rectangle() -> Vec<Wall> {
        walls_through(&[(0.0, 0.0), (400.0, 0.0), (400.0, 300.0), (0.0, 300.0)])
    }

    fn both() -> [RoomDetection; 2] {
        [
            RoomDetection { strategy: CycleStrategy::Enumerate, ..RoomDetection::default() },
            RoomDetection { strategy: CycleStrategy::PlanarFaces, ..RoomDetection::default() },
        ]
    }

    #[test]
    fn test_rectangle_yields_one_room() {
        let walls = rectangle();
        let expected = RoomKey::new(&walls.iter().map(Wall::id).collect::<Vec<_>>());
        for config in both() {
            let cycles = detect_cycles(&walls, &config);
            assert_eq!(cycles.len(), 1, "{:?}", config.strategy);
            assert_eq!(cycles[0].key(), expected);
            assert_eq!(cycles[0].area(), 120_000.0);
        }
    }

    #[test]
    fn test_dangling_walls_produce_nothing() {
        let layer = Uuid::new_v4();
        let walls = vec![
            Wall::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), layer),
            Wall::new(Point::new(100.0, 0.0), Point::new(100.0, 100.0), layer),
            Wall::new(Point::new(500.0, 500.0), Point::new(600.0, 500.0), layer),
        ];
        for config in both() {
            assert!(detect_cycles(&walls, &config).is_empty());
        }
    }

    #[test]
    fn test_spur_inside_room_is_not_boundary() {
        let mut walls = rectangle();
        let spur = Wall::new(Point::new(0.0, 150.0), Point::new(120.0, 150.0), walls[0].layer_id);
        // Split the left wall so the spur attaches at a node.
        walls.pop();
        let layer = walls[0].layer_id;
        walls.push(Wall::new(Point::new(0.0, 300.0), Point::new(0.0, 150.0), layer));
        walls.push(Wall::new(Point::new(0.0, 150.0), Point::new(0.0, 0.0), layer));
        let spur_id = spur.id();
        walls.push(spur);

        for config in both() {
            let cycles = detect_cycles(&walls, &config);
            assert_eq!(cycles.len(), 1, "{:?}", config.strategy);
            assert!(!cycles[0].wall_ids.contains(&spur_id));
            assert_eq!(cycles[0].wall_ids.len(), 5);
            assert!((cycles[0].area() - 120_000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_non_finite_walls_never_form_rooms() {
        let mut walls = rectangle();
        walls[2].end = Point::new(f64::NAN, 300.0);
        walls[3].start = Point::new(f64::NAN, 300.0);
        for config in both() {
            assert!(detect_cycles(&walls, &config).is_empty(), "{:?}", config.strategy);
        }

        let layer = walls[0].layer_id;
        let inf = Point::new(f64::INFINITY, 0.0);
        let walls = vec![
            Wall::new(Point::new(0.0, 0.0), inf, layer),
            Wall::new(inf, Point::new(0.0, 300.0), layer),
            Wall::new(Point::new(0.0, 300.0), Point::new(0.0, 0.0), layer),
        ];
        for config in both() {
            let cycles = detect_cycles(&walls, &config);
            assert!(cycles.iter().all(|c| c.area().is_finite()));
            assert!(cycles.is_empty());
        }
    }

    #[test]
    fn test_adjacent_rooms_share_wall() {
        let layer = Uuid::new_v4();
        let p = |x: f64, y: f64| Point::new(x, y);
        let walls = vec![
            Wall::new(p(0.0, 0.0), p(300.0, 0.0), layer),
            Wall::new(p(300.0, 0.0), p(600.0, 0.0), layer),
            Wall::new(p(600.0, 0.0), p(600.0, 300.0), layer),
            Wall::new(p(600.0, 300.0), p(300.0, 300.0), layer),
            Wall::new(p(300.0, 300.0), p(0.0, 300.0), layer),
            Wall::new(p(0.0, 300.0), p(0.0, 0.0), layer),
            Wall::new(p(300.0, 0.0), p(300.0, 300.0), layer),
        ];
        let shared = walls[6].id();

        let faces = detect_cycles(&walls, &RoomDetection::default());
        assert_eq!(faces.len(), 2);
        assert!(faces.iter().all(|c| c.wall_ids.contains(&shared)));
        assert!(faces.iter().all(|c| c.area() == 90_000.0));

        // The enumerator also reports the merged outline.
        let enumerated = detect_cycles(
            &walls,
            &RoomDetection { strategy: CycleStrategy::Enumerate, ..RoomDetection::default() },
        );
        assert_eq!(enumerated.len(), 3);
        assert!(enumerated.iter().any(|c| c.area() == 180_000.0));
    }

    #[test]
    fn test_l_shaped_room_area() {
        let walls = walls_through(&[
            (0.0, 0.0),
            (400.0, 0.0),
            (400.0, 200.0),
            (200.0, 200.0),
            (200.0, 400.0),
            (0.0, 400.0),
        ]);
        for config in both() {
            let cycles = detect_cycles(&walls, &config);
            assert_eq!(cycles.len(), 1);
            assert_eq!(cycles[0].area(), 120_000.0);
        }
    }

    #[test]
    fn test_enumeration_respects_cycle_cap() {
        // A 4x4 grid of cells has many elementary cycles.
        let layer = Uuid::new_v4();
        let mut walls = Vec::new();
        for i in 0..=4 {
            for j in 0..4 {
                let (a, b) = (i as f64 * 100.0, j as f64 * 100.0);
                walls.push(Wall::new(Point::new(a, b), Point::new(a, b + 100.0), layer));
                walls.push(Wall::new(Point::new(b, a), Point::new(b + 100.0, a), layer));
            }
        }
        let config = RoomDetection {
            strategy: CycleStrategy::Enumerate,
            max_cycle_length: 64,
            max_cycles: 20,
        };
        assert!(detect_cycles(&walls, &config).len() <= 20);
        assert_eq!(detect_cycles(&walls, &RoomDetection::default()).len(), 16);
    }

    #[test]
    fn test_sync_preserves_metadata_and_names_new_rooms() {
        let walls = rectangle();
        let config = RoomDetection::default();
        let mut rooms = sync_rooms(&[], detect_cycles(&walls, &config));
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].name, "Room 1");

        rooms[0].name = "Kitchen".into();
        rooms[0].room_type = RoomType::Kitchen;
        let id = rooms[0].id();

        let again = sync_rooms(&rooms, detect_cycles(&walls, &config));
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id(), id);
        assert_eq!(again[0].name, "Kitchen");
        assert_eq!(again[0].room_type, RoomType::Kitchen);
        assert_eq!(again[0].key(), rooms[0].key());
    }

    #[test]
    fn test_next_room_number_skips_taken_names() {
        let room = |name: &str| Room {
            id: Uuid::new_v4(),
            name: name.into(),
            room_type: RoomType::Generic,
            wall_ids: Vec::new(),
            calculated_area: 0.0,
        };
        assert_eq!(next_room_number(&[]), 1);
        assert_eq!(next_room_number(&[room("Room 2"), room("Kitchen"), room("Room 5")]), 6);
    }
}
