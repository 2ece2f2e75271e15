//! Floorplan Core Library
//!
//! Data model, room inference, undo history and real-time collaboration for
//! a parametric floor-plan editor. Rendering and application chrome live
//! elsewhere; they read the model and drive it through [`ProjectEditor`].

pub mod collaboration;
pub mod config;
pub mod editor;
pub mod geometry;
pub mod history;
pub mod model;
pub mod presence;
pub mod protocol;
pub mod rooms;
pub mod snap;
pub mod storage;
pub mod transport;

pub use collaboration::{SyncEvent, Synchronizer};
pub use config::{ConfigError, EditorConfig};
pub use editor::ProjectEditor;
pub use geometry::{PointKey, centroid_sort, dedup_vertices, polygon_area};
pub use history::UndoManager;
pub use model::{EditError, Level, ModelError, Project, ProjectSnapshot, Room, SavedProject, Wall};
pub use presence::{PresenceMap, PresenceState, Selection};
pub use rooms::{CycleStrategy, RoomDetection};
pub use snap::{GRID_SIZE, SnapMode, SnapResult, snap_to_grid};
pub use transport::{ConnectionState, MemoryHub, NativeWebSocket, Transport, TransportError};
