//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (enemies by index, tree nodes by id)
//! - No rendering or platform dependencies

pub mod collision;
pub mod geometry;
pub mod growth;
pub mod sampling;
pub mod state;
pub mod tick;
pub mod tree;

pub use collision::{Contact, WallHit, detect_wall_hit, move_enemies, reflect_heading};
pub use geometry::{Circle, CircleKind, Geometry, Line, Side};
pub use growth::{Candidate, Checkpoint, Growth, WallState};
pub use sampling::AreaEstimator;
pub use state::{Cursor, Enemy, GameEvent, GameMode, GameState, Splash, SplashKind};
pub use tick::{PointerEvent, TickInput, tick};
pub use tree::{NodeId, NodeKind, RegionTree};
