//! Circular Zero - A circular arena wall-splitting game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (region tree, area estimation, collisions, wall growth)
//! - `levels`: Level data (enemy types, arcade generation, campaign table)
//! - `platform`: Input normalisation and fixed-rate frame clock
//! - `scene`: Render-ready snapshot of the simulation
//! - `settings`: Tunable game parameters

pub mod levels;
pub mod platform;
pub mod scene;
pub mod settings;
pub mod sim;

pub use settings::{Settings, SettingsError};

use glam::DVec2;

/// Game configuration constants
pub mod consts {
    /// Fixed logical step (60 Hz), in milliseconds
    pub const TICK_MS: f64 = 1000.0 / 60.0;
    /// Maximum logical steps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// The arena is the unit disc; all coordinates are in [-1, 1]
    pub const ARENA_RADIUS: f64 = 1.0;

    /// Tolerance for geometric branch selection
    pub const EPSILON: f64 = 1e-9;
    /// Distance below which an enemy's remaining travel is considered spent
    pub const MIN_TRAVEL: f64 = 1e-6;
    /// Bounce cap per enemy per tick (corners can produce zero-length bounces)
    pub const MAX_BOUNCES: u32 = 32;

    /// Radius of the arbitrary circle candidate seeded on pointer press
    pub const CANDIDATE_RADIUS: f64 = 0.2;
    /// Pointer presses further out than this (in arena units) are ignored
    pub const PRESS_BOUND: f64 = 1.1;

    /// Splash durations (seconds)
    pub const LEVEL_STARTED_SECS: f64 = 2.0;
    pub const LEVEL_COMPLETED_SECS: f64 = 3.0;
    pub const LEVEL_FAILED_SECS: f64 = 3.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Shift `angle` by multiples of 2π so it lies within π of `reference`
///
/// Angles are never normalised across the branch cut; a swept range stays
/// on whichever branch its start angle picked.
#[inline]
pub fn unwrap_near(angle: f64, reference: f64) -> f64 {
    reference + normalize_angle(angle - reference)
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f64, theta: f64) -> DVec2 {
    DVec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: DVec2) -> (f64, f64) {
    (pos.length(), pos.y.atan2(pos.x))
}
