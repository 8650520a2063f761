//! Game settings
//!
//! Tunable gameplay parameters, loadable from JSON. Missing fields take
//! their defaults, so a settings file only needs the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::MAX_SUBSTEPS;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Walls ===
    /// Wall growth speed, arena units per second
    pub cursor_speed: f64,
    pub cursor_radius: f64,
    /// Wall budget at level 1 of the arcade modes
    pub initial_walls: u32,
    /// Whether an aborted wall gives its budget unit back
    pub refund_aborted_wall: bool,
    /// Pointer within this many degrees of the line candidate snaps to it
    pub snap_degrees: f64,

    // === Progress ===
    /// Claimed percentage that wins a level
    pub win_percent: u32,
    /// Displayed progress only moves when the estimate rises by more than this
    pub area_debounce: f64,

    // === Area estimation ===
    /// Sample points registered each tick while a wall grows
    pub samples_per_tick: usize,
    /// Sample points registered after laying a level's static walls
    pub level_start_samples: usize,

    // === Timing ===
    /// Catch-up cap: logical steps per frame
    pub max_substeps: u32,

    /// RNG seed for level generation and sampling
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cursor_speed: 0.5,
            cursor_radius: 0.025,
            initial_walls: 5,
            refund_aborted_wall: false,
            snap_degrees: 2.0,

            win_percent: 75,
            area_debounce: 0.01,

            samples_per_tick: 100,
            level_start_samples: 2000,

            max_substeps: MAX_SUBSTEPS,

            seed: 12345,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a settings file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Read a settings file, falling back to defaults if it is missing or bad
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_path(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Using default settings ({}: {})", path.display(), e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.cursor_speed.is_nan() || self.cursor_speed <= 0.0 {
            return Err(SettingsError::Invalid {
                name: "cursor_speed",
                reason: format!("must be positive, got {}", self.cursor_speed),
            });
        }
        let r = self.cursor_radius;
        if r.is_nan() || r <= 0.0 || r >= 1.0 {
            return Err(SettingsError::Invalid {
                name: "cursor_radius",
                reason: format!("must lie in (0, 1), got {}", self.cursor_radius),
            });
        }
        if self.win_percent > 100 {
            return Err(SettingsError::Invalid {
                name: "win_percent",
                reason: format!("must be at most 100, got {}", self.win_percent),
            });
        }
        if self.max_substeps == 0 {
            return Err(SettingsError::Invalid {
                name: "max_substeps",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
