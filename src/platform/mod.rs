//! Platform abstraction layer
//!
//! Handles host differences for:
//! - Time/ticks (fixed-rate clock with catch-up)
//! - Input events (device pixels to arena coordinates)

use glam::DVec2;

use crate::consts::{MAX_SUBSTEPS, TICK_MS};

/// Square drawing surface the arena is shown in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Client-space position of the surface's top-left corner
    pub left: f64,
    pub top: f64,
    /// Side length in pixels
    pub resolution: f64,
    /// Fraction of the surface the arena diameter fills
    pub render_scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            resolution: 512.0,
            render_scale: 0.9,
        }
    }
}

impl Viewport {
    /// Convert a client-space pointer position to arena coordinates
    /// (y up, the rim at distance 1)
    pub fn normalize(&self, client_x: f64, client_y: f64) -> DVec2 {
        let x = 2.0 * (client_x - self.left) / self.resolution - 1.0;
        // Negate Y (screen coords are flipped)
        let y = 1.0 - 2.0 * (client_y - self.top) / self.resolution;
        DVec2::new(x, y) / self.render_scale
    }
}

/// Fixed-rate clock: tells the host how many logical steps to run per frame
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_ms: f64,
    interval_ms: f64,
    max_substeps: u32,
    /// Steps dropped by the catch-up cap since creation
    pub dropped_steps: u64,
}

impl FrameClock {
    pub fn new(now_ms: f64) -> Self {
        Self::with_cap(now_ms, MAX_SUBSTEPS)
    }

    pub fn with_cap(now_ms: f64, max_substeps: u32) -> Self {
        Self {
            last_ms: now_ms,
            interval_ms: TICK_MS,
            max_substeps: max_substeps.max(1),
            dropped_steps: 0,
        }
    }

    /// Number of steps due at `now_ms`; the remainder carries over
    pub fn advance(&mut self, now_ms: f64) -> u32 {
        let elapsed = now_ms - self.last_ms;
        if elapsed < self.interval_ms {
            return 0;
        }
        self.last_ms = now_ms - elapsed % self.interval_ms;

        let due = (elapsed / self.interval_ms).floor() as u64;
        let steps = due.min(self.max_substeps as u64);
        if due > steps {
            self.dropped_steps += due - steps;
            log::trace!("frame clock fell behind, dropped {} steps", due - steps);
        }
        steps as u32
    }
}
