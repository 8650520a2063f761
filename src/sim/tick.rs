//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use glam::DVec2;

use super::collision::{WallHit, detect_wall_hit, move_enemies};
use super::state::GameState;

/// Pointer action in arena coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(DVec2),
    Move(DVec2),
    Up(DVec2),
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer events since the last tick, oldest first
    pub pointer: Vec<PointerEvent>,
}

impl TickInput {
    pub fn from_events(events: impl IntoIterator<Item = PointerEvent>) -> Self {
        Self {
            pointer: events.into_iter().collect(),
        }
    }
}

/// Route a pointer event to the wall controller
pub fn apply_pointer(state: &mut GameState, event: PointerEvent) {
    match event {
        PointerEvent::Down(p) => state.pointer_down(p),
        PointerEvent::Move(p) => state.pointer_move(p),
        PointerEvent::Up(p) => state.pointer_up(p),
    }
}

/// Advance the game state by one fixed timestep of `dt_ms`
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: f64) {
    for &event in &input.pointer {
        apply_pointer(state, event);
    }

    state.time_ticks += 1;

    if let Some(ended) = state.tick_splash(dt_ms) {
        state.end_splash(ended);
    }

    move_enemies(&state.tree, &mut state.enemies, dt_ms);

    if state.is_growing() {
        state
            .estimator
            .run(&mut state.tree, state.settings.samples_per_tick);

        match detect_wall_hit(state) {
            Some(hit) => {
                let (WallHit::Cursor(i) | WallHit::Wall(i)) = hit;
                log::debug!("enemy {} broke the wall ({:?})", i, hit);
                state.abort_wall();
            }
            None => state.advance_growth(dt_ms),
        }
    }

    state.check_failure();
}
