//! Circular Zero - native entry point
//!
//! Plays a scripted headless session and logs what happens. Pass a settings
//! JSON path as the first argument to override the defaults.

use circular_zero::Settings;
use circular_zero::consts::TICK_MS;
use circular_zero::platform::{FrameClock, Viewport};
use circular_zero::scene::Scene;
use circular_zero::sim::{GameEvent, GameMode, GameState, PointerEvent, TickInput, tick};

/// One scripted gesture: press on the rim at `press` (pixels), release at
/// `release`
struct Gesture {
    press: (f64, f64),
    release: (f64, f64),
}

const SCRIPT: &[Gesture] = &[
    // Horizontal diameter
    Gesture {
        press: (486.4, 256.0),
        release: (486.4, 256.0),
    },
    // Arc cutting off the lower right
    Gesture {
        press: (256.0, 486.4),
        release: (330.0, 400.0),
    },
    // Vertical diameter
    Gesture {
        press: (256.0, 25.6),
        release: (256.0, 25.6),
    },
    Gesture {
        press: (60.0, 140.0),
        release: (150.0, 180.0),
    },
    Gesture {
        press: (420.0, 90.0),
        release: (380.0, 160.0),
    },
];

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Circular Zero (native) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path),
        None => Settings::default(),
    };
    let max_substeps = settings.max_substeps;

    let mut state = GameState::new(settings, GameMode::ClassicArcade);
    let viewport = Viewport::default();
    let mut clock = FrameClock::with_cap(0.0, max_substeps);
    let mut now_ms = 0.0;

    // Simulated 60 Hz display
    let mut run_for = |state: &mut GameState, ms: f64, input: TickInput| {
        let mut input = Some(input);
        let end = now_ms + ms;
        while now_ms < end {
            now_ms += TICK_MS;
            for _ in 0..clock.advance(now_ms) {
                tick(state, &input.take().unwrap_or_default(), TICK_MS);
            }
        }
    };

    run_for(&mut state, 2500.0, TickInput::default());

    for gesture in SCRIPT {
        let press = viewport.normalize(gesture.press.0, gesture.press.1);
        let release = viewport.normalize(gesture.release.0, gesture.release.1);
        let input = TickInput::from_events([
            PointerEvent::Move(press),
            PointerEvent::Down(press),
            PointerEvent::Move(release),
            PointerEvent::Up(release),
        ]);
        run_for(&mut state, TICK_MS, input);
        while state.is_growing() {
            run_for(&mut state, 100.0, TickInput::default());
        }

        for event in state.drain_events() {
            match event {
                GameEvent::LevelCompleted { level } => log::info!("level {} won", level),
                GameEvent::LevelFailed { level } => log::info!("level {} lost", level),
                other => log::debug!("{:?}", other),
            }
        }
        log::info!(
            "{}% claimed, {} walls left",
            state.progress_percent(),
            state.remaining_walls
        );
        if state.input_locked() {
            break;
        }
    }

    let scene = Scene::capture(&state);
    log::info!(
        "final scene: level {}, {} regions, {} walls",
        scene.level,
        scene.regions.len(),
        scene.walls.len()
    );
    match scene.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("failed to serialize scene: {}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Headless driver is native only
}
