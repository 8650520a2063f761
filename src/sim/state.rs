//! Game session state
//!
//! Everything the tick touches lives in one `GameState`: the region tree,
//! the enemy list, the cursor, the wall controller, the wall budget and the
//! splash/level bookkeeping. No module keeps state of its own.

use glam::DVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::geometry::{Circle, CircleKind, Geometry};
use super::growth::WallState;
use super::sampling::AreaEstimator;
use super::tree::{NodeId, RegionTree};
use crate::consts::*;
use crate::levels::{self, Campaign, LevelSource};
use crate::settings::Settings;
use crate::{normalize_angle, polar_to_cartesian};

/// How levels are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameMode {
    /// Level n: n standard enemies at random
    #[default]
    ClassicArcade,
    /// Level n: random enemy types whose difficulty adds up to n
    VarietyArcade,
    /// Fixed level table with static walls
    Campaign,
}

/// Between-level screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplashKind {
    LevelStarted,
    LevelCompleted,
    LevelFailed,
    CampaignCompleted,
}

impl SplashKind {
    /// How long the splash stays up, None for forever
    pub fn duration_secs(self) -> Option<f64> {
        match self {
            SplashKind::LevelStarted => Some(LEVEL_STARTED_SECS),
            SplashKind::LevelCompleted => Some(LEVEL_COMPLETED_SECS),
            SplashKind::LevelFailed => Some(LEVEL_FAILED_SECS),
            SplashKind::CampaignCompleted => None,
        }
    }

    /// Locked splashes refuse new walls
    pub fn locked(self) -> bool {
        matches!(self, SplashKind::LevelCompleted | SplashKind::LevelFailed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Splash {
    pub kind: SplashKind,
    /// Milliseconds left, None while the splash never ends
    pub remaining_ms: Option<f64>,
}

impl Splash {
    pub fn new(kind: SplashKind) -> Self {
        Self {
            kind,
            remaining_ms: kind.duration_secs().map(|s| s * 1000.0),
        }
    }
}

/// Notifications for the UI, drained by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    LevelStarted { level: usize },
    WallStarted { checkpoints: usize },
    WallCompleted,
    WallAborted,
    ProgressChanged { percent: u32 },
    WallsChanged { remaining: u32 },
    LevelCompleted { level: usize },
    LevelFailed { level: usize },
    CampaignCompleted,
}

/// A bouncing enemy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub pos: DVec2,
    /// Arena units per second
    pub speed: f64,
    /// Heading angle (radians)
    pub heading: f64,
    pub radius: f64,
    /// Index into the enemy type table
    pub kind: usize,
    /// The open leaf containing this enemy
    pub leaf: NodeId,
}

impl Enemy {
    pub fn new(pos: DVec2, speed: f64, heading: f64, radius: f64, kind: usize) -> Self {
        Self {
            pos,
            speed,
            heading: normalize_angle(heading),
            radius,
            kind,
            leaf: NodeId::default(),
        }
    }

    /// Unit vector along the heading
    #[inline]
    pub fn direction(&self) -> DVec2 {
        DVec2::new(self.heading.cos(), self.heading.sin())
    }

    pub fn velocity(&self) -> DVec2 {
        self.direction() * self.speed
    }

    pub fn set_heading(&mut self, heading: f64) {
        self.heading = normalize_angle(heading);
    }

    /// Bounding disc
    pub fn body(&self) -> Circle {
        Circle::new(self.pos, self.radius, CircleKind::Inside)
    }
}

/// The player's cursor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cursor {
    pub pos: DVec2,
    pub radius: f64,
}

impl Cursor {
    pub fn new(radius: f64) -> Self {
        Self {
            pos: DVec2::new(ARENA_RADIUS, 0.0),
            radius,
        }
    }

    pub fn body(&self) -> Circle {
        Circle::new(self.pos, self.radius, CircleKind::Inside)
    }

    /// Place on the arena rim at the polar angle of `p`
    pub fn track_rim(&mut self, p: DVec2) {
        self.pos = polar_to_cartesian(ARENA_RADIUS, p.y.atan2(p.x));
    }
}

/// The game session
pub struct GameState {
    pub settings: Settings,
    pub mode: GameMode,
    /// Current level (1-based)
    pub level: usize,
    pub tree: RegionTree,
    pub enemies: Vec<Enemy>,
    pub cursor: Cursor,
    pub wall: WallState,
    pub remaining_walls: u32,
    /// Displayed claimed fraction; only rises, in steps above the debounce
    pub claimed: f64,
    pub splash: Option<Splash>,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub events: Vec<GameEvent>,
    pub estimator: AreaEstimator,
    level_won: bool,
    rng: Pcg32,
    levels: Box<dyn LevelSource>,
}

impl GameState {
    /// New session with the built-in campaign, starting at level 1
    pub fn new(settings: Settings, mode: GameMode) -> Self {
        Self::with_levels(settings, mode, Box::new(Campaign::builtin()))
    }

    pub fn with_levels(settings: Settings, mode: GameMode, levels: Box<dyn LevelSource>) -> Self {
        let seed = settings.seed;
        let mut enemies = Vec::new();
        let mut state = Self {
            cursor: Cursor::new(settings.cursor_radius),
            remaining_walls: settings.initial_walls,
            settings,
            mode,
            level: 1,
            tree: RegionTree::new(&mut enemies),
            enemies,
            wall: WallState::Idle,
            claimed: 0.0,
            splash: None,
            time_ticks: 0,
            events: Vec::new(),
            estimator: AreaEstimator::new(seed.wrapping_add(1)),
            level_won: false,
            rng: Pcg32::seed_from_u64(seed),
            levels,
        };
        state.initialize_level(1);
        state
    }

    /// Play a single hand-made level (no campaign progression)
    pub fn with_level(settings: Settings, level: levels::LevelDef) -> Self {
        Self::with_levels(
            settings,
            GameMode::Campaign,
            Box::new(Campaign::new(vec![level])),
        )
    }

    /// Switch game mode and restart at level 1; no-op for the current mode
    pub fn set_mode(&mut self, mode: GameMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.remaining_walls = self.settings.initial_walls;
        self.initialize_level(1);
    }

    pub fn jump_to_level(&mut self, level: usize) {
        self.initialize_level(level);
    }

    pub fn campaign_len(&self) -> usize {
        self.levels.len()
    }

    /// Tear down the current level and build `level` of the current mode
    pub fn initialize_level(&mut self, level: usize) {
        let old = std::mem::replace(&mut self.tree, RegionTree::new(&mut []));
        old.destroy();

        self.wall = WallState::Idle;
        self.level = level.max(1);
        self.level_won = false;
        self.claimed = 0.0;

        match self.mode {
            GameMode::ClassicArcade | GameMode::VarietyArcade => {
                self.enemies = if self.mode == GameMode::ClassicArcade {
                    levels::classic_enemies(self.level, &mut self.rng)
                } else {
                    levels::variety_enemies(self.level, &mut self.rng)
                };
                self.tree = RegionTree::new(&mut self.enemies);
                if self.level == 1 {
                    self.remaining_walls = self.settings.initial_walls;
                } else {
                    self.remaining_walls += self.level as u32 + 1;
                }
            }
            GameMode::Campaign => {
                if self.levels.level(self.level).is_none() {
                    log::warn!(
                        "There is no level {} (campaign has {}), back to level 1",
                        self.level,
                        self.levels.len()
                    );
                    self.level = 1;
                }
                match self.levels.level(self.level) {
                    Some(def) => {
                        let def = def.clone();
                        self.enemies = def.spawn_enemies();
                        self.tree = RegionTree::new(&mut self.enemies);
                        for wall in def.walls() {
                            self.tree.insert_and_split(&wall, &mut self.enemies);
                        }
                        self.remaining_walls = def.available_walls;
                    }
                    None => {
                        log::warn!("campaign is empty, starting an empty arena");
                        self.enemies.clear();
                        self.tree = RegionTree::new(&mut self.enemies);
                    }
                }
            }
        }

        // Static walls start claimed; give their areas an estimate
        if self.tree.closed_leaf_count() > 1 {
            self.estimator
                .run(&mut self.tree, self.settings.level_start_samples);
            self.claimed = self.tree.recalculate_areas();
        }

        log::info!(
            "Level {} ({:?}): {} enemies, {} walls",
            self.level,
            self.mode,
            self.enemies.len(),
            self.remaining_walls
        );
        self.events.push(GameEvent::LevelStarted { level: self.level });
        self.events.push(GameEvent::WallsChanged {
            remaining: self.remaining_walls,
        });
        self.start_splash(SplashKind::LevelStarted);
    }

    pub fn start_splash(&mut self, kind: SplashKind) {
        self.splash = Some(Splash::new(kind));
    }

    /// Whether a locked splash is blocking new walls
    pub fn input_locked(&self) -> bool {
        self.splash.is_some_and(|s| s.kind.locked())
    }

    /// Count down the splash; returns the kind that just ended, if any
    pub(crate) fn tick_splash(&mut self, dt_ms: f64) -> Option<SplashKind> {
        let splash = self.splash.as_mut()?;
        let remaining = splash.remaining_ms.as_mut()?;
        *remaining -= dt_ms;
        if *remaining > 0.0 {
            return None;
        }
        let kind = splash.kind;
        self.splash = None;
        Some(kind)
    }

    pub(crate) fn end_splash(&mut self, kind: SplashKind) {
        match kind {
            SplashKind::LevelStarted => {}
            SplashKind::LevelCompleted => self.initialize_level(self.level + 1),
            SplashKind::LevelFailed => self.initialize_level(1),
            SplashKind::CampaignCompleted => {
                log::warn!("campaign-completed splash should never end");
            }
        }
    }

    /// Displayed progress in whole percent
    pub fn progress_percent(&self) -> u32 {
        (self.claimed * 100.0).round() as u32
    }

    pub fn is_growing(&self) -> bool {
        matches!(self.wall, WallState::Growing(_))
    }

    pub(crate) fn use_wall(&mut self) {
        self.remaining_walls = self.remaining_walls.saturating_sub(1);
        self.events.push(GameEvent::WallsChanged {
            remaining: self.remaining_walls,
        });
    }

    pub(crate) fn refund_wall(&mut self) {
        self.remaining_walls += 1;
        self.events.push(GameEvent::WallsChanged {
            remaining: self.remaining_walls,
        });
    }

    /// Re-estimate areas after a subdivision and update progress.
    ///
    /// The displayed value only moves when the estimate has risen by more
    /// than the debounce. Reaching the win threshold signals completion once.
    pub(crate) fn recalculate_area(&mut self) {
        let estimate = self.tree.recalculate_areas();
        if estimate - self.claimed > self.settings.area_debounce {
            self.claimed = estimate;
            self.events.push(GameEvent::ProgressChanged {
                percent: self.progress_percent(),
            });
        }

        if !self.level_won && self.progress_percent() >= self.settings.win_percent {
            self.level_won = true;
            if self.mode == GameMode::Campaign && self.level >= self.levels.len() {
                log::info!("Campaign completed at level {}", self.level);
                self.events.push(GameEvent::CampaignCompleted);
                self.start_splash(SplashKind::CampaignCompleted);
            } else {
                log::info!("Level {} completed ({}%)", self.level, self.progress_percent());
                self.events.push(GameEvent::LevelCompleted { level: self.level });
                self.start_splash(SplashKind::LevelCompleted);
            }
        }
    }

    /// Out of walls with nothing growing and no splash up
    pub(crate) fn check_failure(&mut self) {
        if self.splash.is_none() && !self.is_growing() && self.remaining_walls == 0 {
            log::info!("Level {} failed: out of walls", self.level);
            self.events.push(GameEvent::LevelFailed { level: self.level });
            self.start_splash(SplashKind::LevelFailed);
        }
    }

    /// Take all pending UI events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// The curve currently shown while drawing or growing
    pub fn visible_wall(&self) -> Option<Geometry> {
        match &self.wall {
            WallState::Idle => None,
            WallState::Drawing(candidate) => Some(candidate.visible()),
            WallState::Growing(growth) => Some(growth.active),
        }
    }
}
