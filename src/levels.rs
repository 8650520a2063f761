//! Level data
//!
//! Enemy types, arcade level generation and the campaign table. Campaign
//! levels are plain data (serde) so they can also be loaded from JSON.

use std::f64::consts::{PI, TAU};

use glam::DVec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::sim::geometry::{Circle, CircleKind, Geometry, Line};
use crate::sim::state::Enemy;
use crate::{normalize_angle, polar_to_cartesian};

/// Enemy archetype
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyType {
    /// Arena units per second
    pub speed: f64,
    pub radius: f64,
    /// Difficulty weight (variety arcade spends the level number on these)
    pub level: usize,
}

/// Standard enemy first; classic arcade uses only that one
pub const ENEMY_TYPES: [EnemyType; 4] = [
    EnemyType {
        speed: 0.3,
        radius: 0.03,
        level: 1,
    },
    // Fast and small
    EnemyType {
        speed: 0.5,
        radius: 0.02,
        level: 2,
    },
    // Slow and large
    EnemyType {
        speed: 0.2,
        radius: 0.08,
        level: 2,
    },
    EnemyType {
        speed: 0.7,
        radius: 0.015,
        level: 3,
    },
];

#[inline]
pub fn enemy_type(kind: usize) -> &'static EnemyType {
    ENEMY_TYPES.get(kind).unwrap_or(&ENEMY_TYPES[0])
}

#[derive(Debug, thiserror::Error)]
pub enum LevelDataError {
    #[error("invalid level JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("campaign has no levels")]
    Empty,
    #[error("level {level}: unknown enemy type {kind}")]
    UnknownEnemyType { level: usize, kind: usize },
    #[error("level {level}: invalid wall ({reason})")]
    InvalidWall { level: usize, reason: String },
}

/// One enemy placed by hand
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemySpawn {
    pub x: f64,
    pub y: f64,
    /// Initial heading (radians)
    pub angle: f64,
    /// Index into [`ENEMY_TYPES`]
    #[serde(default)]
    pub kind: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyLayout {
    List(Vec<EnemySpawn>),
    /// `count` enemies evenly spaced on a circle around the center, each
    /// heading along the circle
    Ring {
        count: usize,
        radius: f64,
        #[serde(default)]
        phase: f64,
        #[serde(default)]
        kind: usize,
    },
}

/// A static wall
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WallSpec {
    Circle { x: f64, y: f64, r: f64 },
    /// Diameter at `angle`
    Line { angle: f64 },
}

impl WallSpec {
    pub fn geometry(&self) -> Geometry {
        match *self {
            WallSpec::Circle { x, y, r } => {
                Geometry::Circle(Circle::new(DVec2::new(x, y), r, CircleKind::Circumference))
            }
            WallSpec::Line { angle } => Geometry::Line(Line::new(angle)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallLayout {
    List(Vec<WallSpec>),
    /// `count` diameters evenly spaced over half a turn
    Spokes {
        count: usize,
        #[serde(default)]
        phase: f64,
    },
    /// Circles centered on the arena center
    Rings { radii: Vec<f64> },
}

/// A campaign level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub enemies: EnemyLayout,
    pub walls: WallLayout,
    pub available_walls: u32,
}

impl LevelDef {
    pub fn spawn_enemies(&self) -> Vec<Enemy> {
        match &self.enemies {
            EnemyLayout::List(spawns) => spawns
                .iter()
                .map(|s| {
                    let t = enemy_type(s.kind);
                    Enemy::new(DVec2::new(s.x, s.y), t.speed, s.angle, t.radius, s.kind)
                })
                .collect(),
            EnemyLayout::Ring {
                count,
                radius,
                phase,
                kind,
            } => {
                let t = enemy_type(*kind);
                (0..*count)
                    .map(|i| {
                        let phi = phase + i as f64 * TAU / *count as f64;
                        let pos = polar_to_cartesian(*radius, phi);
                        Enemy::new(pos, t.speed, phi + PI / 2.0, t.radius, *kind)
                    })
                    .collect()
            }
        }
    }

    /// The static walls, in insertion order
    pub fn walls(&self) -> Vec<Geometry> {
        match &self.walls {
            WallLayout::List(specs) => specs.iter().map(WallSpec::geometry).collect(),
            WallLayout::Spokes { count, phase } => (0..*count)
                .map(|i| {
                    let angle = normalize_angle(phase + i as f64 * PI / *count as f64);
                    Geometry::Line(Line::new(angle))
                })
                .collect(),
            WallLayout::Rings { radii } => radii
                .iter()
                .map(|&r| Geometry::Circle(Circle::new(DVec2::ZERO, r, CircleKind::Circumference)))
                .collect(),
        }
    }

    fn validate(&self, level: usize) -> Result<(), LevelDataError> {
        let kinds: Vec<usize> = match &self.enemies {
            EnemyLayout::List(spawns) => spawns.iter().map(|s| s.kind).collect(),
            EnemyLayout::Ring { kind, .. } => vec![*kind],
        };
        if let Some(&kind) = kinds.iter().find(|&&k| k >= ENEMY_TYPES.len()) {
            return Err(LevelDataError::UnknownEnemyType { level, kind });
        }

        let bad_radius = match &self.walls {
            WallLayout::List(specs) => specs.iter().find_map(|w| match *w {
                WallSpec::Circle { r, .. } if r <= 0.0 => Some(r),
                _ => None,
            }),
            WallLayout::Rings { radii } => radii.iter().copied().find(|&r| r <= 0.0 || r >= 1.0),
            WallLayout::Spokes { .. } => None,
        };
        if let Some(r) = bad_radius {
            return Err(LevelDataError::InvalidWall {
                level,
                reason: format!("radius {r}"),
            });
        }
        Ok(())
    }
}

/// Where campaign levels come from
pub trait LevelSource {
    fn len(&self) -> usize;

    /// Level `n`, 1-based
    fn level(&self, n: usize) -> Option<&LevelDef>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered campaign level table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub levels: Vec<LevelDef>,
}

impl Campaign {
    pub fn new(levels: Vec<LevelDef>) -> Self {
        Self { levels }
    }

    /// Parse a JSON array of levels
    pub fn from_json(json: &str) -> Result<Self, LevelDataError> {
        let levels: Vec<LevelDef> = serde_json::from_str(json)?;
        if levels.is_empty() {
            return Err(LevelDataError::Empty);
        }
        for (i, level) in levels.iter().enumerate() {
            level.validate(i + 1)?;
        }
        Ok(Self { levels })
    }

    pub fn builtin() -> Self {
        let spawn = |x, y, angle, kind| EnemySpawn { x, y, angle, kind };
        Self::new(vec![
            LevelDef {
                enemies: EnemyLayout::List(vec![spawn(0.3, 0.2, 0.7, 0)]),
                walls: WallLayout::List(Vec::new()),
                available_walls: 4,
            },
            LevelDef {
                enemies: EnemyLayout::List(vec![
                    spawn(0.4, 0.5, 2.0, 0),
                    spawn(-0.3, -0.4, -1.0, 0),
                ]),
                walls: WallLayout::List(vec![WallSpec::Line { angle: 0.0 }]),
                available_walls: 4,
            },
            LevelDef {
                enemies: EnemyLayout::Ring {
                    count: 3,
                    radius: 0.65,
                    phase: 0.0,
                    kind: 0,
                },
                walls: WallLayout::Rings { radii: vec![0.35] },
                available_walls: 5,
            },
            LevelDef {
                enemies: EnemyLayout::Ring {
                    count: 6,
                    radius: 0.6,
                    phase: PI / 6.0,
                    kind: 0,
                },
                walls: WallLayout::Spokes {
                    count: 3,
                    phase: 0.0,
                },
                available_walls: 6,
            },
            LevelDef {
                enemies: EnemyLayout::List(vec![
                    spawn(-0.4, 0.2, 0.3, 1),
                    spawn(0.1, -0.5, 2.5, 2),
                    spawn(-0.2, -0.3, -2.0, 0),
                ]),
                walls: WallLayout::List(vec![WallSpec::Circle {
                    x: 0.5,
                    y: 0.5,
                    r: 0.3,
                }]),
                available_walls: 6,
            },
        ])
    }
}

impl LevelSource for Campaign {
    fn len(&self) -> usize {
        self.levels.len()
    }

    fn level(&self, n: usize) -> Option<&LevelDef> {
        n.checked_sub(1).and_then(|i| self.levels.get(i))
    }
}

/// Random enemy of type `kind`, anywhere it fits inside the arena
fn random_enemy(kind: usize, rng: &mut Pcg32) -> Enemy {
    let t = enemy_type(kind);
    // Uniform in radius, so denser towards the center
    let r = rng.random::<f64>() * (1.0 - t.radius);
    let phi = rng.random::<f64>() * TAU;
    let heading = rng.random::<f64>() * TAU;
    Enemy::new(polar_to_cartesian(r, phi), t.speed, heading, t.radius, kind)
}

/// Classic arcade level `level`: that many standard enemies
pub fn classic_enemies(level: usize, rng: &mut Pcg32) -> Vec<Enemy> {
    (0..level).map(|_| random_enemy(0, rng)).collect()
}

/// Variety arcade level `level`: random types whose weights add up to `level`
pub fn variety_enemies(level: usize, rng: &mut Pcg32) -> Vec<Enemy> {
    let mut budget = level;
    let mut enemies = Vec::new();
    while budget > 0 {
        let fitting: Vec<usize> = (0..ENEMY_TYPES.len())
            .filter(|&k| ENEMY_TYPES[k].level <= budget)
            .collect();
        let kind = fitting[rng.random_range(0..fitting.len())];
        enemies.push(random_enemy(kind, rng));
        budget -= ENEMY_TYPES[kind].level;
    }
    enemies
}
