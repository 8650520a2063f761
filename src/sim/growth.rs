//! Wall growth controller
//!
//! Idle → Drawing (pointer held, candidates follow the pointer) → Growing
//! (pointer released, wall committed and sweeping) → Idle, on completion or
//! when an enemy hits the cursor or the built part of the wall.

use std::collections::{HashMap, HashSet};

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::geometry::{Circle, CircleKind, Geometry, Line};
use super::state::{GameEvent, GameState};
use super::tree::{NodeId, RegionTree};
use crate::consts::{CANDIDATE_RADIUS, EPSILON, PRESS_BOUND};
use crate::unwrap_near;

/// Crossings closer than this are the same crossing
const CROSSING_EPSILON: f64 = 1e-9;

/// The two walls on offer while the pointer is held
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candidate {
    /// Diameter through the cursor, swept from the cursor (t = -1)
    pub line: Line,
    /// Circle through cursor and pointer, orthogonal to the rim
    pub circle: Circle,
    /// Line shown instead of the circle
    pub snapped: bool,
}

impl Candidate {
    pub fn visible(&self) -> Geometry {
        if self.snapped {
            Geometry::Line(self.line)
        } else {
            Geometry::Circle(self.circle)
        }
    }
}

/// A scheduled subdivision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Sweep parameter at which the wall first enters the leaf
    pub entry_t: f64,
    /// Sweep parameter at which the wall leaves the leaf
    pub t: f64,
    pub leaf: NodeId,
}

/// A committed wall while it sweeps across the arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Growth {
    /// Built extent: `from_t` is the last checkpoint passed, `to_t` the tip
    pub active: Geometry,
    pub target: f64,
    /// +1 or -1
    pub direction: f64,
    pub affected: Vec<NodeId>,
    /// Sorted, deduplicated crossing parameters including both ends
    pub crossings: Vec<f64>,
    pub checkpoints: Vec<Checkpoint>,
    pub next_checkpoint: usize,
    /// Whether committing this wall spent a budget unit
    pub consumed_wall: bool,
}

impl Growth {
    /// Where the wall first entered `leaf`, if that leaf still waits for a
    /// checkpoint
    pub fn pending_entry(&self, leaf: NodeId) -> Option<f64> {
        self.checkpoints[self.next_checkpoint.min(self.checkpoints.len())..]
            .iter()
            .find(|c| c.leaf == leaf)
            .map(|c| c.entry_t)
    }

    /// Whether the sweep has passed `t`
    #[inline]
    fn passed(&self, t: f64) -> bool {
        self.direction * self.active.to_t() >= self.direction * t
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum WallState {
    #[default]
    Idle,
    Drawing(Candidate),
    Growing(Growth),
}

/// Whether the pointer is within `tolerance` (radians) of the line's angle,
/// as seen from the cursor. Antiparallel counts as aligned.
pub fn snap_to_line(cursor: DVec2, line_angle: f64, pointer: DVec2, tolerance: f64) -> bool {
    use std::f64::consts::{FRAC_PI_2, PI};

    let d = pointer - cursor;
    let mut pointed = d.y.atan2(d.x);
    while pointed - line_angle > FRAC_PI_2 {
        pointed -= PI;
    }
    while pointed - line_angle < -FRAC_PI_2 {
        pointed += PI;
    }
    (pointed - line_angle).abs() < tolerance
}

/// Circle through `cursor` (on the rim) and `pointer` whose center lies on
/// the rim tangent at the cursor, making it orthogonal to the rim.
///
/// None when the pointer is collinear with the cursor and the origin.
pub fn orthogonal_circle(cursor: DVec2, pointer: DVec2) -> Option<Circle> {
    let denom = cursor.x * pointer.y - cursor.y * pointer.x;
    if denom.abs() < EPSILON {
        return None;
    }
    let mu = (cursor - pointer).length_squared() / denom;
    let center = DVec2::new(cursor.x - mu * cursor.y / 2.0, cursor.y + mu * cursor.x / 2.0);
    let r = (center - cursor).length();
    Some(Circle::new(center, r, CircleKind::Circumference))
}

/// Order the crossings along the sweep and turn every stretch that runs
/// through an open leaf into a checkpoint at the stretch's far end.
///
/// A leaf the wall enters more than once keeps only its last checkpoint,
/// with the entry parameter of its first stretch.
pub fn plan_checkpoints(
    tree: &RegionTree,
    wall: &Geometry,
    crossings: &mut Vec<f64>,
    direction: f64,
) -> Vec<Checkpoint> {
    crossings.sort_by(|a, b| (direction * a).total_cmp(&(direction * b)));
    crossings.dedup_by(|a, b| (*a - *b).abs() < CROSSING_EPSILON);

    let stretches: Vec<Checkpoint> = crossings
        .windows(2)
        .filter_map(|w| {
            let leaf = tree.probe(wall.point_at((w[0] + w[1]) / 2.0));
            tree.node(leaf).is_open().then_some(Checkpoint {
                entry_t: w[0],
                t: w[1],
                leaf,
            })
        })
        .collect();

    let mut entries = HashMap::new();
    for stretch in &stretches {
        entries.entry(stretch.leaf).or_insert(stretch.entry_t);
    }

    let mut seen = HashSet::new();
    let mut checkpoints: Vec<Checkpoint> = stretches
        .into_iter()
        .rev()
        .filter(|c| seen.insert(c.leaf))
        .collect();
    checkpoints.reverse();
    for checkpoint in &mut checkpoints {
        if let Some(&entry_t) = entries.get(&checkpoint.leaf) {
            checkpoint.entry_t = entry_t;
        }
    }
    checkpoints
}

impl GameState {
    pub fn pointer_down(&mut self, p: DVec2) {
        if self.is_growing() || self.input_locked() {
            return;
        }
        if p.x.abs() > PRESS_BOUND || p.y.abs() > PRESS_BOUND {
            return;
        }

        let c = self.cursor.pos;
        // Circle position is arbitrary until the pointer moves
        self.wall = WallState::Drawing(Candidate {
            line: Line::new((-c.y).atan2(-c.x)),
            circle: Circle::new(c, CANDIDATE_RADIUS, CircleKind::Circumference),
            snapped: true,
        });
    }

    pub fn pointer_move(&mut self, p: DVec2) {
        let cursor = self.cursor.pos;
        let tolerance = self.settings.snap_degrees.to_radians();
        match &mut self.wall {
            WallState::Growing(_) => {}
            WallState::Drawing(candidate) => {
                if snap_to_line(cursor, candidate.line.angle, p, tolerance) {
                    candidate.snapped = true;
                } else if let Some(circle) = orthogonal_circle(cursor, p) {
                    candidate.circle = circle;
                    candidate.snapped = false;
                } else {
                    candidate.snapped = true;
                }
            }
            WallState::Idle => self.cursor.track_rim(p),
        }
    }

    pub fn pointer_up(&mut self, _p: DVec2) {
        if self.is_growing() || self.input_locked() {
            return;
        }
        let WallState::Drawing(candidate) = std::mem::take(&mut self.wall) else {
            return;
        };
        self.commit_wall(candidate);
    }

    /// Start point, target and direction of the visible candidate
    fn plan_sweep(&self, candidate: &Candidate) -> Option<(Geometry, f64, f64)> {
        if candidate.snapped {
            let line = candidate.line;
            let direction = (line.to_t - line.from_t).signum();
            let active = line.with_range(line.from_t, line.from_t);
            return Some((Geometry::Line(active), line.to_t, direction));
        }

        let circle = candidate.circle;
        let points = Geometry::Circle(circle).intersections_with(self.tree.arena());
        if points.len() < 2 {
            return None;
        }

        // The rim crossing at the cursor is where the sweep starts
        let cursor = self.cursor.pos;
        let (start, end) =
            if (points[0] - cursor).length_squared() <= (points[1] - cursor).length_squared() {
                (points[0], points[1])
            } else {
                (points[1], points[0])
            };
        let from = circle.param_of(start);
        let target = unwrap_near(circle.param_of(end), from);
        if (target - from).abs() < EPSILON {
            return None;
        }

        let active = circle.with_range(from, from);
        Some((Geometry::Circle(active), target, (target - from).signum()))
    }

    fn commit_wall(&mut self, candidate: Candidate) {
        let Some((active, target, direction)) = self.plan_sweep(&candidate) else {
            log::warn!("degenerate wall candidate {:?}, ignored", candidate.visible());
            return;
        };

        let mut wall = active;
        wall.set_to_t(target);

        let mut affected = Vec::new();
        let mut crossings = vec![active.from_t(), target];
        self.tree.insert(&wall, &mut affected, &mut crossings);
        let checkpoints = plan_checkpoints(&self.tree, &wall, &mut crossings, direction);

        let consumed_wall = !checkpoints.is_empty();
        if consumed_wall {
            self.use_wall();
        } else {
            log::debug!("wall crosses no open region, budget unchanged");
        }

        log::info!(
            "wall committed: {} crossings, {} checkpoints, {} walls left",
            crossings.len(),
            checkpoints.len(),
            self.remaining_walls
        );
        self.events.push(GameEvent::WallStarted {
            checkpoints: checkpoints.len(),
        });

        self.wall = WallState::Growing(Growth {
            active,
            target,
            direction,
            affected,
            crossings,
            checkpoints,
            next_checkpoint: 0,
            consumed_wall,
        });
    }

    /// Sweep the growing wall forward by `dt_ms`, splitting leaves at every
    /// checkpoint passed
    pub fn advance_growth(&mut self, dt_ms: f64) {
        if !self.is_growing() {
            return;
        }
        let WallState::Growing(mut growth) = std::mem::take(&mut self.wall) else {
            return;
        };

        let dt = growth.direction * self.settings.cursor_speed * dt_ms / 1000.0
            / growth.active.sweep_scale();
        let tip = growth.active.to_t() + dt;
        growth.active.set_to_t(tip);

        while let Some(&checkpoint) = growth.checkpoints.get(growth.next_checkpoint) {
            if !growth.passed(checkpoint.t) {
                break;
            }
            if !self.tree.subdivide(checkpoint.leaf, &mut self.enemies) {
                log::debug!("checkpoint {:?} has nothing to split", checkpoint.leaf);
            }
            self.recalculate_area();
            growth.active.set_from_t(checkpoint.t);
            growth.next_checkpoint += 1;
        }

        let finished = growth.passed(growth.target);
        if finished {
            growth.active.set_to_t(growth.target);
        }
        self.cursor.pos = growth.active.end_point();

        if finished {
            // Leaves the sweep never split must not keep a stale pending split
            self.tree.cancel_pending(&growth.affected);
            log::debug!("wall completed");
            self.events.push(GameEvent::WallCompleted);
        } else {
            self.wall = WallState::Growing(growth);
        }
    }

    /// Drop the growing wall after a hit.
    ///
    /// Leaves already split keep their walls; every leaf still waiting for
    /// this wall loses its pending split and sample tally. The cursor returns
    /// to the rim at the wall's target end.
    pub fn abort_wall(&mut self) {
        if !self.is_growing() {
            return;
        }
        let WallState::Growing(growth) = std::mem::take(&mut self.wall) else {
            return;
        };

        log::debug!(
            "wall aborted at t = {:.4} ({} of {} checkpoints done)",
            growth.active.to_t(),
            growth.next_checkpoint,
            growth.checkpoints.len()
        );

        self.cursor.pos = growth.active.point_at(growth.target);
        self.tree.cancel_pending(&growth.affected);

        if growth.consumed_wall && self.settings.refund_aborted_wall {
            self.refund_wall();
        }
        self.events.push(GameEvent::WallAborted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::{EnemyLayout, EnemySpawn, LevelDef, WallLayout};
    use crate::settings::Settings;
    use crate::sim::state::Enemy;
    use crate::sim::tree::NodeKind;
    use std::f64::consts::PI;

    fn level_with(enemies: Vec<EnemySpawn>) -> GameState {
        GameState::with_level(
            Settings::default(),
            LevelDef {
                enemies: EnemyLayout::List(enemies),
                walls: WallLayout::List(Vec::new()),
                available_walls: 3,
            },
        )
    }

    fn spawn(x: f64, y: f64) -> EnemySpawn {
        EnemySpawn {
            x,
            y,
            angle: 0.0,
            kind: 0,
        }
    }

    #[test]
    fn test_orthogonal_circle() {
        let cursor = DVec2::new(0.0, -1.0);
        let circle = orthogonal_circle(cursor, DVec2::new(0.3, -0.7)).unwrap();
        assert!((circle.center - DVec2::new(0.3, -1.0)).length() < 1e-12);
        assert!((circle.r - 0.3).abs() < 1e-12);
        // Orthogonal to the rim
        assert!((circle.center.length_squared() - (1.0 + circle.r * circle.r)).abs() < 1e-12);

        assert!(orthogonal_circle(cursor, DVec2::new(0.0, 0.5)).is_none());
    }

    #[test]
    fn test_snap_to_line() {
        let cursor = DVec2::new(1.0, 0.0);
        // Line from the cursor through the center has angle π
        assert!(snap_to_line(cursor, PI, DVec2::new(0.0, 0.01), 2f64.to_radians()));
        assert!(!snap_to_line(cursor, PI, DVec2::new(0.0, 0.2), 2f64.to_radians()));
        // Past the cursor, pointing away from the center, is antiparallel
        assert!(snap_to_line(cursor, PI, DVec2::new(1.5, 0.0), 2f64.to_radians()));
    }

    #[test]
    fn test_plan_checkpoints_keeps_last_per_leaf() {
        let mut enemies = vec![Enemy::new(DVec2::new(0.0, 0.5), 0.3, 0.0, 0.03, 0)];
        let tree = RegionTree::new(&mut enemies);
        let wall = Geometry::Line(Line::new(0.0));
        // Spurious crossings inside one leaf collapse to one checkpoint
        let mut crossings = vec![1.0, -1.0, 0.2, -0.4, 0.2];
        let checkpoints = plan_checkpoints(&tree, &wall, &mut crossings, 1.0);
        assert_eq!(crossings, vec![-1.0, -0.4, 0.2, 1.0]);
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].t, 1.0);
        assert_eq!(checkpoints[0].entry_t, -1.0);
        assert_eq!(checkpoints[0].leaf, enemies[0].leaf);

        let mut reversed = vec![-1.0, 1.0, 0.3];
        let checkpoints = plan_checkpoints(&tree, &wall, &mut reversed, -1.0);
        assert_eq!(reversed, vec![1.0, 0.3, -1.0]);
        assert_eq!(checkpoints[0].t, -1.0);
        assert_eq!(checkpoints[0].entry_t, 1.0);
    }

    #[test]
    fn test_press_seeds_line_candidate() {
        let mut state = level_with(vec![spawn(0.0, 0.5)]);
        state.pointer_move(DVec2::new(0.5, 0.0));
        state.pointer_down(DVec2::new(0.5, 0.0));
        let WallState::Drawing(candidate) = &state.wall else {
            panic!("expected drawing");
        };
        assert!(candidate.snapped);
        assert!((candidate.line.point_at(-1.0) - DVec2::new(1.0, 0.0)).length() < 1e-12);

        // Presses far outside the arena are ignored
        let mut state = level_with(vec![spawn(0.0, 0.5)]);
        state.pointer_down(DVec2::new(2.0, 0.0));
        assert!(matches!(state.wall, WallState::Idle));
    }

    #[test]
    fn test_circle_commit_sweeps_from_cursor() {
        let mut state = level_with(vec![spawn(0.0, 0.5)]);
        state.pointer_move(DVec2::new(0.0, -0.5));
        state.pointer_down(DVec2::new(0.0, -0.5));
        state.pointer_move(DVec2::new(0.3, -0.7));
        state.pointer_up(DVec2::new(0.3, -0.7));

        let WallState::Growing(growth) = &state.wall else {
            panic!("expected growing");
        };
        assert!((growth.active.start_point() - DVec2::new(0.0, -1.0)).length() < 1e-9);
        assert!((growth.active.point_at(growth.target).length() - 1.0).abs() < 1e-9);
        assert!((growth.target - growth.active.from_t()).abs() < PI);
        assert_eq!(growth.direction.abs(), 1.0);
    }

    #[test]
    fn test_line_growth_completes() {
        let mut state = level_with(vec![spawn(0.0, 0.5)]);
        state.pointer_move(DVec2::new(1.0, 0.0));
        state.pointer_down(DVec2::new(1.0, 0.0));
        state.pointer_up(DVec2::new(1.0, 0.0));
        assert!(state.is_growing());
        assert_eq!(state.remaining_walls, 2);

        // 2 units at 0.5/s takes 4 s
        for _ in 0..250 {
            state.advance_growth(1000.0 / 60.0);
        }
        assert!(!state.is_growing());
        assert!((state.cursor.pos - DVec2::new(-1.0, 0.0)).length() < 1e-9);

        let top = state.tree.probe(DVec2::new(0.0, 0.5));
        let bottom = state.tree.probe(DVec2::new(0.0, -0.5));
        assert!(state.tree.node(top).is_open());
        assert!(state.tree.node(bottom).is_closed());
        assert!(state.events.contains(&GameEvent::WallCompleted));
    }

    #[test]
    fn test_abort_reverts_pending_leaves() {
        let mut state = level_with(vec![spawn(0.0, 0.5), spawn(0.0, -0.5)]);
        state.pointer_move(DVec2::new(1.0, 0.0));
        state.pointer_down(DVec2::new(1.0, 0.0));
        state.pointer_up(DVec2::new(1.0, 0.0));
        let leaf = state.enemies[0].leaf;
        assert!(state.tree.node(leaf).as_open().unwrap().pending.is_some());

        state.advance_growth(500.0);
        state.abort_wall();

        assert!(matches!(state.wall, WallState::Idle));
        assert!(matches!(
            &state.tree.node(leaf).kind,
            NodeKind::Open(open) if open.pending.is_none()
        ));
        // Budget stays spent by default
        assert_eq!(state.remaining_walls, 2);
        assert!((state.cursor.pos - DVec2::new(-1.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_abort_refund_is_configurable() {
        let mut settings = Settings::default();
        settings.refund_aborted_wall = true;
        let mut state = GameState::with_level(
            settings,
            LevelDef {
                enemies: EnemyLayout::List(vec![spawn(0.0, 0.5)]),
                walls: WallLayout::List(Vec::new()),
                available_walls: 3,
            },
        );
        state.pointer_move(DVec2::new(0.0, 1.0));
        state.pointer_down(DVec2::new(0.0, 1.0));
        state.pointer_up(DVec2::new(0.0, 1.0));
        assert_eq!(state.remaining_walls, 2);
        state.abort_wall();
        assert_eq!(state.remaining_walls, 3);
    }
}
