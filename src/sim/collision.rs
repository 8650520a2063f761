//! Enemy motion and wall collisions
//!
//! An enemy's region is the intersection of one side of every divider on the
//! path from its leaf to the root, so the enemy only ever tests those curves.
//! Each test is a ray cast of the enemy center against the curve offset by
//! the enemy radius (Minkowski sum). Motion is exact within a tick: travel to
//! the nearest contact, reflect, spend the remaining distance.

use glam::DVec2;

use super::geometry::{Circle, Geometry, Line, Side};
use super::growth::WallState;
use super::state::{Enemy, GameState};
use super::tree::{NodeId, RegionTree};
use crate::consts::{EPSILON, MAX_BOUNCES, MIN_TRAVEL};
use crate::normalize_angle;
use std::f64::consts::{FRAC_PI_2, PI};

/// Nearest boundary an enemy will touch
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Travel distance until touching
    pub distance: f64,
    /// Inner node owning the boundary
    pub boundary: NodeId,
    pub geometry: Geometry,
    /// Side of the boundary the enemy is on
    pub side: Side,
}

/// Why a growing wall has to go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallHit {
    /// An enemy touched the cursor
    Cursor(usize),
    /// An enemy touched the built part of the wall in its own leaf
    Wall(usize),
}

/// Travel until an enemy at `pos` (radius `er`, unit heading `dir`) touches
/// `circle` from `side`
pub fn circle_contact(circle: &Circle, side: Side, pos: DVec2, dir: DVec2, er: f64) -> Option<f64> {
    let q = pos - circle.center;
    let b = q.dot(dir);

    match side {
        Side::Left => {
            let r = (circle.r - er).max(0.0);
            let c = q.length_squared() - r * r;
            if c >= 0.0 && b > 0.0 {
                // Already touching and still heading out
                return Some(0.0);
            }
            let h2 = b * b - c;
            if h2 < 0.0 {
                return None;
            }
            Some((-b + h2.sqrt()).max(0.0))
        }
        Side::Right => {
            let r = circle.r + er;
            if b >= 0.0 {
                return None;
            }
            let c = q.length_squared() - r * r;
            if c <= 0.0 {
                return Some(0.0);
            }
            let h2 = b * b - c;
            if h2 < 0.0 {
                return None;
            }
            Some((-b - h2.sqrt()).max(0.0))
        }
    }
}

/// Travel until an enemy touches `line` from `side`
pub fn line_contact(line: &Line, side: Side, pos: DVec2, dir: DVec2, er: f64) -> Option<f64> {
    let s = side.sign();
    let gap = s * line.signed_distance(pos) - er;
    let approach = -s * line.normal().dot(dir);
    if approach <= EPSILON {
        return None;
    }
    Some((gap / approach).max(0.0))
}

fn contact_distance(geometry: &Geometry, side: Side, enemy: &Enemy) -> Option<f64> {
    let dir = enemy.direction();
    match geometry {
        Geometry::Circle(c) => circle_contact(c, side, enemy.pos, dir, enemy.radius),
        Geometry::Line(l) => line_contact(l, side, enemy.pos, dir, enemy.radius),
    }
}

/// Heading pointing from the enemy straight into the boundary
pub fn into_wall_angle(geometry: &Geometry, side: Side, pos: DVec2) -> f64 {
    match (geometry, side) {
        (Geometry::Circle(c), Side::Left) => {
            let d = pos - c.center;
            d.y.atan2(d.x)
        }
        (Geometry::Circle(c), Side::Right) => {
            let d = c.center - pos;
            d.y.atan2(d.x)
        }
        (Geometry::Line(l), Side::Left) => l.angle - FRAC_PI_2,
        (Geometry::Line(l), Side::Right) => l.angle + FRAC_PI_2,
    }
}

/// Mirror `heading` about the boundary whose inward direction is `into`
#[inline]
pub fn reflect_heading(heading: f64, into: f64) -> f64 {
    normalize_angle(2.0 * into - heading + PI)
}

/// The first boundary of the enemy's leaf it will touch, if any
pub fn nearest_contact(tree: &RegionTree, enemy: &Enemy) -> Option<Contact> {
    tree.boundaries(enemy.leaf)
        .filter_map(|(boundary, geometry, side)| {
            contact_distance(geometry, side, enemy).map(|distance| Contact {
                distance,
                boundary,
                geometry: *geometry,
                side,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Move one enemy for `dt_ms`, bouncing off its region's boundaries.
///
/// Returns the number of bounces.
pub fn advance_enemy(tree: &RegionTree, enemy: &mut Enemy, dt_ms: f64) -> u32 {
    let mut travel = enemy.speed * dt_ms / 1000.0;
    let mut bounces = 0;

    while travel > MIN_TRAVEL {
        let dir = enemy.direction();
        match nearest_contact(tree, enemy) {
            Some(contact) if contact.distance <= travel => {
                enemy.pos += dir * contact.distance;
                travel -= contact.distance;
                let into = into_wall_angle(&contact.geometry, contact.side, enemy.pos);
                enemy.set_heading(reflect_heading(enemy.heading, into));

                bounces += 1;
                if bounces >= MAX_BOUNCES {
                    log::trace!("enemy stuck in a corner at {:?}", enemy.pos);
                    break;
                }
            }
            _ => {
                enemy.pos += dir * travel;
                break;
            }
        }
    }

    bounces
}

/// Move every enemy for `dt_ms`
pub fn move_enemies(tree: &RegionTree, enemies: &mut [Enemy], dt_ms: f64) {
    for enemy in enemies.iter_mut() {
        advance_enemy(tree, enemy, dt_ms);
    }
}

/// First enemy that breaks the growing wall, if any.
///
/// The wall breaks when an enemy touches the cursor, or touches the part of
/// the wall built inside the enemy's own leaf that has not been split off yet.
pub fn detect_wall_hit(state: &GameState) -> Option<WallHit> {
    let WallState::Growing(growth) = &state.wall else {
        return None;
    };
    let cursor = state.cursor.body();
    let active = &growth.active;

    for (i, enemy) in state.enemies.iter().enumerate() {
        if enemy.body().collides_with(&Geometry::Circle(cursor)) {
            return Some(WallHit::Cursor(i));
        }

        let Some(pending) = state
            .tree
            .node(enemy.leaf)
            .as_open()
            .and_then(|leaf| leaf.pending)
        else {
            continue;
        };
        if pending.geometry.distance_to(enemy.pos) >= enemy.radius {
            continue;
        }
        // A leaf the wall revisits stays unsplit until its last exit, so
        // everything built since the wall first entered it is live
        let entry = growth.pending_entry(enemy.leaf).unwrap_or(active.from_t());
        let mut live = *active;
        live.set_from_t(entry);
        let t = live.param_near(enemy.pos, entry);
        if live.in_swept_range(t) {
            return Some(WallHit::Wall(i));
        }
    }

    None
}
