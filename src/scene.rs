//! Render-ready snapshot of the simulation
//!
//! The renderer only ever reads a `Scene`. Leaf regions come out in
//! depth-first order, each with the boundaries that enclose it, so a
//! renderer can fill a region by intersecting the sides it lists.

use glam::DVec2;
use serde::Serialize;

use crate::sim::geometry::{Circle, Geometry, Side};
use crate::sim::state::{GameMode, GameState, SplashKind};
use crate::sim::tree::{NodeId, NodeKind};

#[derive(Debug, Clone, Serialize)]
pub struct RegionView {
    pub id: NodeId,
    pub depth: usize,
    pub claimed: bool,
    /// Estimated fraction of the arena
    pub area: f64,
    /// Enclosing boundaries, innermost first
    pub bounds: Vec<(Geometry, Side)>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EnemyView {
    pub pos: DVec2,
    pub radius: f64,
    pub kind: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub level: usize,
    pub mode: GameMode,
    pub regions: Vec<RegionView>,
    /// Finished walls, excluding the arena rim
    pub walls: Vec<Geometry>,
    pub enemies: Vec<EnemyView>,
    pub cursor: Circle,
    /// Candidate while drawing, built extent while growing
    pub wall: Option<Geometry>,
    pub progress_percent: u32,
    pub remaining_walls: u32,
    pub splash: Option<SplashKind>,
}

impl Scene {
    pub fn capture(state: &GameState) -> Self {
        let tree = &state.tree;
        let mut regions = Vec::new();
        let mut walls = Vec::new();

        tree.walk_depth_first(|id, node, depth| match &node.kind {
            NodeKind::Inner(inner) => {
                if id != tree.root() {
                    walls.push(inner.geometry);
                }
            }
            // The closed leaf outside the rim is not a region
            NodeKind::Closed if node.parent == Some(tree.root()) => {}
            NodeKind::Open(_) | NodeKind::Closed => regions.push(RegionView {
                id,
                depth,
                claimed: node.is_closed(),
                area: node.area,
                bounds: tree
                    .boundaries(id)
                    .map(|(_, geometry, side)| (*geometry, side))
                    .collect(),
            }),
        });

        Self {
            level: state.level,
            mode: state.mode,
            regions,
            walls,
            enemies: state
                .enemies
                .iter()
                .map(|e| EnemyView {
                    pos: e.pos,
                    radius: e.radius,
                    kind: e.kind,
                })
                .collect(),
            cursor: state.cursor.body(),
            wall: state.visible_wall(),
            progress_percent: state.progress_percent(),
            remaining_walls: state.remaining_walls,
            splash: state.splash.map(|s| s.kind),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::Campaign;
    use crate::settings::Settings;

    #[test]
    fn test_capture_campaign_level() {
        let mut state = GameState::with_levels(
            Settings::default(),
            GameMode::Campaign,
            Box::new(Campaign::builtin()),
        );
        state.jump_to_level(3);
        let scene = Scene::capture(&state);

        // One ring: the claimed inner disc and the open annulus
        assert_eq!(scene.walls.len(), 1);
        assert_eq!(scene.regions.len(), 2);
        assert_eq!(scene.regions.iter().filter(|r| r.claimed).count(), 1);
        for region in &scene.regions {
            assert_eq!(region.bounds.len(), region.depth);
        }
        assert_eq!(scene.enemies.len(), 3);
        assert!(scene.wall.is_none());
        assert!(scene.to_json().is_ok());
    }
}
