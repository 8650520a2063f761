//! Region tree over the arena disc
//!
//! A binary partition of the plane. Inner nodes hold a dividing curve and two
//! children (left/right side of that curve). Leaves are either open (may hold
//! enemies, may still be split) or closed (claimed, immutable).
//!
//! Nodes live in one arena and refer to each other by `NodeId`. The parent
//! link is a plain index used for ancestor walks; nothing is owned through it.
//!
//! Splitting is a two-phase commit. `insert` marks every open leaf a new wall
//! passes through with a pending split; `subdivide` later turns one such leaf
//! into an inner node once the growing wall has crossed it.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::geometry::{Circle, Geometry, Side};
use super::state::Enemy;
use crate::consts::EPSILON;

/// Handle into the node arena
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A split scheduled on an open leaf, plus the Monte-Carlo tally of how the
/// leaf's samples fall on either side of it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingSplit {
    pub geometry: Geometry,
    pub left_samples: u64,
    pub right_samples: u64,
}

impl PendingSplit {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            left_samples: 0,
            right_samples: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerNode {
    pub geometry: Geometry,
    pub left: NodeId,
    pub right: NodeId,
    /// Samples routed through this node, per side
    pub left_samples: u64,
    pub right_samples: u64,
}

impl InnerNode {
    #[inline]
    pub fn child(&self, side: Side) -> NodeId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenLeaf {
    /// Indices into the session's enemy list
    pub enemies: Vec<usize>,
    pub pending: Option<PendingSplit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    Inner(InnerNode),
    Open(OpenLeaf),
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub parent: Option<NodeId>,
    /// Estimated share of the arena area, in [0, 1]
    pub area: f64,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_open(&self) -> bool {
        matches!(self.kind, NodeKind::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.kind, NodeKind::Closed)
    }

    pub fn as_inner(&self) -> Option<&InnerNode> {
        match &self.kind {
            NodeKind::Inner(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_open(&self) -> Option<&OpenLeaf> {
        match &self.kind {
            NodeKind::Open(leaf) => Some(leaf),
            _ => None,
        }
    }
}

/// Parameters closer than this to a range end do not cut it
const CUT_EPSILON: f64 = 1e-7;

/// The region tree of one level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionTree {
    nodes: Vec<Node>,
    arena: Geometry,
}

impl RegionTree {
    /// Fresh tree: the arena rim at the root, one open leaf holding every
    /// enemy inside it and a closed, zero-area leaf for the outside.
    pub fn new(enemies: &mut [Enemy]) -> Self {
        let root = NodeId(0);
        let inside = NodeId(1);
        let outside = NodeId(2);

        let arena = Geometry::Circle(Circle::arena());
        for enemy in enemies.iter_mut() {
            enemy.leaf = inside;
        }

        let nodes = vec![
            Node {
                parent: None,
                area: 1.0,
                kind: NodeKind::Inner(InnerNode {
                    geometry: arena,
                    left: inside,
                    right: outside,
                    left_samples: 0,
                    right_samples: 0,
                }),
            },
            Node {
                parent: Some(root),
                area: 1.0,
                kind: NodeKind::Open(OpenLeaf {
                    enemies: (0..enemies.len()).collect(),
                    pending: None,
                }),
            },
            Node {
                parent: Some(root),
                area: 0.0,
                kind: NodeKind::Closed,
            },
        ];

        Self { nodes, arena }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The arena rim
    pub fn arena(&self) -> &Geometry {
        &self.arena
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The dividing curves enclosing `leaf`, innermost first, each with the
    /// side of it the leaf lies on
    pub fn boundaries(&self, leaf: NodeId) -> Boundaries<'_> {
        Boundaries {
            tree: self,
            child: leaf,
        }
    }

    /// Register `geometry` against the tree.
    ///
    /// Every open leaf the curve passes through gets a pending split on
    /// `geometry` and is appended to `affected`. Every parameter at which the
    /// curve crosses an existing boundary is appended to `crossings`,
    /// unsorted and possibly duplicated.
    pub fn insert(
        &mut self,
        geometry: &Geometry,
        affected: &mut Vec<NodeId>,
        crossings: &mut Vec<f64>,
    ) {
        let (lo, hi) = geometry.range();
        let reference = (lo + hi) / 2.0;

        // Each entry is a piece of the curve known to lie inside the node
        let mut stack = vec![(self.root(), lo, hi)];
        while let Some((id, lo, hi)) = stack.pop() {
            match &mut self.nodes[id.index()].kind {
                NodeKind::Inner(inner) => {
                    let divider = inner.geometry;
                    let (left, right) = (inner.left, inner.right);

                    let mut cuts: Vec<f64> = geometry
                        .intersections_with(&divider)
                        .into_iter()
                        .map(|p| geometry.param_near(p, reference))
                        .filter(|t| *t > lo + CUT_EPSILON && *t < hi - CUT_EPSILON)
                        .collect();
                    cuts.sort_by(f64::total_cmp);
                    crossings.extend_from_slice(&cuts);

                    let mut start = lo;
                    for end in cuts.into_iter().chain(std::iter::once(hi)) {
                        if end - start > CUT_EPSILON {
                            let mid = geometry.point_at((start + end) / 2.0);
                            let child = match divider.side_of(mid) {
                                Side::Left => left,
                                Side::Right => right,
                            };
                            stack.push((child, start, end));
                        }
                        start = end;
                    }
                }
                NodeKind::Open(leaf) => {
                    if leaf.pending.is_none() {
                        leaf.pending = Some(PendingSplit::new(*geometry));
                    }
                    if !affected.contains(&id) {
                        affected.push(id);
                    }
                }
                NodeKind::Closed => {}
            }
        }
    }

    /// Point location: the leaf containing `p`
    pub fn probe(&self, p: DVec2) -> NodeId {
        let mut id = self.root();
        while let NodeKind::Inner(inner) = &self.nodes[id.index()].kind {
            id = inner.child(inner.geometry.side_of(p));
        }
        id
    }

    /// Split an open leaf along its pending geometry.
    ///
    /// The leaf becomes an inner node. Its enemies are partitioned by side;
    /// an enemy-free side becomes a closed leaf. If both sides are free only
    /// the one with fewer samples closes (right on a tie), so one wall never
    /// claims more than one region. Areas are seeded from the sample tally.
    ///
    /// Returns false (and does nothing) unless `id` is an open leaf with a
    /// pending split.
    pub fn subdivide(&mut self, id: NodeId, enemies: &mut [Enemy]) -> bool {
        let node = &mut self.nodes[id.index()];
        let area = node.area;
        let NodeKind::Open(leaf) = &mut node.kind else {
            return false;
        };
        let Some(pending) = leaf.pending.take() else {
            return false;
        };
        let members = std::mem::take(&mut leaf.enemies);

        let (left_enemies, right_enemies): (Vec<usize>, Vec<usize>) = members
            .into_iter()
            .partition(|&i| pending.geometry.side_of(enemies[i].pos) == Side::Left);

        let l = pending.left_samples;
        let r = pending.right_samples;
        let left_area = if l + r > 0 {
            area * l as f64 / (l + r) as f64
        } else {
            area / 2.0
        };

        let close_left = left_enemies.is_empty() && (!right_enemies.is_empty() || l < r);
        let close_right = right_enemies.is_empty() && !close_left;

        let left = NodeId(self.nodes.len() as u32);
        let right = NodeId(left.0 + 1);

        for &i in &left_enemies {
            enemies[i].leaf = left;
        }
        for &i in &right_enemies {
            enemies[i].leaf = right;
        }

        let leaf_kind = |close: bool, members: Vec<usize>| {
            if close {
                NodeKind::Closed
            } else {
                NodeKind::Open(OpenLeaf {
                    enemies: members,
                    pending: None,
                })
            }
        };

        self.nodes.push(Node {
            parent: Some(id),
            area: left_area,
            kind: leaf_kind(close_left, left_enemies),
        });
        self.nodes.push(Node {
            parent: Some(id),
            area: area - left_area,
            kind: leaf_kind(close_right, right_enemies),
        });

        self.nodes[id.index()].kind = NodeKind::Inner(InnerNode {
            geometry: pending.geometry,
            left,
            right,
            left_samples: l,
            right_samples: r,
        });

        log::debug!(
            "subdivided {:?}: left {:?}{} right {:?}{}",
            id,
            left,
            if close_left { " (closed)" } else { "" },
            right,
            if close_right { " (closed)" } else { "" },
        );
        true
    }

    /// Insert `geometry` and split every affected leaf at once (static walls)
    pub fn insert_and_split(&mut self, geometry: &Geometry, enemies: &mut [Enemy]) {
        let mut affected = Vec::new();
        let mut crossings = Vec::new();
        self.insert(geometry, &mut affected, &mut crossings);
        for id in affected {
            self.subdivide(id, enemies);
        }
    }

    /// Drop the pending split (and its sample tally) of every listed leaf
    /// that is still open
    pub fn cancel_pending(&mut self, leaves: &[NodeId]) {
        for &id in leaves {
            if let NodeKind::Open(leaf) = &mut self.nodes[id.index()].kind {
                leaf.pending = None;
            }
        }
    }

    /// Route one sample point down the tree, counting it on every inner node
    /// it passes and against the pending split of the open leaf it lands in
    pub fn register_sample(&mut self, p: DVec2) {
        let mut id = self.root();
        loop {
            match &mut self.nodes[id.index()].kind {
                NodeKind::Inner(inner) => {
                    let side = inner.geometry.side_of(p);
                    match side {
                        Side::Left => inner.left_samples += 1,
                        Side::Right => inner.right_samples += 1,
                    }
                    id = inner.child(side);
                }
                NodeKind::Open(leaf) => {
                    if let Some(pending) = &mut leaf.pending {
                        match pending.geometry.side_of(p) {
                            Side::Left => pending.left_samples += 1,
                            Side::Right => pending.right_samples += 1,
                        }
                    }
                    return;
                }
                NodeKind::Closed => return,
            }
        }
    }

    /// Recompute every node's area from the sample ratios of its ancestors.
    ///
    /// Inner nodes without samples keep the split they were seeded with.
    /// Returns the total area of closed leaves.
    pub fn recalculate_areas(&mut self) -> f64 {
        let mut claimed = 0.0;
        let root = self.root();
        self.nodes[root.index()].area = 1.0;

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let area = self.nodes[id.index()].area;
            let split = match &self.nodes[id.index()].kind {
                NodeKind::Inner(inner) => Some((
                    inner.left,
                    inner.right,
                    inner.left_samples,
                    inner.right_samples,
                )),
                NodeKind::Closed => {
                    claimed += area;
                    None
                }
                NodeKind::Open(_) => None,
            };

            let Some((left, right, l, r)) = split else {
                continue;
            };

            let left_area = if l + r > 0 {
                area * l as f64 / (l + r) as f64
            } else {
                let seeded = self.nodes[left.index()].area + self.nodes[right.index()].area;
                if seeded > EPSILON {
                    area * self.nodes[left.index()].area / seeded
                } else {
                    area / 2.0
                }
            };
            self.nodes[left.index()].area = left_area;
            self.nodes[right.index()].area = area - left_area;

            stack.push(right);
            stack.push(left);
        }

        claimed
    }

    /// Sum of closed-leaf areas as currently estimated
    pub fn claimed_area(&self) -> f64 {
        self.nodes
            .iter()
            .filter(|n| n.is_closed())
            .map(|n| n.area)
            .sum()
    }

    /// Ids of all open leaves, in arena order
    pub fn open_leaves(&self) -> Vec<NodeId> {
        (0..self.nodes.len() as u32)
            .map(NodeId)
            .filter(|id| self.nodes[id.index()].is_open())
            .collect()
    }

    pub fn closed_leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_closed()).count()
    }

    /// Pre-order walk: `visit(id, node, depth)`, left before right
    pub fn walk_depth_first<F>(&self, mut visit: F)
    where
        F: FnMut(NodeId, &Node, usize),
    {
        let mut stack = vec![(self.root(), 0)];
        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id.index()];
            visit(id, node, depth);
            if let NodeKind::Inner(inner) = &node.kind {
                stack.push((inner.right, depth + 1));
                stack.push((inner.left, depth + 1));
            }
        }
    }

    /// Release the whole tree, returning how many nodes were freed
    pub fn destroy(self) -> usize {
        let count = self.nodes.len();
        log::debug!("released region tree ({} nodes)", count);
        count
    }
}

/// Iterator over the enclosing boundaries of a node, see [`RegionTree::boundaries`]
pub struct Boundaries<'a> {
    tree: &'a RegionTree,
    child: NodeId,
}

impl<'a> Iterator for Boundaries<'a> {
    type Item = (NodeId, &'a Geometry, Side);

    fn next(&mut self) -> Option<Self::Item> {
        let parent = self.tree.node(self.child).parent?;
        let inner = self.tree.node(parent).as_inner()?;
        let side = if inner.left == self.child {
            Side::Left
        } else {
            Side::Right
        };
        self.child = parent;
        Some((parent, &inner.geometry, side))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::geometry::{CircleKind, Line};
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    fn enemy_at(x: f64, y: f64) -> Enemy {
        Enemy::new(DVec2::new(x, y), 0.3, 0.0, 0.03, 0)
    }

    /// Tree with walls laid at level start, enemies spread so leaves stay open
    fn quartered() -> (RegionTree, Vec<Enemy>) {
        let mut enemies = vec![
            enemy_at(0.5, 0.5),
            enemy_at(-0.5, 0.5),
            enemy_at(-0.5, -0.5),
            enemy_at(0.5, -0.5),
        ];
        let mut tree = RegionTree::new(&mut enemies);
        tree.insert_and_split(&Geometry::from(Line::new(0.0)), &mut enemies);
        tree.insert_and_split(&Geometry::from(Line::new(FRAC_PI_2)), &mut enemies);
        (tree, enemies)
    }

    #[test]
    fn test_new_tree() {
        let mut enemies = vec![enemy_at(0.0, 0.0), enemy_at(0.2, 0.1)];
        let tree = RegionTree::new(&mut enemies);
        assert_eq!(tree.len(), 3);
        let inside = tree.probe(DVec2::new(0.1, 0.1));
        assert_eq!(tree.node(inside).as_open().map(|l| l.enemies.len()), Some(2));
        assert!(enemies.iter().all(|e| e.leaf == inside));
        assert!(tree.node(tree.probe(DVec2::new(2.0, 0.0))).is_closed());
        assert_eq!(tree.claimed_area(), 0.0);
    }

    #[test]
    fn test_insert_diameter_marks_interior() {
        let mut enemies = vec![enemy_at(0.0, 0.5)];
        let mut tree = RegionTree::new(&mut enemies);
        let mut affected = Vec::new();
        let mut crossings = Vec::new();
        tree.insert(&Geometry::from(Line::new(0.0)), &mut affected, &mut crossings);

        assert_eq!(affected, vec![enemies[0].leaf]);
        // Endpoints on the rim are not crossings
        assert!(crossings.is_empty());
        assert!(tree.node(affected[0]).as_open().unwrap().pending.is_some());
    }

    #[test]
    fn test_insert_records_crossings() {
        let (mut tree, _) = quartered();
        let wall = Geometry::from(Line::new(FRAC_PI_2 / 2.0));
        let mut affected = Vec::new();
        let mut crossings = Vec::new();
        tree.insert(&wall, &mut affected, &mut crossings);

        // A diagonal through the center crosses both existing diameters there
        assert_eq!(affected.len(), 2);
        assert!(!crossings.is_empty());
        assert!(crossings.iter().all(|t| t.abs() < 1e-6));
    }

    #[test]
    fn test_subdivide_partitions_enemies() {
        let mut enemies = vec![enemy_at(0.0, 0.5), enemy_at(0.3, 0.2)];
        let mut tree = RegionTree::new(&mut enemies);
        let leaf = enemies[0].leaf;
        let mut affected = Vec::new();
        tree.insert(&Geometry::from(Line::new(0.0)), &mut affected, &mut Vec::new());

        assert!(tree.subdivide(leaf, &mut enemies));
        let inner = tree.node(leaf).as_inner().unwrap();
        let (left, right) = (inner.left, inner.right);
        assert_eq!(tree.node(left).as_open().unwrap().enemies, vec![0, 1]);
        assert!(tree.node(right).is_closed());
        assert!(enemies.iter().all(|e| e.leaf == left));

        // A second call is a no-op
        assert!(!tree.subdivide(leaf, &mut enemies));
    }

    #[test]
    fn test_subdivide_without_pending_is_noop() {
        let mut enemies = vec![enemy_at(0.0, 0.5)];
        let mut tree = RegionTree::new(&mut enemies);
        let leaf = enemies[0].leaf;
        assert!(!tree.subdivide(leaf, &mut enemies));
        assert!(tree.node(leaf).is_open());
    }

    #[test]
    fn test_subdivide_empty_leaf_closes_one_side() {
        let mut enemies = Vec::new();
        let mut tree = RegionTree::new(&mut enemies);
        tree.insert_and_split(&Geometry::from(Line::new(0.0)), &mut enemies);

        let top = tree.probe(DVec2::new(0.0, 0.5));
        let bottom = tree.probe(DVec2::new(0.0, -0.5));
        assert!(tree.node(top).is_open());
        assert!(tree.node(bottom).is_closed());
    }

    #[test]
    fn test_cancel_pending() {
        let mut enemies = vec![enemy_at(0.0, 0.5)];
        let mut tree = RegionTree::new(&mut enemies);
        let mut affected = Vec::new();
        tree.insert(&Geometry::from(Line::new(0.0)), &mut affected, &mut Vec::new());
        tree.register_sample(DVec2::new(0.1, 0.1));
        tree.cancel_pending(&affected);
        assert!(tree.node(affected[0]).as_open().unwrap().pending.is_none());
        assert!(!tree.subdivide(affected[0], &mut enemies));
    }

    #[test]
    fn test_register_sample_counts_pending_sides() {
        let mut enemies = vec![enemy_at(0.0, 0.5)];
        let mut tree = RegionTree::new(&mut enemies);
        let mut affected = Vec::new();
        tree.insert(&Geometry::from(Line::new(0.0)), &mut affected, &mut Vec::new());

        tree.register_sample(DVec2::new(0.1, 0.3));
        tree.register_sample(DVec2::new(0.1, -0.3));
        tree.register_sample(DVec2::new(-0.4, -0.3));

        let pending = tree.node(affected[0]).as_open().unwrap().pending.unwrap();
        assert_eq!(pending.left_samples, 1);
        assert_eq!(pending.right_samples, 2);
        let root = tree.node(tree.root()).as_inner().unwrap();
        assert_eq!(root.left_samples, 3);
        assert_eq!(root.right_samples, 0);
    }

    #[test]
    fn test_recalculate_areas_from_samples() {
        let mut enemies = vec![enemy_at(0.0, 0.5)];
        let mut tree = RegionTree::new(&mut enemies);
        let mut affected = Vec::new();
        tree.insert(&Geometry::from(Line::new(0.0)), &mut affected, &mut Vec::new());
        for _ in 0..3 {
            tree.register_sample(DVec2::new(0.0, 0.5));
        }
        tree.register_sample(DVec2::new(0.0, -0.5));
        tree.subdivide(affected[0], &mut enemies);

        // Seeded from the pending tally: bottom (closed) holds 1/4
        assert!((tree.recalculate_areas() - 0.25).abs() < 1e-12);

        for _ in 0..4 {
            tree.register_sample(DVec2::new(0.0, -0.5));
        }
        // Now 3 top, 5 bottom
        assert!((tree.recalculate_areas() - 0.625).abs() < 1e-12);
        // Deterministic for the same history
        assert!((tree.recalculate_areas() - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_boundaries_walk() {
        let (tree, enemies) = quartered();
        let walls: Vec<_> = tree.boundaries(enemies[0].leaf).collect();
        assert_eq!(walls.len(), 3);
        // Innermost is the vertical diameter; the enemy at x > 0 is on its right
        assert!(matches!(walls[0].1, Geometry::Line(l) if (l.angle - FRAC_PI_2).abs() < 1e-12));
        assert_eq!(walls[0].2, Side::Right);
        assert_eq!(walls[1].2, Side::Left);
        // Outermost is the arena rim, inside
        assert!(matches!(walls[2].1, Geometry::Circle(c) if c.kind == CircleKind::Circumference));
        assert_eq!(walls[2].2, Side::Left);
    }

    #[test]
    fn test_midpoint_sequence_matches_brute_force() {
        let (mut tree, _) = quartered();
        // Circle orthogonal to the rim, crossing the horizontal diameter
        let center = DVec2::new(1.2, 0.1);
        let r = (center.length_squared() - 1.0).sqrt();
        let mut wall = Geometry::from(Circle::new(center, r, CircleKind::Circumference));
        let points = wall.intersections_with(tree.arena());
        assert_eq!(points.len(), 2);
        let from = wall.param_near(points[0], 0.0);
        let to = wall.param_near(points[1], from);
        wall.set_from_t(from);
        wall.set_to_t(to);

        let mut affected = Vec::new();
        let mut crossings = vec![from, to];
        tree.insert(&wall, &mut affected, &mut crossings);
        crossings.sort_by(f64::total_cmp);
        crossings.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

        let by_midpoint: Vec<NodeId> = crossings
            .windows(2)
            .map(|w| tree.probe(wall.point_at((w[0] + w[1]) / 2.0)))
            .collect();

        let (lo, hi) = wall.range();
        let mut brute: Vec<NodeId> = Vec::new();
        for i in 1..2000 {
            let t = lo + (hi - lo) * i as f64 / 2000.0;
            let leaf = tree.probe(wall.point_at(t));
            if brute.last() != Some(&leaf) {
                brute.push(leaf);
            }
        }
        assert_eq!(brute.len(), 2);
        assert_eq!(by_midpoint, brute);
    }

    proptest! {
        #[test]
        fn prop_probe_is_total_and_stable(x in -1.0f64..1.0, y in -1.0f64..1.0) {
            let (tree, _) = quartered();
            let p = DVec2::new(x, y);
            let leaf = tree.probe(p);
            prop_assert!(tree.node(leaf).as_inner().is_none());
            prop_assert_eq!(leaf, tree.probe(p));
            if p.length() < 1.0 {
                prop_assert!(tree.node(leaf).is_open());
            }
        }
    }
}
