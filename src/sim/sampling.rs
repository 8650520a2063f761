//! Monte-Carlo area estimation
//!
//! Uniform points in the arena are routed down the region tree, which counts
//! them per side of every divider (and of every pending split). Area ratios
//! fall out of the counts.

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::tree::RegionTree;

/// Seeded point sampler feeding the region tree
#[derive(Debug, Clone)]
pub struct AreaEstimator {
    rng: Pcg32,
    /// Candidate points drawn from the bounding square
    pub drawn: u64,
    /// Points that fell inside the arena and were registered
    pub accepted: u64,
}

impl AreaEstimator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            drawn: 0,
            accepted: 0,
        }
    }

    /// A uniform point in the unit disc (rejection sampling on the square)
    pub fn sample_point(&mut self) -> DVec2 {
        loop {
            self.drawn += 1;
            let p = DVec2::new(
                self.rng.random::<f64>() * 2.0 - 1.0,
                self.rng.random::<f64>() * 2.0 - 1.0,
            );
            if p.length_squared() <= 1.0 {
                return p;
            }
        }
    }

    /// Register `n` points against `tree`, returns how many were registered
    pub fn run(&mut self, tree: &mut RegionTree, n: usize) -> usize {
        for _ in 0..n {
            let p = self.sample_point();
            tree.register_sample(p);
        }
        self.accepted += n as u64;
        n
    }

    /// Fraction of drawn points kept; tends to π/4
    pub fn acceptance_ratio(&self) -> f64 {
        if self.drawn == 0 {
            0.0
        } else {
            self.accepted as f64 / self.drawn as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::geometry::{Circle, CircleKind, Geometry, Line};
    use crate::sim::state::Enemy;

    #[test]
    fn test_samples_inside_disc() {
        let mut estimator = AreaEstimator::new(7);
        for _ in 0..1000 {
            assert!(estimator.sample_point().length() <= 1.0);
        }
    }

    #[test]
    fn test_acceptance_ratio_near_quarter_pi() {
        let mut estimator = AreaEstimator::new(11);
        let mut tree = RegionTree::new(&mut []);
        estimator.run(&mut tree, 20_000);
        assert!((estimator.acceptance_ratio() - std::f64::consts::FRAC_PI_4).abs() < 0.02);
    }

    #[test]
    fn test_estimates_half_disc() {
        let mut enemies = vec![Enemy::new(DVec2::new(0.0, 0.5), 0.3, 0.0, 0.03, 0)];
        let mut tree = RegionTree::new(&mut enemies);
        tree.insert_and_split(&Geometry::Line(Line::new(0.0)), &mut enemies);

        let mut estimator = AreaEstimator::new(3);
        estimator.run(&mut tree, 20_000);
        let claimed = tree.recalculate_areas();
        assert!((claimed - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_estimates_inner_disc() {
        // A centered disc of radius 0.5 covers a quarter of the arena
        let mut enemies = vec![Enemy::new(DVec2::new(0.0, 0.8), 0.3, 0.0, 0.03, 0)];
        let mut tree = RegionTree::new(&mut enemies);
        let disc = Circle::new(DVec2::ZERO, 0.5, CircleKind::Circumference);
        tree.insert_and_split(&Geometry::Circle(disc), &mut enemies);

        let mut estimator = AreaEstimator::new(5);
        estimator.run(&mut tree, 20_000);
        let claimed = tree.recalculate_areas();
        assert!((claimed - 0.25).abs() < 0.02);
    }
}
