//! Wall geometry: circular arcs and straight lines
//!
//! Both curves carry a scalar parameter range `[from_t, to_t]`:
//! - Circle: polar angle around the circle's center. Angles are mod 2π but a
//!   range is never normalised across the branch cut, so `to_t` may leave
//!   [-π, π) while the wall grows.
//! - Line: signed distance along the line direction, measured from the foot
//!   of the perpendicular dropped from the origin.
//!
//! Every curve also splits the plane into a left and a right side. For a
//! circle, left is the open interior. For a line, left is the half-plane the
//! left-hand normal of its direction points into. Points exactly on a curve
//! belong to the right side, so point location never stalls on a boundary.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::consts::{ARENA_RADIUS, EPSILON};
use crate::unwrap_near;

/// How a circle is meant to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CircleKind {
    /// Boundary arc (walls, the arena rim)
    #[default]
    Circumference,
    /// Filled disc
    Filled,
    /// Interior marker (enemy bodies, the cursor)
    Inside,
}

/// Which side of a dividing curve a point lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// +1 for the left side, -1 for the right
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }
}

/// A circle (or arc of one)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: DVec2,
    pub r: f64,
    pub kind: CircleKind,
    /// Start angle of the swept arc
    pub from_t: f64,
    /// End angle of the swept arc
    pub to_t: f64,
}

impl Circle {
    /// Full circle, angles [0, 2π]
    pub fn new(center: DVec2, r: f64, kind: CircleKind) -> Self {
        Self {
            center,
            r,
            kind,
            from_t: 0.0,
            to_t: TAU,
        }
    }

    /// The arena rim
    pub fn arena() -> Self {
        Self::new(DVec2::ZERO, ARENA_RADIUS, CircleKind::Circumference)
    }

    pub fn with_range(mut self, from_t: f64, to_t: f64) -> Self {
        self.from_t = from_t;
        self.to_t = to_t;
        self
    }

    #[inline]
    pub fn point_at(&self, t: f64) -> DVec2 {
        self.center + self.r * DVec2::new(t.cos(), t.sin())
    }

    /// Polar angle of `p` around the center, in [-π, π]
    #[inline]
    pub fn param_of(&self, p: DVec2) -> f64 {
        let d = p - self.center;
        d.y.atan2(d.x)
    }

    /// Distance from `p` to the circumference, negative inside
    #[inline]
    pub fn signed_distance(&self, p: DVec2) -> f64 {
        (p - self.center).length() - self.r
    }

    #[inline]
    pub fn side_of(&self, p: DVec2) -> Side {
        if (p - self.center).length_squared() < self.r * self.r {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Proximity test treating `self` as a solid disc of radius `r`
    ///
    /// Walls (circumferences, lines) are hit when the disc overlaps the curve;
    /// filled discs and markers are hit when the two discs overlap.
    pub fn collides_with(&self, other: &Geometry) -> bool {
        match other {
            Geometry::Circle(o) => match o.kind {
                CircleKind::Circumference => o.signed_distance(self.center).abs() < self.r,
                CircleKind::Filled | CircleKind::Inside => {
                    (o.center - self.center).length() < self.r + o.r
                }
            },
            Geometry::Line(l) => l.signed_distance(self.center).abs() < self.r,
        }
    }

    pub fn move_to(&mut self, center: DVec2) {
        self.center = center;
    }
}

/// A straight line `{p : n·p = offset}`, `n` the left normal of `angle`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Direction angle
    pub angle: f64,
    /// Signed perpendicular distance from the origin
    pub offset: f64,
    pub from_t: f64,
    pub to_t: f64,
}

impl Line {
    /// A line through the origin spanning the arena diameter
    pub fn new(angle: f64) -> Self {
        Self::with_offset(angle, 0.0)
    }

    /// A line at a perpendicular offset, spanning its chord of the arena
    pub fn with_offset(angle: f64, offset: f64) -> Self {
        let half = (ARENA_RADIUS * ARENA_RADIUS - offset * offset).max(0.0).sqrt();
        Self {
            angle,
            offset,
            from_t: -half,
            to_t: half,
        }
    }

    pub fn with_range(mut self, from_t: f64, to_t: f64) -> Self {
        self.from_t = from_t;
        self.to_t = to_t;
        self
    }

    #[inline]
    pub fn direction(&self) -> DVec2 {
        DVec2::new(self.angle.cos(), self.angle.sin())
    }

    /// Left-hand normal of the direction
    #[inline]
    pub fn normal(&self) -> DVec2 {
        DVec2::new(-self.angle.sin(), self.angle.cos())
    }

    #[inline]
    pub fn point_at(&self, t: f64) -> DVec2 {
        self.normal() * self.offset + self.direction() * t
    }

    #[inline]
    pub fn param_of(&self, p: DVec2) -> f64 {
        self.direction().dot(p)
    }

    /// Distance from `p` to the line, positive on the left side
    #[inline]
    pub fn signed_distance(&self, p: DVec2) -> f64 {
        self.normal().dot(p) - self.offset
    }

    #[inline]
    pub fn side_of(&self, p: DVec2) -> Side {
        if self.signed_distance(p) > 0.0 {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// Dividing or growing curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Circle(Circle),
    Line(Line),
}

impl Geometry {
    pub fn from_t(&self) -> f64 {
        match self {
            Geometry::Circle(c) => c.from_t,
            Geometry::Line(l) => l.from_t,
        }
    }

    pub fn to_t(&self) -> f64 {
        match self {
            Geometry::Circle(c) => c.to_t,
            Geometry::Line(l) => l.to_t,
        }
    }

    pub fn set_from_t(&mut self, t: f64) {
        match self {
            Geometry::Circle(c) => c.from_t = t,
            Geometry::Line(l) => l.from_t = t,
        }
    }

    pub fn set_to_t(&mut self, t: f64) {
        match self {
            Geometry::Circle(c) => c.to_t = t,
            Geometry::Line(l) => l.to_t = t,
        }
    }

    /// Parameter range as (low, high) regardless of sweep direction
    pub fn range(&self) -> (f64, f64) {
        let (a, b) = (self.from_t(), self.to_t());
        if a <= b { (a, b) } else { (b, a) }
    }

    #[inline]
    pub fn point_at(&self, t: f64) -> DVec2 {
        match self {
            Geometry::Circle(c) => c.point_at(t),
            Geometry::Line(l) => l.point_at(t),
        }
    }

    pub fn start_point(&self) -> DVec2 {
        self.point_at(self.from_t())
    }

    pub fn end_point(&self) -> DVec2 {
        self.point_at(self.to_t())
    }

    /// Parameter of a point on (or projected onto) the curve
    ///
    /// For circles the angle is shifted by 2π so it lies within π of
    /// `reference`, keeping it on the same branch as a swept range.
    pub fn param_near(&self, p: DVec2, reference: f64) -> f64 {
        match self {
            Geometry::Circle(c) => unwrap_near(c.param_of(p), reference),
            Geometry::Line(l) => l.param_of(p),
        }
    }

    #[inline]
    pub fn side_of(&self, p: DVec2) -> Side {
        match self {
            Geometry::Circle(c) => c.side_of(p),
            Geometry::Line(l) => l.side_of(p),
        }
    }

    /// Unsigned distance from `p` to the full curve
    pub fn distance_to(&self, p: DVec2) -> f64 {
        match self {
            Geometry::Circle(c) => c.signed_distance(p).abs(),
            Geometry::Line(l) => l.signed_distance(p).abs(),
        }
    }

    /// Arc length per unit parameter
    pub fn sweep_scale(&self) -> f64 {
        match self {
            Geometry::Circle(c) => c.r,
            Geometry::Line(_) => 1.0,
        }
    }

    /// Whether `t` lies strictly between `from_t` and `to_t`, in either order
    pub fn in_swept_range(&self, t: f64) -> bool {
        let (lo, hi) = self.range();
        t > lo && t < hi
    }

    /// Points where the full curves of `self` and `other` cross
    ///
    /// Returns 0, 1 (tangent) or 2 points. Concentric circles and parallel
    /// lines never intersect, even when coincident.
    pub fn intersections_with(&self, other: &Geometry) -> Vec<DVec2> {
        match (self, other) {
            (Geometry::Circle(a), Geometry::Circle(b)) => circle_circle(a, b),
            (Geometry::Circle(c), Geometry::Line(l)) | (Geometry::Line(l), Geometry::Circle(c)) => {
                circle_line(c, l)
            }
            (Geometry::Line(a), Geometry::Line(b)) => line_line(a, b),
        }
    }
}

impl From<Circle> for Geometry {
    fn from(c: Circle) -> Self {
        Geometry::Circle(c)
    }
}

impl From<Line> for Geometry {
    fn from(l: Line) -> Self {
        Geometry::Line(l)
    }
}

fn circle_circle(a: &Circle, b: &Circle) -> Vec<DVec2> {
    let d = b.center - a.center;
    let dist = d.length();
    if dist < EPSILON {
        return Vec::new();
    }

    // Distance from a's center to the chord, along d
    let x = (dist * dist + a.r * a.r - b.r * b.r) / (2.0 * dist);
    let h2 = a.r * a.r - x * x;
    let base = a.center + d * (x / dist);

    if h2 < -EPSILON {
        Vec::new()
    } else if h2 <= EPSILON {
        vec![base]
    } else {
        let h = h2.sqrt();
        let perp = DVec2::new(-d.y, d.x) / dist;
        vec![base + perp * h, base - perp * h]
    }
}

fn circle_line(c: &Circle, l: &Line) -> Vec<DVec2> {
    let s = l.signed_distance(c.center);
    let h2 = c.r * c.r - s * s;
    let t0 = l.param_of(c.center);

    if h2 < -EPSILON {
        Vec::new()
    } else if h2 <= EPSILON {
        vec![l.point_at(t0)]
    } else {
        let h = h2.sqrt();
        vec![l.point_at(t0 - h), l.point_at(t0 + h)]
    }
}

fn line_line(a: &Line, b: &Line) -> Vec<DVec2> {
    let na = a.normal();
    let nb = b.normal();
    let det = na.x * nb.y - na.y * nb.x;
    if det.abs() < EPSILON {
        return Vec::new();
    }
    vec![DVec2::new(
        (a.offset * nb.y - na.y * b.offset) / det,
        (na.x * b.offset - a.offset * nb.x) / det,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn on_both(a: &Geometry, b: &Geometry, p: DVec2) -> bool {
        a.distance_to(p) < 1e-7 && b.distance_to(p) < 1e-7
    }

    #[test]
    fn test_circle_circle_two_points() {
        let a = Geometry::from(Circle::arena());
        let b = Geometry::from(Circle::new(DVec2::new(1.0, 0.0), 0.5, CircleKind::Circumference));
        let points = a.intersections_with(&b);
        assert_eq!(points.len(), 2);
        for p in points {
            assert!(on_both(&a, &b, p));
        }
    }

    #[test]
    fn test_circle_circle_tangent_and_disjoint() {
        let ring = |x: f64, r: f64| {
            Geometry::from(Circle::new(DVec2::new(x, 0.0), r, CircleKind::Circumference))
        };
        let a = Geometry::from(Circle::arena());
        let tangent = ring(1.5, 0.5);
        let points = a.intersections_with(&tangent);
        assert_eq!(points.len(), 1);
        assert!((points[0] - DVec2::new(1.0, 0.0)).length() < 1e-6);

        let far = ring(3.0, 0.5);
        assert!(a.intersections_with(&far).is_empty());

        let nested = ring(0.1, 0.2);
        assert!(a.intersections_with(&nested).is_empty());
    }

    #[test]
    fn test_concentric_circles_never_intersect() {
        let a = Geometry::from(Circle::arena());
        let b = Geometry::from(Circle::arena());
        assert!(a.intersections_with(&b).is_empty());
    }

    #[test]
    fn test_circle_line() {
        let c = Geometry::from(Circle::arena());
        let l = Geometry::from(Line::new(0.0));
        let points = c.intersections_with(&l);
        assert_eq!(points.len(), 2);
        assert!((points[0] - DVec2::new(-1.0, 0.0)).length() < 1e-12);
        assert!((points[1] - DVec2::new(1.0, 0.0)).length() < 1e-12);

        let tangent = Geometry::from(Line::with_offset(0.3, 1.0));
        assert_eq!(c.intersections_with(&tangent).len(), 1);

        let miss = Geometry::from(Line::with_offset(0.3, 1.5));
        assert!(c.intersections_with(&miss).is_empty());
    }

    #[test]
    fn test_line_line() {
        let a = Geometry::from(Line::with_offset(0.0, 0.5));
        let b = Geometry::from(Line::with_offset(FRAC_PI_2, -0.25));
        let points = a.intersections_with(&b);
        assert_eq!(points.len(), 1);
        assert!(on_both(&a, &b, points[0]));

        let parallel = Geometry::from(Line::with_offset(PI, 0.2));
        assert!(a.intersections_with(&parallel).is_empty());
    }

    #[test]
    fn test_line_parametrisation() {
        // Drawn from the cursor at (1, 0) towards the origin
        let l = Line::new(PI);
        assert!((l.point_at(-1.0) - DVec2::new(1.0, 0.0)).length() < 1e-12);
        assert!((l.point_at(1.0) - DVec2::new(-1.0, 0.0)).length() < 1e-12);
        assert!((l.param_of(DVec2::new(0.5, 0.3)) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sides() {
        let c = Circle::arena();
        assert_eq!(c.side_of(DVec2::new(0.5, 0.0)), Side::Left);
        assert_eq!(c.side_of(DVec2::new(1.0, 0.0)), Side::Right);

        let l = Line::new(0.0);
        assert_eq!(l.side_of(DVec2::new(0.0, 0.1)), Side::Left);
        assert_eq!(l.side_of(DVec2::new(0.0, -0.1)), Side::Right);
        // On the line counts as right
        assert_eq!(l.side_of(DVec2::new(0.4, 0.0)), Side::Right);
    }

    #[test]
    fn test_collides_with() {
        let body = Circle::new(DVec2::new(0.0, 0.02), 0.03, CircleKind::Inside);
        assert!(body.collides_with(&Geometry::from(Line::new(0.0))));
        assert!(!body.collides_with(&Geometry::from(Line::with_offset(0.0, 0.1))));

        let cursor = Circle::new(DVec2::new(0.05, 0.02), 0.025, CircleKind::Inside);
        assert!(body.collides_with(&Geometry::from(cursor)));

        let rim = Geometry::from(Circle::arena());
        assert!(!body.collides_with(&rim));
    }

    #[test]
    fn test_param_near_keeps_branch() {
        let g = Geometry::from(Circle::new(DVec2::new(-1.0, 0.0), 0.5, CircleKind::Circumference));
        // A point at angle just past π around the center
        let p = DVec2::new(-1.0, 0.0) + 0.5 * DVec2::new((PI + 0.2).cos(), (PI + 0.2).sin());
        let t = g.param_near(p, PI - 0.1);
        assert!((t - (PI + 0.2)).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_circle_circle_points_on_both(
            ax in -1.0f64..1.0, ay in -1.0f64..1.0, ar in 0.05f64..1.5,
            bx in -1.0f64..1.0, by in -1.0f64..1.0, br in 0.05f64..1.5,
        ) {
            let a = Geometry::from(Circle::new(DVec2::new(ax, ay), ar, CircleKind::Circumference));
            let b = Geometry::from(Circle::new(DVec2::new(bx, by), br, CircleKind::Circumference));
            let points = a.intersections_with(&b);
            prop_assert!(points.len() <= 2);

            let dist = DVec2::new(bx - ax, by - ay).length();
            if dist > 1e-3 {
                let separated = dist > ar + br + 1e-4 || dist < (ar - br).abs() - 1e-4;
                let crossing = dist < ar + br - 1e-4 && dist > (ar - br).abs() + 1e-4;
                if separated {
                    prop_assert!(points.is_empty());
                }
                if crossing {
                    prop_assert_eq!(points.len(), 2);
                }
                for p in points {
                    prop_assert!(a.distance_to(p) < 1e-4);
                    prop_assert!(b.distance_to(p) < 1e-4);
                }
            }
        }

        #[test]
        fn prop_circle_line_points_on_both(
            cx in -1.0f64..1.0, cy in -1.0f64..1.0, r in 0.05f64..1.5,
            angle in -PI..PI, offset in -1.0f64..1.0,
        ) {
            let c = Geometry::from(Circle::new(DVec2::new(cx, cy), r, CircleKind::Circumference));
            let l = Geometry::from(Line::with_offset(angle, offset));
            let points = c.intersections_with(&l);
            let s = l.distance_to(DVec2::new(cx, cy));
            if s > r + 1e-4 {
                prop_assert!(points.is_empty());
            } else if s < r - 1e-4 {
                prop_assert_eq!(points.len(), 2);
            }
            for p in points {
                prop_assert!(c.distance_to(p) < 1e-4);
                prop_assert!(l.distance_to(p) < 1e-9);
            }
        }

        #[test]
        fn prop_line_line_point_on_both(
            a in -PI..PI, oa in -1.0f64..1.0,
            b in -PI..PI, ob in -1.0f64..1.0,
        ) {
            let la = Geometry::from(Line::with_offset(a, oa));
            let lb = Geometry::from(Line::with_offset(b, ob));
            let points = la.intersections_with(&lb);
            prop_assume!((a - b).sin().abs() > 1e-3);
            prop_assert_eq!(points.len(), 1);
            prop_assert!(la.distance_to(points[0]) < 1e-6);
            prop_assert!(lb.distance_to(points[0]) < 1e-6);
        }
    }
}
