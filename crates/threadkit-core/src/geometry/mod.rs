//! Geometry primitives
//!
//! Typed points, segments, half-lines and polylines built on `nalgebra`.
//! Segments and half-lines share the [`LineLike`] parametric form, which is
//! what the intersection and distance routines operate on. All intersection
//! work happens in the XY plane; Z is carried along from the first operand.

pub mod halfline;
pub mod point;
pub mod polyline;
pub mod segment;
pub mod utils;

use std::collections::BTreeSet;
use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub use halfline::HalfLine;
pub use point::Point;
pub use polyline::{combine_collinear, PolyLine};
pub use segment::Segment;

/// Coordinate tolerance in millimetres.
pub const EPSILON: f64 = 1e-6;

/// Segments are referred to by their index in the owning layer.
pub type SegmentId = usize;

/// Ordered set of segment ids. Iteration order is ascending id, which keeps
/// every planner decision deterministic.
pub type SegmentSet = BTreeSet<SegmentId>;

/// Result of an intersection between two line-like primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Single crossing point
    Point(Point),
    /// Collinear overlap with finite extent
    Segment(Segment),
    /// Collinear overlap of two half-lines pointing the same way
    HalfLine(HalfLine),
}

impl Geometry {
    /// The crossing point, if this is a point result
    pub fn as_point(&self) -> Option<&Point> {
        match self {
            Geometry::Point(p) => Some(p),
            _ => None,
        }
    }

    /// True when this result is exactly `point`
    pub fn is_point(&self, point: &Point) -> bool {
        self.as_point().is_some_and(|p| p == point)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point(p) => write!(f, "{}", p),
            Geometry::Segment(s) => write!(f, "{}", s),
            Geometry::HalfLine(h) => write!(f, "{}", h),
        }
    }
}

impl From<Point> for Geometry {
    fn from(p: Point) -> Self {
        Geometry::Point(p)
    }
}

impl From<Segment> for Geometry {
    fn from(s: Segment) -> Self {
        Geometry::Segment(s)
    }
}

impl From<HalfLine> for Geometry {
    fn from(h: HalfLine) -> Self {
        Geometry::HalfLine(h)
    }
}

/// Parametric line primitive: `origin + t * direction` with `t` in
/// `[0, upper]`, `upper = None` meaning unbounded.
pub trait LineLike {
    /// Parameter origin
    fn origin(&self) -> Point;

    /// Direction vector (not necessarily normalized)
    fn direction(&self) -> Vector3<f64>;

    /// Upper bound of the parameter
    fn upper(&self) -> Option<f64>;

    /// Point at parameter `t`
    fn at(&self, t: f64) -> Point {
        self.origin().moved(self.direction() * t)
    }

    /// Whether `t` lies within the parameter range, with tolerance scaled to
    /// the direction length
    fn in_range(&self, t: f64) -> bool {
        let tol = EPSILON / self.direction().xy().norm();
        t >= -tol && self.upper().map_or(true, |u| t <= u + tol)
    }

    /// Parameter of the perpendicular foot of `point` on the infinite line
    fn project(&self, point: &Point) -> f64 {
        let d = self.direction().xy();
        let w = (point.vector() - self.origin().vector()).xy();
        w.dot(&d) / d.norm_squared()
    }

    /// Orthogonal distance from `point` to this primitive, or `None` when the
    /// perpendicular foot falls outside the parameter range.
    fn perpendicular_distance(&self, point: &Point) -> Option<f64> {
        let t = self.project(point);
        if !self.in_range(t) {
            return None;
        }
        Some(self.at(t).distance_2d(point))
    }
}

/// Anything a point can be measured against.
pub trait PointDistance {
    /// Distance to `point`, `None` if undefined for this shape
    fn distance_to(&self, point: &Point) -> Option<f64>;
}

impl PointDistance for Point {
    fn distance_to(&self, point: &Point) -> Option<f64> {
        Some(self.distance_2d(point))
    }
}

impl PointDistance for HalfLine {
    fn distance_to(&self, point: &Point) -> Option<f64> {
        self.perpendicular_distance(point)
    }
}

impl PointDistance for Segment {
    fn distance_to(&self, point: &Point) -> Option<f64> {
        Some(self.closest_point(point).distance_2d(point))
    }
}

fn cross2(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Intersect two line-like primitives in the XY plane.
///
/// Parallel, non-collinear inputs never intersect. Collinear inputs that
/// overlap return the overlap (a point if they only touch).
pub fn intersection<A: LineLike, B: LineLike>(a: &A, b: &B) -> Option<Geometry> {
    let p1 = a.origin();
    let d1 = a.direction();
    let p2 = b.origin();
    let d2 = b.direction();
    let w = p2.vector() - p1.vector();

    let denom = cross2(&d1, &d2);
    let scale = d1.xy().norm() * d2.xy().norm();

    if denom.abs() <= EPSILON * scale {
        // Parallel: only collinear overlaps count
        if cross2(&w, &d1).abs() > EPSILON * d1.xy().norm() {
            return None;
        }
        return collinear_overlap(a, b);
    }

    let t = cross2(&w, &d2) / denom;
    let u = cross2(&w, &d1) / denom;
    if a.in_range(t) && b.in_range(u) {
        Some(Geometry::Point(a.at(t)))
    } else {
        None
    }
}

fn collinear_overlap<A: LineLike, B: LineLike>(a: &A, b: &B) -> Option<Geometry> {
    // Express b's extent in a's parameter space
    let t0 = a.project(&b.origin());
    let same_way = a.direction().xy().dot(&b.direction().xy()) > 0.0;
    let t1 = b.upper().map(|u| a.project(&b.at(u)));

    let (b_lo, b_hi) = match (t1, same_way) {
        (Some(t1), _) => (t0.min(t1), Some(t0.max(t1))),
        (None, true) => (t0, None),
        (None, false) => (f64::NEG_INFINITY, Some(t0)),
    };

    let lo = b_lo.max(0.0);
    let hi = match (a.upper(), b_hi) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) => Some(x),
        (None, y) => y,
    };

    let tol = EPSILON / a.direction().xy().norm();
    match hi {
        Some(hi) if hi < lo - tol => None,
        Some(hi) if hi <= lo + tol => Some(Geometry::Point(a.at(lo))),
        Some(hi) => Segment::new(a.at(lo), a.at(hi)).ok().map(Geometry::Segment),
        None => HalfLine::from_vector(a.at(lo), a.direction())
            .ok()
            .map(Geometry::HalfLine),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment {
        Segment::new(Point::new(x1, y1, 0.0), Point::new(x2, y2, 0.0)).unwrap()
    }

    #[test]
    fn test_crossing_segments() {
        let a = seg(0.0, 0.0, 10.0, 10.0);
        let b = seg(0.0, 10.0, 10.0, 0.0);
        let hit = intersection(&a, &b).unwrap();
        assert!(hit.is_point(&Point::new(5.0, 5.0, 0.0)));
    }

    #[test]
    fn test_parallel_segments_miss() {
        let a = seg(0.0, 0.0, 10.0, 0.0);
        let b = seg(0.0, 1.0, 10.0, 1.0);
        assert!(intersection(&a, &b).is_none());
    }

    #[test]
    fn test_collinear_overlap_is_segment() {
        let a = seg(0.0, 0.0, 10.0, 0.0);
        let b = seg(5.0, 0.0, 15.0, 0.0);
        match intersection(&a, &b) {
            Some(Geometry::Segment(s)) => {
                assert_eq!(*s.start(), Point::new(5.0, 0.0, 0.0));
                assert_eq!(*s.end(), Point::new(10.0, 0.0, 0.0));
            }
            other => panic!("expected overlap segment, got {:?}", other),
        }
    }

    #[test]
    fn test_collinear_disjoint() {
        let a = seg(0.0, 0.0, 1.0, 0.0);
        let b = seg(2.0, 0.0, 3.0, 0.0);
        assert!(intersection(&a, &b).is_none());
    }

    #[test]
    fn test_touching_endpoints() {
        let a = seg(0.0, 0.0, 1.0, 0.0);
        let b = seg(1.0, 0.0, 1.0, 5.0);
        assert!(intersection(&a, &b)
            .unwrap()
            .is_point(&Point::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_halfline_behind_origin_has_no_foot() {
        let h = HalfLine::new(Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(h.perpendicular_distance(&Point::new(-5.0, 1.0, 0.0)), None);
        assert_eq!(h.perpendicular_distance(&Point::new(5.0, 2.0, 0.0)), Some(2.0));
    }
}
