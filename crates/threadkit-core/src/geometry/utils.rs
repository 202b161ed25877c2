//! Geometry utilities
//!
//! Angular distance and sorting, tangents, circle intersections, proximity
//! tests and the visibility search used by the avoidance planner.
//!
//! Angles returned here live in `[0, 2π)`; angular distances are the signed
//! shortest rotation in `(-π, π]`.

use std::collections::BTreeMap;

use tracing::trace;

use super::{
    HalfLine, LineLike, Point, PointDistance, Segment, SegmentId, SegmentSet, EPSILON,
};
use crate::angle::Angle;
use crate::error::ConstructionError;

/// Signed shortest rotation from `a` to `b`
pub fn ang_diff(a: Angle, b: Angle) -> Angle {
    a.diff(b)
}

/// Angle at `center` between the directions to `reference` and to `point`
pub fn ang_dist(point: &Point, center: &Point, reference: &Point) -> Angle {
    reference.angle_from(center).diff(point.angle_from(center))
}

/// Sort `points` by the magnitude of rotation away from `reference`, seen
/// from its origin. Ties keep input order.
pub fn angsort(points: &[Point], reference: &HalfLine) -> Vec<Point> {
    let origin = *reference.point();
    let base = reference.angle();
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| {
        let da = base.diff(a.angle_from(&origin)).abs().radians();
        let db = base.diff(b.angle_from(&origin)).abs().radians();
        da.total_cmp(&db)
    });
    sorted
}

/// Point on a circle at `angle`
pub fn angle_to_point(center: &Point, radius: f64, angle: Angle) -> Point {
    let (c, s) = angle.unit();
    Point::new(center.x + radius * c, center.y + radius * s, center.z)
}

/// The two points where lines from `point` touch the circle.
///
/// Errors if `point` lies inside the circle.
pub fn tangent_points(
    center: &Point,
    radius: f64,
    point: &Point,
) -> Result<(Point, Point), ConstructionError> {
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    let d = dx.hypot(dy);
    if d < radius {
        return Err(ConstructionError::PointInsideCircle {
            center: *center,
            radius,
            point: *point,
        });
    }
    let rho = radius / d;
    let ad = rho * rho;
    let bd = rho * (1.0 - ad).max(0.0).sqrt();
    Ok((
        Point::new(center.x + ad * dx - bd * dy, center.y + ad * dy + bd * dx, center.z),
        Point::new(center.x + ad * dx + bd * dy, center.y + ad * dy - bd * dx, center.z),
    ))
}

/// Points where `line` crosses the circle, nearest to the line origin first.
///
/// Zero, one (tangent) or two points.
pub fn circle_intersection<L: LineLike>(center: &Point, radius: f64, line: &L) -> Vec<Point> {
    let origin = line.origin();
    let d = line.direction().xy();
    let f = (origin.vector() - center.vector()).xy();

    let a = d.norm_squared();
    let b = 2.0 * f.dot(&d);
    let c = f.norm_squared() - radius * radius;
    let disc = b * b - 4.0 * a * c;

    let params: Vec<f64> = if disc < -EPSILON {
        Vec::new()
    } else if disc.abs() <= EPSILON {
        vec![-b / (2.0 * a)]
    } else {
        let root = disc.sqrt();
        vec![(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
    };

    let mut points: Vec<Point> = params
        .into_iter()
        .filter(|t| line.in_range(*t))
        .map(|t| line.at(t))
        .collect();
    points.sort_by(|p, q| origin.distance_2d(p).total_cmp(&origin.distance_2d(q)));
    points
}

/// True if `a` is closer than `by` to `point`.
///
/// A distance that cannot be computed counts as not too close.
pub fn too_close<T: PointDistance + ?Sized>(a: &T, point: &Point, by: f64) -> bool {
    a.distance_to(point).is_some_and(|d| d - by <= -EPSILON)
}

/// A direction the thread could be rotated to, and the segments it would
/// still conflict with.
#[derive(Debug, Clone)]
pub struct VisibilityCandidate {
    /// Point the thread would be aimed at
    pub point: Point,
    /// Segments still crossed or passed too closely
    pub residual: SegmentSet,
}

/// Candidate thread directions from `origin` around the endpoints of
/// `segments`, sorted by residual size (stable).
///
/// For each endpoint farther than `avoid_by` from `origin`, the two tangent
/// points of a circle of radius `avoid_by` around it give the directions
/// that just clear it. Endpoints within `avoid_by` of `origin` cannot be
/// cleared by any rotation and are not checked.
pub fn visibility(
    origin: &Point,
    segments: &BTreeMap<SegmentId, &Segment>,
    avoid_by: f64,
) -> Result<Vec<VisibilityCandidate>, ConstructionError> {
    let mut endpoints: Vec<Point> = Vec::new();
    for seg in segments.values() {
        for ep in [seg.start(), seg.end()] {
            if ep != origin && !endpoints.contains(ep) {
                endpoints.push(*ep);
            }
        }
    }

    let mut targets: Vec<Point> = Vec::with_capacity(endpoints.len() * 2);
    for ep in &endpoints {
        if origin.distance_2d(ep) > avoid_by {
            let (a, b) = tangent_points(ep, avoid_by, origin)?;
            targets.push(a);
            targets.push(b);
        }
    }

    let mut candidates = Vec::with_capacity(targets.len());
    for target in targets {
        let path = match HalfLine::new(*origin, target) {
            Ok(path) => path,
            Err(_) => continue,
        };
        let mut residual = path.intersecting(segments.iter().map(|(id, s)| (*id, *s)));
        for (id, seg) in segments {
            let near = [seg.start(), seg.end()].into_iter().any(|ep| {
                ep != origin && !too_close(origin, ep, avoid_by) && too_close(&path, ep, avoid_by)
            });
            if near {
                residual.insert(*id);
            }
        }
        trace!("visibility {} -> {:?}", target, residual);
        candidates.push(VisibilityCandidate {
            point: target,
            residual,
        });
    }

    candidates.sort_by_key(|c| c.residual.len());
    Ok(candidates)
}
