//! Half-line used as the thread path

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{intersection, Geometry, LineLike, Point, Segment, SegmentId, SegmentSet, EPSILON};
use crate::angle::Angle;
use crate::error::ConstructionError;

/// Ray from an origin along a non-zero direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalfLine {
    origin: Point,
    direction: Vector3<f64>,
}

impl HalfLine {
    /// Half-line from `origin` through `through`
    pub fn new(origin: Point, through: Point) -> Result<Self, ConstructionError> {
        Self::from_vector(origin, origin.vector_to(&through))
    }

    /// Half-line from `origin` along `direction`
    pub fn from_vector(origin: Point, direction: Vector3<f64>) -> Result<Self, ConstructionError> {
        if direction.xy().norm() <= EPSILON {
            return Err(ConstructionError::ZeroDirection { origin });
        }
        Ok(Self { origin, direction })
    }

    /// Half-line in the XY plane at `angle`
    pub fn from_angle(origin: Point, angle: Angle) -> Self {
        let (c, s) = angle.unit();
        Self {
            origin,
            direction: Vector3::new(c, s, 0.0),
        }
    }

    /// Origin point
    pub fn point(&self) -> &Point {
        &self.origin
    }

    /// Direction vector
    pub fn vector(&self) -> &Vector3<f64> {
        &self.direction
    }

    /// Direction in the XY plane, in `[0, 2π)`
    pub fn angle(&self) -> Angle {
        Angle::atan2(self.direction.y, self.direction.x).normalized()
    }

    /// Copy translated by `v`
    pub fn moved(&self, v: Vector3<f64>) -> HalfLine {
        HalfLine {
            origin: self.origin.moved(v),
            direction: self.direction,
        }
    }

    /// Copy with the origin dropped to Z = 0 and a flat direction
    pub fn as2d(&self) -> HalfLine {
        HalfLine {
            origin: self.origin.as2d(),
            direction: Vector3::new(self.direction.x, self.direction.y, 0.0),
        }
    }

    /// Copy with the origin moved to `z`
    pub fn set_z(&self, z: f64) -> HalfLine {
        HalfLine {
            origin: self.origin.set_z(z),
            direction: self.direction,
        }
    }

    /// Same origin and direction as `other`
    pub fn same_path(&self, other: &HalfLine) -> bool {
        self.origin == other.origin
            && self.direction.xy().normalize().metric_distance(&other.direction.xy().normalize())
                <= EPSILON
    }

    /// Whether `point` is on this half-line
    pub fn contains(&self, point: &Point) -> bool {
        self.perpendicular_distance(point)
            .is_some_and(|d| d <= EPSILON)
    }

    /// Intersection with a line-like primitive
    pub fn intersection<L: LineLike>(&self, other: &L) -> Option<Geometry> {
        intersection(self, other)
    }

    /// Ids of `segments` this half-line crosses, not counting a crossing
    /// exactly at the origin.
    pub fn intersecting<'a, I>(&self, segments: I) -> SegmentSet
    where
        I: IntoIterator<Item = (SegmentId, &'a Segment)>,
    {
        segments
            .into_iter()
            .filter(|(_, seg)| match intersection(self, *seg) {
                None => false,
                Some(hit) => !hit.is_point(&self.origin),
            })
            .map(|(id, _)| id)
            .collect()
    }
}

impl LineLike for HalfLine {
    fn origin(&self) -> Point {
        self.origin
    }

    fn direction(&self) -> Vector3<f64> {
        self.direction
    }

    fn upper(&self) -> Option<f64> {
        None
    }
}

impl PartialEq for HalfLine {
    fn eq(&self, other: &Self) -> bool {
        self.same_path(other)
    }
}

impl fmt::Display for HalfLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.angle())
    }
}
