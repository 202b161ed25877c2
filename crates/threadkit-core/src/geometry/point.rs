//! 3D point with optional gcode provenance

use std::fmt;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::EPSILON;
use crate::angle::Angle;

/// A point in printer coordinates (millimetres).
///
/// Equality compares coordinates within [`EPSILON`]; the source line is
/// traceability only and does not take part.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
    /// Line number of the gcode command that produced this point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            line_number: None,
        }
    }

    /// Attach a source line number
    pub fn with_line(mut self, line_number: u32) -> Self {
        self.line_number = Some(line_number);
        self
    }

    /// Position vector
    pub fn vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Convert to an `nalgebra` point
    pub fn to_point3(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Build from an `nalgebra` point
    pub fn from_point3(p: &Point3<f64>) -> Self {
        Self::new(p.x, p.y, p.z)
    }

    /// Vector from `self` to `other`
    pub fn vector_to(&self, other: &Point) -> Vector3<f64> {
        other.vector() - self.vector()
    }

    /// Euclidean distance in 3D
    pub fn distance(&self, other: &Point) -> f64 {
        self.vector_to(other).norm()
    }

    /// Distance in the XY plane
    pub fn distance_2d(&self, other: &Point) -> f64 {
        self.vector_to(other).xy().norm()
    }

    /// Copy with Z set to zero
    pub fn as2d(&self) -> Point {
        self.set_z(0.0)
    }

    /// Copy with a different Z
    pub fn set_z(&self, z: f64) -> Point {
        Point { z, ..*self }
    }

    /// Copy translated by `v`; provenance is dropped
    pub fn moved(&self, v: Vector3<f64>) -> Point {
        Point::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }

    /// True if X and Y match within tolerance
    pub fn xy_eq(&self, other: &Point) -> bool {
        (self.x - other.x).abs() <= EPSILON && (self.y - other.y).abs() <= EPSILON
    }

    /// Direction of `self` seen from `center`, in `[0, 2π)`
    pub fn angle_from(&self, center: &Point) -> Angle {
        Angle::atan2(self.y - center.y, self.x - center.x).normalized()
    }

    /// Linear interpolation towards `other`
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        self.moved(self.vector_to(other) * t)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.xy_eq(other) && (self.z - other.z).abs() <= EPSILON
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl From<[f64; 3]> for Point {
    fn from(c: [f64; 3]) -> Self {
        Point::new(c[0], c[1], c[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_within_epsilon() {
        let a = Point::new(1.0, 2.0, 3.0);
        let b = Point::new(1.0 + EPSILON / 2.0, 2.0, 3.0).with_line(7);
        assert_eq!(a, b);
        assert_ne!(a, Point::new(1.001, 2.0, 3.0));
    }

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(3.0, 4.0, 12.0);
        assert_eq!(a.distance(&b), 13.0);
        assert_eq!(a.distance_2d(&b), 5.0);
    }

    #[test]
    fn test_angle_from() {
        let c = Point::new(0.0, 0.0, 0.0);
        let p = Point::new(0.0, -1.0, 0.0);
        assert!((p.angle_from(&c).degrees() - 270.0).abs() < 1e-9);
    }
}
