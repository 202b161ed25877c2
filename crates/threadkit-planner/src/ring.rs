//! The rotating thread carrier

use serde::{Deserialize, Serialize};
use threadkit_core::geometry::utils::{angle_to_point, circle_intersection};
use threadkit_core::{Angle, HalfLine, LineLike, Point};
use threadkit_settings::RingSettings;

/// Ring holding the free end of the thread.
///
/// `angle` is kept in `[0, 2π)`. `position` is the unwrapped axis position in
/// degrees, which is what absolute ring moves are expressed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ring {
    radius: f64,
    base_center: Point,
    center: Point,
    angle: Angle,
    position: f64,
    rotation_multiplier: f64,
}

impl Ring {
    /// Ring at `angle` around `center`
    pub fn new(center: Point, radius: f64, angle: Angle) -> Self {
        Self {
            radius,
            base_center: center,
            center,
            angle: angle.normalized(),
            position: angle.degrees(),
            rotation_multiplier: 1.0,
        }
    }

    /// Ring at its home angle
    pub fn from_settings(settings: &RingSettings) -> Self {
        Self {
            rotation_multiplier: settings.rotation_multiplier,
            ..Self::new(settings.center_point(), settings.radius, settings.home())
        }
    }

    /// Radius in mm
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Current center in bed coordinates
    pub fn center(&self) -> &Point {
        &self.center
    }

    /// Current angle, in `[0, 2π)`
    pub fn angle(&self) -> Angle {
        self.angle
    }

    /// Unwrapped axis position in degrees
    pub fn position(&self) -> f64 {
        self.position
    }

    /// +1 or -1 depending on motor mounting
    pub fn rotation_multiplier(&self) -> f64 {
        self.rotation_multiplier
    }

    /// Where the thread leaves the ring
    pub fn point(&self) -> Point {
        self.angle_to_point(self.angle)
    }

    /// Point on the ring at `angle`
    pub fn angle_to_point(&self, angle: Angle) -> Point {
        angle_to_point(&self.center, self.radius, angle)
    }

    /// Angle of `point` seen from the center, in `[0, 2π)`
    pub fn point_to_angle(&self, point: &Point) -> Angle {
        point.angle_from(&self.center)
    }

    /// Points where `line` crosses the ring, nearest to its origin first
    pub fn intersection<L: LineLike>(&self, line: &L) -> Vec<Point> {
        circle_intersection(&self.center, self.radius, line)
    }

    /// Smallest rotation that puts the ring on `path`.
    ///
    /// Rotations smaller than `min_move` are reported as zero. `None` if the
    /// path never reaches the ring.
    pub fn delta_for_path(&self, path: &HalfLine, min_move: Angle) -> Option<Angle> {
        let delta = self
            .intersection(path)
            .iter()
            .map(|p| self.angle.diff(self.point_to_angle(p)))
            .min_by(|a, b| a.abs().radians().total_cmp(&b.abs().radians()))?;
        if delta.abs().radians() < min_move.radians() {
            Some(Angle::ZERO)
        } else {
            Some(delta)
        }
    }

    /// Rotate by `delta`
    pub fn rotate_by(&mut self, delta: Angle) {
        self.angle = (self.angle + delta).normalized();
        self.position += delta.degrees();
    }

    /// Copy rotated by `delta`
    pub fn rotated(&self, delta: Angle) -> Ring {
        let mut ring = self.clone();
        ring.rotate_by(delta);
        ring
    }

    /// Track a bed that has moved to `y`: the ring center in bed coordinates
    /// shifts the other way.
    pub fn set_bed_y(&mut self, y: f64) {
        self.center = Point::new(self.base_center.x, self.base_center.y - y, self.base_center.z);
    }
}
