//! Planar angles
//!
//! [`Angle`] stores radians and derives degrees on demand. Arithmetic and
//! comparisons operate in radian space. Inverse trigonometric helpers return
//! an `Angle` instead of a raw scalar.

use std::f64::consts::{PI, TAU};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A planar angle.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Angle {
    radians: f64,
}

impl Angle {
    /// Zero angle
    pub const ZERO: Angle = Angle { radians: 0.0 };

    /// Create an angle from radians
    pub const fn from_radians(radians: f64) -> Self {
        Self { radians }
    }

    /// Create an angle from degrees
    pub fn from_degrees(degrees: f64) -> Self {
        Self {
            radians: degrees.to_radians(),
        }
    }

    /// Value in radians
    pub fn radians(self) -> f64 {
        self.radians
    }

    /// Value in degrees
    pub fn degrees(self) -> f64 {
        self.radians.to_degrees()
    }

    /// Angle of the vector (x, y)
    pub fn atan2(y: f64, x: f64) -> Self {
        Self::from_radians(y.atan2(x))
    }

    /// Arc cosine
    pub fn acos(value: f64) -> Self {
        Self::from_radians(value.acos())
    }

    /// Arc sine
    pub fn asin(value: f64) -> Self {
        Self::from_radians(value.asin())
    }

    /// Sine of the angle
    pub fn sin(self) -> f64 {
        self.radians.sin()
    }

    /// Cosine of the angle
    pub fn cos(self) -> f64 {
        self.radians.cos()
    }

    /// Absolute value
    pub fn abs(self) -> Self {
        Self::from_radians(self.radians.abs())
    }

    /// Wrap into the canonical range `[0, 2π)`.
    pub fn normalized(self) -> Self {
        let r = self.radians.rem_euclid(TAU);
        // rem_euclid can round up to TAU for tiny negative inputs
        if r >= TAU {
            Self::ZERO
        } else {
            Self::from_radians(r)
        }
    }

    /// Signed shortest rotation from `self` to `to`, in `(-π, π]`.
    pub fn diff(self, to: Angle) -> Angle {
        let d = (to.radians - self.radians + PI).rem_euclid(TAU) - PI;
        if d <= -PI {
            Angle::from_radians(d + TAU)
        } else {
            Angle::from_radians(d)
        }
    }

    /// Unit vector components `(cos, sin)`
    pub fn unit(self) -> (f64, f64) {
        (self.cos(), self.sin())
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}°", self.degrees())
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle::from_radians(self.radians + rhs.radians)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle::from_radians(self.radians - rhs.radians)
    }
}

impl Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        Angle::from_radians(-self.radians)
    }
}

impl Mul<f64> for Angle {
    type Output = Angle;

    fn mul(self, rhs: f64) -> Angle {
        Angle::from_radians(self.radians * rhs)
    }
}

impl Div<f64> for Angle {
    type Output = Angle;

    fn div(self, rhs: f64) -> Angle {
        Angle::from_radians(self.radians / rhs)
    }
}
