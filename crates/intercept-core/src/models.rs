//! Core value types shared across the interception engine.
//!
//! All coordinates are in the physical world frame, in centimeters.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// A point (or vector) in the horizontal plane, in centimeters.
///
/// Serialized as `{x, y}`; arithmetic goes through [`nalgebra::Vector2`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl From<Vector2<f64>> for Point2 {
    fn from(v: Vector2<f64>) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Point2> for Vector2<f64> {
    fn from(p: Point2) -> Self {
        Vector2::new(p.x, p.y)
    }
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn vector(self) -> Vector2<f64> {
        self.into()
    }

    pub fn norm(self) -> f64 {
        self.vector().norm()
    }

    pub fn distance(self, other: Point2) -> f64 {
        (self.vector() - other.vector()).norm()
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector.
    pub fn normalized(self) -> Option<Point2> {
        self.vector().try_normalize(f64::EPSILON).map(Point2::from)
    }

    /// Counter-clockwise perpendicular.
    pub fn perp(self) -> Point2 {
        Point2::new(-self.y, self.x)
    }

    pub fn dot(self, other: Point2) -> f64 {
        self.vector().dot(&other.vector())
    }

    /// z-component of the 2D cross product.
    pub fn cross(self, other: Point2) -> f64 {
        self.vector().perp(&other.vector())
    }

    pub fn midpoint(self, other: Point2) -> Point2 {
        ((self.vector() + other.vector()) * 0.5).into()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn with_z(self, z: f64) -> Point3 {
        Point3::new(self.x, self.y, z)
    }
}

impl Add for Point2 {
    type Output = Point2;

    fn add(self, rhs: Point2) -> Point2 {
        (self.vector() + rhs.vector()).into()
    }
}

impl Sub for Point2 {
    type Output = Point2;

    fn sub(self, rhs: Point2) -> Point2 {
        (self.vector() - rhs.vector()).into()
    }
}

impl Mul<f64> for Point2 {
    type Output = Point2;

    fn mul(self, rhs: f64) -> Point2 {
        (self.vector() * rhs).into()
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// A point (or vector) in space, in centimeters (or cm/s for velocities).
///
/// `(0, 0, 0)` is reserved by the sensing layer to mean "not detected".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Vector3<f64>> for Point3 {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Point3> for Vector3<f64> {
    fn from(p: Point3) -> Self {
        Vector3::new(p.x, p.y, p.z)
    }
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn vector(self) -> Vector3<f64> {
        self.into()
    }

    pub fn xy(self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    /// True for the "not detected" sentinel.
    pub fn is_sentinel(self) -> bool {
        self == Self::ORIGIN
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn norm(self) -> f64 {
        self.vector().norm()
    }

    pub fn distance(self, other: Point3) -> f64 {
        (self.vector() - other.vector()).norm()
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        (self.vector() + rhs.vector()).into()
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        (self.vector() - rhs.vector()).into()
    }
}

impl Mul<f64> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f64) -> Point3 {
        (self.vector() * rhs).into()
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Identity of one of the two drones. Lower ids win role ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DroneId(pub u8);

impl fmt::Display for DroneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "drone{}", self.0)
    }
}
