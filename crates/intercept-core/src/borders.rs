//! Calibrated play-area boundary.
//!
//! The area is a quadrangle given by four user-picked corners. The left and
//! right sides are stored as `x = m * y + b` so that near-vertical sides never
//! divide by zero; the top and bottom are plain y bounds.

use crate::error::BordersError;
use crate::models::Point2;
use crate::tracking::TrackedObject;
use serde::{Deserialize, Serialize};

/// A side line expressed as `x = m * y + b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderLine {
    pub m: f64,
    pub b: f64,
}

impl BorderLine {
    fn through(p: Point2, q: Point2) -> Result<Self, BordersError> {
        let dy = q.y - p.y;
        if dy.abs() <= f64::EPSILON {
            return Err(BordersError::HorizontalSide {
                a: p.to_string(),
                b: q.to_string(),
            });
        }
        let m = (q.x - p.x) / dy;
        Ok(Self { m, b: p.x - m * p.y })
    }

    pub fn x_at(&self, y: f64) -> f64 {
        self.m * y + self.b
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borders {
    /// lower-left, lower-right, upper-right, upper-left
    corners: [Point2; 4],
    left: BorderLine,
    right: BorderLine,
    y_lower: f64,
    y_upper: f64,
    middle: Point2,
}

impl Borders {
    /// Calibrate from four corners given in any order.
    pub fn from_corners(corners: [Point2; 4]) -> Result<Self, BordersError> {
        if let Some(index) = corners.iter().position(|c| !c.is_finite()) {
            return Err(BordersError::NonFinite { index });
        }

        let mut by_y = corners;
        by_y.sort_by(|a, b| a.y.total_cmp(&b.y));
        let (mut lower, mut upper) = ([by_y[0], by_y[1]], [by_y[2], by_y[3]]);
        lower.sort_by(|a, b| a.x.total_cmp(&b.x));
        upper.sort_by(|a, b| a.x.total_cmp(&b.x));
        let [lower_left, lower_right] = lower;
        let [upper_left, upper_right] = upper;

        let left = BorderLine::through(lower_left, upper_left)?;
        let right = BorderLine::through(lower_right, upper_right)?;

        let y_lower = lower_left.y.max(lower_right.y);
        let y_upper = upper_left.y.min(upper_right.y);
        if y_lower >= y_upper {
            return Err(BordersError::Empty {
                lower: y_lower,
                upper: y_upper,
            });
        }

        let y_mid = (y_lower + y_upper) / 2.0;
        if left.x_at(y_mid) >= right.x_at(y_mid) {
            return Err(BordersError::Crossed);
        }

        let ordered = [lower_left, lower_right, upper_right, upper_left];
        let middle = ordered
            .iter()
            .fold(Point2::default(), |acc, c| acc + *c)
            * 0.25;

        Ok(Self {
            corners: ordered,
            left,
            right,
            y_lower,
            y_upper,
            middle,
        })
    }

    /// Axis-aligned area spanning `[min, max]`.
    pub fn rectangle(min: Point2, max: Point2) -> Result<Self, BordersError> {
        Self::from_corners([
            min,
            Point2::new(max.x, min.y),
            max,
            Point2::new(min.x, max.y),
        ])
    }

    pub fn corners(&self) -> [Point2; 4] {
        self.corners
    }

    pub fn middle(&self) -> Point2 {
        self.middle
    }

    /// Strictly inside the calibrated area.
    pub fn contains(&self, point: Point2) -> bool {
        point.y > self.y_lower
            && point.y < self.y_upper
            && point.x > self.left.x_at(point.y)
            && point.x < self.right.x_at(point.y)
    }

    /// A detected object inside the area. Missing objects are never inside.
    pub fn in_borders(&self, object: &TrackedObject) -> bool {
        object.exists && self.contains(object.position.xy())
    }

    /// Home points for two drones: centers of the left and right halves.
    pub fn home_points(&self) -> [Point2; 2] {
        let y = self.middle.y;
        let left = Point2::new(self.left.x_at(y), y);
        let right = Point2::new(self.right.x_at(y), y);
        [left.midpoint(self.middle), right.midpoint(self.middle)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point3;

    fn trapezoid() -> Borders {
        Borders::from_corners([
            Point2::new(300.0, 250.0),
            Point2::new(-300.0, -200.0),
            Point2::new(-250.0, 250.0),
            Point2::new(250.0, -200.0),
        ])
        .expect("valid corners")
    }

    #[test]
    fn corners_are_canonicalized() {
        let b = trapezoid();
        let [ll, lr, ur, ul] = b.corners();
        assert_eq!(ll, Point2::new(-300.0, -200.0));
        assert_eq!(lr, Point2::new(250.0, -200.0));
        assert_eq!(ur, Point2::new(300.0, 250.0));
        assert_eq!(ul, Point2::new(-250.0, 250.0));
    }

    #[test]
    fn contains_follows_slanted_sides() {
        let b = trapezoid();
        assert!(b.contains(Point2::new(0.0, 0.0)));
        assert!(b.contains(Point2::new(290.0, 240.0)));
        assert!(!b.contains(Point2::new(-290.0, 240.0)));
        assert!(!b.contains(Point2::new(0.0, 250.0)));
    }

    #[test]
    fn vertical_sides_are_supported() {
        let b = Borders::rectangle(Point2::new(0.0, 0.0), Point2::new(400.0, 300.0)).unwrap();
        assert!(b.contains(Point2::new(200.0, 150.0)));
        assert!(!b.contains(Point2::new(400.0, 150.0)));
        assert_eq!(b.middle(), Point2::new(200.0, 150.0));
        let [left, right] = b.home_points();
        assert_eq!(left, Point2::new(100.0, 150.0));
        assert_eq!(right, Point2::new(300.0, 150.0));
    }

    #[test]
    fn degenerate_corners_are_rejected() {
        let flat = Borders::from_corners([
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(30.0, 0.0),
        ]);
        assert!(flat.is_err());

        let nan = Borders::rectangle(Point2::new(f64::NAN, 0.0), Point2::new(1.0, 1.0));
        assert_eq!(nan, Err(BordersError::NonFinite { index: 0 }));
    }

    #[test]
    fn missing_objects_are_outside() {
        let b = Borders::rectangle(Point2::new(0.0, 0.0), Point2::new(400.0, 300.0)).unwrap();
        let mut ball = TrackedObject::at(Point3::new(100.0, 100.0, 50.0));
        assert!(b.in_borders(&ball));
        ball.exists = false;
        assert!(!b.in_borders(&ball));
    }
}
