//! Planar geometry used by the obstacle model and the border test.
//!
//! Everything here works on the horizontal plane in centimeters.

use crate::models::Point2;

/// Tolerance in centimeters for orientation and containment tests.
pub const EPS_CM: f64 = 1e-6;

/// Orientation of `r` relative to the directed line `p -> q`.
///
/// Positive when `r` lies to the left, negative to the right, zero when colinear.
pub fn orient(p: Point2, q: Point2, r: Point2) -> f64 {
    (q - p).cross(r - p)
}

/// Closest point to `point` on the segment `start-end`.
pub fn closest_point_on_segment(point: Point2, start: Point2, end: Point2) -> Point2 {
    let seg = end - start;
    let seg_len_sq = seg.dot(seg);

    if seg_len_sq < EPS_CM {
        // Segment is essentially a point
        return start;
    }

    // Project point onto segment line: t = ((P-A) · (B-A)) / |B-A|²
    let t = ((point - start).dot(seg) / seg_len_sq).clamp(0.0, 1.0);
    start + seg * t
}

/// Largest single-axis displacement between two points.
///
/// The drones move each horizontal axis independently, so travel time is
/// bounded by the longer axis rather than the Euclidean distance.
pub fn max_axis_distance(a: Point2, b: Point2) -> f64 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

/// Signed doubled area of a polygon given in traversal order.
/// Positive for counter-clockwise traversal.
pub fn signed_area2(polygon: &[Point2]) -> f64 {
    polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| a.cross(*b))
        .sum()
}

/// Strict interior test for a convex polygon in traversal order.
///
/// Points on an edge or at a vertex are outside.
pub fn strictly_inside_convex(polygon: &[Point2], point: Point2) -> bool {
    let sign = signed_area2(polygon).signum();
    if sign == 0.0 {
        return false;
    }
    polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .all(|(a, b)| sign * orient(*a, *b, point) > EPS_CM)
}

/// Clip the segment `p1-p2` against a closed convex polygon (Cyrus-Beck).
///
/// Returns the parameter range `(t_enter, t_exit)` within `[0, 1]` of the part
/// of the segment lying inside or on the polygon, or `None` if it misses.
pub fn clip_segment_convex(polygon: &[Point2], p1: Point2, p2: Point2) -> Option<(f64, f64)> {
    let sign = signed_area2(polygon).signum();
    if sign == 0.0 {
        return None;
    }

    let dir = p2 - p1;
    let mut t_enter = 0.0_f64;
    let mut t_exit = 1.0_f64;

    for (a, b) in polygon.iter().zip(polygon.iter().cycle().skip(1)) {
        let edge = *b - *a;
        // Inside half-plane: f(t) = f0 + t * denom >= 0
        let f0 = sign * edge.cross(p1 - *a);
        let denom = sign * edge.cross(dir);

        if denom.abs() <= f64::EPSILON {
            if f0 < -EPS_CM {
                return None;
            }
            continue;
        }

        let t = -f0 / denom;
        if denom > 0.0 {
            t_enter = t_enter.max(t);
        } else {
            t_exit = t_exit.min(t);
        }
        if t_enter > t_exit {
            return None;
        }
    }

    Some((t_enter, t_exit))
}
