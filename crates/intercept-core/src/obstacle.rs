//! No-fly rectangle around a drone's planned flight segment.
//!
//! The active drone's segment from its position to its destination is padded
//! into a rectangle (wider behind the start than past the end). The passive
//! drone uses it to test positions and paths, and to plan the shortest way
//! around it through the rectangle's corners.

use crate::models::Point2;
use crate::routing::{shortest_path, Adjacency};
use crate::spatial::{
    clip_segment_convex, closest_point_on_segment, strictly_inside_convex, EPS_CM,
};
use serde::{Deserialize, Serialize};

/// Polygon traversal order over the canonical corner indices.
pub const CORNERS: [usize; 4] = [0, 1, 3, 2];

/// Corner pairs spanning the rectangle; never edges of the visibility graph.
const SPANNING_PAIRS: [(usize, usize); 2] = [(0, 3), (1, 2)];

const SOURCE: usize = 0;
const TARGET: usize = 5;

/// Padding around the flight segment, in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleMargins {
    /// Extension behind the segment start
    pub start_cm: f64,
    /// Extension past the segment end
    pub end_cm: f64,
    /// Half-width on each side of the segment
    pub side_cm: f64,
    /// Distance kept outside an edge when escaping the rectangle
    pub exit_cm: f64,
    /// Distance of the preparation point beyond the end edge
    pub preparation_cm: f64,
}

impl Default for ObstacleMargins {
    fn default() -> Self {
        Self {
            start_cm: 40.0,
            end_cm: 25.0,
            side_cm: 30.0,
            exit_cm: 15.0,
            preparation_cm: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    corners: [Point2; 4],
    preparation: Point2,
    margins: ObstacleMargins,
}

impl Obstacle {
    /// Pad the segment `start -> end`. A zero-length segment is padded along +x.
    pub fn new(start: Point2, end: Point2, margins: ObstacleMargins) -> Self {
        let axis = (end - start).normalized().unwrap_or(Point2::new(1.0, 0.0));
        let side = axis.perp() * margins.side_cm;

        let start_mid = start - axis * margins.start_cm;
        let end_mid = end + axis * margins.end_cm;
        let raw = [
            start_mid + side,
            start_mid - side,
            end_mid + side,
            end_mid - side,
        ];

        Self {
            corners: canonicalize(raw),
            preparation: end + axis * (margins.end_cm + margins.preparation_cm),
            margins,
        }
    }

    /// Corners in canonical order; traverse with [`CORNERS`].
    pub fn corners(&self) -> [Point2; 4] {
        self.corners
    }

    pub fn polygon(&self) -> [Point2; 4] {
        CORNERS.map(|i| self.corners[i])
    }

    /// Parking spot just outside the destination-side edge.
    pub fn preparation_destination(&self) -> Point2 {
        self.preparation
    }

    /// Strict interior test; edges and corners are outside.
    pub fn point_in_region(&self, point: Point2) -> bool {
        strictly_inside_convex(&self.polygon(), point)
    }

    /// True if the segment passes through the interior. Touching a corner or
    /// sliding along an edge does not count.
    pub fn segment_crosses(&self, p1: Point2, p2: Point2) -> bool {
        if self.point_in_region(p1) || self.point_in_region(p2) {
            return true;
        }
        let polygon = self.polygon();
        let Some((t_enter, t_exit)) = clip_segment_convex(&polygon, p1, p2) else {
            return false;
        };
        let dir = p2 - p1;
        if (t_exit - t_enter) * dir.norm() <= EPS_CM {
            return false;
        }
        let mid = p1 + dir * ((t_enter + t_exit) / 2.0);
        strictly_inside_convex(&polygon, mid)
    }

    /// Closest point outside the rectangle, `exit_cm` beyond the nearest edge.
    pub fn nearest_exit(&self, point: Point2) -> Point2 {
        let polygon = self.polygon();
        let center = polygon.iter().fold(Point2::default(), |acc, c| acc + *c) * 0.25;

        let nearest = polygon
            .iter()
            .zip(polygon.iter().cycle().skip(1))
            .map(|(a, b)| {
                let foot = closest_point_on_segment(point, *a, *b);
                (foot, point.distance(foot), *a, *b)
            })
            .min_by(|x, y| x.1.total_cmp(&y.1));

        let Some((foot, _, a, b)) = nearest else {
            return point;
        };

        let mut outward = (b - a).perp().normalized().unwrap_or(Point2::new(1.0, 0.0));
        if outward.dot(center - a) > 0.0 {
            outward = outward * -1.0;
        }
        foot + outward * self.margins.exit_cm
    }

    /// Next waypoint from `source` towards `target` that stays out of the rectangle.
    ///
    /// The waypoint lies in the direction of the first hop of the shortest
    /// corner-visibility path, at the straight-line distance to `target`.
    /// Returns `source` unchanged when no path exists.
    pub fn bypass(&self, source: Point2, target: Point2) -> Point2 {
        if self.point_in_region(source) {
            return self.nearest_exit(source);
        }
        if self.point_in_region(target) {
            let relocated = self.nearest_exit(target);
            return self.bypass(source, relocated);
        }

        let straight = source.distance(target);
        if straight <= EPS_CM {
            return source;
        }

        let nodes = self.graph_nodes(source, target);
        let weights = self.visibility_graph(&nodes);
        let Some(path) = shortest_path(&weights, SOURCE, TARGET) else {
            tracing::warn!(%source, %target, "no bypass path around obstacle");
            return source;
        };

        let Some(heading) = path
            .iter()
            .skip(1)
            .find_map(|&i| (nodes[i] - source).normalized())
        else {
            return source;
        };
        source + heading * straight
    }

    fn graph_nodes(&self, source: Point2, target: Point2) -> [Point2; 6] {
        let [c0, c1, c2, c3] = self.corners;
        [source, c0, c1, c2, c3, target]
    }

    fn visibility_graph(&self, nodes: &[Point2; 6]) -> Adjacency<6> {
        let mut weights: Adjacency<6> = [[None; 6]; 6];
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                if is_spanning_pair(i, j) || self.segment_crosses(nodes[i], nodes[j]) {
                    continue;
                }
                let d = nodes[i].distance(nodes[j]);
                weights[i][j] = Some(d);
                weights[j][i] = Some(d);
            }
        }
        weights
    }
}

/// Node indices `1..=4` are corners `0..=3`.
fn is_spanning_pair(i: usize, j: usize) -> bool {
    let corner = |n: usize| (1..=4).contains(&n).then(|| n - 1);
    match (corner(i), corner(j)) {
        (Some(a), Some(b)) => SPANNING_PAIRS
            .iter()
            .any(|&(p, q)| (a, b) == (p, q) || (a, b) == (q, p)),
        _ => false,
    }
}

/// Order rectangle corners: the rightmost pair first (lower y, then upper),
/// then the left corner adjacent to corner 1, then the remaining one.
fn canonicalize(raw: [Point2; 4]) -> [Point2; 4] {
    let mut by_x = raw;
    by_x.sort_by(|a, b| b.x.total_cmp(&a.x).then(a.y.total_cmp(&b.y)));

    let (mut right, left) = ([by_x[0], by_x[1]], [by_x[2], by_x[3]]);
    right.sort_by(|a, b| a.y.total_cmp(&b.y).then(b.x.total_cmp(&a.x)));
    let [c0, c1] = right;

    let (c3, c2) = if left[0].distance(c1) <= left[1].distance(c1) {
        (left[0], left[1])
    } else {
        (left[1], left[0])
    };
    [c0, c1, c2, c3]
}
