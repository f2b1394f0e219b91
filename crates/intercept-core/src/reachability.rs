//! Empirical drone travel-time lookup.
//!
//! Maps a one-axis travel distance (cm) to the measured time (s) a drone
//! needs to cover it, plus a configurable safety offset.

use serde::{Deserialize, Serialize};

/// Measured (distance_cm, seconds) breakpoints. Interpolated linearly and
/// clamped to the last value past the final breakpoint.
pub const REACHABILITY_TABLE: [(f64, f64); 6] = [
    (0.0, 0.85),
    (2.0, 2.0),
    (30.0, 2.76),
    (50.0, 2.76),
    (70.0, 2.93),
    (90.0, 4.15),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reachability {
    /// Added to every looked-up time, in seconds.
    pub offset_s: f64,
}

impl Default for Reachability {
    fn default() -> Self {
        Self { offset_s: 0.0 }
    }
}

impl Reachability {
    pub fn new(offset_s: f64) -> Self {
        Self { offset_s }
    }

    /// Time in seconds to travel `distance_cm` along one axis.
    pub fn time_for(&self, distance_cm: f64) -> f64 {
        lookup(distance_cm.abs()) + self.offset_s
    }
}

fn lookup(distance: f64) -> f64 {
    if !distance.is_finite() {
        return REACHABILITY_TABLE[REACHABILITY_TABLE.len() - 1].1;
    }

    for pair in REACHABILITY_TABLE.windows(2) {
        let (d0, t0) = pair[0];
        let (d1, t1) = pair[1];
        if distance < d1 {
            let ratio = ((distance - d0) / (d1 - d0)).clamp(0.0, 1.0);
            return t0 + (t1 - t0) * ratio;
        }
    }

    REACHABILITY_TABLE[REACHABILITY_TABLE.len() - 1].1
}
