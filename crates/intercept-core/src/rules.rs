//! Flight rules and thresholds for the interception state machine.

use crate::obstacle::ObstacleMargins;
use crate::predictor::BalloonModel;
use crate::reachability::Reachability;
use serde::{Deserialize, Serialize};

/// How many drones take part and how roles are assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionMode {
    /// One drone, always active
    Solo,
    /// Two drones alternating the active role after every hit
    #[default]
    Pair,
}

impl MissionMode {
    pub fn drone_count(self) -> usize {
        match self {
            MissionMode::Solo => 1,
            MissionMode::Pair => 2,
        }
    }
}

/// Configuration for the flight state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightRules {
    pub mode: MissionMode,
    /// A person throws the balloon; searching waits until it leaves the hand
    pub human_thrower: bool,
    /// Height a thrown balloon must reach before it counts as released (cm)
    pub release_height_cm: f64,

    /// Cruising height of idle drones (cm)
    pub default_height_cm: f64,
    /// No destination is ever planned below this (cm)
    pub min_safe_height_cm: f64,
    /// How much lower the passive drone parks than the default height (cm)
    pub passive_height_drop_cm: f64,

    /// Prediction horizon for the optimal hitting point (s)
    pub search_start_s: f64,
    pub search_end_s: f64,
    pub search_step_s: f64,
    /// Maximum predicted horizontal speed of a hittable balloon (cm/s)
    pub hit_xy_speed_bound: f64,
    /// Minimum predicted height of a hittable balloon (cm)
    pub hit_z_bound_cm: f64,
    /// The drone aims this far below the predicted balloon (cm)
    pub hit_below_ball_cm: f64,
    /// Number of recent hitting points averaged into the destination
    pub prediction_history: usize,

    /// Balloon horizontal speed under which tracking may start (cm/s)
    pub track_xy_speed_bound: f64,
    /// Horizontal offset tolerated before committing to a hit (cm)
    pub track_xy_tolerance_cm: f64,
    /// Relative horizontal velocity tolerated before committing to a hit (cm/s)
    pub track_velocity_tolerance: f64,
    /// Vertical gap that ends a hit (cm)
    pub hit_gap_cm: f64,

    /// Height lost per tick while descending (cm)
    pub descent_step_cm: f64,
    /// Height match tolerance when descending ends (cm)
    pub height_tolerance_cm: f64,

    pub reachability: Reachability,
    pub balloon: BalloonModel,
    pub obstacle: ObstacleMargins,
}

impl Default for FlightRules {
    fn default() -> Self {
        Self {
            mode: MissionMode::Pair,
            human_thrower: false,
            release_height_cm: 150.0,
            default_height_cm: 100.0,
            min_safe_height_cm: 40.0,
            passive_height_drop_cm: 30.0,
            search_start_s: 0.1,
            search_end_s: 3.0,
            search_step_s: 0.1,
            hit_xy_speed_bound: 30.0,
            hit_z_bound_cm: 60.0,
            hit_below_ball_cm: 15.0,
            prediction_history: 4,
            track_xy_speed_bound: 40.0,
            track_xy_tolerance_cm: 15.0,
            track_velocity_tolerance: 40.0,
            hit_gap_cm: 10.0,
            descent_step_cm: 5.0,
            height_tolerance_cm: 10.0,
            reachability: Reachability::default(),
            balloon: BalloonModel::default(),
            obstacle: ObstacleMargins::default(),
        }
    }
}

impl FlightRules {
    /// Height at which the passive drone waits beside the active drone's path.
    pub fn passive_height_cm(&self) -> f64 {
        (self.default_height_cm - self.passive_height_drop_cm).max(self.min_safe_height_cm)
    }

    /// Raise `z` to the safe floor. Non-finite heights pass through unchanged
    /// so the planner can reject them.
    pub fn clamp_height(&self, z: f64) -> f64 {
        if !z.is_finite() {
            return z;
        }
        z.max(self.min_safe_height_cm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_raises_to_safe_floor() {
        let rules = FlightRules::default();
        assert_eq!(rules.clamp_height(10.0), rules.min_safe_height_cm);
        assert_eq!(rules.clamp_height(120.0), 120.0);
    }

    #[test]
    fn clamp_keeps_non_finite_heights() {
        let rules = FlightRules::default();
        assert!(rules.clamp_height(f64::NAN).is_nan());
        assert_eq!(rules.clamp_height(f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(rules.clamp_height(f64::INFINITY), f64::INFINITY);
    }
}
