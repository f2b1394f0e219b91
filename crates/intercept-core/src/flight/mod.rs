//! Per-drone flight state machine.
//!
//! Each drone owns exactly one [`Phase`]. Every tick the machine first asks
//! the current phase for a transition; on a transition it runs the old
//! phase's cleanup and the new phase's setup. The resulting phase then runs
//! and plans this tick's maneuver. Transitions replace the phase wholesale;
//! nothing about a phase's identity is mutated in place.

mod drone;
mod machine;

pub use drone::{Controls, Decision, Drone, DroneView, Maneuver, RoleChange, TickContext};
pub use machine::step;

use crate::models::{Point2, Point3};
use crate::predictor::HittingPoint;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// The nine named flight states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightState {
    OnGround,
    Hovering,
    Waiting,
    StandingBy,
    SearchingPrediction,
    Searching,
    Hitting,
    Descending,
    PrepareAndAvoid,
}

impl FlightState {
    pub fn name(self) -> &'static str {
        match self {
            FlightState::OnGround => "ON_GROUND",
            FlightState::Hovering => "HOVERING",
            FlightState::Waiting => "WAITING",
            FlightState::StandingBy => "STANDING_BY",
            FlightState::SearchingPrediction => "SEARCHING_PREDICTION",
            FlightState::Searching => "SEARCHING",
            FlightState::Hitting => "HITTING",
            FlightState::Descending => "DESCENDING",
            FlightState::PrepareAndAvoid => "PREPARE_AND_AVOID",
        }
    }

    /// States that chase the balloon and must abort when it is lost.
    pub fn is_searching(self) -> bool {
        matches!(self, FlightState::SearchingPrediction | FlightState::Searching)
    }
}

impl fmt::Display for FlightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A flight state together with the data captured on entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    OnGround,
    Hovering,
    Waiting,
    StandingBy,
    SearchingPrediction {
        /// Entry time and position; the approach lead is measured from here
        started_at: f64,
        start_position: Point3,
        /// Most recent hitting-point positions, newest last
        history: VecDeque<Point2>,
        last_hit: Option<HittingPoint>,
    },
    Searching,
    Hitting {
        started_at: f64,
    },
    Descending,
    PrepareAndAvoid,
}

impl Phase {
    pub fn kind(&self) -> FlightState {
        match self {
            Phase::OnGround => FlightState::OnGround,
            Phase::Hovering => FlightState::Hovering,
            Phase::Waiting => FlightState::Waiting,
            Phase::StandingBy => FlightState::StandingBy,
            Phase::SearchingPrediction { .. } => FlightState::SearchingPrediction,
            Phase::Searching => FlightState::Searching,
            Phase::Hitting { .. } => FlightState::Hitting,
            Phase::Descending => FlightState::Descending,
            Phase::PrepareAndAvoid => FlightState::PrepareAndAvoid,
        }
    }
}
