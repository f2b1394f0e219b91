//! Error types for the interception engine.
//!
//! Expected outcomes (nothing detected, no interception window, no bypass
//! path) are plain values; these types cover the genuinely exceptional cases.

use crate::models::DroneId;
use thiserror::Error;

/// Rejected border calibration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BordersError {
    #[error("border corner {index} is not finite")]
    NonFinite { index: usize },
    #[error("border side through {a} and {b} is horizontal")]
    HorizontalSide { a: String, b: String },
    #[error("border area is empty (lower {lower:.1} >= upper {upper:.1})")]
    Empty { lower: f64, upper: f64 },
    #[error("left border lies right of the right border")]
    Crossed,
}

/// Failure reported by a motion controller (hardware or link).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    #[error("{drone} is not ready to accept commands")]
    NotReady { drone: DroneId },
    #[error("{drone} command `{command}` failed: {reason}")]
    CommandFailed {
        drone: DroneId,
        command: &'static str,
        reason: String,
    },
}

/// A planning step produced something that must not reach the motors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlightError {
    #[error("{drone} planned a non-finite destination in state {state}")]
    NonFiniteDestination { drone: DroneId, state: &'static str },
    #[error("{drone} has no sibling drone in pair mode")]
    MissingSibling { drone: DroneId },
}

/// A session could not be assembled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("{mode} mode needs {expected} motion controllers, got {got}")]
    ControllerCount {
        mode: &'static str,
        expected: usize,
        got: usize,
    },
}
