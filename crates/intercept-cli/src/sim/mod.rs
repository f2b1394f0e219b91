//! Closed-loop simulation of the balloon and the drones.

pub mod motion;
pub mod runner;
pub mod scenarios;
pub mod world;

pub use motion::{DroneCommand, Link, SharedLink, SimMotionController};
pub use runner::{run, RunOptions, RunSummary};
pub use scenarios::{Scenario, Throw, SCENARIOS};
pub use world::{Body, SimDrone, World, WorldParams};
