//! Motion controller for simulated airframes.

use intercept_core::{DroneId, MotionController, MotionError, Point3, TrackedObject};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Last command sent to a simulated airframe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum DroneCommand {
    #[default]
    Idle,
    Hold,
    GoTo(Point3),
    Hit(Point3),
    Land,
}

/// State shared between a controller and the airframe it drives.
#[derive(Debug, Default)]
pub struct Link {
    pub command: DroneCommand,
    pub airborne: bool,
    /// Height to climb to after takeoff, cleared on arrival
    pub climb_to: Option<f64>,
    /// Reject every command, as a dropped radio link would
    pub offline: bool,
    pub commands_sent: u64,
}

pub type SharedLink = Arc<Mutex<Link>>;

pub(crate) fn lock(link: &SharedLink) -> MutexGuard<'_, Link> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct SimMotionController {
    id: DroneId,
    link: SharedLink,
    takeoff_height_cm: f64,
}

impl SimMotionController {
    pub fn new(id: DroneId, link: SharedLink, takeoff_height_cm: f64) -> Self {
        Self {
            id,
            link,
            takeoff_height_cm,
        }
    }

    fn send(&self, name: &'static str, command: DroneCommand) -> Result<(), MotionError> {
        let mut link = lock(&self.link);
        if link.offline {
            return Err(MotionError::CommandFailed {
                drone: self.id,
                command: name,
                reason: "link offline".to_string(),
            });
        }
        link.command = command;
        link.commands_sent += 1;
        Ok(())
    }
}

impl MotionController for SimMotionController {
    fn is_ready(&self) -> bool {
        lock(&self.link).airborne
    }

    fn takeoff(&mut self) -> Result<(), MotionError> {
        self.send("takeoff", DroneCommand::Hold)?;
        let mut link = lock(&self.link);
        link.airborne = true;
        link.climb_to = Some(self.takeoff_height_cm);
        tracing::info!(drone = %self.id, "takeoff");
        Ok(())
    }

    fn land(&mut self) -> Result<(), MotionError> {
        self.send("land", DroneCommand::Land)?;
        lock(&self.link).climb_to = None;
        tracing::info!(drone = %self.id, "landing");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MotionError> {
        self.send("stop", DroneCommand::Hold)
    }

    fn go_to(&mut self, destination: Point3, _state: &TrackedObject) -> Result<(), MotionError> {
        self.send("go_to", DroneCommand::GoTo(destination))
    }

    fn hit(&mut self, target: Point3, _state: &TrackedObject) -> Result<(), MotionError> {
        self.send("hit", DroneCommand::Hit(target))
    }
}
