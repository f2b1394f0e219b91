use super::{FlightState, Phase};
use crate::borders::Borders;
use crate::models::{DroneId, Point2, Point3};
use crate::obstacle::Obstacle;
use crate::rules::FlightRules;
use crate::tracking::TrackedObject;
use serde::{Deserialize, Serialize};

/// Operator inputs for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub takeoff: bool,
    pub start: bool,
    pub begin: bool,
}

/// What the motion controller should do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Maneuver {
    /// Send nothing
    Idle,
    /// Zero all controls
    Hold,
    GoTo(Point3),
    /// Close on the target as fast as possible
    Hit(Point3),
}

impl Maneuver {
    pub fn target(&self) -> Option<Point3> {
        match self {
            Maneuver::GoTo(p) | Maneuver::Hit(p) => Some(*p),
            Maneuver::Idle | Maneuver::Hold => None,
        }
    }
}

/// Role update requested by a phase's setup or cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleChange {
    #[default]
    Keep,
    /// This drone gives the active role to its sibling
    HandOver,
    /// The lowest drone id becomes active, the other passive
    ByIdentity,
}

/// One drone: its flight phase, role and sensed kinematics.
#[derive(Debug, Clone)]
pub struct Drone {
    pub id: DroneId,
    pub phase: Phase,
    pub active: bool,
    pub tracked: TrackedObject,
    /// Last planned destination
    pub destination: Point3,
    pub home: Point2,
}

impl Drone {
    pub fn new(id: DroneId, active: bool, home: Point2) -> Self {
        Self {
            id,
            phase: Phase::OnGround,
            active,
            tracked: TrackedObject::default(),
            destination: Point3::ORIGIN,
            home,
        }
    }

    pub fn state(&self) -> FlightState {
        self.phase.kind()
    }

    pub fn position(&self) -> Point3 {
        self.tracked.position
    }

    /// Read-only snapshot offered to the sibling for this tick.
    pub fn view(&self, rules: &FlightRules) -> DroneView {
        let position = self.position();
        let heading_to = if self.destination.is_sentinel() {
            position
        } else {
            self.destination
        };
        DroneView {
            id: self.id,
            state: self.state(),
            active: self.active,
            position,
            destination: self.destination,
            obstacle: Obstacle::new(position.xy(), heading_to.xy(), rules.obstacle),
        }
    }
}

/// Pre-tick snapshot of a drone as seen by its sibling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneView {
    pub id: DroneId,
    pub state: FlightState,
    pub active: bool,
    pub position: Point3,
    pub destination: Point3,
    /// Padded rectangle around this drone's planned segment
    pub obstacle: Obstacle,
}

/// Everything a drone may read during its tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub now_s: f64,
    pub balloon: &'a TrackedObject,
    pub borders: Option<&'a Borders>,
    pub controls: Controls,
    pub rules: &'a FlightRules,
    pub sibling: Option<&'a DroneView>,
}

impl TickContext<'_> {
    pub fn balloon_in_borders(&self) -> bool {
        self.borders.is_some_and(|b| b.in_borders(self.balloon))
    }

    pub fn point_in_borders(&self, point: Point3) -> bool {
        self.borders.is_some_and(|b| b.contains(point.xy()))
    }

    /// The sibling while it holds the active role.
    pub fn active_sibling(&self) -> Option<&DroneView> {
        self.sibling.filter(|s| s.active)
    }
}

/// Outcome of one drone's tick, applied after every drone has decided.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub phase: Phase,
    pub maneuver: Maneuver,
    pub destination: Point3,
    pub roles: RoleChange,
    pub takeoff: bool,
}
