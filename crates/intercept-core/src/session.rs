//! Per-tick session coordinator.
//!
//! Pulls one sensor frame, snapshots every drone, lets each drone decide
//! against the same snapshot, then applies phases, roles and motion commands.
//! Only this struct writes drone state, and only between ticks.

use crate::borders::Borders;
use crate::error::{FlightError, MotionError, SessionError};
use crate::flight::{
    self, Controls, Decision, Drone, DroneView, FlightState, Maneuver, RoleChange, TickContext,
};
use crate::models::{DroneId, Point2, Point3};
use crate::rules::{FlightRules, MissionMode};
use crate::tracking::TrackedObject;
use serde::{Deserialize, Serialize};

/// Positions sensed at one instant. A `(0, 0, 0)` entry means "not detected".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    pub time_s: f64,
    pub balloon: Point3,
    /// Indexed like the session's drones
    pub drones: Vec<Point3>,
}

/// Converts destinations into flight-controller commands for one drone.
pub trait MotionController {
    /// Whether commands may be issued right now.
    fn is_ready(&self) -> bool;
    fn takeoff(&mut self) -> Result<(), MotionError>;
    fn land(&mut self) -> Result<(), MotionError>;
    /// Zero all velocity commands.
    fn stop(&mut self) -> Result<(), MotionError>;
    fn go_to(&mut self, destination: Point3, state: &TrackedObject) -> Result<(), MotionError>;
    /// Close on `target` with maximal vertical speed.
    fn hit(&mut self, target: Point3, state: &TrackedObject) -> Result<(), MotionError>;
}

/// Receives one record per tick; display and logging only.
pub trait TelemetrySink {
    fn publish(&mut self, record: &TickRecord);
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn publish(&mut self, _record: &TickRecord) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneRecord {
    pub id: DroneId,
    pub state: FlightState,
    pub active: bool,
    pub position: Point3,
    pub destination: Point3,
    pub maneuver: Maneuver,
    /// Obstacle around this drone's planned segment, polygon order
    pub obstacle: [Point2; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick: u64,
    pub time_s: f64,
    pub balloon: Point3,
    pub balloon_exists: bool,
    pub drones: Vec<DroneRecord>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub ticks: u64,
    pub hits: u64,
    pub aborts: u64,
    pub planning_errors: u64,
    pub failed_commands: u64,
}

pub struct Session<M> {
    rules: FlightRules,
    borders: Option<Borders>,
    balloon: TrackedObject,
    drones: Vec<Drone>,
    controllers: Vec<M>,
    stats: SessionStats,
}

impl<M: MotionController> Session<M> {
    /// One drone per controller, ids `1..`, the lowest id starting active.
    pub fn new(
        rules: FlightRules,
        borders: Option<Borders>,
        controllers: Vec<M>,
    ) -> Result<Self, SessionError> {
        let expected = rules.mode.drone_count();
        if controllers.len() != expected {
            return Err(SessionError::ControllerCount {
                mode: match rules.mode {
                    MissionMode::Solo => "solo",
                    MissionMode::Pair => "pair",
                },
                expected,
                got: controllers.len(),
            });
        }

        let drones = (0..expected)
            .map(|i| Drone::new(DroneId(i as u8 + 1), i == 0, Point2::default()))
            .collect();

        let mut session = Self {
            rules,
            borders: None,
            balloon: TrackedObject::default(),
            drones,
            controllers,
            stats: SessionStats::default(),
        };
        if let Some(borders) = borders {
            session.calibrate(borders);
        }
        Ok(session)
    }

    /// Install the play area and assign home points.
    pub fn calibrate(&mut self, borders: Borders) {
        let homes = match self.rules.mode {
            MissionMode::Solo => [borders.middle(); 2],
            MissionMode::Pair => borders.home_points(),
        };
        for (drone, home) in self.drones.iter_mut().zip(homes) {
            drone.home = home;
        }
        tracing::info!(middle = %borders.middle(), "borders calibrated");
        self.borders = Some(borders);
    }

    pub fn rules(&self) -> &FlightRules {
        &self.rules
    }

    pub fn borders(&self) -> Option<&Borders> {
        self.borders.as_ref()
    }

    pub fn balloon(&self) -> &TrackedObject {
        &self.balloon
    }

    pub fn drones(&self) -> &[Drone] {
        &self.drones
    }

    pub fn controllers(&self) -> &[M] {
        &self.controllers
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Run one control tick.
    pub fn tick(
        &mut self,
        frame: &SensorFrame,
        controls: Controls,
        telemetry: &mut dyn TelemetrySink,
    ) -> SessionStats {
        self.stats.ticks += 1;

        self.balloon.update(frame.balloon, frame.time_s);
        for (i, drone) in self.drones.iter_mut().enumerate() {
            let sensed = frame.drones.get(i).copied().unwrap_or(Point3::ORIGIN);
            drone.tracked.update(sensed, frame.time_s);
        }

        let views: Vec<DroneView> = self.drones.iter().map(|d| d.view(&self.rules)).collect();
        let decisions: Vec<Result<Decision, FlightError>> = self
            .drones
            .iter()
            .enumerate()
            .map(|(i, drone)| {
                let ctx = TickContext {
                    now_s: frame.time_s,
                    balloon: &self.balloon,
                    borders: self.borders.as_ref(),
                    controls,
                    rules: &self.rules,
                    sibling: views.iter().enumerate().find(|(j, _)| *j != i).map(|(_, v)| v),
                };
                flight::step(drone, &ctx)
            })
            .collect();

        let mut roles = Vec::with_capacity(decisions.len());
        let mut commands = Vec::with_capacity(decisions.len());
        for (i, decision) in decisions.into_iter().enumerate() {
            match decision {
                Ok(decision) => {
                    self.record_transition(i, decision.phase.kind());
                    let drone = &mut self.drones[i];
                    drone.phase = decision.phase;
                    drone.destination = decision.destination;
                    roles.push((i, decision.roles));
                    commands.push(Some((decision.maneuver, decision.takeoff)));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "planning failed, stopping drone until next tick");
                    self.stats.planning_errors += 1;
                    commands.push(None);
                }
            }
        }

        self.apply_roles(&roles);
        debug_assert!(
            self.rules.mode == MissionMode::Solo || self.active_count() == 1,
            "exactly one drone must be active"
        );

        let mut maneuvers = Vec::with_capacity(commands.len());
        for (i, command) in commands.into_iter().enumerate() {
            maneuvers.push(command.map_or(Maneuver::Hold, |(m, _)| m));
            self.dispatch(i, command);
        }

        telemetry.publish(&self.record(frame.time_s, &maneuvers));
        self.stats
    }

    /// Number of drones currently holding the active role.
    pub fn active_count(&self) -> usize {
        self.drones.iter().filter(|d| d.active).count()
    }

    fn record_transition(&mut self, index: usize, next: FlightState) {
        let previous = self.drones[index].state();
        if previous == next {
            return;
        }
        match (previous, next) {
            (FlightState::Hitting, FlightState::Descending) => self.stats.hits += 1,
            (from, FlightState::StandingBy | FlightState::Waiting) if from.is_searching() => {
                tracing::warn!(drone = %self.drones[index].id, from = %from, to = %next, "interception aborted");
                self.stats.aborts += 1;
            }
            _ => {}
        }
    }

    /// Hand-overs first, then identity assignment, so the result is the same
    /// whichever drone asked first.
    fn apply_roles(&mut self, changes: &[(usize, RoleChange)]) {
        let handovers = changes.iter().filter(|(_, c)| *c == RoleChange::HandOver);
        for &(from, _) in handovers {
            if self.drones.len() < 2 {
                continue;
            }
            for (i, drone) in self.drones.iter_mut().enumerate() {
                drone.active = i != from;
            }
            tracing::info!(from = %self.drones[from].id, "active role handed over");
        }

        if changes.iter().any(|(_, c)| *c == RoleChange::ByIdentity) {
            let lowest = self.drones.iter().map(|d| d.id).min();
            for drone in &mut self.drones {
                drone.active = Some(drone.id) == lowest;
            }
        }
    }

    fn dispatch(&mut self, index: usize, command: Option<(Maneuver, bool)>) {
        let drone = &self.drones[index];
        let controller = &mut self.controllers[index];

        let result = match command {
            None => controller.stop(),
            Some((maneuver, takeoff)) => send(controller, drone, maneuver, takeoff),
        };

        if let Err(err) = result {
            tracing::error!(drone = %drone.id, error = %err, "motion command failed");
            self.stats.failed_commands += 1;
        }
    }

    fn record(&self, time_s: f64, maneuvers: &[Maneuver]) -> TickRecord {
        TickRecord {
            tick: self.stats.ticks,
            time_s,
            balloon: self.balloon.position,
            balloon_exists: self.balloon.exists,
            drones: self
                .drones
                .iter()
                .zip(maneuvers)
                .map(|(drone, maneuver)| DroneRecord {
                    id: drone.id,
                    state: drone.state(),
                    active: drone.active,
                    position: drone.position(),
                    destination: drone.destination,
                    maneuver: *maneuver,
                    obstacle: drone.view(&self.rules).obstacle.polygon(),
                })
                .collect(),
        }
    }

    /// Land every drone. Failures are logged and never block.
    pub fn shutdown(&mut self) -> SessionStats {
        for (drone, controller) in self.drones.iter_mut().zip(self.controllers.iter_mut()) {
            if let Err(err) = controller.land() {
                tracing::error!(drone = %drone.id, error = %err, "landing failed");
                self.stats.failed_commands += 1;
            }
            drone.phase = flight::Phase::OnGround;
        }
        tracing::info!(
            ticks = self.stats.ticks,
            hits = self.stats.hits,
            aborts = self.stats.aborts,
            failed_commands = self.stats.failed_commands,
            "session finished"
        );
        self.stats
    }
}

fn send<M: MotionController>(
    controller: &mut M,
    drone: &Drone,
    maneuver: Maneuver,
    takeoff: bool,
) -> Result<(), MotionError> {
    if takeoff {
        controller.takeoff()?;
        return controller.stop();
    }
    if matches!(maneuver, Maneuver::Idle) {
        return Ok(());
    }
    if !controller.is_ready() {
        return Err(MotionError::NotReady { drone: drone.id });
    }
    match maneuver {
        Maneuver::Idle => Ok(()),
        Maneuver::Hold => controller.stop(),
        Maneuver::GoTo(destination) => controller.go_to(destination, &drone.tracked),
        Maneuver::Hit(target) => controller.hit(target, &drone.tracked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        airborne: bool,
        fail_land: bool,
        log: Vec<String>,
    }

    impl MotionController for Recorder {
        fn is_ready(&self) -> bool {
            self.airborne
        }
        fn takeoff(&mut self) -> Result<(), MotionError> {
            self.airborne = true;
            self.log.push("takeoff".into());
            Ok(())
        }
        fn land(&mut self) -> Result<(), MotionError> {
            self.log.push("land".into());
            if self.fail_land {
                return Err(MotionError::CommandFailed {
                    drone: DroneId(1),
                    command: "land",
                    reason: "link lost".into(),
                });
            }
            self.airborne = false;
            Ok(())
        }
        fn stop(&mut self) -> Result<(), MotionError> {
            self.log.push("stop".into());
            Ok(())
        }
        fn go_to(&mut self, destination: Point3, _: &TrackedObject) -> Result<(), MotionError> {
            self.log.push(format!("go_to {destination}"));
            Ok(())
        }
        fn hit(&mut self, target: Point3, _: &TrackedObject) -> Result<(), MotionError> {
            self.log.push(format!("hit {target}"));
            Ok(())
        }
    }

    fn borders() -> Borders {
        Borders::rectangle(Point2::new(0.0, 0.0), Point2::new(400.0, 300.0)).unwrap()
    }

    #[test]
    fn controller_count_must_match_mode() {
        let err = Session::new(FlightRules::default(), None, vec![Recorder::default()])
            .err()
            .unwrap();
        assert_eq!(
            err,
            SessionError::ControllerCount {
                mode: "pair",
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn lowest_id_starts_active_and_gets_left_home() {
        let session = Session::new(
            FlightRules::default(),
            Some(borders()),
            vec![Recorder::default(), Recorder::default()],
        )
        .unwrap();
        assert!(session.drones()[0].active);
        assert!(!session.drones()[1].active);
        assert_eq!(session.drones()[0].home, Point2::new(100.0, 150.0));
        assert_eq!(session.drones()[1].home, Point2::new(300.0, 150.0));
    }

    #[test]
    fn takeoff_tick_issues_takeoff_then_stop() {
        let mut session = Session::new(
            FlightRules::default(),
            Some(borders()),
            vec![Recorder::default(), Recorder::default()],
        )
        .unwrap();
        let frame = SensorFrame {
            time_s: 0.1,
            balloon: Point3::ORIGIN,
            drones: vec![Point3::new(100.0, 150.0, 5.0), Point3::new(300.0, 150.0, 5.0)],
        };
        let controls = Controls {
            takeoff: true,
            ..Controls::default()
        };
        session.tick(&frame, controls, &mut NullTelemetry);

        for (drone, controller) in session.drones().iter().zip(session.controllers()) {
            assert_eq!(drone.state(), FlightState::Hovering);
            assert_eq!(controller.log, vec!["takeoff", "stop"]);
        }
    }

    #[test]
    fn idle_drones_send_nothing_before_takeoff() {
        let mut session = Session::new(
            FlightRules::default(),
            None,
            vec![Recorder::default(), Recorder::default()],
        )
        .unwrap();
        let frame = SensorFrame {
            time_s: 0.1,
            balloon: Point3::ORIGIN,
            drones: vec![],
        };
        let stats = session.tick(&frame, Controls::default(), &mut NullTelemetry);
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.failed_commands, 0);
        assert!(session.controllers().iter().all(|c| c.log.is_empty()));
    }

    #[test]
    fn failed_landing_is_counted_not_fatal() {
        let mut session = Session::new(
            FlightRules::default(),
            Some(borders()),
            vec![
                Recorder {
                    fail_land: true,
                    ..Recorder::default()
                },
                Recorder::default(),
            ],
        )
        .unwrap();
        let stats = session.shutdown();
        assert_eq!(stats.failed_commands, 1);
        assert!(session.controllers().iter().all(|c| c.log == vec!["land"]));
    }

    #[test]
    fn planning_error_stops_the_drone_and_retries() {
        let rules = FlightRules {
            mode: MissionMode::Solo,
            hit_below_ball_cm: f64::NAN,
            ..FlightRules::default()
        };
        let mut session = Session::new(rules, Some(borders()), vec![Recorder::default()]).unwrap();
        let frame = |time_s: f64, balloon: Point3| SensorFrame {
            time_s,
            balloon,
            drones: vec![Point3::new(200.0, 150.0, 100.0)],
        };
        let pressed = |start: bool, begin: bool| Controls {
            takeoff: true,
            start,
            begin,
        };

        session.tick(&frame(0.1, Point3::ORIGIN), pressed(false, false), &mut NullTelemetry);
        session.tick(&frame(0.2, Point3::ORIGIN), pressed(true, false), &mut NullTelemetry);
        session.tick(&frame(0.3, Point3::ORIGIN), pressed(true, true), &mut NullTelemetry);
        assert_eq!(session.drones()[0].state(), FlightState::StandingBy);
        let sent_before = session.controllers()[0].log.len();

        let balloon = Point3::new(200.0, 150.0, 250.0);
        let stats = session.tick(&frame(0.4, balloon), pressed(true, true), &mut NullTelemetry);
        assert_eq!(stats.planning_errors, 1);
        assert_eq!(stats.aborts, 0);
        assert_eq!(session.drones()[0].state(), FlightState::StandingBy);
        assert_eq!(session.controllers()[0].log[sent_before..], ["stop"]);

        // The failed step is taken again from the unchanged phase
        let stats = session.tick(&frame(0.5, balloon), pressed(true, true), &mut NullTelemetry);
        assert_eq!(stats.planning_errors, 2);
        assert_eq!(session.drones()[0].state(), FlightState::StandingBy);
        assert_eq!(session.controllers()[0].log[sent_before..], ["stop", "stop"]);
    }

    #[test]
    fn handover_moves_the_active_role() {
        let mut session = Session::new(
            FlightRules::default(),
            Some(borders()),
            vec![Recorder::default(), Recorder::default()],
        )
        .unwrap();
        session.apply_roles(&[(0, RoleChange::HandOver), (1, RoleChange::Keep)]);
        assert!(!session.drones()[0].active);
        assert!(session.drones()[1].active);

        session.apply_roles(&[(1, RoleChange::ByIdentity)]);
        assert!(session.drones()[0].active);
        assert_eq!(session.active_count(), 1);
    }
}
