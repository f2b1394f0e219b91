//! Setup, run, transition and cleanup hooks for every flight state.
//!
//! A tick first asks the current phase for a transition. On a transition the
//! old phase is cleaned up and the new one set up, then the (possibly new)
//! phase runs and produces this tick's maneuver.

use super::drone::{Decision, Drone, Maneuver, RoleChange, TickContext};
use super::{FlightState, Phase};
use crate::error::FlightError;
use crate::models::{Point2, Point3};
use crate::rules::{FlightRules, MissionMode};
use crate::spatial::max_axis_distance;
use std::collections::VecDeque;

/// Advance one drone by one tick against the pre-tick snapshot in `ctx`.
pub fn step(drone: &Drone, ctx: &TickContext<'_>) -> Result<Decision, FlightError> {
    let current = drone.state();
    let mut phase = drone.phase.clone();
    let mut roles = RoleChange::Keep;
    let mut takeoff = false;

    if let Some(next) = to_transition(drone, ctx).filter(|&next| next != current) {
        tracing::info!(drone = %drone.id, from = %current, to = %next, "flight state transition");
        let released = cleanup(current, ctx.rules);
        let (entered, acquired) = setup(next, drone, ctx);
        roles = if acquired == RoleChange::Keep { released } else { acquired };
        takeoff = current == FlightState::OnGround && next == FlightState::Hovering;
        phase = entered;
    }

    let maneuver = run(drone, &mut phase, ctx)?;
    if maneuver.target().is_some_and(|p| !p.is_finite()) {
        return Err(FlightError::NonFiniteDestination {
            drone: drone.id,
            state: phase.kind().name(),
        });
    }

    Ok(Decision {
        destination: maneuver.target().unwrap_or(drone.destination),
        phase,
        maneuver,
        roles,
        takeoff,
    })
}

fn setup(next: FlightState, drone: &Drone, ctx: &TickContext<'_>) -> (Phase, RoleChange) {
    match next {
        FlightState::OnGround => (Phase::OnGround, RoleChange::Keep),
        FlightState::Hovering => (Phase::Hovering, RoleChange::Keep),
        FlightState::Waiting => (Phase::Waiting, RoleChange::ByIdentity),
        FlightState::StandingBy => (Phase::StandingBy, RoleChange::Keep),
        FlightState::SearchingPrediction => (
            Phase::SearchingPrediction {
                started_at: ctx.now_s,
                start_position: drone.position(),
                history: VecDeque::with_capacity(ctx.rules.prediction_history),
                last_hit: None,
            },
            RoleChange::Keep,
        ),
        FlightState::Searching => (Phase::Searching, RoleChange::Keep),
        FlightState::Hitting => (
            Phase::Hitting {
                started_at: ctx.now_s,
            },
            RoleChange::Keep,
        ),
        FlightState::Descending => (Phase::Descending, RoleChange::Keep),
        FlightState::PrepareAndAvoid => (Phase::PrepareAndAvoid, RoleChange::Keep),
    }
}

fn cleanup(leaving: FlightState, rules: &FlightRules) -> RoleChange {
    match (leaving, rules.mode) {
        (FlightState::Hitting, MissionMode::Pair) => RoleChange::HandOver,
        _ => RoleChange::Keep,
    }
}

fn to_transition(drone: &Drone, ctx: &TickContext<'_>) -> Option<FlightState> {
    let rules = ctx.rules;
    let ball = ctx.balloon;
    let pos = drone.position();

    match &drone.phase {
        Phase::OnGround => {
            (ctx.controls.takeoff && ctx.borders.is_some()).then_some(FlightState::Hovering)
        }
        Phase::Hovering => ctx.controls.start.then_some(FlightState::Waiting),
        Phase::Waiting => ctx.controls.begin.then_some(FlightState::StandingBy),
        Phase::StandingBy => {
            if !ctx.balloon_in_borders() {
                return None;
            }
            if rules.human_thrower && ball.position.z < rules.release_height_cm {
                // Still in the thrower's hand
                return None;
            }
            Some(if drone.active {
                FlightState::SearchingPrediction
            } else {
                FlightState::PrepareAndAvoid
            })
        }
        Phase::SearchingPrediction { last_hit, .. } => {
            if let Some(abort) = lost_or_outside(drone, ctx) {
                return Some(abort);
            }
            if ball.position.z < pos.z && ball.velocity.z <= 0.0 {
                return Some(FlightState::Waiting);
            }
            let trackable = last_hit.is_some()
                && ball.horizontal_speed() < rules.track_xy_speed_bound
                && ball.position.z > pos.z;
            trackable.then_some(FlightState::Searching)
        }
        Phase::Searching => {
            if let Some(abort) = lost_or_outside(drone, ctx) {
                return Some(abort);
            }
            if ball.position.z < pos.z {
                return Some(FlightState::Waiting);
            }
            let offset = pos.xy().distance(ball.position.xy());
            let relative_speed = (ball.velocity.xy() - drone.tracked.velocity.xy()).norm();
            let committed = offset <= rules.track_xy_tolerance_cm
                && relative_speed <= rules.track_velocity_tolerance
                && ball.velocity.z < 0.0;
            committed.then_some(FlightState::Hitting)
        }
        Phase::Hitting { .. } => {
            let gap = ball.position.z - pos.z;
            // A struck balloon starts climbing before the gap closes
            let done = !ball.exists || gap < rules.hit_gap_cm || ball.velocity.z > 0.0;
            done.then_some(FlightState::Descending)
        }
        Phase::Descending => (pos.z <= rules.default_height_cm + rules.height_tolerance_cm)
            .then_some(FlightState::PrepareAndAvoid),
        Phase::PrepareAndAvoid => {
            if ctx
                .sibling
                .is_some_and(|s| s.state == FlightState::Waiting)
            {
                return Some(FlightState::Waiting);
            }
            if !drone.active {
                return None;
            }
            if !ctx.balloon_in_borders() {
                return Some(FlightState::Waiting);
            }
            let other_z = ctx.sibling.map_or(pos.z, |s| s.position.z);
            (ball.velocity.z > 0.0 || ball.position.z <= other_z)
                .then_some(FlightState::SearchingPrediction)
        }
    }
}

/// Abort target when the balloon or the drone itself has left the play area.
fn lost_or_outside(drone: &Drone, ctx: &TickContext<'_>) -> Option<FlightState> {
    let drone_outside = drone.tracked.exists && !ctx.point_in_borders(drone.position());
    if !ctx.balloon_in_borders() || drone_outside {
        tracing::warn!(drone = %drone.id, drone_outside, "search aborted, balloon or drone outside borders");
        return Some(FlightState::StandingBy);
    }
    None
}

fn run(drone: &Drone, phase: &mut Phase, ctx: &TickContext<'_>) -> Result<Maneuver, FlightError> {
    let rules = ctx.rules;
    let pos = drone.position();

    let maneuver = match phase {
        Phase::OnGround => Maneuver::Idle,
        Phase::Hovering => Maneuver::Hold,
        Phase::Waiting | Phase::StandingBy => go_to(rules, home_destination(drone, ctx)),
        Phase::SearchingPrediction {
            started_at,
            start_position,
            history,
            last_hit,
        } => {
            let predictor = ctx.balloon.predictor(rules.balloon);
            *last_hit = predictor.get_optimal_hitting_point(
                rules.search_start_s,
                rules.search_end_s,
                rules.search_step_s,
                rules.hit_xy_speed_bound,
                rules.hit_z_bound_cm,
            );
            let Some(hit) = last_hit else {
                return Ok(keep_destination(drone));
            };

            history.push_back(hit.position.xy());
            while history.len() > rules.prediction_history.max(1) {
                history.pop_front();
            }
            let target = history.iter().fold(Point2::default(), |acc, p| acc + *p)
                * (1.0 / history.len() as f64);

            // Travel time counts from where and when the search began
            let approach = rules
                .reachability
                .time_for(max_axis_distance(start_position.xy(), target));
            let lead = (approach - (ctx.now_s - *started_at)).max(0.0);
            let z = predictor.get_prediction(lead).z - rules.hit_below_ball_cm;
            tracing::debug!(drone = %drone.id, %target, z, lead, "hitting point");
            go_to(rules, target.with_z(z))
        }
        Phase::Searching => {
            let ball = ctx.balloon;
            let lead = rules
                .reachability
                .time_for(max_axis_distance(pos.xy(), ball.position.xy()));
            let predicted = ball.predictor(rules.balloon).get_prediction(lead);
            go_to(rules, predicted.xy().with_z(pos.z))
        }
        Phase::Hitting { started_at } => {
            let elapsed = ctx.now_s - *started_at;
            let horizon = rules.reachability.time_for(0.0) - elapsed;
            let target = ctx.balloon.predictor(rules.balloon).get_prediction(horizon);
            Maneuver::Hit(Point3 {
                z: rules.clamp_height(target.z),
                ..target
            })
        }
        Phase::Descending => {
            let z = if pos.z > rules.default_height_cm {
                (pos.z - rules.descent_step_cm).max(rules.default_height_cm)
            } else {
                pos.z
            };
            let xy = match ctx.active_sibling() {
                Some(active) => active.obstacle.bypass(pos.xy(), pos.xy()),
                None => pos.xy(),
            };
            go_to(rules, xy.with_z(z))
        }
        Phase::PrepareAndAvoid if drone.active => keep_destination(drone),
        Phase::PrepareAndAvoid => {
            let sibling = ctx
                .sibling
                .ok_or(FlightError::MissingSibling { drone: drone.id })?;
            let preparation = sibling.obstacle.preparation_destination();
            let xy = sibling.obstacle.bypass(pos.xy(), preparation);
            go_to(rules, xy.with_z(rules.passive_height_cm()))
        }
    };
    Ok(maneuver)
}

/// Home point at the drone's role height, routed around the active sibling.
fn home_destination(drone: &Drone, ctx: &TickContext<'_>) -> Point3 {
    let rules = ctx.rules;
    if drone.active {
        return drone.home.with_z(rules.default_height_cm);
    }
    let xy = match ctx.active_sibling() {
        Some(active) => active.obstacle.bypass(drone.position().xy(), drone.home),
        None => drone.home,
    };
    xy.with_z(rules.passive_height_cm())
}

fn keep_destination(drone: &Drone) -> Maneuver {
    if drone.destination.is_sentinel() {
        Maneuver::Hold
    } else {
        Maneuver::GoTo(drone.destination)
    }
}

fn go_to(rules: &FlightRules, destination: Point3) -> Maneuver {
    Maneuver::GoTo(Point3 {
        z: rules.clamp_height(destination.z),
        ..destination
    })
}
