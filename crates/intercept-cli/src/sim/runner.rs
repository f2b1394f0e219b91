//! Control loop driving a session against the simulated world.

use super::motion::{lock, SharedLink, SimMotionController};
use super::scenarios::Scenario;
use super::world::{SimDrone, World, WorldParams};
use crate::config::Config;
use anyhow::{anyhow, Context};
use intercept_core::{BalloonModel, DroneId, Session, SessionStats, TelemetrySink};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::{interval, MissedTickBehavior};

/// Upper bound on simulated seconds spent waiting for drones to land.
const LANDING_TIMEOUT_S: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub ticks: u64,
    /// Pace ticks on the wall clock instead of running as fast as possible
    pub realtime: bool,
    pub scenario: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticks: 1200,
            realtime: false,
            scenario: "rally".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub stats: SessionStats,
    /// Contacts counted by the simulated physics
    pub balloon_hits: u64,
    pub rallies: u64,
    pub sim_time_s: f64,
    pub landed: bool,
}

/// Run one scenario until `options.ticks` ticks elapse or `shutdown` fires,
/// then land every drone.
pub async fn run(
    config: &Config,
    options: &RunOptions,
    telemetry: &mut dyn TelemetrySink,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<RunSummary> {
    let scenario = Scenario::by_name(&options.scenario, &config.borders)
        .ok_or_else(|| anyhow!("unknown scenario {:?}", options.scenario))?;
    let rules = config.rules();
    let params = WorldParams {
        noise_cm: scenario.noise_cm,
        dropout_rate: scenario.dropout_rate,
        ..WorldParams::default()
    };

    let links: Vec<SharedLink> = (0..rules.mode.drone_count())
        .map(|_| SharedLink::default())
        .collect();
    let controllers = links
        .iter()
        .enumerate()
        .map(|(i, link)| {
            SimMotionController::new(DroneId(i as u8 + 1), link.clone(), params.takeoff_height_cm)
        })
        .collect();
    let mut session = Session::new(rules, Some(config.borders.clone()), controllers)
        .context("failed to assemble session")?;

    let bodies = session
        .drones()
        .iter()
        .zip(&links)
        .map(|(drone, link)| SimDrone::new(drone.home.with_z(0.0), link.clone()))
        .collect();
    let mut world = World::new(params, BalloonModel::default(), bodies, config.seed);

    let dt = config.tick_interval().as_secs_f64();
    let mut ticker = interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        scenario = scenario.name,
        mode = ?config.mode,
        ticks = options.ticks,
        realtime = options.realtime,
        "simulation starting"
    );

    for _ in 0..options.ticks {
        if options.realtime {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Simulation loop shutting down");
                    break;
                }
                _ = ticker.tick() => {}
            }
        } else {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => {
                    tracing::info!("Simulation loop shutting down");
                    break;
                }
            }
            tokio::task::yield_now().await;
        }

        let now = world.time_s();
        for throw in scenario.throws_between(now - dt, now) {
            world.throw(throw.from, throw.velocity);
        }
        let frame = world.sense();
        session.tick(&frame, scenario.controls_at(now), telemetry);
        world.step(dt);
    }

    let stats = session.shutdown();
    let deadline = world.time_s() + LANDING_TIMEOUT_S;
    while world.drones().iter().any(SimDrone::is_airborne) && world.time_s() < deadline {
        world.step(dt);
    }
    let landed = links.iter().all(|link| !lock(link).airborne);
    if !landed {
        tracing::warn!("drones still airborne after landing timeout");
    }

    let summary = RunSummary {
        stats,
        balloon_hits: world.hits(),
        rallies: world.rallies(),
        sim_time_s: world.time_s(),
        landed,
    };
    tracing::info!(
        hits = summary.balloon_hits,
        rallies = summary.rallies,
        sim_time_s = summary.sim_time_s,
        "simulation finished"
    );
    Ok(summary)
}
