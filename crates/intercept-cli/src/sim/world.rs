//! Simulated play area: one balloon and the drones chasing it.
//!
//! The balloon follows the same drag and buoyancy model the predictor uses.
//! Drones chase their last command with a speed-limited proportional law.

use super::motion::{lock, DroneCommand, SharedLink};
use intercept_core::{BallisticPredictor, BalloonModel, Point3, SensorFrame};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Physical constants of the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldParams {
    pub takeoff_height_cm: f64,
    pub max_speed_cm_s: f64,
    /// Speed limit while hitting
    pub hit_speed_cm_s: f64,
    /// Proportional gain from position error to velocity (1/s)
    pub follow_gain: f64,
    pub land_speed_cm_s: f64,
    /// Drone-to-balloon distance that counts as contact
    pub contact_radius_cm: f64,
    /// Upward speed given to a struck balloon
    pub impulse_cm_s: f64,
    /// Uniform sensing noise on every coordinate
    pub noise_cm: f64,
    /// Probability that the balloon is not detected in a frame
    pub dropout_rate: f64,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            takeoff_height_cm: 100.0,
            max_speed_cm_s: 150.0,
            hit_speed_cm_s: 300.0,
            follow_gain: 3.0,
            land_speed_cm_s: 60.0,
            contact_radius_cm: 25.0,
            impulse_cm_s: 280.0,
            noise_cm: 0.5,
            dropout_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Point3,
    pub velocity: Point3,
}

#[derive(Debug)]
pub struct SimDrone {
    pub body: Body,
    link: SharedLink,
}

impl SimDrone {
    pub fn new(position: Point3, link: SharedLink) -> Self {
        Self {
            body: Body {
                position,
                velocity: Point3::ORIGIN,
            },
            link,
        }
    }

    pub fn is_airborne(&self) -> bool {
        lock(&self.link).airborne
    }

    pub fn is_hitting(&self) -> bool {
        matches!(lock(&self.link).command, DroneCommand::Hit(_))
    }

    fn step(&mut self, dt: f64, params: &WorldParams) {
        let mut link = lock(&self.link);
        if !link.airborne {
            self.body.velocity = Point3::ORIGIN;
            return;
        }

        let here = self.body.position;
        let (target, speed) = match (link.command, link.climb_to) {
            (DroneCommand::GoTo(p), _) => (p, params.max_speed_cm_s),
            (DroneCommand::Hit(p), _) => (p, params.hit_speed_cm_s),
            (DroneCommand::Land, _) => (here.xy().with_z(0.0), params.land_speed_cm_s),
            (_, Some(height)) => (here.xy().with_z(height), params.max_speed_cm_s),
            (DroneCommand::Idle | DroneCommand::Hold, None) => (here, 0.0),
        };

        let error = target - here;
        let remaining = error.norm();
        let mut velocity = error * params.follow_gain;
        let magnitude = velocity.norm();
        if magnitude > speed {
            velocity = velocity * (speed / magnitude);
        }
        // Never overshoot the target within one step
        if dt > 0.0 && velocity.norm() * dt > remaining {
            velocity = error * (1.0 / dt);
        }

        self.body.velocity = velocity;
        self.body.position = here + velocity * dt;

        if let Some(height) = link.climb_to {
            if (self.body.position.z - height).abs() < 1.0 {
                link.climb_to = None;
            }
        }
        if link.command == DroneCommand::Land && self.body.position.z <= 1.0 {
            self.body.position.z = 0.0;
            self.body.velocity = Point3::ORIGIN;
            link.airborne = false;
            link.command = DroneCommand::Idle;
        }
    }
}

#[derive(Debug)]
pub struct World {
    params: WorldParams,
    model: BalloonModel,
    time_s: f64,
    /// `None` while nobody has thrown the balloon
    balloon: Option<Body>,
    last_contact_s: f64,
    drones: Vec<SimDrone>,
    rng: StdRng,
    hits: u64,
    rallies: u64,
}

impl World {
    pub fn new(params: WorldParams, model: BalloonModel, drones: Vec<SimDrone>, seed: u64) -> Self {
        Self {
            params,
            model,
            time_s: 0.0,
            balloon: None,
            last_contact_s: f64::NEG_INFINITY,
            drones,
            rng: StdRng::seed_from_u64(seed),
            hits: 0,
            rallies: 0,
        }
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn balloon(&self) -> Option<Body> {
        self.balloon
    }

    pub fn drones(&self) -> &[SimDrone] {
        &self.drones
    }

    /// Balloon contacts made by hitting drones.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Rallies ended by the balloon reaching the floor.
    pub fn rallies(&self) -> u64 {
        self.rallies
    }

    pub fn throw(&mut self, from: Point3, velocity: Point3) {
        tracing::info!(%from, %velocity, "balloon thrown");
        self.balloon = Some(Body {
            position: from,
            velocity,
        });
    }

    /// Noisy positions as the cameras would report them.
    pub fn sense(&mut self) -> SensorFrame {
        let detected = !self.rng.random_bool(self.params.dropout_rate.clamp(0.0, 1.0));
        let balloon = match (self.balloon, detected) {
            (Some(body), true) => self.noisy(body.position),
            _ => Point3::ORIGIN,
        };
        let positions: Vec<Point3> = self.drones.iter().map(|d| d.body.position).collect();
        SensorFrame {
            time_s: self.time_s,
            balloon,
            drones: positions.into_iter().map(|p| self.noisy(p)).collect(),
        }
    }

    fn noisy(&mut self, p: Point3) -> Point3 {
        let n = self.params.noise_cm;
        if n <= 0.0 {
            return p;
        }
        Point3::new(
            p.x + self.rng.random_range(-n..=n),
            p.y + self.rng.random_range(-n..=n),
            p.z + self.rng.random_range(-n..=n),
        )
    }

    pub fn step(&mut self, dt: f64) {
        self.time_s += dt;
        for drone in &mut self.drones {
            drone.step(dt, &self.params);
        }

        let Some(mut body) = self.balloon else {
            return;
        };

        let next =
            BallisticPredictor::new(body.position, body.velocity, self.model).predict_state(dt);
        body.position = next.position;
        body.velocity = next.velocity;

        if let Some(striker) = self.striker(&body) {
            let jitter = self.params.impulse_cm_s * 0.05;
            body.velocity = Point3::new(
                striker.velocity.x * 0.2 + self.rng.random_range(-jitter..=jitter),
                striker.velocity.y * 0.2 + self.rng.random_range(-jitter..=jitter),
                self.params.impulse_cm_s + striker.velocity.z.max(0.0) * 0.2,
            );
            self.last_contact_s = self.time_s;
            self.hits += 1;
            tracing::info!(hits = self.hits, position = %body.position, "balloon struck");
        }

        let floor = self.model.radius_m * 100.0;
        if body.position.z <= floor {
            tracing::info!(position = %body.position, "balloon reached the floor");
            self.rallies += 1;
            self.balloon = None;
            return;
        }
        self.balloon = Some(body);
    }

    /// A hitting drone touching the balloon, outside the contact cooldown.
    fn striker(&self, balloon: &Body) -> Option<Body> {
        if self.time_s - self.last_contact_s < 0.3 {
            return None;
        }
        self.drones
            .iter()
            .filter(|d| d.is_hitting())
            .find(|d| d.body.position.distance(balloon.position) <= self.params.contact_radius_cm)
            .map(|d| d.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::motion::Link;
    use approx::assert_relative_eq;

    fn quiet() -> WorldParams {
        WorldParams {
            noise_cm: 0.0,
            ..WorldParams::default()
        }
    }

    fn airborne_drone(position: Point3, command: DroneCommand) -> SimDrone {
        let link = SharedLink::default();
        {
            let mut state = lock(&link);
            state.airborne = true;
            state.command = command;
        }
        SimDrone::new(position, link)
    }

    #[test]
    fn balloon_falls_like_the_predictor_says() {
        let mut world = World::new(quiet(), BalloonModel::default(), vec![], 1);
        let from = Point3::new(100.0, 100.0, 250.0);
        let velocity = Point3::new(30.0, 0.0, 50.0);
        world.throw(from, velocity);
        for _ in 0..20 {
            world.step(0.05);
        }

        let expected = BallisticPredictor::new(from, velocity, BalloonModel::default())
            .get_prediction(1.0);
        let body = world.balloon().unwrap();
        assert_relative_eq!(body.position.x, expected.x, epsilon = 0.5);
        assert_relative_eq!(body.position.z, expected.z, epsilon = 0.5);
    }

    #[test]
    fn floor_ends_the_rally() {
        let mut world = World::new(quiet(), BalloonModel::default(), vec![], 1);
        world.throw(Point3::new(100.0, 100.0, 40.0), Point3::ORIGIN);
        for _ in 0..100 {
            world.step(0.05);
        }
        assert!(world.balloon().is_none());
        assert_eq!(world.rallies(), 1);
        assert_eq!(world.sense().balloon, Point3::ORIGIN);
    }

    #[test]
    fn hitting_drone_in_contact_strikes_upwards() {
        let target = Point3::new(100.0, 100.0, 150.0);
        let drone = airborne_drone(Point3::new(100.0, 100.0, 140.0), DroneCommand::Hit(target));
        let mut world = World::new(quiet(), BalloonModel::default(), vec![drone], 1);
        world.throw(Point3::new(100.0, 100.0, 150.0), Point3::new(0.0, 0.0, -50.0));

        world.step(0.05);
        assert_eq!(world.hits(), 1);
        assert!(world.balloon().unwrap().velocity.z > 0.0);

        // Cooldown prevents a double count
        world.step(0.05);
        assert_eq!(world.hits(), 1);
    }

    #[test]
    fn drone_follows_commands_within_speed_limit() {
        let goal = Point3::new(300.0, 100.0, 100.0);
        let drone = airborne_drone(Point3::new(100.0, 100.0, 100.0), DroneCommand::GoTo(goal));
        let mut world = World::new(quiet(), BalloonModel::default(), vec![drone], 1);

        world.step(0.1);
        let body = world.drones()[0].body;
        assert_relative_eq!(body.velocity.x, 150.0, epsilon = 1e-9);
        assert_relative_eq!(body.position.x, 115.0, epsilon = 1e-9);

        for _ in 0..100 {
            world.step(0.1);
        }
        assert_relative_eq!(world.drones()[0].body.position.x, 300.0, epsilon = 1e-6);
    }

    #[test]
    fn takeoff_climbs_then_landing_grounds() {
        let link = SharedLink::new(std::sync::Mutex::new(Link {
            airborne: true,
            climb_to: Some(100.0),
            command: DroneCommand::Hold,
            ..Link::default()
        }));
        let drone = SimDrone::new(Point3::new(50.0, 50.0, 0.0), link.clone());
        let mut world = World::new(quiet(), BalloonModel::default(), vec![drone], 1);
        for _ in 0..50 {
            world.step(0.05);
        }
        assert_relative_eq!(world.drones()[0].body.position.z, 100.0, epsilon = 1.0);
        assert!(lock(&link).climb_to.is_none());

        lock(&link).command = DroneCommand::Land;
        for _ in 0..100 {
            world.step(0.05);
        }
        assert!(!world.drones()[0].is_airborne());
        assert_eq!(world.drones()[0].body.position.z, 0.0);
    }

    #[test]
    fn same_seed_senses_the_same_noise() {
        let params = WorldParams {
            noise_cm: 2.0,
            ..WorldParams::default()
        };
        let frames = |seed| {
            let drone = airborne_drone(Point3::new(50.0, 50.0, 100.0), DroneCommand::Hold);
            let mut world = World::new(params, BalloonModel::default(), vec![drone], seed);
            world.throw(Point3::new(100.0, 100.0, 200.0), Point3::ORIGIN);
            (0..5).map(|_| world.sense()).collect::<Vec<_>>()
        };
        assert_eq!(frames(3), frames(3));
        assert_ne!(frames(3), frames(4));
    }
}
