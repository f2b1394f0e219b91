//! Sliding-window kinematics for sensed objects (balloon and drones).

use crate::models::Point3;
use crate::predictor::{BallisticPredictor, BalloonModel};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_WINDOW: usize = 10;
pub const DEFAULT_MAX_STALE_TICKS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Sample {
    time_s: f64,
    position: Point3,
}

/// Position, velocity and existence of one tracked object.
///
/// Velocity is the mean of finite differences over the last `window` samples
/// and stays zero until the window is full. A sentinel `(0, 0, 0)` sample marks
/// the object as missing: the last good position is kept for consumers that
/// tolerate stale data, and the window is dropped after `max_stale_ticks`
/// consecutive misses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedObject {
    pub position: Point3,
    pub velocity: Point3,
    pub exists: bool,
    /// Time of the last accepted sample, seconds
    pub last_update: f64,
    window: usize,
    max_stale_ticks: u32,
    stale_ticks: u32,
    samples: VecDeque<Sample>,
}

impl Default for TrackedObject {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_STALE_TICKS)
    }
}

impl TrackedObject {
    pub fn new(window: usize, max_stale_ticks: u32) -> Self {
        let window = window.max(2);
        Self {
            position: Point3::ORIGIN,
            velocity: Point3::ORIGIN,
            exists: false,
            last_update: 0.0,
            window,
            max_stale_ticks,
            stale_ticks: 0,
            samples: VecDeque::with_capacity(window),
        }
    }

    /// An object at a known position with no motion history.
    pub fn at(position: Point3) -> Self {
        Self {
            position,
            exists: !position.is_sentinel(),
            ..Self::default()
        }
    }

    /// Builder for tests and simulations that already know the velocity.
    pub fn with_velocity(mut self, velocity: Point3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Feed one sensed position taken at `time_s`.
    pub fn update(&mut self, position: Point3, time_s: f64) {
        if position.is_sentinel() || !position.is_finite() {
            self.mark_missing();
            return;
        }

        if self.samples.back().is_some_and(|s| time_s <= s.time_s) {
            // Out-of-order or duplicate frame
            return;
        }

        self.exists = true;
        self.stale_ticks = 0;
        self.position = position;
        self.last_update = time_s;

        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample { time_s, position });
        self.velocity = self.window_velocity();
    }

    fn mark_missing(&mut self) {
        self.exists = false;
        self.stale_ticks = self.stale_ticks.saturating_add(1);
        if self.stale_ticks > self.max_stale_ticks && !self.samples.is_empty() {
            tracing::debug!(stale_ticks = self.stale_ticks, "dropping stale track history");
            self.samples.clear();
            self.velocity = Point3::ORIGIN;
        }
    }

    fn window_velocity(&self) -> Point3 {
        if self.samples.len() < self.window {
            return Point3::ORIGIN;
        }

        let (sum, count) = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .filter_map(|(a, b)| {
                let dt = b.time_s - a.time_s;
                (dt > 0.0).then(|| (b.position - a.position) * (1.0 / dt))
            })
            .fold((Point3::ORIGIN, 0usize), |(sum, n), v| (sum + v, n + 1));

        if count == 0 {
            return Point3::ORIGIN;
        }
        sum * (1.0 / count as f64)
    }

    /// True once enough samples have been seen to trust the velocity.
    pub fn velocity_ready(&self) -> bool {
        self.samples.len() == self.window
    }

    pub fn horizontal_speed(&self) -> f64 {
        self.velocity.x.hypot(self.velocity.y)
    }

    /// Ballistic snapshot of this object's current kinematics.
    pub fn predictor(&self, model: BalloonModel) -> BallisticPredictor {
        BallisticPredictor::new(self.position, self.velocity, model)
    }
}
