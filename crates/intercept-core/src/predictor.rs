//! Ballistic prediction for a light, drag-dominated sphere.
//!
//! The balloon is modelled as a sphere whose mass is the trapped air plus the
//! shell, subject to gravity, buoyant lift and quadratic drag. The integrated
//! state is `[horizontal speed, vertical speed, horizontal displacement, height]`
//! in SI units; the heading is frozen at construction and used to rotate the
//! horizontal displacement back onto the x/y axes.
//!
//! The public API takes and returns centimeters (and cm/s).

use crate::models::Point3;
use nalgebra::Vector4;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const CM_PER_M: f64 = 100.0;

/// Refinement resolution relative to the coarse search step.
const REFINE_RATIO: f64 = 10.0;

/// Physical constants of the balloon and the surrounding air.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalloonModel {
    /// Sphere radius in meters
    pub radius_m: f64,
    /// Weight of the rubber shell in kilograms
    pub shell_mass_kg: f64,
    /// Ambient air density in kg/m³
    pub air_density: f64,
    /// Dimensionless drag coefficient of a sphere
    pub drag_coefficient: f64,
    /// Gravitational acceleration in m/s²
    pub gravity: f64,
    /// Largest internal integration step in seconds
    pub max_step_s: f64,
}

impl Default for BalloonModel {
    fn default() -> Self {
        Self {
            radius_m: 0.13,
            shell_mass_kg: 0.002,
            air_density: 1.225,
            drag_coefficient: 0.47,
            gravity: 9.81,
            max_step_s: 0.01,
        }
    }
}

impl BalloonModel {
    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.radius_m.powi(3)
    }

    /// Trapped air plus shell.
    pub fn mass(&self) -> f64 {
        self.air_density * self.volume() + self.shell_mass_kg
    }

    /// Quadratic drag constant divided by mass, in 1/m.
    pub fn drag_per_mass(&self) -> f64 {
        let area = PI * self.radius_m.powi(2);
        0.5 * self.air_density * self.drag_coefficient * area / self.mass()
    }

    /// Net vertical acceleration from gravity and buoyancy, in m/s² (negative is down).
    pub fn buoyancy_accel(&self) -> f64 {
        (self.air_density * self.volume() / self.mass() - 1.0) * self.gravity
    }

    /// Derivative of `[vh, vz, h, z]`.
    pub fn derivative(&self, state: &Vector4<f64>) -> Vector4<f64> {
        let (vh, vz) = (state[0], state[1]);
        let drag = self.drag_per_mass() * (vh * vh + vz * vz);
        let theta = vh.atan2(vz);
        Vector4::new(
            -drag * theta.sin(),
            -drag * theta.cos() + self.buoyancy_accel(),
            vh,
            vz,
        )
    }

    fn rk4_step(&self, x0: &Vector4<f64>, dt: f64) -> Vector4<f64> {
        let k1 = self.derivative(x0);
        let k2 = self.derivative(&(x0 + k1 * (0.5 * dt)));
        let k3 = self.derivative(&(x0 + k2 * (0.5 * dt)));
        let k4 = self.derivative(&(x0 + k3 * dt));
        x0 + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
    }

    /// Integrate `state` from `t0` to `tf` with substeps no longer than `max_step_s`.
    pub fn integrate(&self, state: Vector4<f64>, t0: f64, tf: f64) -> Vector4<f64> {
        let span = tf - t0;
        if span <= 0.0 || !span.is_finite() {
            return state;
        }
        let steps = (span / self.max_step_s.max(1e-4)).ceil().max(1.0) as usize;
        let dt = span / steps as f64;
        (0..steps).fold(state, |x, _| self.rk4_step(&x, dt))
    }
}

/// Predicted kinematics at some future time, in centimeters and cm/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictedState {
    pub time_s: f64,
    pub position: Point3,
    pub velocity: Point3,
    pub horizontal_speed: f64,
}

/// Earliest predicted point satisfying the hitting constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HittingPoint {
    pub time_s: f64,
    pub position: Point3,
    /// Predicted horizontal speed at `time_s`, cm/s
    pub horizontal_speed: f64,
}

/// Immutable snapshot of one object's kinematics used for forward prediction.
#[derive(Debug, Clone, Copy)]
pub struct BallisticPredictor {
    model: BalloonModel,
    origin_m: (f64, f64),
    /// Heading of horizontal motion, radians from +x
    phi: f64,
    initial: Vector4<f64>,
}

impl BallisticPredictor {
    /// Snapshot `position` (cm) and `velocity` (cm/s).
    pub fn new(position: Point3, velocity: Point3, model: BalloonModel) -> Self {
        let vx = velocity.x / CM_PER_M;
        let vy = velocity.y / CM_PER_M;
        let vz = velocity.z / CM_PER_M;
        let vh = vx.hypot(vy);

        Self {
            model,
            origin_m: (position.x / CM_PER_M, position.y / CM_PER_M),
            phi: vy.atan2(vx),
            initial: Vector4::new(vh, vz, 0.0, position.z / CM_PER_M),
        }
    }

    fn to_predicted(&self, time_s: f64, state: &Vector4<f64>) -> PredictedState {
        let (vh, vz, h, z) = (state[0], state[1], state[2], state[3]);
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        PredictedState {
            time_s,
            position: Point3::new(
                (self.origin_m.0 + h * cos_phi) * CM_PER_M,
                (self.origin_m.1 + h * sin_phi) * CM_PER_M,
                z * CM_PER_M,
            ),
            velocity: Point3::new(
                vh * cos_phi * CM_PER_M,
                vh * sin_phi * CM_PER_M,
                vz * CM_PER_M,
            ),
            horizontal_speed: vh * CM_PER_M,
        }
    }

    /// Predicted state after `elapsed_s` seconds. Negative times clamp to now.
    pub fn predict_state(&self, elapsed_s: f64) -> PredictedState {
        let elapsed_s = elapsed_s.max(0.0);
        let state = self.model.integrate(self.initial, 0.0, elapsed_s);
        self.to_predicted(elapsed_s, &state)
    }

    /// Predicted position after `elapsed_s` seconds.
    pub fn get_prediction(&self, elapsed_s: f64) -> Point3 {
        self.predict_state(elapsed_s).position
    }

    /// Predicted states at every time in ascending `times`.
    pub fn trajectory(&self, times: &[f64]) -> Vec<PredictedState> {
        let mut out = Vec::with_capacity(times.len());
        let mut t = 0.0;
        let mut state = self.initial;
        for &target in times {
            let target = target.max(t);
            state = self.model.integrate(state, t, target);
            t = target;
            out.push(self.to_predicted(t, &state));
        }
        out
    }

    /// Earliest time in `[start_s, end_s]` at which the balloon is at least
    /// `z_bound` high while moving horizontally no faster than
    /// `xy_velocity_bound` (cm/s).
    ///
    /// Searches at `step_s` resolution, then re-searches one coarse step on
    /// either side of the first hit at a tenth of the step. `None` means no
    /// interception window exists in the horizon.
    pub fn get_optimal_hitting_point(
        &self,
        start_s: f64,
        end_s: f64,
        step_s: f64,
        xy_velocity_bound: f64,
        z_bound: f64,
    ) -> Option<HittingPoint> {
        let qualifies = |s: &PredictedState| {
            s.position.z >= z_bound && s.horizontal_speed <= xy_velocity_bound
        };

        let coarse = self.trajectory(&time_grid(start_s, end_s, step_s));
        let Some(hit) = coarse.iter().find(|&s| qualifies(s)) else {
            tracing::debug!(start_s, end_s, z_bound, "no interception window");
            return None;
        };

        let fine_start = (hit.time_s - step_s).max(start_s);
        let fine_end = (hit.time_s + step_s).min(end_s);
        let fine = self.trajectory(&time_grid(fine_start, fine_end, step_s / REFINE_RATIO));
        let best = fine.iter().find(|&s| qualifies(s)).unwrap_or(hit);

        Some(HittingPoint {
            time_s: best.time_s,
            position: best.position,
            horizontal_speed: best.horizontal_speed,
        })
    }

    /// First time on the `[start_s, end_s]` grid at which the balloon is below
    /// `z_threshold` (cm) with horizontal speed at most `xy_speed_limit` (cm/s).
    ///
    /// Found by bisection over the grid, assuming the condition stays true once
    /// reached (descending, decelerating balloon).
    pub fn time_to_height(
        &self,
        z_threshold: f64,
        xy_speed_limit: f64,
        start_s: f64,
        end_s: f64,
        step_s: f64,
    ) -> Option<f64> {
        let grid = time_grid(start_s, end_s, step_s);
        let states = self.trajectory(&grid);
        let below = |i: usize| {
            states[i].position.z < z_threshold && states[i].horizontal_speed <= xy_speed_limit
        };

        let last = states.len().checked_sub(1)?;
        if below(0) {
            return Some(grid[0]);
        }
        if !below(last) {
            return None;
        }
        Some(grid[bisect_first(&below, 0, last)])
    }
}

/// Index of the first true value in `(lo, hi]`, given `!pred(lo)` and `pred(hi)`.
fn bisect_first(pred: &impl Fn(usize) -> bool, lo: usize, hi: usize) -> usize {
    if hi - lo <= 1 {
        return hi;
    }
    let mid = lo + (hi - lo) / 2;
    if pred(mid) {
        bisect_first(pred, lo, mid)
    } else {
        bisect_first(pred, mid, hi)
    }
}

/// `start, start + step, ...` up to and including `end` (within rounding).
pub fn time_grid(start_s: f64, end_s: f64, step_s: f64) -> Vec<f64> {
    if !(step_s > 0.0) || !start_s.is_finite() || !end_s.is_finite() || end_s < start_s {
        return Vec::new();
    }
    let count = ((end_s - start_s) / step_s + 1e-9).floor() as usize;
    (0..=count).map(|i| start_s + i as f64 * step_s).collect()
}
