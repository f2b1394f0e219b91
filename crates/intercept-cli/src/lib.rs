//! Simulator and tooling around the interception core.
//!
//! Configuration comes from `INTERCEPT_*` environment variables. The `simulate`
//! binary flies a scripted scenario against simulated drones; `predict` prints
//! the ballistic forecast for one observed balloon state.

pub mod config;
pub mod sim;
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use telemetry::JsonLinesTelemetry;
