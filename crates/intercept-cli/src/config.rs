//! Simulator configuration from environment.

use intercept_core::{Borders, BordersError, FlightRules, MissionMode, Point2, Reachability};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("INTERCEPT_BORDERS needs 8 comma-separated numbers, got {0}")]
    BordersArity(usize),
    #[error("invalid INTERCEPT_BORDERS: {0}")]
    Borders(#[from] BordersError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tick_hz: f64,
    pub mode: MissionMode,
    pub human_thrower: bool,
    pub reachability_offset_s: f64,
    pub borders: Borders,
    pub telemetry_path: Option<PathBuf>,
    pub seed: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let tick_hz = parse(&lookup, "INTERCEPT_TICK_HZ", "positive tick rate", 20.0_f64)?;
        if !(tick_hz > 0.0 && tick_hz.is_finite()) {
            let value = tick_hz.to_string();
            return Err(invalid("INTERCEPT_TICK_HZ", value, "positive tick rate"));
        }

        let mode = match lookup("INTERCEPT_DRONES").as_deref() {
            None | Some("2") => MissionMode::Pair,
            Some("1") => MissionMode::Solo,
            Some(other) => {
                return Err(invalid("INTERCEPT_DRONES", other.into(), "drone count (1 or 2)"))
            }
        };

        let human_thrower = match lookup("INTERCEPT_HUMAN_THROWER").as_deref() {
            None | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(invalid("INTERCEPT_HUMAN_THROWER", other.into(), "boolean"))
            }
        };

        let reachability_offset_s =
            parse(&lookup, "INTERCEPT_REACH_OFFSET_S", "offset in seconds", 0.0_f64)?;

        let borders = match lookup("INTERCEPT_BORDERS") {
            Some(raw) => parse_borders(&raw)?,
            None => Borders::rectangle(Point2::new(0.0, 0.0), Point2::new(400.0, 300.0))?,
        };

        Ok(Self {
            tick_hz,
            mode,
            human_thrower,
            reachability_offset_s,
            borders,
            telemetry_path: lookup("INTERCEPT_TELEMETRY")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            seed: parse(&lookup, "INTERCEPT_SEED", "unsigned seed", 7_u64)?,
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz)
    }

    pub fn rules(&self) -> FlightRules {
        FlightRules {
            mode: self.mode,
            human_thrower: self.human_thrower,
            reachability: Reachability::new(self.reachability_offset_s),
            ..FlightRules::default()
        }
    }
}

fn invalid(var: &'static str, value: String, expected: &'static str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value,
        expected,
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| invalid(var, raw, expected)),
    }
}

/// `x1,y1,x2,y2,x3,y3,x4,y4` in centimeters, corners in any order.
fn parse_borders(raw: &str) -> Result<Borders, ConfigError> {
    let values = raw
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid("INTERCEPT_BORDERS", raw.into(), "list of numbers"))?;
    if values.len() != 8 {
        return Err(ConfigError::BordersArity(values.len()));
    }
    let corner = |i: usize| Point2::new(values[2 * i], values[2 * i + 1]);
    Ok(Borders::from_corners([corner(0), corner(1), corner(2), corner(3)])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]).unwrap();
        assert_eq!(config.tick_hz, 20.0);
        assert_eq!(config.mode, MissionMode::Pair);
        assert!(!config.human_thrower);
        assert_eq!(config.seed, 7);
        assert!(config.telemetry_path.is_none());
        assert_eq!(config.borders.middle(), Point2::new(200.0, 150.0));
        assert_relative_eq!(config.tick_interval().as_secs_f64(), 0.05, epsilon = 1e-9);
    }

    #[test]
    fn overrides_flow_into_rules() {
        let config = config(&[
            ("INTERCEPT_DRONES", "1"),
            ("INTERCEPT_HUMAN_THROWER", "true"),
            ("INTERCEPT_REACH_OFFSET_S", "0.25"),
            ("INTERCEPT_TELEMETRY", "/tmp/ticks.jsonl"),
        ])
        .unwrap();
        let rules = config.rules();
        assert_eq!(rules.mode, MissionMode::Solo);
        assert!(rules.human_thrower);
        assert_eq!(rules.reachability.offset_s, 0.25);
        assert_eq!(config.telemetry_path, Some(PathBuf::from("/tmp/ticks.jsonl")));
    }

    #[test]
    fn borders_from_corner_list() {
        let config = config(&[("INTERCEPT_BORDERS", "0,0, 200,0, 200,100, 0,100")]).unwrap();
        assert_eq!(config.borders.middle(), Point2::new(100.0, 50.0));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            config(&[("INTERCEPT_TICK_HZ", "fast")]),
            Err(ConfigError::Invalid { var: "INTERCEPT_TICK_HZ", .. })
        ));
        assert!(matches!(
            config(&[("INTERCEPT_TICK_HZ", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("INTERCEPT_DRONES", "3")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("INTERCEPT_BORDERS", "0,0,1,1")]),
            Err(ConfigError::BordersArity(4))
        ));
        assert!(matches!(
            config(&[("INTERCEPT_BORDERS", "0,0, 200,0, 300,0, 100,0")]),
            Err(ConfigError::Borders(_))
        ));
    }
}
