//! Print the ballistic forecast for one observed balloon state.
//!
//! Usage:
//!   cargo run -p intercept-cli --bin predict -- --position 200,150,220 --velocity 30,0,80

use anyhow::{bail, Context, Result};
use clap::Parser;
use intercept_core::predictor::time_grid;
use intercept_core::{BallisticPredictor, FlightRules, Point3};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(author, version, about = "Forecast a balloon trajectory and its hitting point")]
struct Args {
    /// Observed position `x,y,z` in centimeters
    #[arg(long, allow_hyphen_values = true)]
    position: String,

    /// Observed velocity `vx,vy,vz` in cm/s
    #[arg(long, allow_hyphen_values = true, default_value = "0,0,0")]
    velocity: String,

    /// Trajectory horizon in seconds
    #[arg(long, default_value_t = 3.0)]
    horizon: f64,

    /// Trajectory sample spacing in seconds
    #[arg(long, default_value_t = 0.1)]
    step: f64,

    /// Height for the time-to-height query (cm)
    #[arg(long, default_value_t = 60.0)]
    height: f64,
}

fn parse_point(raw: &str) -> Result<Point3> {
    let values = raw
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("{raw:?} is not a list of numbers"))?;
    match values.as_slice() {
        [x, y, z] => Ok(Point3::new(*x, *y, *z)),
        _ => bail!("expected three comma-separated numbers, got {raw:?}"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if !(args.horizon > 0.0 && args.step > 0.0) {
        bail!("horizon and step must be positive");
    }

    let rules = FlightRules::default();
    let predictor = BallisticPredictor::new(
        parse_point(&args.position)?,
        parse_point(&args.velocity)?,
        rules.balloon,
    );

    let hitting_point = predictor.get_optimal_hitting_point(
        rules.search_start_s,
        rules.search_end_s,
        rules.search_step_s,
        rules.hit_xy_speed_bound,
        rules.hit_z_bound_cm,
    );
    let time_to_height =
        predictor.time_to_height(args.height, f64::INFINITY, 0.0, args.horizon, args.step);
    let trajectory = predictor.trajectory(&time_grid(0.0, args.horizon, args.step));

    let report = json!({
        "hitting_point": hitting_point,
        "time_to_height_s": time_to_height,
        "trajectory": trajectory,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
