//! Fly a scripted balloon scenario against simulated drones.
//!
//! Usage:
//!   cargo run -p intercept-cli --bin simulate -- --scenario drift --realtime
//!
//! Mission settings come from `INTERCEPT_*` environment variables; set
//! `INTERCEPT_TELEMETRY` to a path to record one JSON line per tick.

use anyhow::{Context, Result};
use clap::Parser;
use intercept_cli::sim::{self, RunOptions, SCENARIOS};
use intercept_cli::{Config, JsonLinesTelemetry};
use intercept_core::{NullTelemetry, TelemetrySink};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Balloon interception simulator
#[derive(Parser, Debug)]
#[command(author, version, about = "Simulate drones keeping a balloon in the air")]
struct Args {
    /// Number of control ticks to run
    #[arg(long, default_value_t = 1200)]
    ticks: u64,

    /// Pace ticks on the wall clock
    #[arg(long)]
    realtime: bool,

    /// Override INTERCEPT_SEED
    #[arg(long)]
    seed: Option<u64>,

    /// Throw script to run
    #[arg(long, default_value = "rally")]
    scenario: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("intercept_cli=info,intercept_core=info"));
    let (plain, json) = if args.json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .init();

    if !SCENARIOS.contains(&args.scenario.as_str()) {
        anyhow::bail!(
            "unknown scenario {:?}, expected one of {}",
            args.scenario,
            SCENARIOS.join(", ")
        );
    }

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut telemetry: Box<dyn TelemetrySink> = match &config.telemetry_path {
        Some(path) => Box::new(
            JsonLinesTelemetry::create(path)
                .with_context(|| format!("cannot open telemetry file {}", path.display()))?,
        ),
        None => Box::new(NullTelemetry),
    };

    let (stop_tx, stop_rx) = broadcast::channel(1);
    // Kept so a failed signal handler cannot close the channel
    let _stop_guard = stop_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
            let _ = stop_tx.send(());
        }
    });

    let options = RunOptions {
        ticks: args.ticks,
        realtime: args.realtime,
        scenario: args.scenario,
    };
    let summary = sim::run(&config, &options, telemetry.as_mut(), stop_rx).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
