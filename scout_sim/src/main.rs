// scout_sim/src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scout_sim::cli::{Cli, Command};
use scout_sim::prelude::*;
use scout_sim::simulation::config::load_scenario;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    match cli.command {
        Some(Command::Defaults) => {
            let text = toml::to_string_pretty(&MissionConfig::default())
                .context("failed to serialize the default mission config")?;
            println!("{text}");
            Ok(())
        }
        None => run(&cli),
    }
}

fn init_logging(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter '{directives}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let mut scenario = load_scenario(&cli.scenario)?;
    if cli.seed.is_some() {
        scenario.simulation.seed = cli.seed;
    }
    if cli.cancel_at.is_some() {
        scenario.simulation.cancel_at = cli.cancel_at;
    }

    let options = RunOptions {
        state_dir: cli.state_dir.clone(),
        realtime: cli.realtime,
    };
    let report = Simulation::new(scenario, &options)?.run()?;

    println!(
        "Mission finished in state {} after {:.1}s simulated ({} ticks, {} collisions)",
        report.final_state, report.sim_time, report.ticks, report.collisions
    );
    if let Some(reason) = report.record.as_ref().and_then(MissionRecord::reason) {
        println!("Reason: {reason}");
    }
    if let Some(identity) = report.record.as_ref().and_then(MissionRecord::identity) {
        println!("Found: {identity}");
    }
    for delivery in &report.deliveries {
        let status = if delivery.delivered { "ok" } else { "FAILED" };
        println!("  sink {:<8} {status}", delivery.sink);
    }
    Ok(())
}
