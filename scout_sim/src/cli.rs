// scout_sim/src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scout: a home robot that goes looking for someone and reports back.
///
/// Without a subcommand, runs one mission in the simulated house described
/// by the scenario file.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/home_search.toml")]
    pub scenario: PathBuf,

    /// Directory holding the persisted map and the web reports.
    #[arg(long, default_value = "scout_state")]
    pub state_dir: PathBuf,

    /// Pace the simulation against the wall clock and use worker threads.
    #[arg(long, default_value_t = false)]
    pub realtime: bool,

    /// Override the scenario's random seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Cancel the mission at this simulated time (seconds).
    #[arg(long)]
    pub cancel_at: Option<f64>,

    /// Log filter, e.g. `debug` or `scout_core=trace`. Falls back to RUST_LOG.
    #[arg(long)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the default mission configuration as TOML.
    Defaults,
}
