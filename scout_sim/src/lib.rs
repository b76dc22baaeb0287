// scout_sim/src/lib.rs

//! Simulated house for the Scout mission controller: a ground-truth world,
//! noisy devices wired to it, and the fixed-step loop that runs a mission.

// This prelude is for convenience for other files WITHIN the scout_sim crate.
pub mod prelude;

pub mod cli;
pub mod simulation;

pub use simulation::config::load_scenario;
pub use simulation::core::runner::{RunOptions, RunReport, Simulation};
