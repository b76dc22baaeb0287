// scout_sim/src/prelude.rs

// Re-export the scout_core prelude so plugins see the controller contracts.
pub use scout_core::prelude::*;

// Re-export common simulation-specific types.
pub use crate::simulation::config::structs::*;
pub use crate::simulation::core::prng::SimulationRng;
pub use crate::simulation::core::runner::{RunOptions, RunReport, Simulation};
pub use crate::simulation::core::world::{lock, SharedWorld, World};
pub use crate::simulation::plugins::build_collaborators;
