// scout_sim/src/simulation/plugins/sensors/mod.rs

pub mod pose;
pub mod range;
