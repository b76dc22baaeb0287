// scout_sim/src/simulation/plugins/vehicles/mod.rs

pub mod diff_drive;
