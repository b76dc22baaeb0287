// scout_core/src/planning/mod.rs

pub mod dijkstra;
