// scout_core/src/perception/mod.rs

//! When to look, and when to believe what was seen.

pub mod gate;
pub mod scheduler;

pub use gate::{DetectionGate, GateVerdict, RejectReason};
pub use scheduler::{ModeBudget, ScanBudget, ScanGrant, ScanMode, ScanScheduler};
