// scout_core/src/mission/mod.rs

mod controller;
pub mod pipeline;
mod record;
mod state;

pub use controller::{MissionController, MissionStatus};
pub use pipeline::SinkDelivery;
pub use record::{MissionId, MissionRecord, Outcome, Transition};
pub use state::MissionState;
