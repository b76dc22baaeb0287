// scout_sim/src/simulation/plugins/mod.rs

pub mod camera;
pub mod sensors;
pub mod services;
pub mod sinks;
pub mod vehicles;

use std::io;
use std::path::Path;
use std::sync::Arc;

use scout_core::abstractions::{Collaborators, ReportSink};
use scout_core::worker::Workers;

use crate::simulation::config::ScenarioConfig;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::world::SharedWorld;

use camera::{SimCamera, SimDetector, SimMount};
use sensors::{pose::SimLocalizer, range::SimRangeSensor};
use services::SimSummarizer;
use sinks::{AudioSink, DisplaySink, WebSink};
use vehicles::diff_drive::DiffDrive;

// Random streams, one per noisy device.
const POSE_STREAM: u64 = 1;
const RANGE_STREAM: u64 = 2;
const CAMERA_STREAM: u64 = 3;
const DETECTOR_STREAM: u64 = 4;
const SUMMARIZER_STREAM: u64 = 5;

/// Wires every simulated device to `world` and returns them as the
/// controller's collaborator set. Web reports go under `state_dir/reports`.
pub fn build_collaborators(
    scenario: &ScenarioConfig,
    world: &SharedWorld,
    workers: Workers,
    state_dir: &Path,
) -> Collaborators {
    let seed = scenario.simulation.seed;
    let description = scenario
        .world
        .person
        .as_ref()
        .map_or_else(|| "An empty room.".to_string(), |p| p.activity.clone());

    let mut sinks: Vec<Box<dyn ReportSink>> = Vec::new();
    if scenario.sinks.display {
        sinks.push(Box::new(DisplaySink::stdout()));
    }
    if scenario.sinks.web {
        sinks.push(Box::new(WebSink::new(state_dir.join("reports"))));
    }
    if scenario.sinks.audio {
        sinks.push(Box::new(AudioSink::new(io::stdout())));
    }

    Collaborators {
        pose: Box::new(SimLocalizer::new(
            world.clone(),
            &scenario.sensors.pose,
            SimulationRng::new(seed, POSE_STREAM),
        )),
        obstacles: Box::new(SimRangeSensor::new(
            world.clone(),
            &scenario.sensors.range,
            SimulationRng::new(seed, RANGE_STREAM),
        )),
        motion: Box::new(DiffDrive::new(world.clone())),
        mount: Box::new(SimMount::new(world.clone())),
        camera: Arc::new(SimCamera::new(
            world.clone(),
            &scenario.camera,
            SimulationRng::new(seed, CAMERA_STREAM),
        )),
        detector: Arc::new(SimDetector::new(
            world.clone(),
            &scenario.camera,
            &scenario.detector,
            SimulationRng::new(seed, DETECTOR_STREAM),
        )),
        summarizer: Arc::new(SimSummarizer::new(
            description,
            &scenario.summarizer,
            workers,
            SimulationRng::new(seed, SUMMARIZER_STREAM),
        )),
        sinks,
    }
}
