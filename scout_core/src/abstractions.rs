// scout_core/src/abstractions.rs

//! Contracts for everything the mission controller talks to.
//!
//! The controller never touches hardware or services directly; the runtime
//! (or a test rig) hands it one implementation of each trait below.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{DetectorError, HardwareFault, SinkError, SummaryUnavailable};
use crate::messages::{DetectionEvent, Frame, Media, MediaKind};
use crate::mission::MissionRecord;
use crate::search::SweepPosition;
use crate::types::{ObstacleReading, Pose};

// --- SENSOR SOURCES ---
// Both are polled once per tick and answer with the last value they have.
// Freshness is judged by the caller, not the source.

pub trait PoseSource: Send {
    fn latest_pose(&mut self) -> Option<Pose>;
}

pub trait ObstacleSource: Send {
    fn latest_clearance(&mut self) -> Option<ObstacleReading>;
}

// --- ACTUATORS ---

/// Sole owner of the drive hardware.
pub trait MotionExecutor: Send {
    /// Fire-and-forget velocity command (m/s, rad/s).
    fn drive(&mut self, forward: f64, turn: f64) -> Result<(), HardwareFault>;

    fn stop(&mut self) -> Result<(), HardwareFault>;

    /// Whether the base is still moving (it may coast after a stop).
    fn is_moving(&self) -> bool;
}

/// Pan/tilt mechanism carrying the camera.
pub trait CameraMount: Send {
    fn point(&mut self, position: SweepPosition) -> Result<(), HardwareFault>;
}

// --- CAMERA & MODELS ---
// These are shared with worker threads, hence `Send + Sync`.

pub trait Camera: Send + Sync {
    /// Low resolution, fast. Called from the control loop.
    fn capture_frame(&self) -> Result<Frame, HardwareFault>;

    /// High resolution image or clip for the report. May block.
    fn capture_media(&self, kind: MediaKind) -> Result<Media, HardwareFault>;
}

pub trait Detector: Send + Sync {
    /// Best person candidate in the frame, if any.
    fn detect(&self, frame: &Frame) -> Result<Option<DetectionEvent>, DetectorError>;
}

pub trait Summarizer: Send + Sync {
    fn summarize(&self, media: &Media, prompt: &str) -> Result<String, SummaryUnavailable>;
}

// --- REPORTING ---

/// A destination for the closed mission record (display, web, audio, ...).
pub trait ReportSink: Send {
    fn name(&self) -> &str;

    fn send(&mut self, record: &MissionRecord) -> Result<(), SinkError>;
}

/// The full set of collaborators a controller is built from.
pub struct Collaborators {
    pub pose: Box<dyn PoseSource>,
    pub obstacles: Box<dyn ObstacleSource>,
    pub motion: Box<dyn MotionExecutor>,
    pub mount: Box<dyn CameraMount>,
    pub camera: Arc<dyn Camera>,
    pub detector: Arc<dyn Detector>,
    pub summarizer: Arc<dyn Summarizer>,
    pub sinks: Vec<Box<dyn ReportSink>>,
}

impl Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field(
                "sinks",
                &self.sinks.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
