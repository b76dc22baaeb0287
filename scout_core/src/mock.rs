// scout_core/src/mock.rs

//! Scripted stand-ins for every collaborator.
//!
//! All rig-backed parts share one [`MockRig`] so a test can move the robot,
//! show or hide the person, inject faults, and inspect what the controller
//! commanded, all from the outside.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::abstractions::{
    Camera, CameraMount, Collaborators, Detector, MotionExecutor, ObstacleSource, PoseSource,
    ReportSink, Summarizer,
};
use crate::error::{DetectorError, HardwareFault, SinkError, SummaryUnavailable};
use crate::messages::{BoundingBox, DetectionEvent, Frame, Media, MediaKind};
use crate::mission::MissionRecord;
use crate::search::SweepPosition;
use crate::types::{MotionCommand, ObstacleReading, Pose};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =========================================================================
// == Shared Rig ==
// =========================================================================

#[derive(Debug)]
struct RigState {
    pose: Option<Pose>,
    clearance: Option<ObstacleReading>,
    commands: Vec<MotionCommand>,
    moving: bool,
    motion_fault: Option<HardwareFault>,
    mount: Vec<SweepPosition>,
    frames: usize,
    frame_fault: Option<HardwareFault>,
    capture_fault: Option<HardwareFault>,
    capture_delay: Duration,
    captures: usize,
    person_visible: bool,
    detection: DetectionEvent,
    detector_fault: bool,
}

impl Default for RigState {
    fn default() -> Self {
        Self {
            pose: None,
            clearance: Some(ObstacleReading::new(f64::INFINITY, 0.0)),
            commands: Vec::new(),
            moving: false,
            motion_fault: None,
            mount: Vec::new(),
            frames: 0,
            frame_fault: None,
            capture_fault: None,
            capture_delay: Duration::ZERO,
            captures: 0,
            person_visible: false,
            detection: DetectionEvent::new(BoundingBox::centered(0.5, 0.5, 0.2, 0.5), 0.9, 0.0),
            detector_fault: false,
        }
    }
}

/// Handle to the scripted world. Cheap to clone; all clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockRig {
    state: Arc<Mutex<RigState>>,
}

impl MockRig {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut RigState) -> R) -> R {
        f(&mut lock(&self.state))
    }

    // --- Scripting ---

    pub fn set_pose(&self, pose: Pose) {
        self.with(|s| s.pose = Some(pose));
    }

    pub fn clear_pose(&self) {
        self.with(|s| s.pose = None);
    }

    pub fn set_clearance(&self, reading: ObstacleReading) {
        self.with(|s| s.clearance = Some(reading));
    }

    pub fn clear_clearance(&self) {
        self.with(|s| s.clearance = None);
    }

    pub fn set_person_visible(&self, visible: bool) {
        self.with(|s| s.person_visible = visible);
    }

    /// What the detector reports while the person is visible. The frame
    /// timestamp is filled in per frame.
    pub fn set_detection(&self, detection: DetectionEvent) {
        self.with(|s| s.detection = detection);
    }

    pub fn fail_detector(&self, fail: bool) {
        self.with(|s| s.detector_fault = fail);
    }

    pub fn fail_capture(&self, fault: Option<HardwareFault>) {
        self.with(|s| s.capture_fault = fault);
    }

    /// Makes media capture block (only meaningful with threaded workers).
    pub fn set_capture_delay(&self, delay: Duration) {
        self.with(|s| s.capture_delay = delay);
    }

    pub fn fail_frames(&self, fault: Option<HardwareFault>) {
        self.with(|s| s.frame_fault = fault);
    }

    pub fn fail_motion(&self, fault: Option<HardwareFault>) {
        self.with(|s| s.motion_fault = fault);
    }

    // --- Inspection ---

    pub fn commands(&self) -> Vec<MotionCommand> {
        self.with(|s| s.commands.clone())
    }

    pub fn last_command(&self) -> Option<MotionCommand> {
        self.with(|s| s.commands.last().copied())
    }

    pub fn is_moving(&self) -> bool {
        self.with(|s| s.moving)
    }

    pub fn mount_positions(&self) -> Vec<SweepPosition> {
        self.with(|s| s.mount.clone())
    }

    pub fn frames_captured(&self) -> usize {
        self.with(|s| s.frames)
    }

    pub fn media_captured(&self) -> usize {
        self.with(|s| s.captures)
    }

    /// Builds a full collaborator set over this rig.
    pub fn collaborators(
        &self,
        summarizer: Arc<dyn Summarizer>,
        sinks: Vec<Box<dyn ReportSink>>,
    ) -> Collaborators {
        Collaborators {
            pose: Box::new(self.clone()),
            obstacles: Box::new(self.clone()),
            motion: Box::new(self.clone()),
            mount: Box::new(self.clone()),
            camera: Arc::new(self.clone()),
            detector: Arc::new(self.clone()),
            summarizer,
            sinks,
        }
    }
}

impl PoseSource for MockRig {
    fn latest_pose(&mut self) -> Option<Pose> {
        self.with(|s| s.pose)
    }
}

impl ObstacleSource for MockRig {
    fn latest_clearance(&mut self) -> Option<ObstacleReading> {
        self.with(|s| s.clearance)
    }
}

impl MotionExecutor for MockRig {
    fn drive(&mut self, forward: f64, turn: f64) -> Result<(), HardwareFault> {
        self.with(|s| {
            if let Some(fault) = s.motion_fault.clone() {
                return Err(fault);
            }
            s.commands.push(MotionCommand::Move { forward, turn });
            s.moving = forward != 0.0 || turn != 0.0;
            Ok(())
        })
    }

    fn stop(&mut self) -> Result<(), HardwareFault> {
        self.with(|s| {
            s.commands.push(MotionCommand::Stop);
            s.moving = false;
            Ok(())
        })
    }

    fn is_moving(&self) -> bool {
        self.with(|s| s.moving)
    }
}

impl CameraMount for MockRig {
    fn point(&mut self, position: SweepPosition) -> Result<(), HardwareFault> {
        self.with(|s| s.mount.push(position));
        Ok(())
    }
}

impl Camera for MockRig {
    fn capture_frame(&self) -> Result<Frame, HardwareFault> {
        self.with(|s| {
            if let Some(fault) = s.frame_fault.clone() {
                return Err(fault);
            }
            s.frames += 1;
            Ok(Frame::empty(0.0))
        })
    }

    fn capture_media(&self, kind: MediaKind) -> Result<Media, HardwareFault> {
        let delay = self.with(|s| s.capture_delay);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.with(|s| {
            if let Some(fault) = s.capture_fault.clone() {
                return Err(fault);
            }
            s.captures += 1;
            Ok(Media {
                kind,
                location: format!("mock://media/{}", s.captures),
                captured_at: 0.0,
            })
        })
    }
}

impl Detector for MockRig {
    fn detect(&self, frame: &Frame) -> Result<Option<DetectionEvent>, DetectorError> {
        self.with(|s| {
            if s.detector_fault {
                return Err(DetectorError("mock detector offline".into()));
            }
            if !s.person_visible {
                return Ok(None);
            }
            Ok(Some(DetectionEvent {
                frame_timestamp: frame.timestamp,
                ..s.detection.clone()
            }))
        })
    }
}

// =========================================================================
// == Summarizer & Sinks ==
// =========================================================================

/// Answers from a script; once the script runs out, repeats `fallback`.
#[derive(Debug)]
pub struct ScriptedSummarizer {
    script: Mutex<VecDeque<Result<String, SummaryUnavailable>>>,
    fallback: Result<String, SummaryUnavailable>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedSummarizer {
    pub fn new(script: Vec<Result<String, SummaryUnavailable>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Err(SummaryUnavailable::Failed("script exhausted".into())),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(answer: Result<String, SummaryUnavailable>) -> Self {
        Self {
            fallback: answer,
            ..Self::new(Vec::new())
        }
    }

    /// Blocks each call for `delay` (only meaningful with threaded workers).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        lock(&self.prompts).len()
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

impl Summarizer for ScriptedSummarizer {
    fn summarize(&self, _media: &Media, prompt: &str) -> Result<String, SummaryUnavailable> {
        lock(&self.prompts).push(prompt.to_string());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Keeps every record it receives.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    name: String,
    received: Arc<Mutex<Vec<MissionRecord>>>,
}

impl RecordingSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: Arc::default(),
        }
    }

    pub fn received(&self) -> Vec<MissionRecord> {
        lock(&self.received).clone()
    }
}

impl ReportSink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, record: &MissionRecord) -> Result<(), SinkError> {
        lock(&self.received).push(record.clone());
        Ok(())
    }
}

/// Rejects every record.
#[derive(Debug, Clone)]
pub struct FailingSink {
    name: String,
}

impl FailingSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ReportSink for FailingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, _record: &MissionRecord) -> Result<(), SinkError> {
        Err(SinkError::new(&self.name, "unreachable"))
    }
}
