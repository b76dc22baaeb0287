// scout_core/src/prelude.rs

// --- Collaborator Contracts ---
pub use crate::abstractions::{
    Camera, CameraMount, Collaborators, Detector, MotionExecutor, ObstacleSource, PoseSource,
    ReportSink, Summarizer,
};

// --- Data ---
pub use crate::mapping::{MapStore, Waypoint, WaypointId, WaypointMap};
pub use crate::messages::{BoundingBox, DetectionEvent, Frame, Media, MediaKind};
pub use crate::search::SweepPosition;
pub use crate::types::{MotionCommand, ObstacleReading, Pose, Timestamp};

// --- Mission ---
pub use crate::config::MissionConfig;
pub use crate::error::{
    DetectorError, HardwareFault, MapError, MissionError, SinkError, StoreError,
    SummaryUnavailable,
};
pub use crate::mission::{
    MissionController, MissionId, MissionRecord, MissionState, MissionStatus, Outcome,
};
pub use crate::worker::{CancelToken, Workers};
