// scout_core/src/error.rs

use thiserror::Error;

use crate::mapping::WaypointId;

/// Top-level error taxonomy for a mission.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MissionError {
    #[error("{sensor} reading is stale (age {age:.2}s > {max_age:.2}s)")]
    Stale {
        sensor: &'static str,
        age: f64,
        max_age: f64,
    },

    #[error(transparent)]
    HardwareFault(#[from] HardwareFault),

    #[error(transparent)]
    SummaryUnavailable(#[from] SummaryUnavailable),

    #[error("state {state} exceeded its dwell limit of {limit:.1}s")]
    Timeout { state: String, limit: f64 },

    #[error("mission cancelled")]
    Cancelled,

    #[error("a mission is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Map(#[from] MapError),

    #[error("worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A motion or camera executor reported failure.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{device} fault: {message}")]
pub struct HardwareFault {
    pub device: String,
    pub message: String,
}

impl HardwareFault {
    pub fn new(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SummaryUnavailable {
    #[error("summarizer timed out")]
    TimedOut,
    #[error("summarizer failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MapError {
    #[error("waypoint '{0}' already exists")]
    Duplicate(WaypointId),
    #[error("unknown waypoint '{0}'")]
    Unknown(WaypointId),
    #[error("no route from '{from}' to '{to}'")]
    NoRoute { from: WaypointId, to: WaypointId },
    #[error("no home waypoint is set")]
    NoHome,
    #[error("invalid traversal cost {cost} on edge '{from}' -> '{to}'")]
    InvalidCost {
        from: WaypointId,
        to: WaypointId,
        cost: f64,
    },
    #[error("waypoints disconnected from home: {0:?}")]
    Disconnected(Vec<WaypointId>),
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("detector error: {0}")]
pub struct DetectorError(pub String);

#[derive(Debug, Error, Clone, PartialEq)]
#[error("sink '{sink}' failed: {message}")]
pub struct SinkError {
    pub sink: String,
    pub message: String,
}

impl SinkError {
    pub fn new(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid configuration: {field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Attempt to modify a mission record after its terminal state.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("mission record {0} is closed")]
pub struct RecordClosed(pub uuid::Uuid);

/// Persistence failures of the map/home store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed map file {path}: {source}")]
    Format {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Map(#[from] MapError),
}
