// scout_core/src/messages.rs

//! Data exchanged with the camera, detector and summarizer collaborators.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// =========================================================================
// == Camera Output ==
// =========================================================================

/// A low-resolution scan frame. The pixels are opaque to the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub timestamp: Timestamp,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }
}

/// What the high-resolution capture should produce.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Image,
    Clip { seconds: f64 },
}

/// A reference to captured media. The record carries the location, not the bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    /// Where the capture was stored (file path, URL, ...).
    pub location: String,
    pub captured_at: Timestamp,
}

// =========================================================================
// == Detector Output ==
// =========================================================================

/// Axis-aligned region in normalized image coordinates ([0, 1] on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min: x_min.min(x_max),
            y_min: y_min.min(y_max),
            x_max: x_max.max(x_min),
            y_max: y_max.max(y_min),
        }
    }

    /// A box of `width` x `height` centred on (`cx`, `cy`).
    pub fn centered(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::new(
            cx - width / 2.0,
            cy - height / 2.0,
            cx + width / 2.0,
            cy + height / 2.0,
        )
    }

    pub fn area(&self) -> f64 {
        (self.x_max - self.x_min).max(0.0) * (self.y_max - self.y_min).max(0.0)
    }

    /// Intersection over union. Degenerate boxes overlap nothing.
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f64 {
        let ix = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let iy = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// One candidate person detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub region: BoundingBox,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub frame_timestamp: Timestamp,
    /// Who was recognized, when the detector knows the face. `None` is an
    /// unknown person.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl DetectionEvent {
    pub fn new(region: BoundingBox, confidence: f64, frame_timestamp: Timestamp) -> Self {
        Self {
            region,
            confidence: confidence.clamp(0.0, 1.0),
            frame_timestamp,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The recognized name, or `"Unknown"`.
    pub fn identity(&self) -> &str {
        self.label.as_deref().unwrap_or(UNKNOWN_PERSON)
    }
}

/// How an unrecognized person is reported.
pub const UNKNOWN_PERSON: &str = "Unknown";

/// The detector's answer for a single frame, as fed to the detection gate.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameObservation {
    pub timestamp: Timestamp,
    pub detection: Option<DetectionEvent>,
}

impl FrameObservation {
    pub fn miss(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            detection: None,
        }
    }

    pub fn hit(event: DetectionEvent) -> Self {
        Self {
            timestamp: event.frame_timestamp,
            detection: Some(event),
        }
    }
}
