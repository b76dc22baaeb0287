// scout_core/src/config.rs

//! Tunable parameters of the mission controller.
//!
//! Every section deserializes with per-field defaults, so a scenario file only
//! has to name the values it changes. Call [`MissionConfig::validate`] before
//! use; [`crate::mission::MissionController::new`] does this for you.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::messages::MediaKind;
use crate::search::SweepPosition;

pub const DEFAULT_PROMPT: &str =
    "Describe what is happening in this picture in one, simple sentence.";
pub const DEFAULT_PLACEHOLDER: &str = "person found, summary unavailable";

// =========================================================================
// == Top Level ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MissionConfig {
    /// Human-readable target description stored in every record.
    pub target: String,
    pub detection: DetectionConfig,
    pub navigation: NavigationConfig,
    pub scan: ScanConfig,
    pub search: SearchConfig,
    pub capture: CaptureConfig,
    pub dwell: DwellLimits,
    /// How many times `Returning` re-plans after a timeout before failing.
    pub returning_retries: u32,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            target: "find person".to_string(),
            detection: DetectionConfig::default(),
            navigation: NavigationConfig::default(),
            scan: ScanConfig::default(),
            search: SearchConfig::default(),
            capture: CaptureConfig::default(),
            dwell: DwellLimits::default(),
            returning_retries: 2,
        }
    }
}

// =========================================================================
// == Sections ==
// =========================================================================

/// Confirmation policy of the detection gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    pub confidence_threshold: f64,
    /// K: hits needed inside the window, opener included.
    pub required_hits: usize,
    /// N: frames the window may span, opener included.
    pub window_frames: usize,
    /// Seconds after the opening frame before the candidate is discarded.
    pub window_duration: f64,
    /// Minimum IoU with the last accepted region for a frame to count.
    pub min_overlap: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            required_hits: 3,
            window_frames: 5,
            window_duration: 3.0,
            min_overlap: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Sign of the turn rate (counter-clockwise positive).
    pub fn sign(self) -> f64 {
        match self {
            TurnDirection::Left => 1.0,
            TurnDirection::Right => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AvoidanceConfig {
    /// Seconds to stay stopped before rotating.
    pub stop_duration: f64,
    /// Degrees to rotate away from the obstruction.
    pub rotate_angle_deg: f64,
    pub rotate_rate: f64,
    pub direction: TurnDirection,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            stop_duration: 0.3,
            rotate_angle_deg: 45.0,
            rotate_rate: 1.0,
            direction: TurnDirection::Left,
        }
    }
}

impl AvoidanceConfig {
    pub fn rotate_duration(&self) -> f64 {
        self.rotate_angle_deg.to_radians().abs() / self.rotate_rate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationConfig {
    /// Clearance (m) below which the avoidance maneuver takes over.
    pub safety_clearance: f64,
    pub pose_max_age: f64,
    pub obstacle_max_age: f64,
    pub position_tolerance: f64,
    pub cruise_speed: f64,
    pub max_turn_rate: f64,
    /// Proportional gain on heading error.
    pub heading_gain: f64,
    /// Distance (m) inside which forward speed is scaled down.
    pub approach_distance: f64,
    pub avoidance: AvoidanceConfig,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            safety_clearance: 0.35,
            pose_max_age: 0.5,
            obstacle_max_age: 0.5,
            position_tolerance: 0.25,
            cruise_speed: 0.3,
            max_turn_rate: 1.2,
            heading_gain: 2.0,
            approach_distance: 0.6,
            avoidance: AvoidanceConfig::default(),
        }
    }
}

/// Sampling interval and concurrency cap for one scan mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeScanConfig {
    pub interval: f64,
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub travel: ModeScanConfig,
    pub search: ModeScanConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            travel: ModeScanConfig {
                interval: 1.0,
                max_in_flight: 1,
            },
            search: ModeScanConfig {
                interval: 0.5,
                max_in_flight: 2,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub positions: Vec<SweepPosition>,
    /// Append the `Up`/`Down` positions when a tilt mechanism is fitted.
    pub tilt: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            positions: vec![SweepPosition::Left, SweepPosition::Center, SweepPosition::Right],
            tilt: false,
        }
    }
}

impl SearchConfig {
    pub fn sweep(&self) -> Vec<SweepPosition> {
        let mut positions = self.positions.clone();
        if self.tilt {
            positions.extend([SweepPosition::Up, SweepPosition::Down]);
        }
        positions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub media: MediaKind,
    pub prompt: String,
    pub placeholder: String,
    /// Total seconds granted to the summarizer, retries included.
    pub summary_timeout: f64,
    pub summarize_attempts: u32,
    pub retry_backoff: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            media: MediaKind::Image,
            prompt: DEFAULT_PROMPT.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            summary_timeout: 30.0,
            summarize_attempts: 3,
            retry_backoff: 1.0,
        }
    }
}

/// Maximum seconds spent in each non-terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DwellLimits {
    pub record_home: f64,
    pub traveling: f64,
    pub searching: f64,
    pub confirming: f64,
    pub capturing: f64,
    pub summarizing: f64,
    pub returning: f64,
    pub reporting: f64,
}

impl Default for DwellLimits {
    fn default() -> Self {
        Self {
            record_home: 5.0,
            traveling: 60.0,
            searching: 20.0,
            confirming: 10.0,
            capturing: 10.0,
            summarizing: 45.0,
            returning: 90.0,
            reporting: 10.0,
        }
    }
}

// =========================================================================
// == Validation ==
// =========================================================================

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::new(field, format!("must be positive, got {value}")))
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::new(field, format!("must lie in [0, 1], got {value}")))
    }
}

impl MissionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detection;
        unit_interval("detection.confidence_threshold", d.confidence_threshold)?;
        unit_interval("detection.min_overlap", d.min_overlap)?;
        if d.required_hits == 0 {
            return Err(ConfigError::new("detection.required_hits", "must be at least 1"));
        }
        if d.required_hits > d.window_frames {
            return Err(ConfigError::new(
                "detection.required_hits",
                format!(
                    "K = {} cannot exceed N = {}",
                    d.required_hits, d.window_frames
                ),
            ));
        }
        positive("detection.window_duration", d.window_duration)?;

        let n = &self.navigation;
        positive("navigation.safety_clearance", n.safety_clearance)?;
        positive("navigation.pose_max_age", n.pose_max_age)?;
        positive("navigation.obstacle_max_age", n.obstacle_max_age)?;
        positive("navigation.position_tolerance", n.position_tolerance)?;
        positive("navigation.cruise_speed", n.cruise_speed)?;
        positive("navigation.max_turn_rate", n.max_turn_rate)?;
        positive("navigation.heading_gain", n.heading_gain)?;
        positive("navigation.approach_distance", n.approach_distance)?;
        positive("navigation.avoidance.rotate_rate", n.avoidance.rotate_rate)?;
        if n.avoidance.stop_duration < 0.0 {
            return Err(ConfigError::new(
                "navigation.avoidance.stop_duration",
                "cannot be negative",
            ));
        }

        for (field, mode) in [("scan.travel", &self.scan.travel), ("scan.search", &self.scan.search)] {
            positive(field, mode.interval)?;
            if mode.max_in_flight == 0 {
                return Err(ConfigError::new(field, "max_in_flight must be at least 1"));
            }
        }

        if self.search.sweep().is_empty() {
            return Err(ConfigError::new("search.positions", "sweep has no positions"));
        }

        let c = &self.capture;
        positive("capture.summary_timeout", c.summary_timeout)?;
        if c.summarize_attempts == 0 {
            return Err(ConfigError::new("capture.summarize_attempts", "must be at least 1"));
        }
        if c.retry_backoff < 0.0 {
            return Err(ConfigError::new("capture.retry_backoff", "cannot be negative"));
        }
        if let MediaKind::Clip { seconds } = c.media {
            positive("capture.media.seconds", seconds)?;
        }

        let w = &self.dwell;
        for (field, limit) in [
            ("dwell.record_home", w.record_home),
            ("dwell.traveling", w.traveling),
            ("dwell.searching", w.searching),
            ("dwell.confirming", w.confirming),
            ("dwell.capturing", w.capturing),
            ("dwell.summarizing", w.summarizing),
            ("dwell.returning", w.returning),
            ("dwell.reporting", w.reporting),
        ] {
            positive(field, limit)?;
        }
        if c.summary_timeout > w.summarizing {
            return Err(ConfigError::new(
                "capture.summary_timeout",
                format!(
                    "{}s exceeds the Summarizing dwell limit of {}s",
                    c.summary_timeout, w.summarizing
                ),
            ));
        }
        if d.window_duration > w.confirming {
            return Err(ConfigError::new(
                "detection.window_duration",
                format!(
                    "{}s exceeds the Confirming dwell limit of {}s",
                    d.window_duration, w.confirming
                ),
            ));
        }
        Ok(())
    }
}
