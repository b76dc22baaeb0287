// scout_sim/src/simulation/config/structs.rs

use serde::{Deserialize, Serialize};

use scout_core::config::MissionConfig;
use scout_core::error::MapError;
use scout_core::mapping::{Waypoint, WaypointId, WaypointMap};

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// # ScenarioConfig
/// Root of a `scenario.toml` file: the simulated house, the robot and its
/// devices, and the mission tunables handed to the controller untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationSection,

    #[serde(default)]
    pub mission: MissionConfig,

    #[serde(default)]
    pub world: WorldConfig,

    #[serde(default)]
    pub robot: RobotConfig,

    /// The TOML has `[[waypoints]]`, which becomes a Vec of WaypointConfig.
    #[serde(default)]
    pub waypoints: Vec<WaypointConfig>,

    #[serde(default)]
    pub sensors: SensorsConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub summarizer: SummarizerConfig,

    #[serde(default)]
    pub sinks: SinksConfig,
}

// =========================================================================
// == Sections ==
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// The run stops here even if the mission has not ended.
    pub duration_seconds: f64,
    /// Control loop frequency in Hz.
    pub tick_rate: f64,
    /// Simulated time at which `start_mission` is issued.
    #[serde(default)]
    pub start_at: f64,
    /// Simulated time at which `cancel` is issued, if any.
    #[serde(default)]
    pub cancel_at: Option<f64>,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: None,
            duration_seconds: 600.0,
            tick_rate: 20.0,
            start_at: 0.0,
            cancel_at: None,
        }
    }
}

impl SimulationSection {
    pub fn dt(&self) -> f64 {
        1.0 / self.tick_rate
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldConfig {
    /// Walls as `[min_x, min_y, max_x, max_y]` in meters.
    pub bounds: [f64; 4],
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    #[serde(default)]
    pub person: Option<PersonConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bounds: [-5.0, -5.0, 5.0, 5.0],
            obstacles: Vec::new(),
            person: None,
        }
    }
}

/// A round piece of furniture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObstacleConfig {
    pub center: [f64; 2],
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonConfig {
    pub position: [f64; 2],
    /// Name the detector recognizes the person by. Unset means a stranger.
    #[serde(default)]
    pub name: Option<String>,
    /// What the simulated summarizer "sees".
    #[serde(default = "default_activity")]
    pub activity: String,
}

fn default_activity() -> String {
    "A person is standing in the room.".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotConfig {
    pub start: [f64; 2],
    /// Initial heading in degrees, counter-clockwise from +x.
    #[serde(default)]
    pub heading_deg: f64,
    pub max_speed: f64,
    pub max_turn_rate: f64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            start: [0.0, 0.0],
            heading_deg: 0.0,
            max_speed: 0.5,
            max_turn_rate: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaypointConfig {
    pub id: String,
    pub position: [f64; 2],
    #[serde(default)]
    pub heading_deg: f64,
    /// Two-way links; the cost is the straight-line distance.
    #[serde(default)]
    pub links: Vec<String>,
    /// One-way links from this waypoint.
    #[serde(default)]
    pub one_way: Vec<String>,
    /// Marks this waypoint as a pre-recorded Home.
    #[serde(default)]
    pub home: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorsConfig {
    #[serde(default)]
    pub pose: PoseSensorConfig,
    #[serde(default)]
    pub range: RangeSensorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoseSensorConfig {
    /// Publication rate in Hz.
    pub rate: f64,
    pub position_noise_stddev: f64,
    pub heading_noise_stddev: f64,
    /// `[start, duration]` windows in which the localizer publishes nothing.
    #[serde(default)]
    pub dropouts: Vec<[f64; 2]>,
}

impl Default for PoseSensorConfig {
    fn default() -> Self {
        Self {
            rate: 10.0,
            position_noise_stddev: 0.02,
            heading_noise_stddev: 0.01,
            dropouts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeSensorConfig {
    pub rate: f64,
    pub max_range: f64,
    pub noise_stddev: f64,
}

impl Default for RangeSensorConfig {
    fn default() -> Self {
        Self {
            rate: 10.0,
            max_range: 4.0,
            noise_stddev: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraConfig {
    pub fov_deg: f64,
    pub max_range: f64,
    /// Probability that a high-resolution capture fails.
    #[serde(default)]
    pub capture_failure_rate: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 60.0,
            max_range: 4.0,
            capture_failure_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    /// Confidence for a person right in front of the camera.
    pub base_confidence: f64,
    pub noise_stddev: f64,
    /// Per-frame probability of a spurious detection.
    pub false_positive_rate: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            base_confidence: 0.95,
            noise_stddev: 0.03,
            false_positive_rate: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummarizerConfig {
    /// Seconds per call (only slept in real time).
    pub latency: f64,
    /// Probability that a single call fails.
    pub failure_rate: f64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            latency: 2.0,
            failure_rate: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinksConfig {
    pub display: bool,
    pub web: bool,
    pub audio: bool,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            display: true,
            web: true,
            audio: true,
        }
    }
}

// =========================================================================
// == Conversions ==
// =========================================================================

impl ScenarioConfig {
    /// Builds the waypoint graph described by `[[waypoints]]`.
    pub fn waypoint_map(&self) -> Result<WaypointMap, MapError> {
        let mut map = WaypointMap::new();
        for wp in &self.waypoints {
            let [x, y] = wp.position;
            map.insert(Waypoint::new(wp.id.as_str(), x, y).with_heading(wp.heading_deg.to_radians()))?;
        }
        for wp in &self.waypoints {
            let from = WaypointId::new(wp.id.as_str());
            for (to, both) in wp
                .links
                .iter()
                .map(|l| (l, true))
                .chain(wp.one_way.iter().map(|l| (l, false)))
            {
                let to = WaypointId::new(to.as_str());
                let cost = straight_line(&map, &from, &to)?;
                if both {
                    map.connect_both(&from, &to, cost)?;
                } else {
                    map.connect(&from, &to, cost)?;
                }
            }
        }
        if let Some(home) = self.waypoints.iter().find(|wp| wp.home) {
            map.set_home(WaypointId::new(home.id.as_str()))?;
        }
        Ok(map)
    }
}

fn straight_line(map: &WaypointMap, a: &WaypointId, b: &WaypointId) -> Result<f64, MapError> {
    let pa = map.get(a).ok_or_else(|| MapError::Unknown(a.clone()))?;
    let pb = map.get(b).ok_or_else(|| MapError::Unknown(b.clone()))?;
    Ok((pa.position - pb.position).norm())
}
