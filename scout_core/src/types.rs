// scout_core/src/types.rs

use nalgebra::{Isometry2, Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::utils::serde_helpers;

// --- Core Time Alias ---
/// Seconds on the controller's monotonic clock.
pub type Timestamp = f64;

// =========================================================================
// == Pose & Obstacle Readings ==
// =========================================================================

/// A planar robot pose as delivered by the pose estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    #[serde(with = "serde_helpers::point2_as_array")]
    pub position: Point2<f64>,
    /// Heading in radians, counter-clockwise from +X.
    pub heading: f64,
    pub timestamp: Timestamp,
}

impl Pose {
    pub fn new(x: f64, y: f64, heading: f64, timestamp: Timestamp) -> Self {
        Self {
            position: Point2::new(x, y),
            heading,
            timestamp,
        }
    }

    pub fn to_isometry(&self) -> Isometry2<f64> {
        Isometry2::new(self.position.coords, self.heading)
    }

    /// Age of the reading relative to `now`. Readings from the future count as fresh.
    pub fn age(&self, now: Timestamp) -> f64 {
        (now - self.timestamp).max(0.0)
    }

    pub fn distance_to(&self, target: &Point2<f64>) -> f64 {
        (target - self.position).norm()
    }

    /// Bearing to `target` relative to the current heading, wrapped to [-PI, PI].
    pub fn relative_bearing(&self, target: &Point2<f64>) -> f64 {
        let delta: Vector2<f64> = target - self.position;
        wrap_angle(delta.y.atan2(delta.x) - self.heading)
    }
}

/// Minimum clearance along the current heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleReading {
    /// Free distance in meters. `f64::INFINITY` means nothing in range.
    pub clearance: f64,
    pub timestamp: Timestamp,
}

impl ObstacleReading {
    pub fn new(clearance: f64, timestamp: Timestamp) -> Self {
        Self {
            clearance,
            timestamp,
        }
    }

    pub fn age(&self, now: Timestamp) -> f64 {
        (now - self.timestamp).max(0.0)
    }
}

// =========================================================================
// == Motion ==
// =========================================================================

/// A single command for the motion executor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionCommand {
    Move {
        /// m/s, positive forward.
        forward: f64,
        /// rad/s, positive counter-clockwise.
        turn: f64,
    },
    Stop,
}

impl MotionCommand {
    pub fn forward_velocity(&self) -> f64 {
        match self {
            MotionCommand::Move { forward, .. } => *forward,
            MotionCommand::Stop => 0.0,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, MotionCommand::Stop)
    }
}

/// Normalizes an angle to [-PI, PI].
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}
