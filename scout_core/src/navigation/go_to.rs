// scout_core/src/navigation/go_to.rs

use nalgebra::Point2;
use std::f64::consts::FRAC_PI_2;

use crate::config::NavigationConfig;
use crate::types::{MotionCommand, Pose};

/// Steers towards a point at cruise speed, slowing on approach.
///
/// Turn rate is proportional to the heading error. Forward speed is scaled by
/// the cosine of that error and drops to zero beyond 90 degrees, so a target
/// behind the robot is turned towards in place before driving.
#[derive(Debug, Clone)]
pub struct SimpleGoTo {
    pub cruise_speed: f64,
    pub max_turn_rate: f64,
    pub heading_gain: f64,
    pub approach_distance: f64,
}

impl SimpleGoTo {
    pub fn from_config(config: &NavigationConfig) -> Self {
        Self {
            cruise_speed: config.cruise_speed,
            max_turn_rate: config.max_turn_rate,
            heading_gain: config.heading_gain,
            approach_distance: config.approach_distance,
        }
    }

    pub fn command(&self, pose: &Pose, target: &Point2<f64>) -> MotionCommand {
        let distance = pose.distance_to(target);
        let heading_error = pose.relative_bearing(target);

        let turn = (self.heading_gain * heading_error).clamp(-self.max_turn_rate, self.max_turn_rate);

        let heading_scale = if heading_error.abs() > FRAC_PI_2 {
            0.0
        } else {
            heading_error.cos()
        };
        let approach_scale = (distance / self.approach_distance).min(1.0);
        let forward = self.cruise_speed * heading_scale * approach_scale;

        sanitize(forward, turn)
    }
}

/// NaN/inf from a bad pose must never reach the motors.
fn sanitize(forward: f64, turn: f64) -> MotionCommand {
    if forward.is_finite() && turn.is_finite() {
        MotionCommand::Move { forward, turn }
    } else {
        MotionCommand::Stop
    }
}
