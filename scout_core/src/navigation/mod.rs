// scout_core/src/navigation/mod.rs

//! Travel-mode motion: go-to steering under a reactive avoidance override.

mod avoidance;
mod go_to;
mod route;

pub use avoidance::{AvoidanceManeuver, AvoidancePhase};
pub use go_to::SimpleGoTo;
pub use route::{RouteFollower, RouteProgress};

use nalgebra::Point2;
use tracing::debug;

use crate::config::NavigationConfig;
use crate::types::{MotionCommand, ObstacleReading, Pose, Timestamp};

/// Combines steering and avoidance into one command per tick.
///
/// Inputs are already freshness-checked: `None` means stale or missing.
#[derive(Debug, Clone)]
pub struct NavigationPolicy {
    safety_clearance: f64,
    go_to: SimpleGoTo,
    avoidance: AvoidanceManeuver,
}

impl NavigationPolicy {
    pub fn new(config: &NavigationConfig) -> Self {
        Self {
            safety_clearance: config.safety_clearance,
            go_to: SimpleGoTo::from_config(config),
            avoidance: AvoidanceManeuver::new(config.avoidance.clone()),
        }
    }

    pub fn is_avoiding(&self) -> bool {
        self.avoidance.is_active()
    }

    /// Drops any maneuver in progress (on state changes).
    pub fn reset(&mut self) {
        self.avoidance.cancel();
    }

    pub fn step(
        &mut self,
        now: Timestamp,
        pose: Option<&Pose>,
        clearance: Option<&ObstacleReading>,
        target: &Point2<f64>,
    ) -> MotionCommand {
        if let Some(cmd) = self.avoidance.step(now) {
            return cmd;
        }
        let Some(reading) = clearance else {
            // Blind: do not move until the range sensor is back.
            return MotionCommand::Stop;
        };
        if reading.clearance < self.safety_clearance {
            debug!(clearance = reading.clearance, "obstacle ahead, avoiding");
            return self.avoidance.trigger(now);
        }
        match pose {
            Some(pose) => self.go_to.command(pose, target),
            None => MotionCommand::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> NavigationPolicy {
        NavigationPolicy::new(&NavigationConfig::default())
    }

    fn clear(t: f64) -> ObstacleReading {
        ObstacleReading::new(5.0, t)
    }

    #[test]
    fn stale_pose_never_moves_forward() {
        let mut p = policy();
        let target = Point2::new(3.0, 0.0);
        for i in 0..50 {
            let t = i as f64 * 0.1;
            let clearance = if i % 10 < 3 {
                ObstacleReading::new(0.1, t)
            } else {
                clear(t)
            };
            let cmd = p.step(t, None, Some(&clearance), &target);
            assert_eq!(cmd.forward_velocity(), 0.0, "tick {i}");
        }
    }

    #[test]
    fn stale_clearance_stops() {
        let mut p = policy();
        let pose = Pose::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(p.step(0.0, Some(&pose), None, &Point2::new(3.0, 0.0)), MotionCommand::Stop);
    }

    #[test]
    fn obstacle_overrides_go_to_regardless_of_target() {
        let pose = Pose::new(0.0, 0.0, 0.0, 0.0);
        let blocked = ObstacleReading::new(0.2, 0.0);
        for target in [Point2::new(3.0, 0.0), Point2::new(-3.0, 2.0)] {
            let mut p = policy();
            assert_eq!(p.step(0.0, Some(&pose), Some(&blocked), &target), MotionCommand::Stop);
            assert!(p.is_avoiding());
            // Rotation phase ignores the target entirely.
            assert_eq!(
                p.step(0.5, Some(&pose), Some(&clear(0.5)), &target),
                MotionCommand::Move {
                    forward: 0.0,
                    turn: 1.0
                }
            );
        }
    }

    #[test]
    fn resumes_go_to_after_maneuver() {
        let mut p = policy();
        let pose = Pose::new(0.0, 0.0, 0.0, 0.0);
        let target = Point2::new(3.0, 0.0);
        p.step(0.0, Some(&pose), Some(&ObstacleReading::new(0.2, 0.0)), &target);
        let cmd = p.step(2.0, Some(&pose), Some(&clear(2.0)), &target);
        assert!(cmd.forward_velocity() > 0.0);
        assert!(!p.is_avoiding());
    }
}
