// scout_core/src/navigation/avoidance.rs

use crate::config::AvoidanceConfig;
use crate::types::{MotionCommand, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvoidancePhase {
    Stopping { until: Timestamp },
    Rotating { until: Timestamp },
}

/// Fixed reactive maneuver: stop, rotate a fixed angle, resume.
///
/// Purely time-based, so it runs the same whether or not a fresh pose is
/// available, and never commands forward motion.
#[derive(Debug, Clone)]
pub struct AvoidanceManeuver {
    config: AvoidanceConfig,
    phase: Option<AvoidancePhase>,
}

impl AvoidanceManeuver {
    pub fn new(config: AvoidanceConfig) -> Self {
        Self {
            config,
            phase: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_some()
    }

    pub fn phase(&self) -> Option<AvoidancePhase> {
        self.phase
    }

    pub fn trigger(&mut self, now: Timestamp) -> MotionCommand {
        self.phase = Some(AvoidancePhase::Stopping {
            until: now + self.config.stop_duration,
        });
        MotionCommand::Stop
    }

    /// Command for this tick, or `None` once the maneuver has finished.
    pub fn step(&mut self, now: Timestamp) -> Option<MotionCommand> {
        match self.phase? {
            AvoidancePhase::Stopping { until } if now < until => Some(MotionCommand::Stop),
            AvoidancePhase::Stopping { until } => {
                let rotate_until = until + self.config.rotate_duration();
                self.phase = Some(AvoidancePhase::Rotating {
                    until: rotate_until,
                });
                self.step(now)
            }
            AvoidancePhase::Rotating { until } if now < until => Some(MotionCommand::Move {
                forward: 0.0,
                turn: self.config.direction.sign() * self.config.rotate_rate,
            }),
            AvoidancePhase::Rotating { .. } => {
                self.phase = None;
                None
            }
        }
    }

    pub fn cancel(&mut self) {
        self.phase = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TurnDirection;
    use approx::assert_abs_diff_eq;

    #[test]
    fn stops_then_rotates_then_resumes() {
        let mut m = AvoidanceManeuver::new(AvoidanceConfig::default());
        assert_eq!(m.trigger(0.0), MotionCommand::Stop);
        assert_eq!(m.step(0.1), Some(MotionCommand::Stop));

        let Some(MotionCommand::Move { forward, turn }) = m.step(0.4) else {
            panic!("expected rotation");
        };
        assert_eq!(forward, 0.0);
        assert_abs_diff_eq!(turn, 1.0);

        // 45 degrees at 1 rad/s is ~0.785 s after the 0.3 s stop.
        assert!(m.step(1.0).is_some());
        assert_eq!(m.step(1.2), None);
        assert!(!m.is_active());
    }

    #[test]
    fn right_turns_are_negative() {
        let mut m = AvoidanceManeuver::new(AvoidanceConfig {
            direction: TurnDirection::Right,
            stop_duration: 0.0,
            ..AvoidanceConfig::default()
        });
        m.trigger(0.0);
        assert_eq!(
            m.step(0.0),
            Some(MotionCommand::Move {
                forward: 0.0,
                turn: -1.0
            })
        );
    }
}
