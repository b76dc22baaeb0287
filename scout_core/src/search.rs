// scout_core/src/search.rs

//! Stationary pan-and-scan routine run at each waypoint.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Where the camera mount points during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepPosition {
    Left,
    Center,
    Right,
    Up,
    Down,
}

impl SweepPosition {
    /// Nominal (pan, tilt) in radians; positive pan is to the left.
    pub fn angles(self) -> (f64, f64) {
        let pan = 45f64.to_radians();
        let tilt = 20f64.to_radians();
        match self {
            SweepPosition::Left => (pan, 0.0),
            SweepPosition::Center => (0.0, 0.0),
            SweepPosition::Right => (-pan, 0.0),
            SweepPosition::Up => (0.0, tilt),
            SweepPosition::Down => (0.0, -tilt),
        }
    }
}

/// What the controller should do this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepStep {
    /// Command the mount to this position.
    Point(SweepPosition),
    /// Hold still; `wants_frame` while this position has no frame yet.
    Dwell {
        position: SweepPosition,
        wants_frame: bool,
    },
    /// Every position has been covered.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Pointing,
    Dwelling { since: Timestamp, framed: bool },
    Done,
}

/// Fixed-order sweep with a fixed dwell per position.
#[derive(Debug, Clone)]
pub struct PanScan {
    positions: Vec<SweepPosition>,
    dwell: f64,
    index: usize,
    phase: Phase,
}

impl PanScan {
    pub fn new(positions: Vec<SweepPosition>, dwell: f64) -> Self {
        let phase = if positions.is_empty() {
            Phase::Done
        } else {
            Phase::Pointing
        };
        Self {
            positions,
            dwell,
            index: 0,
            phase,
        }
    }

    pub fn current(&self) -> Option<SweepPosition> {
        self.positions.get(self.index).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Advances the sweep. A position is left once it has a frame and its
    /// dwell has elapsed.
    pub fn step(&mut self, now: Timestamp) -> SweepStep {
        match self.phase {
            Phase::Done => SweepStep::Complete,
            Phase::Pointing => self.point_current(now),
            Phase::Dwelling { since, framed } => {
                let Some(position) = self.current() else {
                    self.phase = Phase::Done;
                    return SweepStep::Complete;
                };
                if framed && now - since >= self.dwell {
                    self.index += 1;
                    if self.index >= self.positions.len() {
                        self.phase = Phase::Done;
                        return SweepStep::Complete;
                    }
                    return self.point_current(now);
                }
                SweepStep::Dwell {
                    position,
                    wants_frame: !framed,
                }
            }
        }
    }

    /// Records that the current position received its frame.
    pub fn mark_frame(&mut self) {
        if let Phase::Dwelling { since, .. } = self.phase {
            self.phase = Phase::Dwelling {
                since,
                framed: true,
            };
        }
    }

    /// Restarts the interrupted position after a confirmation attempt.
    pub fn resume(&mut self) {
        if self.phase != Phase::Done {
            self.phase = Phase::Pointing;
        }
    }

    fn point_current(&mut self, now: Timestamp) -> SweepStep {
        match self.current() {
            Some(position) => {
                self.phase = Phase::Dwelling {
                    since: now,
                    framed: false,
                };
                SweepStep::Point(position)
            }
            None => {
                self.phase = Phase::Done;
                SweepStep::Complete
            }
        }
    }
}
