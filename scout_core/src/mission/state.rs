// scout_core/src/mission/state.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::DwellLimits;
use crate::mapping::WaypointId;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionState {
    #[default]
    Idle,
    RecordHome,
    Traveling(WaypointId),
    Searching(WaypointId),
    Confirming,
    Capturing,
    Summarizing,
    Returning,
    Reporting,
    Cancelled,
    Failed,
    Succeeded,
}

impl MissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MissionState::Cancelled | MissionState::Failed | MissionState::Succeeded
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            MissionState::Idle => "Idle",
            MissionState::RecordHome => "RecordHome",
            MissionState::Traveling(_) => "Traveling",
            MissionState::Searching(_) => "Searching",
            MissionState::Confirming => "Confirming",
            MissionState::Capturing => "Capturing",
            MissionState::Summarizing => "Summarizing",
            MissionState::Returning => "Returning",
            MissionState::Reporting => "Reporting",
            MissionState::Cancelled => "Cancelled",
            MissionState::Failed => "Failed",
            MissionState::Succeeded => "Succeeded",
        }
    }

    /// Maximum dwell for the state; `None` for Idle and terminal states.
    pub fn dwell_limit(&self, limits: &DwellLimits) -> Option<f64> {
        match self {
            MissionState::RecordHome => Some(limits.record_home),
            MissionState::Traveling(_) => Some(limits.traveling),
            MissionState::Searching(_) => Some(limits.searching),
            MissionState::Confirming => Some(limits.confirming),
            MissionState::Capturing => Some(limits.capturing),
            MissionState::Summarizing => Some(limits.summarizing),
            MissionState::Returning => Some(limits.returning),
            MissionState::Reporting => Some(limits.reporting),
            MissionState::Idle
            | MissionState::Cancelled
            | MissionState::Failed
            | MissionState::Succeeded => None,
        }
    }

    /// The robot is (or should be) moving between waypoints.
    pub fn is_navigating(&self) -> bool {
        matches!(self, MissionState::Traveling(_) | MissionState::Returning)
    }
}

impl fmt::Display for MissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionState::Traveling(w) | MissionState::Searching(w) => {
                write!(f, "{}({})", self.name(), w)
            }
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_dwell_limit() {
        let limits = DwellLimits::default();
        for state in [MissionState::Cancelled, MissionState::Failed, MissionState::Succeeded] {
            assert!(state.is_terminal());
            assert_eq!(state.dwell_limit(&limits), None);
        }
        assert_eq!(MissionState::Returning.dwell_limit(&limits), Some(90.0));
    }

    #[test]
    fn display_includes_waypoint() {
        let state = MissionState::Traveling(WaypointId::from("w1"));
        assert_eq!(state.to_string(), "Traveling(w1)");
        assert_eq!(MissionState::Confirming.to_string(), "Confirming");
    }
}
