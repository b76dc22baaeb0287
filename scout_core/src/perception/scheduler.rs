// scout_core/src/perception/scheduler.rs

use serde::Serialize;
use tracing::trace;

use crate::config::{ModeScanConfig, ScanConfig};
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Passive, low-frequency checks while moving between waypoints.
    Travel,
    /// Stationary sweeps; also used while confirming a candidate.
    Search,
}

/// Sampling state of one mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeBudget {
    pub interval: f64,
    pub max_in_flight: usize,
    in_flight: usize,
    last_grant: Option<Timestamp>,
}

impl ModeBudget {
    fn new(config: &ModeScanConfig) -> Self {
        Self {
            interval: config.interval,
            max_in_flight: config.max_in_flight,
            in_flight: 0,
            last_grant: None,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn last_grant(&self) -> Option<Timestamp> {
        self.last_grant
    }

    fn permits(&self, now: Timestamp) -> bool {
        self.in_flight < self.max_in_flight
            && self
                .last_grant
                .map_or(true, |last| now - last >= self.interval)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanBudget {
    pub travel: ModeBudget,
    pub search: ModeBudget,
}

impl ScanBudget {
    pub fn mode(&self, mode: ScanMode) -> &ModeBudget {
        match mode {
            ScanMode::Travel => &self.travel,
            ScanMode::Search => &self.search,
        }
    }

    fn mode_mut(&mut self, mode: ScanMode) -> &mut ModeBudget {
        match mode {
            ScanMode::Travel => &mut self.travel,
            ScanMode::Search => &mut self.search,
        }
    }
}

/// Proof that a scan slot was granted. Hand it back through
/// [`ScanScheduler::complete`] when the detector answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct ScanGrant {
    pub mode: ScanMode,
}

/// Owns the [`ScanBudget`]; the only place it is mutated.
#[derive(Debug, Clone)]
pub struct ScanScheduler {
    budget: ScanBudget,
    mode: Option<ScanMode>,
}

impl ScanScheduler {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            budget: ScanBudget {
                travel: ModeBudget::new(&config.travel),
                search: ModeBudget::new(&config.search),
            },
            mode: None,
        }
    }

    pub fn budget(&self) -> &ScanBudget {
        &self.budget
    }

    pub fn mode(&self) -> Option<ScanMode> {
        self.mode
    }

    /// Switches modes (or stops scanning with `None`). Entering a mode resets
    /// its grant clock so the first slot is available immediately.
    pub fn set_mode(&mut self, mode: Option<ScanMode>) {
        if mode != self.mode {
            if let Some(m) = mode {
                self.budget.mode_mut(m).last_grant = None;
            }
            self.mode = mode;
        }
    }

    /// Read-only: would a request at `now` be granted?
    pub fn permits(&self, now: Timestamp) -> bool {
        self.mode
            .is_some_and(|mode| self.budget.mode(mode).permits(now))
    }

    pub fn request(&mut self, now: Timestamp) -> Option<ScanGrant> {
        let mode = self.mode?;
        let budget = self.budget.mode_mut(mode);
        if !budget.permits(now) {
            return None;
        }
        budget.in_flight += 1;
        budget.last_grant = Some(now);
        trace!(?mode, in_flight = budget.in_flight, "scan slot granted");
        Some(ScanGrant { mode })
    }

    pub fn complete(&mut self, grant: ScanGrant) {
        let budget = self.budget.mode_mut(grant.mode);
        budget.in_flight = budget.in_flight.saturating_sub(1);
    }

    /// Forgets every outstanding slot, e.g. after pending detections were dropped.
    pub fn abandon_all(&mut self) {
        self.budget.travel.in_flight = 0;
        self.budget.search.in_flight = 0;
    }

    pub fn in_flight(&self) -> usize {
        self.budget.travel.in_flight + self.budget.search.in_flight
    }
}
