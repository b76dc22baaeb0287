// scout_core/src/mission/record.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::MissionState;
use crate::error::RecordClosed;
use crate::mapping::WaypointId;
use crate::messages::{DetectionEvent, Media};
use crate::types::{Pose, Timestamp};

pub type MissionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Timeout,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub at: Timestamp,
    pub from: MissionState,
    pub to: MissionState,
    pub reason: String,
}

/// Log of one search-and-report run.
///
/// Appended to by the controller while the mission runs; once
/// [`MissionRecord::close`] is called every mutator returns [`RecordClosed`].
/// Report sinks only ever see a shared reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionRecord {
    id: MissionId,
    target: String,
    started_at: Timestamp,
    home: Option<Pose>,
    transitions: Vec<Transition>,
    visited: Vec<WaypointId>,
    detection: Option<DetectionEvent>,
    /// Who was found: a recognized name or `"Unknown"`. Set with the detection.
    #[serde(default)]
    identity: Option<String>,
    media: Option<Media>,
    summary: Option<String>,
    summary_is_placeholder: bool,
    outcome: Option<Outcome>,
    reason: Option<String>,
    closed_at: Option<Timestamp>,
}

impl MissionRecord {
    pub fn new(id: MissionId, target: impl Into<String>, started_at: Timestamp) -> Self {
        Self {
            id,
            target: target.into(),
            started_at,
            home: None,
            transitions: Vec::new(),
            visited: Vec::new(),
            detection: None,
            identity: None,
            media: None,
            summary: None,
            summary_is_placeholder: false,
            outcome: None,
            reason: None,
            closed_at: None,
        }
    }

    // --- Accessors ---

    pub fn id(&self) -> MissionId {
        self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn home(&self) -> Option<&Pose> {
        self.home.as_ref()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn visited(&self) -> &[WaypointId] {
        &self.visited
    }

    pub fn detection(&self) -> Option<&DetectionEvent> {
        self.detection.as_ref()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn media(&self) -> Option<&Media> {
        self.media.as_ref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn summary_is_placeholder(&self) -> bool {
        self.summary_is_placeholder
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn closed_at(&self) -> Option<Timestamp> {
        self.closed_at
    }

    pub fn is_closed(&self) -> bool {
        self.outcome.is_some()
    }

    /// Every state the mission passed through, in order, starting with the
    /// state it left first.
    pub fn states(&self) -> Vec<MissionState> {
        let mut states: Vec<MissionState> = self
            .transitions
            .first()
            .map(|t| t.from.clone())
            .into_iter()
            .collect();
        states.extend(self.transitions.iter().map(|t| t.to.clone()));
        states
    }

    /// Seconds between start and close (or `now` while open).
    pub fn elapsed(&self, now: Timestamp) -> f64 {
        self.closed_at.unwrap_or(now) - self.started_at
    }

    // --- Mutators ---

    fn ensure_open(&self) -> Result<(), RecordClosed> {
        if self.is_closed() {
            Err(RecordClosed(self.id))
        } else {
            Ok(())
        }
    }

    pub fn push_transition(&mut self, transition: Transition) -> Result<(), RecordClosed> {
        self.ensure_open()?;
        self.transitions.push(transition);
        Ok(())
    }

    pub fn set_home(&mut self, home: Pose) -> Result<(), RecordClosed> {
        self.ensure_open()?;
        self.home = Some(home);
        Ok(())
    }

    pub fn mark_visited(&mut self, waypoint: WaypointId) -> Result<(), RecordClosed> {
        self.ensure_open()?;
        self.visited.push(waypoint);
        Ok(())
    }

    pub fn set_detection(&mut self, event: DetectionEvent) -> Result<(), RecordClosed> {
        self.ensure_open()?;
        self.identity = Some(event.identity().to_string());
        self.detection = Some(event);
        Ok(())
    }

    pub fn set_media(&mut self, media: Media) -> Result<(), RecordClosed> {
        self.ensure_open()?;
        self.media = Some(media);
        Ok(())
    }

    pub fn set_summary(&mut self, text: String, placeholder: bool) -> Result<(), RecordClosed> {
        self.ensure_open()?;
        self.summary = Some(text);
        self.summary_is_placeholder = placeholder;
        Ok(())
    }

    /// Seals the record with its outcome and a human-readable reason.
    pub fn close(
        &mut self,
        outcome: Outcome,
        reason: impl Into<String>,
        at: Timestamp,
    ) -> Result<(), RecordClosed> {
        self.ensure_open()?;
        self.outcome = Some(outcome);
        self.reason = Some(reason.into());
        self.closed_at = Some(at);
        Ok(())
    }
}
