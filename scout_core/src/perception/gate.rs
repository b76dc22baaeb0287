// scout_core/src/perception/gate.rs

//! Temporal confirmation of person detections.
//!
//! A single frame above the confidence threshold only *opens* a candidate.
//! The candidate is confirmed once K frames (the opener included) out of at
//! most N hit the same approximate location, and discarded when N frames go
//! by or the window duration elapses first. A strong hit that arrives as a
//! candidate is discarded (too late, or somewhere else) opens the next one. The
//! gate is a pure function of the observations fed to it, which keeps it
//! scriptable in tests.

use tracing::debug;

use crate::config::DetectionConfig;
use crate::messages::{BoundingBox, DetectionEvent, FrameObservation};
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// N frames were seen without reaching K hits.
    FramesExhausted { hits: usize, frames: usize },
    /// The window duration passed without reaching K hits.
    WindowElapsed { hits: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    /// No candidate; nothing to act on.
    Idle,
    /// A candidate was opened by this frame.
    Opened,
    /// A candidate is open and still undecided.
    Pending { hits: usize, frames: usize },
    /// Enough corroborating frames. Carries the most recent hit.
    Confirmed(DetectionEvent),
    Rejected(RejectReason),
    /// The candidate was rejected, and the same frame opened a new one.
    Reopened(RejectReason),
}

#[derive(Debug, Clone)]
struct Candidate {
    opened_at: Timestamp,
    anchor: BoundingBox,
    latest: DetectionEvent,
    hits: usize,
    frames: usize,
}

#[derive(Debug, Clone)]
pub struct DetectionGate {
    config: DetectionConfig,
    candidate: Option<Candidate>,
}

impl DetectionGate {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            candidate: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.candidate.is_some()
    }

    /// Discards any open candidate without a verdict.
    pub fn reset(&mut self) {
        self.candidate = None;
    }

    /// Feeds one frame's detector result.
    pub fn observe(&mut self, observation: FrameObservation) -> GateVerdict {
        let threshold = self.config.confidence_threshold;
        let above = observation
            .detection
            .filter(|event| event.confidence >= threshold);

        let Some(mut candidate) = self.candidate.take() else {
            return match above {
                Some(event) => self.open(event),
                None => GateVerdict::Idle,
            };
        };

        if observation.timestamp - candidate.opened_at > self.config.window_duration {
            debug!(hits = candidate.hits, "candidate window elapsed");
            let reason = RejectReason::WindowElapsed {
                hits: candidate.hits,
            };
            return self.reject(reason, above);
        }

        candidate.frames += 1;
        let mut elsewhere = None;
        if let Some(mut event) = above {
            if event.region.overlap_ratio(&candidate.anchor) >= self.config.min_overlap {
                candidate.hits += 1;
                candidate.anchor = event.region;
                if event.label.is_none() {
                    event.label = candidate.latest.label.take();
                }
                candidate.latest = event;
            } else {
                elsewhere = Some(event);
            }
        }

        if candidate.hits >= self.config.required_hits {
            debug!(hits = candidate.hits, frames = candidate.frames, "candidate confirmed");
            return GateVerdict::Confirmed(candidate.latest);
        }
        if candidate.frames >= self.config.window_frames {
            debug!(hits = candidate.hits, frames = candidate.frames, "candidate rejected");
            let reason = RejectReason::FramesExhausted {
                hits: candidate.hits,
                frames: candidate.frames,
            };
            return self.reject(reason, elsewhere);
        }

        let verdict = GateVerdict::Pending {
            hits: candidate.hits,
            frames: candidate.frames,
        };
        self.candidate = Some(candidate);
        verdict
    }

    /// Rejects the open candidate if its window has passed by `now`, even when
    /// no further frame arrives.
    pub fn expire(&mut self, now: Timestamp) -> Option<GateVerdict> {
        let candidate = self.candidate.as_ref()?;
        if now - candidate.opened_at > self.config.window_duration {
            let hits = candidate.hits;
            self.candidate = None;
            debug!(hits, "candidate window elapsed");
            return Some(GateVerdict::Rejected(RejectReason::WindowElapsed { hits }));
        }
        None
    }

    /// Closes the candidate; `next` (an unused strong hit) opens a new one.
    fn reject(&mut self, reason: RejectReason, next: Option<DetectionEvent>) -> GateVerdict {
        let Some(event) = next else {
            return GateVerdict::Rejected(reason);
        };
        match self.open(event) {
            GateVerdict::Opened => GateVerdict::Reopened(reason),
            verdict => verdict,
        }
    }

    fn open(&mut self, event: DetectionEvent) -> GateVerdict {
        if self.config.required_hits <= 1 {
            return GateVerdict::Confirmed(event);
        }
        debug!(confidence = event.confidence, "candidate opened");
        self.candidate = Some(Candidate {
            opened_at: event.frame_timestamp,
            anchor: event.region,
            latest: event,
            hits: 1,
            frames: 1,
        });
        GateVerdict::Opened
    }
}
