// scout_core/src/mission/pipeline.rs

//! Capture, summarize, report. Also the detector job used by scanning.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::record::MissionRecord;
use crate::abstractions::{Camera, Detector, ReportSink, Summarizer};
use crate::config::CaptureConfig;
use crate::error::{DetectorError, HardwareFault, MissionError, SummaryUnavailable};
use crate::messages::{DetectionEvent, Frame, Media, MediaKind};
use crate::worker::{Job, Workers};

pub type CaptureJob = Job<Result<Media, HardwareFault>>;
pub type SummaryJob = Job<Result<String, SummaryUnavailable>>;
pub type DetectionJob = Job<Result<Option<DetectionEvent>, DetectorError>>;

// --- Detection ---

pub fn spawn_detection(
    workers: Workers,
    detector: Arc<dyn Detector>,
    frame: Frame,
) -> Result<DetectionJob, MissionError> {
    workers.spawn("detect", move || detector.detect(&frame))
}

// --- Capture ---

pub fn spawn_capture(
    workers: Workers,
    camera: Arc<dyn Camera>,
    kind: MediaKind,
) -> Result<CaptureJob, MissionError> {
    workers.spawn("capture", move || camera.capture_media(kind))
}

// --- Summary ---

/// Parameters of one summarizer request, retries included.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub prompt: String,
    pub attempts: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl SummaryRequest {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            prompt: config.prompt.clone(),
            attempts: config.summarize_attempts.max(1),
            backoff: Duration::from_secs_f64(config.retry_backoff.max(0.0)),
            timeout: Duration::from_secs_f64(config.summary_timeout.max(0.0)),
        }
    }
}

pub fn spawn_summary(
    workers: Workers,
    summarizer: Arc<dyn Summarizer>,
    media: Media,
    request: SummaryRequest,
) -> Result<SummaryJob, MissionError> {
    workers.spawn("summarize", move || {
        summarize_with_retries(workers, summarizer.as_ref(), &media, &request)
    })
}

/// Calls the summarizer until it answers, the attempts run out, or the
/// real-time budget is spent (threaded workers only).
pub fn summarize_with_retries(
    workers: Workers,
    summarizer: &dyn Summarizer,
    media: &Media,
    request: &SummaryRequest,
) -> Result<String, SummaryUnavailable> {
    let deadline = workers.deadline(request.timeout);
    let past_deadline = |deadline: Option<Instant>| deadline.is_some_and(|d| Instant::now() >= d);

    let mut last_error = SummaryUnavailable::TimedOut;
    for attempt in 1..=request.attempts {
        if past_deadline(deadline) {
            return Err(SummaryUnavailable::TimedOut);
        }
        match summarizer.summarize(media, &request.prompt) {
            Ok(text) => return Ok(text),
            Err(e) => {
                warn!(attempt, attempts = request.attempts, error = %e, "summarizer attempt failed");
                last_error = e;
            }
        }
        if attempt < request.attempts {
            workers.pause(request.backoff);
        }
    }
    Err(last_error)
}

// --- Reporting ---

/// Result of pushing the record to one sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinkDelivery {
    pub sink: String,
    pub delivered: bool,
    pub error: Option<String>,
}

/// Sends `record` to every sink. One sink failing never stops the others.
pub fn dispatch(sinks: &mut [Box<dyn ReportSink>], record: &MissionRecord) -> Vec<SinkDelivery> {
    sinks
        .iter_mut()
        .map(|sink| {
            let name = sink.name().to_string();
            match sink.send(record) {
                Ok(()) => {
                    info!(mission = %record.id(), sink = %name, "report delivered");
                    SinkDelivery {
                        sink: name,
                        delivered: true,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(mission = %record.id(), sink = %name, error = %e, "report sink failed");
                    SinkDelivery {
                        sink: name,
                        delivered: false,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect()
}
