// scout_core/src/worker.rs

//! Off-loop execution for the operations allowed to block.
//!
//! Media capture, detector inference and summarizer calls run as [`Job`]s so
//! the control loop keeps its obstacle-avoidance cadence. The loop polls jobs
//! without blocking; dropping a job abandons it and its late result is
//! discarded on the floor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

use crate::error::MissionError;

/// How jobs are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Workers {
    /// Each job gets its own named thread; results come back over a channel.
    #[default]
    Threaded,
    /// The job runs during submission and is ready at the first poll.
    /// Used with a virtual clock, where blocking costs no simulated time.
    Inline,
}

impl Workers {
    pub fn threaded() -> Self {
        Workers::Threaded
    }

    pub fn inline() -> Self {
        Workers::Inline
    }

    pub fn spawn<T, F>(self, label: &str, job: F) -> Result<Job<T>, MissionError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        match self {
            Workers::Inline => Ok(Job {
                label: label.to_string(),
                state: JobState::Done(Some(job())),
            }),
            Workers::Threaded => {
                let (tx, rx) = mpsc::channel();
                let name = format!("scout-{label}");
                thread::Builder::new()
                    .name(name)
                    .spawn(move || {
                        // The receiver is gone if the job was abandoned.
                        let _ = tx.send(job());
                    })
                    .map_err(|e| MissionError::Worker(format!("failed to spawn {label}: {e}")))?;
                trace!(label, "job spawned");
                Ok(Job {
                    label: label.to_string(),
                    state: JobState::Waiting(rx),
                })
            }
        }
    }

    /// Wall-clock deadline for work started now, if this mode runs in real time.
    pub fn deadline(self, budget: Duration) -> Option<Instant> {
        match self {
            Workers::Threaded => Some(Instant::now() + budget),
            Workers::Inline => None,
        }
    }

    /// Sleeps inside a job. A no-op for inline jobs, which run on simulated time.
    pub fn pause(self, duration: Duration) {
        if self == Workers::Threaded && !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

#[derive(Debug)]
pub enum JobPoll<T> {
    Ready(T),
    Pending,
    /// The worker died (or the result was already taken).
    Lost,
}

#[derive(Debug)]
enum JobState<T> {
    Done(Option<T>),
    Waiting(Receiver<T>),
}

/// Handle to work running off the control loop.
#[derive(Debug)]
pub struct Job<T> {
    label: String,
    state: JobState<T>,
}

impl<T> Job<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Non-blocking check for the result. `Ready` is returned at most once.
    pub fn poll(&mut self) -> JobPoll<T> {
        match &mut self.state {
            JobState::Done(slot) => slot.take().map_or(JobPoll::Lost, JobPoll::Ready),
            JobState::Waiting(rx) => match rx.try_recv() {
                Ok(value) => {
                    self.state = JobState::Done(None);
                    JobPoll::Ready(value)
                }
                Err(TryRecvError::Empty) => JobPoll::Pending,
                Err(TryRecvError::Disconnected) => {
                    warn!(label = %self.label, "worker exited without a result");
                    self.state = JobState::Done(None);
                    JobPoll::Lost
                }
            },
        }
    }
}

/// Cancellation flag shared between the controller and whoever may cancel
/// (web handler, wake-word listener, signal handler).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
