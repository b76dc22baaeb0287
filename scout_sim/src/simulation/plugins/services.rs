// scout_sim/src/simulation/plugins/services.rs

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use scout_core::abstractions::Summarizer;
use scout_core::error::SummaryUnavailable;
use scout_core::messages::Media;
use scout_core::worker::Workers;

use crate::simulation::config::structs::SummarizerConfig;
use crate::simulation::core::prng::SimulationRng;

/// Stand-in for the remote vision-language service.
///
/// Answers with the scripted activity of the person in the scene after a
/// fixed latency, and fails at the configured rate.
pub struct SimSummarizer {
    description: String,
    latency: Duration,
    failure_rate: f64,
    workers: Workers,
    rng: Mutex<SimulationRng>,
}

impl SimSummarizer {
    pub fn new(
        description: impl Into<String>,
        config: &SummarizerConfig,
        workers: Workers,
        rng: SimulationRng,
    ) -> Self {
        Self {
            description: description.into(),
            latency: Duration::from_secs_f64(config.latency.max(0.0)),
            failure_rate: config.failure_rate,
            workers,
            rng: Mutex::new(rng),
        }
    }
}

impl Summarizer for SimSummarizer {
    fn summarize(&self, media: &Media, prompt: &str) -> Result<String, SummaryUnavailable> {
        debug!(location = %media.location, prompt, "summarizing");
        self.workers.pause(self.latency);
        let failed = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .chance(self.failure_rate);
        if failed {
            return Err(SummaryUnavailable::Failed(
                "summarization service unavailable".into(),
            ));
        }
        Ok(self.description.clone())
    }
}
