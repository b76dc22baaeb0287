// scout_sim/src/simulation/plugins/sensors/pose.rs

use tracing::{info, warn};

use scout_core::abstractions::PoseSource;
use scout_core::types::{wrap_angle, Pose};

use crate::simulation::config::structs::PoseSensorConfig;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::world::{lock, SharedWorld};

// =========================================================================
// == Simulated Localizer ==
// =========================================================================

/// Publishes a noisy copy of the true pose at a fixed rate.
///
/// During a configured dropout it publishes nothing, so the last pose ages
/// and the controller sees it go stale.
pub struct SimLocalizer {
    world: SharedWorld,
    period: f64,
    position_noise: f64,
    heading_noise: f64,
    dropouts: Vec<(f64, f64)>,
    rng: SimulationRng,
    last: Option<Pose>,
    in_dropout: bool,
}

impl SimLocalizer {
    pub fn new(world: SharedWorld, config: &PoseSensorConfig, rng: SimulationRng) -> Self {
        Self {
            world,
            period: 1.0 / config.rate,
            position_noise: config.position_noise_stddev,
            heading_noise: config.heading_noise_stddev,
            dropouts: config.dropouts.iter().map(|&[start, len]| (start, len)).collect(),
            rng,
            last: None,
            in_dropout: false,
        }
    }

    fn dropped(&self, now: f64) -> bool {
        self.dropouts
            .iter()
            .any(|&(start, len)| now >= start && now < start + len)
    }
}

impl PoseSource for SimLocalizer {
    fn latest_pose(&mut self) -> Option<Pose> {
        let truth = lock(&self.world).true_pose();
        let now = truth.timestamp;

        let dropped = self.dropped(now);
        if dropped != self.in_dropout {
            self.in_dropout = dropped;
            if dropped {
                warn!(t = now, "localizer dropout");
            } else {
                info!(t = now, "localizer recovered");
            }
        }

        // Small epsilon: the world clock accumulates `dt` and drifts.
        let due = self
            .last
            .map_or(true, |p| now - p.timestamp >= self.period - 1e-9);
        if !dropped && due {
            self.last = Some(Pose::new(
                truth.position.x + self.rng.gaussian(self.position_noise),
                truth.position.y + self.rng.gaussian(self.position_noise),
                wrap_angle(truth.heading + self.rng.gaussian(self.heading_noise)),
                now,
            ));
        }
        self.last
    }
}
