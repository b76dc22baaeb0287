// scout_sim/src/simulation/plugins/sensors/range.rs

use scout_core::abstractions::ObstacleSource;
use scout_core::types::ObstacleReading;

use crate::simulation::config::structs::RangeSensorConfig;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::world::{lock, SharedWorld};

/// Forward-facing range finder: one ray along the body heading.
pub struct SimRangeSensor {
    world: SharedWorld,
    period: f64,
    max_range: f64,
    noise: f64,
    rng: SimulationRng,
    last: Option<ObstacleReading>,
}

impl SimRangeSensor {
    pub fn new(world: SharedWorld, config: &RangeSensorConfig, rng: SimulationRng) -> Self {
        Self {
            world,
            period: 1.0 / config.rate,
            max_range: config.max_range,
            noise: config.noise_stddev,
            rng,
            last: None,
        }
    }
}

impl ObstacleSource for SimRangeSensor {
    fn latest_clearance(&mut self) -> Option<ObstacleReading> {
        let (now, clearance) = {
            let world = lock(&self.world);
            let robot = world.robot;
            (
                world.time,
                world.ray_clearance(&robot.position, robot.heading, self.max_range),
            )
        };
        let due = self
            .last
            .map_or(true, |r| now - r.timestamp >= self.period - 1e-9);
        if due {
            let noisy = (clearance + self.rng.gaussian(self.noise)).clamp(0.0, self.max_range);
            self.last = Some(ObstacleReading::new(noisy, now));
        }
        self.last
    }
}
