// scout_sim/src/simulation/plugins/vehicles/diff_drive.rs

use tracing::trace;

use scout_core::abstractions::MotionExecutor;
use scout_core::error::HardwareFault;

use crate::simulation::core::world::{lock, SharedWorld};

/// Differential-drive base. Commands are latched into the world and
/// integrated by [`World::step`](crate::simulation::core::world::World::step).
pub struct DiffDrive {
    world: SharedWorld,
}

impl DiffDrive {
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

impl MotionExecutor for DiffDrive {
    fn drive(&mut self, forward: f64, turn: f64) -> Result<(), HardwareFault> {
        if !forward.is_finite() || !turn.is_finite() {
            return Err(HardwareFault::new(
                "drive",
                format!("non-finite command ({forward}, {turn})"),
            ));
        }
        trace!(forward, turn, "drive");
        lock(&self.world).set_command(forward, turn);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareFault> {
        lock(&self.world).set_command(0.0, 0.0);
        Ok(())
    }

    fn is_moving(&self) -> bool {
        lock(&self.world).is_moving()
    }
}
