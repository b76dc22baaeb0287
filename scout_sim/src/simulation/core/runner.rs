// scout_sim/src/simulation/core/runner.rs

//! The fixed-step loop that drives the controller against the simulated world.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use scout_core::mapping::MapStore;
use scout_core::mission::{MissionController, MissionRecord, MissionState, SinkDelivery};
use scout_core::worker::Workers;

use crate::simulation::config::ScenarioConfig;
use crate::simulation::core::world::{lock, SharedWorld, World};
use crate::simulation::plugins::build_collaborators;

pub const MAP_FILE: &str = "map.json";

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Where the map (with Home) and web reports live between runs.
    pub state_dir: PathBuf,
    /// Pace ticks against the wall clock and run jobs on worker threads.
    pub realtime: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("scout_state"),
            realtime: false,
        }
    }
}

/// What happened during one simulated run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub final_state: MissionState,
    pub record: Option<MissionRecord>,
    pub sim_time: f64,
    pub ticks: u64,
    pub collisions: u32,
    pub deliveries: Vec<SinkDelivery>,
}

pub struct Simulation {
    scenario: ScenarioConfig,
    world: SharedWorld,
    controller: MissionController,
    realtime: bool,
}

impl Simulation {
    pub fn new(scenario: ScenarioConfig, options: &RunOptions) -> Result<Self> {
        let store = MapStore::new(options.state_dir.join(MAP_FILE));
        let map = store
            .load_or(scenario.waypoint_map()?)
            .context("failed to load the stored map")?;

        let workers = if options.realtime {
            Workers::threaded()
        } else {
            Workers::inline()
        };
        let world = World::from_scenario(&scenario).shared();
        let io = build_collaborators(&scenario, &world, workers, &options.state_dir);
        let controller = MissionController::new(scenario.mission.clone(), map, io, workers)?
            .with_store(store);

        info!(
            seed = ?scenario.simulation.seed,
            waypoints = controller.map().len(),
            realtime = options.realtime,
            "simulation ready"
        );
        Ok(Self {
            scenario,
            world,
            controller,
            realtime: options.realtime,
        })
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn controller(&self) -> &MissionController {
        &self.controller
    }

    /// Runs until the mission ends or the scenario duration elapses, then
    /// shuts the controller down (which saves the map).
    pub fn run(&mut self) -> Result<RunReport> {
        let sim = self.scenario.simulation.clone();
        let dt = sim.dt();
        let wall_start = Instant::now();
        let mut started = false;
        let mut cancel_sent = false;
        let mut ticks: u64 = 0;

        loop {
            let now = lock(&self.world).time;

            if !started && now + 1e-9 >= sim.start_at {
                let id = self.controller.start_mission(now)?;
                info!(mission = %id, t = now, "mission started");
                started = true;
            }
            if let Some(at) = sim.cancel_at {
                if started && !cancel_sent && now + 1e-9 >= at {
                    info!(t = now, "scenario cancels the mission");
                    self.controller.cancel();
                    cancel_sent = true;
                }
            }

            let state = self.controller.tick(now);
            ticks += 1;
            if started && state.is_terminal() {
                break;
            }
            if now >= sim.duration_seconds {
                warn!(t = now, state = %state, "scenario duration elapsed");
                break;
            }

            lock(&self.world).step(dt);

            if self.realtime {
                let due = wall_start + Duration::from_secs_f64(ticks as f64 * dt);
                if let Some(wait) = due.checked_duration_since(Instant::now()) {
                    thread::sleep(wait);
                }
            }
        }

        let (now, collisions) = {
            let world = lock(&self.world);
            (world.time, world.collisions)
        };
        self.controller
            .shutdown(now)
            .context("failed to save the map on shutdown")?;

        let status = self.controller.status(now);
        let report = RunReport {
            final_state: status.state,
            record: status.last_record,
            sim_time: now,
            ticks,
            collisions,
            deliveries: status.deliveries,
        };
        info!(
            state = %report.final_state,
            t = report.sim_time,
            ticks = report.ticks,
            collisions = report.collisions,
            "simulation finished"
        );
        Ok(report)
    }
}
