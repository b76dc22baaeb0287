// scout_sim/src/simulation/config/mod.rs

//! Loading and validating scenario files.

pub mod structs;

use anyhow::{ensure, Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;
use tracing::info;

pub use structs::ScenarioConfig;

/// Environment variables with this prefix override scenario keys;
/// `__` separates nesting levels (`SCOUT_MISSION__DETECTION__REQUIRED_HITS=2`).
pub const ENV_PREFIX: &str = "SCOUT_";

/// Reads `path`, applies environment overrides, and validates the result.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    ensure!(
        path.is_file(),
        "scenario file not found at {}",
        path.display()
    );
    info!(path = %path.display(), "loading scenario");

    let scenario: ScenarioConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .with_context(|| format!("failed to parse scenario file at {}", path.display()))?;
    validate(&scenario)?;
    Ok(scenario)
}

/// Checks the parts of a scenario the simulator relies on.
pub fn validate(scenario: &ScenarioConfig) -> Result<()> {
    scenario
        .mission
        .validate()
        .context("invalid [mission] section")?;

    let sim = &scenario.simulation;
    ensure!(sim.tick_rate > 0.0, "simulation.tick_rate must be positive");
    ensure!(
        sim.duration_seconds > 0.0,
        "simulation.duration_seconds must be positive"
    );

    let [min_x, min_y, max_x, max_y] = scenario.world.bounds;
    ensure!(min_x < max_x && min_y < max_y, "world.bounds must span an area");
    ensure!(
        scenario.robot.max_speed > 0.0 && scenario.robot.max_turn_rate > 0.0,
        "robot limits must be positive"
    );
    ensure!(
        scenario.sensors.pose.rate > 0.0 && scenario.sensors.range.rate > 0.0,
        "sensor rates must be positive"
    );
    for (name, p) in [
        ("camera.capture_failure_rate", scenario.camera.capture_failure_rate),
        ("detector.false_positive_rate", scenario.detector.false_positive_rate),
        ("summarizer.failure_rate", scenario.summarizer.failure_rate),
    ] {
        ensure!((0.0..=1.0).contains(&p), "{name} must be a probability, got {p}");
    }

    scenario
        .waypoint_map()
        .context("invalid [[waypoints]]")?;
    Ok(())
}
