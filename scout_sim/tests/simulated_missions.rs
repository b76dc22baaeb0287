// scout_sim/tests/simulated_missions.rs

//! End-to-end runs of the demo scenario on the virtual clock.

use std::fs;
use std::path::{Path, PathBuf};

use scout_sim::prelude::*;
use scout_sim::simulation::config::load_scenario;
use scout_sim::simulation::core::runner::MAP_FILE;

fn demo_scenario() -> ScenarioConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/scenarios/home_search.toml");
    let mut scenario = load_scenario(&path).unwrap();
    // Keep test output quiet; the web sink is what the assertions read.
    scenario.sinks.display = false;
    scenario.sinks.audio = false;
    scenario
}

fn run_in(dir: &Path, scenario: ScenarioConfig) -> RunReport {
    let options = RunOptions {
        state_dir: dir.to_path_buf(),
        realtime: false,
    };
    Simulation::new(scenario, &options).unwrap().run().unwrap()
}

#[test]
fn seeded_run_finds_the_person_and_returns_home() {
    let dir = tempfile::tempdir().unwrap();
    let report = run_in(dir.path(), demo_scenario());

    assert_eq!(report.final_state, MissionState::Succeeded);
    assert_eq!(report.collisions, 0);
    let record = report.record.unwrap();
    assert_eq!(record.outcome(), Some(Outcome::Success));
    assert!(record.detection().is_some());
    assert_eq!(record.identity(), Some("Alex"));
    assert!(record.media().is_some());
    assert!(record.summary().is_some());
    assert!(record.visited().iter().any(|w| w.as_str() == "bedroom"));

    let states: Vec<&str> = record.states().iter().map(MissionState::name).collect();
    assert_eq!(states.first(), Some(&"Idle"));
    assert!(states.contains(&"Capturing"));
    assert!(states.contains(&"Returning"));
    assert_eq!(states.last(), Some(&"Succeeded"));
}

#[test]
fn same_seed_gives_the_same_mission() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let first = run_in(a.path(), demo_scenario()).record.unwrap();
    let second = run_in(b.path(), demo_scenario()).record.unwrap();

    let timeline = |r: &MissionRecord| -> Vec<(MissionState, f64)> {
        r.transitions().iter().map(|t| (t.to.clone(), t.at)).collect()
    };
    assert_eq!(timeline(&first), timeline(&second));
    assert_eq!(first.summary(), second.summary());
    assert_ne!(first.id(), second.id());
}

#[test]
fn scheduled_cancel_ends_the_mission() {
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = demo_scenario();
    scenario.simulation.cancel_at = Some(6.0);

    let report = run_in(dir.path(), scenario);
    assert_eq!(report.final_state, MissionState::Cancelled);
    let record = report.record.unwrap();
    assert_eq!(record.outcome(), Some(Outcome::Cancelled));
    assert!(record.closed_at().unwrap() >= 6.0);
}

#[test]
fn web_report_and_map_are_written_to_the_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    let report = run_in(dir.path(), demo_scenario());
    let record = report.record.unwrap();

    let web = report
        .deliveries
        .iter()
        .find(|d| d.sink == "web")
        .unwrap();
    assert!(web.delivered);

    let json = fs::read_to_string(dir.path().join("reports").join(format!("{}.json", record.id())))
        .unwrap();
    let stored: MissionRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(stored.id(), record.id());

    let map: WaypointMap =
        serde_json::from_str(&fs::read_to_string(dir.path().join(MAP_FILE)).unwrap()).unwrap();
    assert_eq!(map.home_id().map(WaypointId::as_str), Some("home"));
    assert_eq!(map.len(), 4);
}

#[test]
fn an_empty_house_is_searched_and_reported_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = demo_scenario();
    scenario.world.person = None;
    scenario.detector.false_positive_rate = 0.0;

    let report = run_in(dir.path(), scenario);
    assert_eq!(report.final_state, MissionState::Failed);
    let record = report.record.unwrap();
    assert_eq!(record.visited().len(), 3);
    assert_eq!(
        record.reason(),
        Some("target not found after searching 3 waypoints")
    );
}
