// scout_core/tests/mission_scenarios.rs

//! End-to-end runs of the mission controller against the scripted rig.
//!
//! The harness plays the role of the robot: every tick it "drives" by
//! teleporting to whatever the controller is currently steering towards,
//! then publishes a fresh pose and a clear range reading.

use std::sync::Arc;
use std::time::Duration;

use scout_core::abstractions::ReportSink;
use scout_core::config::{MissionConfig, DEFAULT_PLACEHOLDER};
use scout_core::error::{HardwareFault, MissionError, SummaryUnavailable};
use scout_core::mapping::{MapStore, Waypoint, WaypointId, WaypointMap};
use scout_core::messages::{BoundingBox, DetectionEvent, UNKNOWN_PERSON};
use scout_core::mission::{MissionController, MissionRecord, MissionState, Outcome};
use scout_core::mock::{FailingSink, MockRig, RecordingSink, ScriptedSummarizer};
use scout_core::types::{MotionCommand, ObstacleReading, Pose};
use scout_core::worker::Workers;

const DT: f64 = 0.1;
const MAX_TICKS: usize = 5_000;

fn wp(id: &str) -> WaypointId {
    WaypointId::from(id)
}

/// Home (0,0), w1 (2,0), w2 (4,0), w3 (4,2), linked as a chain.
fn house(with_home: bool) -> WaypointMap {
    let mut map = WaypointMap::new();
    map.insert(Waypoint::new("w1", 2.0, 0.0)).unwrap();
    map.insert(Waypoint::new("w2", 4.0, 0.0)).unwrap();
    map.insert(Waypoint::new("w3", 4.0, 2.0)).unwrap();
    map.connect_both(&wp("w1"), &wp("w2"), 2.0).unwrap();
    map.connect_both(&wp("w2"), &wp("w3"), 2.0).unwrap();
    if with_home {
        map.insert(Waypoint::new("home", 0.0, 0.0)).unwrap();
        map.connect_both(&wp("home"), &wp("w1"), 2.0).unwrap();
        map.set_home(wp("home")).unwrap();
    }
    map
}

struct Harness {
    controller: MissionController,
    rig: MockRig,
    display: RecordingSink,
    summarizer: Arc<ScriptedSummarizer>,
    now: f64,
    position: (f64, f64),
    /// When false the robot stays put regardless of commands.
    drives: bool,
    /// When false the pose is no longer refreshed.
    localized: bool,
    /// Range reading published each tick.
    clearance: f64,
    /// When false no range reading is published.
    ranging: bool,
    real_time: bool,
}

impl Harness {
    fn new(summarizer: ScriptedSummarizer) -> Self {
        Self::build(MissionConfig::default(), house(true), summarizer, Workers::Inline, Vec::new())
    }

    fn build(
        config: MissionConfig,
        map: WaypointMap,
        summarizer: ScriptedSummarizer,
        workers: Workers,
        mut extra_sinks: Vec<Box<dyn ReportSink>>,
    ) -> Self {
        let rig = MockRig::new();
        let display = RecordingSink::new("display");
        let summarizer = Arc::new(summarizer);
        let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(display.clone())];
        sinks.append(&mut extra_sinks);
        let io = rig.collaborators(summarizer.clone(), sinks);
        let controller = MissionController::new(config, map, io, workers).unwrap();
        Self {
            controller,
            rig,
            display,
            summarizer,
            now: 0.0,
            position: (0.0, 0.0),
            drives: true,
            localized: true,
            clearance: 5.0,
            ranging: true,
            real_time: workers == Workers::Threaded,
        }
    }

    fn start(&mut self) {
        self.publish();
        self.controller.start_mission(self.now).unwrap();
    }

    fn publish(&self) {
        if self.localized {
            let (x, y) = self.position;
            self.rig.set_pose(Pose::new(x, y, 0.0, self.now));
        }
        if self.ranging {
            self.rig
                .set_clearance(ObstacleReading::new(self.clearance, self.now));
        }
    }

    fn with_store(mut self, store: MapStore) -> Self {
        self.controller = self.controller.with_store(store);
        self
    }

    fn tick(&mut self) -> MissionState {
        self.now += DT;
        if self.drives && self.rig.is_moving() {
            if let Some(target) = self.controller.current_target() {
                self.position = (target.x, target.y);
            }
        }
        self.publish();
        if self.real_time {
            std::thread::sleep(Duration::from_millis(1));
        }
        self.controller.tick(self.now).clone()
    }

    fn run_until(&mut self, done: impl Fn(&MissionState) -> bool) -> MissionState {
        for _ in 0..MAX_TICKS {
            let state = self.tick();
            if done(&state) {
                return state;
            }
        }
        panic!("gave up in state {}", self.controller.state());
    }

    fn run_to_end(&mut self) -> MissionRecord {
        self.run_until(MissionState::is_terminal);
        self.controller.last_record().cloned().unwrap()
    }
}

// =========================================================================
// == Happy Path ==
// =========================================================================

#[test]
fn person_at_second_waypoint_is_found_and_reported() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("A person reads on the couch.".into())));
    h.start();

    h.run_until(|s| *s == MissionState::Searching(wp("w2")));
    h.rig.set_person_visible(true);
    let record = h.run_to_end();

    assert_eq!(*h.controller.state(), MissionState::Succeeded);
    assert_eq!(
        record.states(),
        vec![
            MissionState::Idle,
            MissionState::RecordHome,
            MissionState::Traveling(wp("w1")),
            MissionState::Searching(wp("w1")),
            MissionState::Traveling(wp("w2")),
            MissionState::Searching(wp("w2")),
            MissionState::Confirming,
            MissionState::Capturing,
            MissionState::Summarizing,
            MissionState::Returning,
            MissionState::Reporting,
            MissionState::Succeeded,
        ]
    );
    assert_eq!(record.outcome(), Some(Outcome::Success));
    assert_eq!(record.summary(), Some("A person reads on the couch."));
    assert!(!record.summary_is_placeholder());
    assert!(record.detection().is_some());
    assert_eq!(record.identity(), Some(UNKNOWN_PERSON));
    assert!(record.media().is_some());
    assert_eq!(record.visited(), &[wp("w1"), wp("w2")]);
    assert_eq!(h.position, (0.0, 0.0), "robot should be back home");

    let delivered = h.display.received();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].is_closed());
    assert_eq!(delivered[0], record);
}

#[test]
fn every_transition_is_recorded_with_increasing_time() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("ok".into())));
    h.start();
    h.run_until(|s| *s == MissionState::Searching(wp("w1")));
    h.rig.set_person_visible(true);
    let record = h.run_to_end();

    let transitions = record.transitions();
    assert!(transitions.windows(2).all(|pair| pair[0].at <= pair[1].at));
    assert!(transitions.windows(2).all(|pair| pair[0].to == pair[1].from));
    assert!(transitions.iter().all(|t| !t.reason.is_empty()));
}

#[test]
fn robot_holds_still_from_confirming_through_summarizing() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("ok".into())));
    h.start();
    h.run_until(|s| *s == MissionState::Searching(wp("w1")));
    h.rig.set_person_visible(true);
    h.run_until(|s| *s == MissionState::Confirming);
    let from = h.rig.commands().len();
    h.run_until(|s| *s == MissionState::Returning);

    // The return route is planned at the Returning transition, so every
    // command up to and including that tick is a stop.
    assert!(h.rig.commands()[from..].iter().all(MotionCommand::is_stop));
}

// =========================================================================
// == Search Exhaustion ==
// =========================================================================

#[test]
fn full_traversal_without_detection_fails() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.start();
    let record = h.run_to_end();

    assert_eq!(*h.controller.state(), MissionState::Failed);
    assert_eq!(record.outcome(), Some(Outcome::Failed));
    assert_eq!(record.visited(), &[wp("w1"), wp("w2"), wp("w3")]);
    assert_eq!(record.reason(), Some("target not found after searching 3 waypoints"));
    assert_eq!(h.summarizer.calls(), 0);
    assert_eq!(h.display.received().len(), 1);

    // Three positions per waypoint, plus the re-centre after each sweep.
    assert!(h.rig.mount_positions().len() >= 3 * 4);
}

#[test]
fn rejected_candidate_resumes_the_search() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.start();
    h.run_until(|s| *s == MissionState::Searching(wp("w1")));
    h.rig.set_person_visible(true);
    h.run_until(|s| *s == MissionState::Confirming);
    h.rig.set_person_visible(false);

    let resumed = h.run_until(|s| *s != MissionState::Confirming);
    assert_eq!(resumed, MissionState::Searching(wp("w1")));

    let record = h.run_to_end();
    assert_eq!(record.outcome(), Some(Outcome::Failed));
    assert!(record.detection().is_none());
}

// =========================================================================
// == Detection While Traveling ==
// =========================================================================

#[test]
fn single_noisy_frame_in_travel_keeps_the_robot_driving() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.drives = false;
    h.start();
    h.run_until(|s| *s == MissionState::Traveling(wp("w1")));
    h.tick();
    assert!(h.rig.is_moving());

    // Exactly one frame sees the person.
    h.rig.set_person_visible(true);
    let seen = h.rig.frames_captured();
    while h.rig.frames_captured() == seen {
        h.tick();
    }
    h.rig.set_person_visible(false);
    let from = h.rig.commands().len();

    h.run_until(|s| *s == MissionState::Confirming);
    while *h.controller.state() == MissionState::Confirming {
        assert!(h.rig.is_moving(), "stopped while confirming at t={:.1}", h.now);
        h.tick();
    }
    assert_eq!(*h.controller.state(), MissionState::Traveling(wp("w1")));
    assert!(!h.rig.commands()[from..].iter().any(MotionCommand::is_stop));
    assert!(h.rig.is_moving());

    let record = h.controller.status(h.now).current_record.unwrap();
    let rejected = record.transitions().last().unwrap();
    assert_eq!(rejected.from, MissionState::Confirming);
    assert!(rejected.reason.starts_with("candidate rejected"));
}

#[test]
fn passive_hit_in_travel_is_confirmed_before_arrival() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("Grandma is watering plants.".into())));
    h.drives = false;
    h.rig.set_detection(
        DetectionEvent::new(BoundingBox::centered(0.4, 0.5, 0.15, 0.5), 0.8, 0.0).with_label("Grandma"),
    );
    h.rig.set_person_visible(true);
    h.start();
    h.run_until(|s| *s == MissionState::Summarizing);

    let record = h.controller.status(h.now).current_record.unwrap();
    assert_eq!(
        record.states(),
        vec![
            MissionState::Idle,
            MissionState::RecordHome,
            MissionState::Traveling(wp("w1")),
            MissionState::Confirming,
            MissionState::Capturing,
            MissionState::Summarizing,
        ]
    );
    assert!(record.visited().is_empty());
    assert_eq!(h.position, (0.0, 0.0));
    assert_eq!(h.rig.media_captured(), 1);

    // Home stop, the drive towards w1, and the stop once confirmed.
    let commands = h.rig.commands();
    assert!(matches!(
        commands.as_slice(),
        [MotionCommand::Stop, MotionCommand::Move { .. }, MotionCommand::Stop]
    ));

    let record = h.run_to_end();
    assert_eq!(record.outcome(), Some(Outcome::Success));
    assert_eq!(record.identity(), Some("Grandma"));
    assert_eq!(record.detection().unwrap().confidence, 0.8);
    assert_eq!(h.display.received()[0].identity(), Some("Grandma"));
}

#[test]
fn detector_errors_count_as_empty_frames() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.rig.set_person_visible(true);
    h.rig.fail_detector(true);
    h.start();
    let record = h.run_to_end();

    assert_eq!(record.outcome(), Some(Outcome::Failed));
    assert_eq!(record.reason(), Some("target not found after searching 3 waypoints"));
    assert!(!record.states().contains(&MissionState::Confirming));
    // Every waypoint was swept with frames that reached the detector.
    assert!(h.rig.frames_captured() >= 3 * 3);
    assert_eq!(h.rig.media_captured(), 0);
}

// =========================================================================
// == Cancellation ==
// =========================================================================

fn assert_stopped_after_one_tick(h: &mut Harness) {
    h.controller.cancel();
    h.tick();
    assert_eq!(h.rig.last_command(), Some(MotionCommand::Stop));
    assert!(!h.rig.is_moving());
}

#[test]
fn cancel_before_confirming_ends_immediately() {
    for target in ["RecordHome", "Traveling", "Searching", "Confirming"] {
        let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
        h.start();
        match target {
            "Traveling" => {
                h.run_until(|s| matches!(s, MissionState::Traveling(_)));
            }
            "Searching" => {
                h.run_until(|s| matches!(s, MissionState::Searching(_)));
            }
            "Confirming" => {
                h.run_until(|s| matches!(s, MissionState::Searching(_)));
                h.rig.set_person_visible(true);
                h.run_until(|s| *s == MissionState::Confirming);
            }
            _ => {}
        }
        assert_eq!(h.controller.state().name(), target);

        assert_stopped_after_one_tick(&mut h);
        assert_eq!(*h.controller.state(), MissionState::Cancelled, "cancel in {target}");
        let record = h.controller.last_record().unwrap();
        assert_eq!(record.outcome(), Some(Outcome::Cancelled));
        assert_eq!(h.display.received().len(), 1);
    }
}

#[test]
fn cancel_while_traveling_stops_a_moving_robot() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.drives = false;
    h.start();
    h.run_until(|s| matches!(s, MissionState::Traveling(_)));
    h.tick();
    assert!(h.rig.is_moving());

    assert_stopped_after_one_tick(&mut h);
    assert_eq!(*h.controller.state(), MissionState::Cancelled);
}

#[test]
fn cancel_while_returning_finishes_the_trip_home() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("ok".into())));
    h.start();
    h.run_until(|s| *s == MissionState::Searching(wp("w2")));
    h.rig.set_person_visible(true);
    h.run_until(|s| *s == MissionState::Returning);
    h.tick();

    assert_stopped_after_one_tick(&mut h);
    assert_eq!(*h.controller.state(), MissionState::Returning);

    let record = h.run_to_end();
    assert_eq!(*h.controller.state(), MissionState::Cancelled);
    assert_eq!(record.outcome(), Some(Outcome::Cancelled));
    assert_eq!(h.position, (0.0, 0.0));
    assert!(!record.states().contains(&MissionState::Reporting));
}

#[test]
fn cancel_while_capturing_returns_home_first() {
    let mut h = Harness::build(
        MissionConfig::default(),
        house(true),
        ScriptedSummarizer::always(Ok("unused".into())),
        Workers::Threaded,
        Vec::new(),
    );
    h.rig.set_capture_delay(Duration::from_millis(500));
    h.rig.set_person_visible(true);
    h.start();
    h.run_until(|s| *s == MissionState::Capturing);

    assert_stopped_after_one_tick(&mut h);
    assert_eq!(*h.controller.state(), MissionState::Returning);

    let record = h.run_to_end();
    assert_eq!(record.outcome(), Some(Outcome::Cancelled));
    assert!(record.media().is_none());
    assert_eq!(h.summarizer.calls(), 0);
}

#[test]
fn cancel_while_summarizing_returns_home_first() {
    let mut h = Harness::build(
        MissionConfig::default(),
        house(true),
        ScriptedSummarizer::always(Ok("late".into())).with_delay(Duration::from_secs(2)),
        Workers::Threaded,
        Vec::new(),
    );
    h.rig.set_person_visible(true);
    h.start();
    h.run_until(|s| *s == MissionState::Summarizing);

    assert_stopped_after_one_tick(&mut h);
    assert_eq!(*h.controller.state(), MissionState::Returning);

    let record = h.run_to_end();
    assert_eq!(record.outcome(), Some(Outcome::Cancelled));
    assert!(record.summary().is_none());
}

#[test]
fn cancel_while_idle_is_a_no_op() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.controller.cancel();
    h.tick();
    assert_eq!(*h.controller.state(), MissionState::Idle);
    assert!(h.rig.commands().is_empty());

    // A cancel issued while idle must not leak into the next mission.
    h.start();
    h.run_until(|s| matches!(s, MissionState::Traveling(_)));
}

// =========================================================================
// == Sensing ==
// =========================================================================

#[test]
fn stale_pose_never_drives_forward() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.start();
    h.run_until(|s| matches!(s, MissionState::Traveling(_)));
    h.localized = false;
    h.rig.clear_pose();
    let from = h.rig.commands().len();

    for i in 0..40 {
        h.clearance = if i % 7 == 0 { 0.1 } else { 5.0 };
        h.tick();
    }
    assert!(h.rig.commands()[from..]
        .iter()
        .all(|cmd| cmd.forward_velocity() <= 0.0));
    assert!(!h.controller.state().is_terminal());
}

#[test]
fn blocked_path_triggers_avoidance_before_progress() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.drives = false;
    h.start();
    h.run_until(|s| matches!(s, MissionState::Traveling(_)));
    h.tick();
    assert!(h.rig.last_command().is_some_and(|cmd| cmd.forward_velocity() > 0.0));

    h.clearance = 0.1;
    let from = h.rig.commands().len();
    h.tick();
    assert_eq!(h.rig.commands()[from..], [MotionCommand::Stop]);

    // Path clears, but the maneuver still runs: hold, then rotate in place.
    h.clearance = 5.0;
    for _ in 0..10 {
        h.tick();
    }
    let maneuver = &h.rig.commands()[from..];
    assert!(maneuver.iter().any(|cmd| matches!(
        cmd,
        MotionCommand::Move { forward, turn } if *forward == 0.0 && *turn != 0.0
    )));
}

#[test]
fn lost_range_reading_holds_the_robot_still() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.drives = false;
    h.start();
    h.run_until(|s| matches!(s, MissionState::Traveling(_)));
    h.tick();
    assert!(h.rig.is_moving());

    h.ranging = false;
    h.rig.clear_clearance();
    for _ in 0..5 {
        h.tick();
        assert!(!h.rig.is_moving());
    }
    assert_eq!(h.rig.last_command(), Some(MotionCommand::Stop));
    assert_eq!(*h.controller.state(), MissionState::Traveling(wp("w1")));

    h.ranging = true;
    h.tick();
    assert!(h.rig.is_moving());
}

// =========================================================================
// == Returning ==
// =========================================================================

/// Finds the person at w1, then blocks the way home for good.
fn stranded_after_finding(h: &mut Harness) {
    h.start();
    h.run_until(|s| *s == MissionState::Searching(wp("w1")));
    h.rig.set_person_visible(true);
    h.run_until(|s| *s == MissionState::Returning);
    h.drives = false;
    h.clearance = 0.05;
}

fn returning_entries(record: &MissionRecord) -> usize {
    record
        .transitions()
        .iter()
        .filter(|t| t.to == MissionState::Returning)
        .count()
}

#[test]
fn blocked_return_retries_then_times_out() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("ok".into())));
    stranded_after_finding(&mut h);
    let record = h.run_to_end();

    assert_eq!(*h.controller.state(), MissionState::Failed);
    assert_eq!(record.outcome(), Some(Outcome::Timeout));
    assert_eq!(
        returning_entries(&record),
        1 + h.controller.config().returning_retries as usize
    );
    assert_eq!(returning_entries(&record), 3);
    assert!(record.reason().unwrap().contains("Returning"));
    assert!(record.summary().is_some());
    assert_eq!(h.display.received().len(), 1);
}

#[test]
fn blocked_return_after_cancel_ends_cancelled() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("ok".into())));
    stranded_after_finding(&mut h);
    h.controller.cancel();
    h.tick();
    assert_eq!(*h.controller.state(), MissionState::Returning);

    let record = h.run_to_end();
    assert_eq!(*h.controller.state(), MissionState::Cancelled);
    assert_eq!(record.outcome(), Some(Outcome::Cancelled));
    assert_eq!(returning_entries(&record), 3);
    assert_eq!(record.reason(), Some("cancelled; could not return home in time"));
}

// =========================================================================
// == Hardware Faults ==
// =========================================================================

#[test]
fn motion_fault_fails_the_mission() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.rig
        .fail_motion(Some(HardwareFault::new("motion", "motor driver overheated")));
    h.start();
    let record = h.run_to_end();

    assert_eq!(*h.controller.state(), MissionState::Failed);
    assert_eq!(record.outcome(), Some(Outcome::Failed));
    assert!(record.reason().unwrap().contains("motor driver overheated"));
    assert_eq!(
        record.states(),
        vec![
            MissionState::Idle,
            MissionState::RecordHome,
            MissionState::Traveling(wp("w1")),
            MissionState::Failed,
        ]
    );
    assert!(!h.rig.is_moving());
    assert_eq!(h.display.received().len(), 1);
}

#[test]
fn frame_fault_fails_the_mission() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.rig
        .fail_frames(Some(HardwareFault::new("camera", "sensor unplugged")));
    h.start();
    let record = h.run_to_end();

    assert_eq!(record.outcome(), Some(Outcome::Failed));
    assert!(record.reason().unwrap().contains("sensor unplugged"));
    assert_eq!(h.rig.frames_captured(), 0);
    assert_eq!(h.rig.last_command(), Some(MotionCommand::Stop));
}

// =========================================================================
// == Summary & Capture Failures ==
// =========================================================================

#[test]
fn failed_summarizer_falls_back_to_placeholder() {
    let mut h = Harness::new(ScriptedSummarizer::always(Err(SummaryUnavailable::Failed(
        "service down".into(),
    ))));
    h.rig.set_person_visible(true);
    h.start();
    let record = h.run_to_end();

    assert_eq!(record.outcome(), Some(Outcome::Success));
    assert_eq!(record.summary(), Some(DEFAULT_PLACEHOLDER));
    assert!(record.summary_is_placeholder());
    assert_eq!(record.reason(), Some("person found, summary unavailable"));
    assert_eq!(h.summarizer.calls(), 3);
}

#[test]
fn slow_summarizer_times_out_to_placeholder() {
    let mut config = MissionConfig::default();
    config.capture.summary_timeout = 1.0;
    let mut h = Harness::build(
        config,
        house(true),
        ScriptedSummarizer::always(Ok("too late".into())).with_delay(Duration::from_secs(5)),
        Workers::Threaded,
        Vec::new(),
    );
    h.rig.set_person_visible(true);
    h.start();
    let record = h.run_to_end();

    assert_eq!(record.outcome(), Some(Outcome::Success));
    assert!(record.summary_is_placeholder());
    assert_eq!(record.summary(), Some(DEFAULT_PLACEHOLDER));
}

#[test]
fn capture_fault_fails_the_mission_and_still_reports() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.rig.fail_capture(Some(HardwareFault::new("camera", "shutter jammed")));
    h.rig.set_person_visible(true);
    h.start();
    let record = h.run_to_end();

    assert_eq!(*h.controller.state(), MissionState::Failed);
    assert_eq!(record.outcome(), Some(Outcome::Failed));
    assert!(record.reason().unwrap().contains("shutter jammed"));
    assert!(record.detection().is_some());
    assert_eq!(h.display.received().len(), 1);
    assert_eq!(h.rig.last_command(), Some(MotionCommand::Stop));
}

#[test]
fn failing_sink_does_not_change_the_outcome() {
    let mut h = Harness::build(
        MissionConfig::default(),
        house(true),
        ScriptedSummarizer::always(Ok("ok".into())),
        Workers::Inline,
        vec![Box::new(FailingSink::new("web"))],
    );
    h.rig.set_person_visible(true);
    h.start();
    let record = h.run_to_end();

    assert_eq!(record.outcome(), Some(Outcome::Success));
    let status = h.controller.status(h.now);
    assert_eq!(status.deliveries.len(), 2);
    assert!(status.deliveries[0].delivered);
    assert!(!status.deliveries[1].delivered);
    assert_eq!(h.display.received().len(), 1);
}

// =========================================================================
// == Lifecycle ==
// =========================================================================

#[test]
fn second_start_is_rejected_while_running() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.start();
    assert_eq!(
        h.controller.start_mission(h.now),
        Err(MissionError::AlreadyRunning)
    );
}

#[test]
fn missions_can_run_back_to_back() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("ok".into())));
    h.rig.set_person_visible(true);
    h.start();
    let first = h.run_to_end();

    h.start();
    assert_eq!(*h.controller.state(), MissionState::RecordHome);
    let second = h.run_to_end();

    assert_ne!(first.id(), second.id());
    assert_eq!(second.outcome(), Some(Outcome::Success));
    assert_eq!(h.display.received().len(), 2);
}

#[test]
fn missing_pose_times_out_in_record_home() {
    let mut h = Harness::build(
        MissionConfig::default(),
        house(false),
        ScriptedSummarizer::always(Ok("unused".into())),
        Workers::Inline,
        Vec::new(),
    );
    h.localized = false;
    h.start();
    let record = h.run_to_end();

    assert_eq!(*h.controller.state(), MissionState::Failed);
    assert_eq!(record.outcome(), Some(Outcome::Timeout));
    assert!(record.reason().unwrap().contains("RecordHome"));
    assert!(h.now <= h.controller.config().dwell.record_home + 2.0 * DT);
}

#[test]
fn status_reports_the_running_mission() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    let idle = h.controller.status(h.now);
    assert_eq!(idle.state, MissionState::Idle);
    assert!(idle.mission.is_none());

    h.start();
    for _ in 0..5 {
        h.tick();
    }
    let status = h.controller.status(h.now);
    assert!(status.mission.is_some());
    assert!((status.elapsed - 0.5).abs() < 1e-9);
    assert!(status.current_record.is_some());
}

#[test]
fn shutdown_closes_the_mission_as_cancelled() {
    let mut h = Harness::new(ScriptedSummarizer::always(Ok("unused".into())));
    h.start();
    h.run_until(|s| matches!(s, MissionState::Traveling(_)));
    h.controller.shutdown(h.now).unwrap();

    assert_eq!(*h.controller.state(), MissionState::Cancelled);
    let record = h.controller.last_record().unwrap();
    assert_eq!(record.reason(), Some("controller shutdown"));
    assert_eq!(h.rig.last_command(), Some(MotionCommand::Stop));
}

// =========================================================================
// == Persistence ==
// =========================================================================

#[test]
fn home_is_recorded_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = MapStore::new(dir.path().join("map.json"));

    let mut h = Harness::build(
        MissionConfig::default(),
        house(false),
        ScriptedSummarizer::always(Ok("unused".into())),
        Workers::Inline,
        Vec::new(),
    )
    .with_store(store.clone());
    h.position = (0.5, 0.0);
    h.start();
    h.run_until(|s| matches!(s, MissionState::Traveling(_)));

    let saved = store.load().unwrap().unwrap();
    let home = saved.home().unwrap();
    assert_eq!((home.position.x, home.position.y), (0.5, 0.0));
    assert_eq!(saved.route(&home.id, &wp("w1")).unwrap().len(), 2);

    let record = h.controller.status(h.now).current_record.unwrap();
    assert_eq!(record.home().map(|p| p.position.x), Some(0.5));
}

#[test]
fn stored_home_is_reused_without_waiting_for_pose() {
    let dir = tempfile::tempdir().unwrap();
    let store = MapStore::new(dir.path().join("map.json"));
    let mut seeded = house(false);
    seeded.set_home_from_pose(&Pose::new(0.0, 0.0, 0.0, 0.0));
    store.save(&seeded).unwrap();

    let map = store.load_or(house(false)).unwrap();
    let mut h = Harness::build(
        MissionConfig::default(),
        map,
        ScriptedSummarizer::always(Ok("unused".into())),
        Workers::Inline,
        Vec::new(),
    );
    h.localized = false;
    h.start();
    let state = h.tick();
    assert_eq!(state, MissionState::Traveling(wp("w1")));
}
