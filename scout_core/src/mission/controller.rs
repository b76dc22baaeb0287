// scout_core/src/mission/controller.rs

//! The mission state machine.
//!
//! One cooperative control loop: every [`MissionController::tick`] polls the
//! pose and obstacle sources, evaluates the current state, and issues at most
//! one motion command and at most one scan request. Capture, detection and
//! summarization run as worker jobs that the loop polls without blocking.

use nalgebra::Point2;
use std::collections::VecDeque;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::pipeline::{
    self, CaptureJob, DetectionJob, SinkDelivery, SummaryJob, SummaryRequest,
};
use super::record::{MissionId, MissionRecord, Outcome, Transition};
use super::state::MissionState;
use crate::abstractions::Collaborators;
use crate::config::MissionConfig;
use crate::error::{HardwareFault, MapError, MissionError, StoreError, SummaryUnavailable};
use crate::mapping::{MapStore, WaypointId, WaypointMap};
use crate::messages::{FrameObservation, Media};
use crate::navigation::{NavigationPolicy, RouteFollower, RouteProgress};
use crate::perception::{DetectionGate, GateVerdict, ScanGrant, ScanMode, ScanScheduler};
use crate::search::{PanScan, SweepPosition, SweepStep};
use crate::types::{MotionCommand, ObstacleReading, Pose, Timestamp};
use crate::worker::{CancelToken, JobPoll, Workers};

/// Snapshot returned by [`MissionController::status`].
#[derive(Debug, Clone)]
pub struct MissionStatus {
    pub state: MissionState,
    pub mission: Option<MissionId>,
    /// Seconds since the current (or last) mission started.
    pub elapsed: f64,
    pub current_record: Option<MissionRecord>,
    pub last_record: Option<MissionRecord>,
    /// Per-sink results of the last report dispatch.
    pub deliveries: Vec<SinkDelivery>,
}

// =========================================================================
// == Internal Bookkeeping ==
// =========================================================================

/// Why a mission is ending. Step functions return it through `?`.
#[derive(Debug)]
struct Ending {
    state: MissionState,
    outcome: Outcome,
    reason: String,
}

impl Ending {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: MissionState::Failed,
            outcome: Outcome::Failed,
            reason: reason.into(),
        }
    }

    fn timeout(state: &MissionState, limit: f64) -> Self {
        Self {
            state: MissionState::Failed,
            outcome: Outcome::Timeout,
            reason: MissionError::Timeout {
                state: state.to_string(),
                limit,
            }
            .to_string(),
        }
    }

    fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            state: MissionState::Cancelled,
            outcome: Outcome::Cancelled,
            reason: reason.into(),
        }
    }

    fn succeeded(reason: impl Into<String>) -> Self {
        Self {
            state: MissionState::Succeeded,
            outcome: Outcome::Success,
            reason: reason.into(),
        }
    }
}

impl From<HardwareFault> for Ending {
    fn from(fault: HardwareFault) -> Self {
        Ending::failed(MissionError::HardwareFault(fault).to_string())
    }
}

impl From<MapError> for Ending {
    fn from(e: MapError) -> Self {
        Ending::failed(format!("navigation failed: {e}"))
    }
}

impl From<MissionError> for Ending {
    fn from(e: MissionError) -> Self {
        Ending::failed(e.to_string())
    }
}

type Step = Result<(), Ending>;

/// Freshness-checked sensor values for one tick. `None` means stale.
#[derive(Debug, Clone, Copy)]
struct Readings {
    pose: Option<Pose>,
    clearance: Option<ObstacleReading>,
}

struct PendingScan {
    grant: ScanGrant,
    captured_at: Timestamp,
    job: DetectionJob,
}

struct ActiveMission {
    record: MissionRecord,
    deadline: Option<Timestamp>,
    /// Waypoints not yet visited, in visitation order.
    plan: VecDeque<WaypointId>,
    /// Last waypoint the robot reached.
    location: WaypointId,
    route: Option<RouteFollower>,
    target: Option<Point2<f64>>,
    sweep: Option<PanScan>,
    /// Mode to go back to if the candidate in `Confirming` is rejected.
    resume: Option<MissionState>,
    scans: VecDeque<PendingScan>,
    capture: Option<CaptureJob>,
    summary: Option<SummaryJob>,
    summary_started: Timestamp,
    cancel_handled: bool,
    /// Cancelled past `Confirming`: finish in `Cancelled` once home.
    cancel_requested: bool,
    return_retries: u32,
}

impl ActiveMission {
    fn new(record: MissionRecord) -> Self {
        Self {
            record,
            deadline: None,
            plan: VecDeque::new(),
            location: WaypointId::home(),
            route: None,
            target: None,
            sweep: None,
            resume: None,
            scans: VecDeque::new(),
            capture: None,
            summary: None,
            summary_started: 0.0,
            cancel_handled: false,
            cancel_requested: false,
            return_retries: 0,
        }
    }
}

// =========================================================================
// == Mission Controller ==
// =========================================================================

pub struct MissionController {
    config: MissionConfig,
    map: WaypointMap,
    store: Option<MapStore>,
    io: Collaborators,
    workers: Workers,
    cancel: CancelToken,
    scheduler: ScanScheduler,
    gate: DetectionGate,
    navigation: NavigationPolicy,
    state: MissionState,
    active: Option<ActiveMission>,
    last_record: Option<MissionRecord>,
    deliveries: Vec<SinkDelivery>,
    last_command: Option<MotionCommand>,
    pose_stale: bool,
    clearance_stale: bool,
}

impl MissionController {
    pub fn new(
        config: MissionConfig,
        map: WaypointMap,
        io: Collaborators,
        workers: Workers,
    ) -> Result<Self, MissionError> {
        config.validate()?;
        Ok(Self {
            scheduler: ScanScheduler::new(&config.scan),
            gate: DetectionGate::new(config.detection.clone()),
            navigation: NavigationPolicy::new(&config.navigation),
            config,
            map,
            store: None,
            io,
            workers,
            cancel: CancelToken::new(),
            state: MissionState::Idle,
            active: None,
            last_record: None,
            deliveries: Vec::new(),
            last_command: None,
            pose_stale: false,
            clearance_stale: false,
        })
    }

    /// Persists Home and the map through `store` (on Home capture and shutdown).
    pub fn with_store(mut self, store: MapStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn state(&self) -> &MissionState {
        &self.state
    }

    pub fn map(&self) -> &WaypointMap {
        &self.map
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn last_record(&self) -> Option<&MissionRecord> {
        self.last_record.as_ref()
    }

    /// Handle that other threads can use to cancel the running mission.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Where the robot is currently driving to, if it is navigating.
    pub fn current_target(&self) -> Option<Point2<f64>> {
        let active = self.active.as_ref()?;
        if !self.state.is_navigating() && !self.confirming_in_travel(active) {
            return None;
        }
        active
            .target
            .or_else(|| active.route.as_ref().and_then(RouteFollower::current_target))
    }

    // --- Commands ---

    pub fn start_mission(&mut self, now: Timestamp) -> Result<MissionId, MissionError> {
        if self.active.is_some() {
            warn!(state = %self.state, "start rejected: mission already running");
            return Err(MissionError::AlreadyRunning);
        }
        if self.state.is_terminal() {
            debug!(previous = %self.state, "resetting to Idle");
            self.state = MissionState::Idle;
        }
        match self.map.validate() {
            Ok(()) | Err(MapError::NoHome) => {}
            Err(e) => warn!(error = %e, "map has problems; affected waypoints will fail explicitly"),
        }

        self.cancel.clear();
        self.last_command = None;
        self.deliveries.clear();

        let id = Uuid::new_v4();
        let mut active = ActiveMission::new(MissionRecord::new(id, &self.config.target, now));
        self.transition(&mut active, now, MissionState::RecordHome, "mission start");
        self.active = Some(active);
        Ok(id)
    }

    /// Requests cancellation. A no-op while no mission is running.
    pub fn cancel(&mut self) {
        if self.active.is_some() {
            info!(state = %self.state, "cancellation requested");
            self.cancel.cancel();
        } else {
            debug!("cancel ignored: no active mission");
        }
    }

    pub fn status(&self, now: Timestamp) -> MissionStatus {
        let current = self.active.as_ref().map(|a| &a.record);
        let elapsed = current
            .or(self.last_record.as_ref())
            .map_or(0.0, |record| record.elapsed(now));
        MissionStatus {
            state: self.state.clone(),
            mission: current.map(MissionRecord::id),
            elapsed,
            current_record: current.cloned(),
            last_record: self.last_record.clone(),
            deliveries: self.deliveries.clone(),
        }
    }

    /// Stops the robot, closes any running mission as cancelled, and saves the map.
    pub fn shutdown(&mut self, now: Timestamp) -> Result<(), StoreError> {
        if let Some(active) = self.active.take() {
            self.finish(active, Ending::cancelled("controller shutdown"), now);
        }
        self.stop_motors();
        if let Some(store) = &self.store {
            store.save(&self.map)?;
        }
        Ok(())
    }

    // --- Control Loop ---

    /// Runs one control step and returns the resulting state.
    pub fn tick(&mut self, now: Timestamp) -> &MissionState {
        let Some(mut active) = self.active.take() else {
            return &self.state;
        };
        match self.step(&mut active, now) {
            Ok(()) => self.active = Some(active),
            Err(ending) => self.finish(active, ending, now),
        }
        &self.state
    }

    fn step(&mut self, active: &mut ActiveMission, now: Timestamp) -> Step {
        let readings = self.read_sensors(now);
        trace!(state = %self.state, pose = ?readings.pose, clearance = ?readings.clearance, "tick");

        if self.cancel.is_cancelled() && !active.cancel_handled {
            active.cancel_handled = true;
            self.stop_motors();
            return self.handle_cancel(active, now, &readings);
        }

        self.check_deadline(active, now, &readings)?;
        self.poll_detections(active, now)?;
        if self.state == MissionState::Confirming {
            if let Some(verdict) = self.gate.expire(now) {
                self.apply_verdict(active, now, verdict)?;
            }
        }

        match self.state.clone() {
            MissionState::RecordHome => self.step_record_home(active, now, &readings),
            MissionState::Traveling(w) => self.step_traveling(active, now, w, &readings),
            MissionState::Searching(w) => self.step_searching(active, now, w),
            MissionState::Confirming => self.step_confirming(active, now, &readings),
            MissionState::Capturing => self.step_capturing(active, now),
            MissionState::Summarizing => self.step_summarizing(active, now, &readings),
            MissionState::Returning => self.step_returning(active, now, &readings),
            MissionState::Reporting => {
                let reason = if active.record.summary_is_placeholder() {
                    "person found, summary unavailable"
                } else {
                    "person found and reported"
                };
                Err(Ending::succeeded(reason))
            }
            MissionState::Idle
            | MissionState::Cancelled
            | MissionState::Failed
            | MissionState::Succeeded => Ok(()),
        }
    }

    fn read_sensors(&mut self, now: Timestamp) -> Readings {
        let max_pose_age = self.config.navigation.pose_max_age;
        let raw_pose = self.io.pose.latest_pose();
        let pose_age = raw_pose.map_or(f64::INFINITY, |p| p.age(now));
        let pose = raw_pose
            .filter(|p| pose_age <= max_pose_age && p.position.coords.iter().all(|v| v.is_finite()));
        if pose.is_none() != self.pose_stale {
            self.pose_stale = pose.is_none();
            if self.pose_stale {
                let stale = MissionError::Stale {
                    sensor: "pose",
                    age: pose_age,
                    max_age: max_pose_age,
                };
                warn!(error = %stale, "pose unavailable; planned motion suspended");
            } else {
                info!("pose fresh again");
            }
        }

        let max_clearance_age = self.config.navigation.obstacle_max_age;
        let clearance = self
            .io
            .obstacles
            .latest_clearance()
            .filter(|r| r.age(now) <= max_clearance_age && !r.clearance.is_nan());
        if clearance.is_none() != self.clearance_stale {
            self.clearance_stale = clearance.is_none();
            if self.clearance_stale {
                warn!(max_age = max_clearance_age, "obstacle reading stale; holding still");
            } else {
                info!("obstacle reading fresh again");
            }
        }

        Readings { pose, clearance }
    }

    // --- Cancellation & Timeouts ---

    fn handle_cancel(&mut self, active: &mut ActiveMission, now: Timestamp, readings: &Readings) -> Step {
        match self.state {
            MissionState::Capturing | MissionState::Summarizing => {
                active.capture = None;
                active.summary = None;
                active.cancel_requested = true;
                self.enter_returning(active, now, readings, "cancelled; returning home")
            }
            MissionState::Returning => {
                info!("cancelled while returning; continuing home");
                active.cancel_requested = true;
                Ok(())
            }
            _ => Err(Ending::cancelled("cancelled by request")),
        }
    }

    fn check_deadline(&mut self, active: &mut ActiveMission, now: Timestamp, readings: &Readings) -> Step {
        let Some(deadline) = active.deadline else {
            return Ok(());
        };
        if now <= deadline {
            return Ok(());
        }
        let limit = self.state.dwell_limit(&self.config.dwell).unwrap_or_default();
        if self.state != MissionState::Returning {
            return Err(Ending::timeout(&self.state, limit));
        }
        if active.return_retries < self.config.returning_retries {
            active.return_retries += 1;
            let reason = format!(
                "return timed out, retry {}/{}",
                active.return_retries, self.config.returning_retries
            );
            warn!(%reason, "re-planning route home");
            return self.enter_returning(active, now, readings, &reason);
        }
        if active.cancel_requested {
            return Err(Ending::cancelled("cancelled; could not return home in time"));
        }
        Err(Ending::timeout(&self.state, limit))
    }

    // --- Scanning ---

    /// Takes one frame and submits it for detection if the scheduler allows.
    fn scan_once(&mut self, active: &mut ActiveMission, now: Timestamp) -> Result<bool, Ending> {
        let Some(grant) = self.scheduler.request(now) else {
            return Ok(false);
        };
        let mut frame = match self.io.camera.capture_frame() {
            Ok(frame) => frame,
            Err(fault) => {
                self.scheduler.complete(grant);
                return Err(fault.into());
            }
        };
        frame.timestamp = now;
        let job = match pipeline::spawn_detection(self.workers, self.io.detector.clone(), frame) {
            Ok(job) => job,
            Err(e) => {
                self.scheduler.complete(grant);
                return Err(e.into());
            }
        };
        active.scans.push_back(PendingScan {
            grant,
            captured_at: now,
            job,
        });
        Ok(true)
    }

    fn drop_scans(&mut self, active: &mut ActiveMission) {
        if !active.scans.is_empty() {
            debug!(pending = active.scans.len(), "abandoning detection jobs");
        }
        active.scans.clear();
        self.scheduler.abandon_all();
        self.gate.reset();
    }

    /// Feeds finished detections to the gate in submission order.
    fn poll_detections(&mut self, active: &mut ActiveMission, now: Timestamp) -> Step {
        while let Some(front) = active.scans.front_mut() {
            let result = match front.job.poll() {
                JobPoll::Pending => break,
                JobPoll::Ready(result) => Some(result),
                JobPoll::Lost => None,
            };
            let Some(scan) = active.scans.pop_front() else {
                break;
            };
            self.scheduler.complete(scan.grant);

            let observation = match result {
                Some(Ok(Some(mut event))) => {
                    event.frame_timestamp = scan.captured_at;
                    FrameObservation::hit(event)
                }
                Some(Ok(None)) => FrameObservation::miss(scan.captured_at),
                Some(Err(e)) => {
                    warn!(error = %e, "detector failed; treating frame as empty");
                    FrameObservation::miss(scan.captured_at)
                }
                None => continue,
            };
            let verdict = self.gate.observe(observation);
            self.apply_verdict(active, now, verdict)?;
        }
        Ok(())
    }

    fn apply_verdict(&mut self, active: &mut ActiveMission, now: Timestamp, verdict: GateVerdict) -> Step {
        match verdict {
            GateVerdict::Idle | GateVerdict::Pending { .. } => Ok(()),
            GateVerdict::Opened => match self.state {
                MissionState::Traveling(_) | MissionState::Searching(_) => {
                    self.enter_confirming(active, now)
                }
                _ => Ok(()),
            },
            GateVerdict::Reopened(reason) => match self.state {
                MissionState::Traveling(_) | MissionState::Searching(_) => {
                    self.enter_confirming(active, now)
                }
                MissionState::Confirming => {
                    info!(?reason, "candidate dropped; a hit elsewhere opened another");
                    Ok(())
                }
                _ => Ok(()),
            },
            GateVerdict::Confirmed(event) => {
                match self.state {
                    MissionState::Traveling(_) | MissionState::Searching(_) => {
                        self.enter_confirming(active, now)?;
                    }
                    MissionState::Confirming => {}
                    _ => return Ok(()),
                }
                if let Err(e) = active.record.set_detection(event) {
                    warn!(error = %e, "could not record detection");
                }
                self.enter_capturing(active, now)
            }
            GateVerdict::Rejected(reason) => {
                if self.state != MissionState::Confirming {
                    return Ok(());
                }
                let why = format!("candidate rejected: {reason:?}");
                match active.resume.take() {
                    Some(MissionState::Traveling(w)) => {
                        self.scheduler.set_mode(Some(ScanMode::Travel));
                        self.transition(active, now, MissionState::Traveling(w), &why);
                        Ok(())
                    }
                    Some(MissionState::Searching(w)) => {
                        if let Some(sweep) = active.sweep.as_mut() {
                            sweep.resume();
                        }
                        self.transition(active, now, MissionState::Searching(w), &why);
                        Ok(())
                    }
                    other => Err(Ending::failed(format!(
                        "cannot resume after rejected candidate (prior mode {other:?})"
                    ))),
                }
            }
        }
    }

    // --- State Entry ---

    fn transition(&mut self, active: &mut ActiveMission, now: Timestamp, to: MissionState, reason: &str) {
        let from = std::mem::replace(&mut self.state, to.clone());
        info!(mission = %active.record.id(), from = %from, to = %to, reason, "state transition");
        let transition = Transition {
            at: now,
            from,
            to: to.clone(),
            reason: reason.to_string(),
        };
        if let Err(e) = active.record.push_transition(transition) {
            warn!(error = %e, "transition not recorded");
        }
        active.deadline = to.dwell_limit(&self.config.dwell).map(|limit| now + limit);
    }

    fn enter_traveling(&mut self, active: &mut ActiveMission, now: Timestamp, target: WaypointId, reason: &str) -> Step {
        let route = RouteFollower::plan(&self.map, &active.location, &target)?;
        debug!(route = ?route.hops().collect::<Vec<_>>(), "route planned");
        active.route = Some(route);
        active.target = None;
        self.navigation.reset();
        self.scheduler.set_mode(Some(ScanMode::Travel));
        self.transition(active, now, MissionState::Traveling(target), reason);
        Ok(())
    }

    fn enter_searching(&mut self, active: &mut ActiveMission, now: Timestamp, at: WaypointId) {
        active.route = None;
        active.target = None;
        active.sweep = Some(PanScan::new(
            self.config.search.sweep(),
            self.config.scan.search.interval,
        ));
        self.navigation.reset();
        self.scheduler.set_mode(Some(ScanMode::Search));
        let reason = format!("arrived at {at}");
        self.transition(active, now, MissionState::Searching(at), &reason);
    }

    /// Scans at the Search cadence. A candidate seen while traveling does not
    /// interrupt the drive; one seen during a sweep keeps the robot still.
    fn enter_confirming(&mut self, active: &mut ActiveMission, now: Timestamp) -> Step {
        active.resume = Some(self.state.clone());
        self.scheduler.set_mode(Some(ScanMode::Search));
        self.transition(active, now, MissionState::Confirming, "candidate detection");
        if self.confirming_in_travel(active) {
            return Ok(());
        }
        self.navigation.reset();
        self.commit(active, MotionCommand::Stop)
    }

    fn enter_capturing(&mut self, active: &mut ActiveMission, now: Timestamp) -> Step {
        self.drop_scans(active);
        self.scheduler.set_mode(None);
        active.resume = None;
        self.transition(active, now, MissionState::Capturing, "person confirmed");
        self.commit(active, MotionCommand::Stop)?;
        let job = pipeline::spawn_capture(
            self.workers,
            self.io.camera.clone(),
            self.config.capture.media,
        )?;
        active.capture = Some(job);
        Ok(())
    }

    fn enter_summarizing(&mut self, active: &mut ActiveMission, now: Timestamp, media: Media) -> Step {
        self.transition(active, now, MissionState::Summarizing, "media captured");
        let request = SummaryRequest::from_config(&self.config.capture);
        let job = pipeline::spawn_summary(self.workers, self.io.summarizer.clone(), media, request)?;
        active.summary = Some(job);
        active.summary_started = now;
        Ok(())
    }

    /// Plans from the waypoint nearest the robot (or the last one reached when
    /// the pose is stale) back to Home.
    fn enter_returning(&mut self, active: &mut ActiveMission, now: Timestamp, readings: &Readings, reason: &str) -> Step {
        self.drop_scans(active);
        self.scheduler.set_mode(None);
        self.navigation.reset();
        self.transition(active, now, MissionState::Returning, reason);

        let start = readings
            .pose
            .and_then(|pose| self.map.nearest(&pose.position).map(|w| w.id.clone()))
            .unwrap_or_else(|| active.location.clone());
        let planned = self
            .map
            .home_id()
            .cloned()
            .ok_or(MapError::NoHome)
            .and_then(|home| RouteFollower::plan(&self.map, &start, &home));
        match planned {
            Ok(route) => {
                active.route = Some(route);
                active.target = None;
                Ok(())
            }
            Err(e) if active.cancel_requested => {
                Err(Ending::cancelled(format!("cancelled; return home failed: {e}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    // --- Per-State Steps ---

    fn step_record_home(&mut self, active: &mut ActiveMission, now: Timestamp, readings: &Readings) -> Step {
        self.commit(active, MotionCommand::Stop)?;

        let home_pose = match self.map.home() {
            Some(home) => {
                debug!(home = %home.id, "reusing stored home");
                Pose {
                    position: home.position,
                    heading: home.heading,
                    timestamp: now,
                }
            }
            None => {
                // Wait for a fresh pose; the dwell limit bounds the wait.
                let Some(pose) = readings.pose else {
                    return Ok(());
                };
                let id = self.map.set_home_from_pose(&pose);
                info!(home = %id, x = pose.position.x, y = pose.position.y, "home recorded");
                self.persist_map();
                pose
            }
        };
        if let Err(e) = active.record.set_home(home_pose) {
            warn!(error = %e, "home not recorded");
        }
        if let Some(home) = self.map.home_id() {
            active.location = home.clone();
        }

        active.plan = self.map.visitation_order().into();
        debug!(order = ?active.plan, "visitation order");
        let Some(first) = active.plan.pop_front() else {
            return Err(Ending::failed("no waypoints reachable from home"));
        };
        self.enter_traveling(active, now, first, "home recorded")
    }

    fn step_traveling(&mut self, active: &mut ActiveMission, now: Timestamp, target: WaypointId, readings: &Readings) -> Step {
        self.scan_once(active, now)?;
        if self.drive_route(active, now, readings)? {
            active.location = target.clone();
            if let Err(e) = active.record.mark_visited(target.clone()) {
                warn!(error = %e, "visit not recorded");
            }
            self.enter_searching(active, now, target);
        }
        Ok(())
    }

    fn step_searching(&mut self, active: &mut ActiveMission, now: Timestamp, at: WaypointId) -> Step {
        self.commit(active, MotionCommand::Stop)?;
        let step = active
            .sweep
            .as_mut()
            .map_or(SweepStep::Complete, |sweep| sweep.step(now));
        match step {
            SweepStep::Point(position) => {
                debug!(?position, "pointing camera");
                self.io.mount.point(position)?;
            }
            SweepStep::Dwell {
                wants_frame: true, ..
            } => {
                if self.scan_once(active, now)? {
                    if let Some(sweep) = active.sweep.as_mut() {
                        sweep.mark_frame();
                    }
                }
            }
            SweepStep::Dwell { .. } => {}
            SweepStep::Complete => {
                // Frames still with the detector may yet open a candidate.
                if !active.scans.is_empty() {
                    return Ok(());
                }
                self.io.mount.point(SweepPosition::Center)?;
                active.sweep = None;
                let reason = format!("sweep at {at} complete");
                return match active.plan.pop_front() {
                    Some(next) => self.enter_traveling(active, now, next, &reason),
                    None => Err(Ending::failed(format!(
                        "target not found after searching {} waypoints",
                        active.record.visited().len()
                    ))),
                };
            }
        }
        Ok(())
    }

    fn step_confirming(&mut self, active: &mut ActiveMission, now: Timestamp, readings: &Readings) -> Step {
        self.scan_once(active, now)?;
        if self.confirming_in_travel(active) {
            // Arrival is only acted on after the verdict, back in Traveling.
            self.drive_route(active, now, readings)?;
        } else {
            self.commit(active, MotionCommand::Stop)?;
        }
        Ok(())
    }

    fn step_capturing(&mut self, active: &mut ActiveMission, now: Timestamp) -> Step {
        self.commit(active, MotionCommand::Stop)?;
        let Some(job) = active.capture.as_mut() else {
            return Err(Ending::failed("capture was never started"));
        };
        match job.poll() {
            JobPoll::Pending => Ok(()),
            JobPoll::Ready(Ok(media)) => {
                active.capture = None;
                info!(location = %media.location, "media captured");
                if let Err(e) = active.record.set_media(media.clone()) {
                    warn!(error = %e, "media not recorded");
                }
                self.enter_summarizing(active, now, media)
            }
            JobPoll::Ready(Err(fault)) => Err(fault.into()),
            JobPoll::Lost => Err(HardwareFault::new("camera", "capture worker exited").into()),
        }
    }

    fn step_summarizing(&mut self, active: &mut ActiveMission, now: Timestamp, readings: &Readings) -> Step {
        self.commit(active, MotionCommand::Stop)?;
        let Some(job) = active.summary.as_mut() else {
            return Err(Ending::failed("summary was never requested"));
        };
        let outcome = match job.poll() {
            JobPoll::Pending if now - active.summary_started < self.config.capture.summary_timeout => {
                return Ok(());
            }
            JobPoll::Pending => Err(MissionError::SummaryUnavailable(SummaryUnavailable::TimedOut)),
            JobPoll::Ready(Ok(text)) => Ok(text),
            JobPoll::Ready(Err(e)) => Err(MissionError::SummaryUnavailable(e)),
            JobPoll::Lost => Err(MissionError::Worker("summarizer worker exited".into())),
        };
        active.summary = None;

        let (text, placeholder, reason) = match outcome {
            Ok(text) => (text, false, "summary ready"),
            Err(e) => {
                warn!(error = %e, "using placeholder summary");
                (self.config.capture.placeholder.clone(), true, "summary unavailable")
            }
        };
        if let Err(e) = active.record.set_summary(text, placeholder) {
            warn!(error = %e, "summary not recorded");
        }
        self.enter_returning(active, now, readings, reason)
    }

    fn step_returning(&mut self, active: &mut ActiveMission, now: Timestamp, readings: &Readings) -> Step {
        if !self.drive_route(active, now, readings)? {
            return Ok(());
        }
        if let Some(home) = self.map.home_id() {
            active.location = home.clone();
        }
        if active.cancel_requested {
            return Err(Ending::cancelled("cancelled; returned home"));
        }
        self.transition(active, now, MissionState::Reporting, "arrived home");
        Ok(())
    }

    // --- Motion ---

    fn confirming_in_travel(&self, active: &ActiveMission) -> bool {
        self.state == MissionState::Confirming
            && matches!(active.resume, Some(MissionState::Traveling(_)))
    }

    /// Follows the active route for one tick. Returns `true` once the robot is
    /// stopped within tolerance of the destination.
    fn drive_route(&mut self, active: &mut ActiveMission, now: Timestamp, readings: &Readings) -> Result<bool, Ending> {
        let tolerance = self.config.navigation.position_tolerance;
        let Some(route) = active.route.as_mut() else {
            return Err(Ending::failed("navigating without a route"));
        };
        let progress = readings.pose.as_ref().map(|pose| route.advance(pose, tolerance));

        match progress {
            Some(RouteProgress::AtDestination) => {
                active.target = None;
                self.navigation.reset();
                self.commit(active, MotionCommand::Stop)?;
                Ok(!self.io.motion.is_moving())
            }
            Some(RouteProgress::EnRoute { target, .. }) => {
                active.target = Some(target);
                let cmd = self.navigation.step(
                    now,
                    readings.pose.as_ref(),
                    readings.clearance.as_ref(),
                    &target,
                );
                self.commit(active, cmd)?;
                Ok(false)
            }
            None => {
                // Stale pose: the policy only allows stopping or avoidance.
                let target = active.target.unwrap_or_else(Point2::origin);
                let cmd = self
                    .navigation
                    .step(now, None, readings.clearance.as_ref(), &target);
                self.commit(active, cmd)?;
                Ok(false)
            }
        }
    }

    /// Sends `cmd` to the motion executor unless it repeats the last one.
    /// A cancellation that arrived mid-tick turns any command into a stop.
    fn commit(&mut self, active: &ActiveMission, cmd: MotionCommand) -> Step {
        if self.cancel.is_cancelled() && !active.cancel_handled {
            self.stop_motors();
            return Ok(());
        }
        if self.last_command == Some(cmd) {
            return Ok(());
        }
        match cmd {
            MotionCommand::Move { forward, turn } => self.io.motion.drive(forward, turn)?,
            MotionCommand::Stop => self.io.motion.stop()?,
        }
        trace!(?cmd, "motion command");
        self.last_command = Some(cmd);
        Ok(())
    }

    /// Unconditional stop; faults are logged since there is nothing else to do.
    fn stop_motors(&mut self) {
        if let Err(fault) = self.io.motion.stop() {
            error!(error = %fault, "stop command failed");
        }
        self.last_command = Some(MotionCommand::Stop);
    }

    // --- Termination ---

    fn finish(&mut self, mut active: ActiveMission, ending: Ending, now: Timestamp) {
        if self.last_command != Some(MotionCommand::Stop) {
            self.stop_motors();
        }
        self.drop_scans(&mut active);
        self.scheduler.set_mode(None);
        self.navigation.reset();
        active.capture = None;
        active.summary = None;

        self.transition(&mut active, now, ending.state.clone(), &ending.reason);
        if let Err(e) = active.record.close(ending.outcome, ending.reason.clone(), now) {
            warn!(error = %e, "record already closed");
        }
        match ending.outcome {
            Outcome::Success => {
                info!(mission = %active.record.id(), reason = %ending.reason, "mission succeeded")
            }
            outcome => {
                warn!(mission = %active.record.id(), ?outcome, reason = %ending.reason, "mission ended")
            }
        }

        self.deliveries = pipeline::dispatch(&mut self.io.sinks, &active.record);
        self.last_record = Some(active.record);
    }

    fn persist_map(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.map) {
                warn!(error = %e, "could not persist home; continuing");
            }
        }
    }
}

impl std::fmt::Debug for MissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionController")
            .field("state", &self.state)
            .field("workers", &self.workers)
            .field("waypoints", &self.map.len())
            .finish_non_exhaustive()
    }
}
