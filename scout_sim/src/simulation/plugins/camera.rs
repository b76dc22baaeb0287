// scout_sim/src/simulation/plugins/camera.rs

//! Camera, pan/tilt mount, and the person detector that reads its frames.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use scout_core::abstractions::{Camera, CameraMount, Detector};
use scout_core::error::{DetectorError, HardwareFault};
use scout_core::messages::{BoundingBox, DetectionEvent, Frame, Media, MediaKind};
use scout_core::search::SweepPosition;
use scout_core::types::wrap_angle;

use crate::simulation::config::structs::{CameraConfig, DetectorConfig};
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::world::{lock, SharedWorld};

const FRAME_WIDTH: u32 = 160;
const FRAME_HEIGHT: u32 = 120;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =========================================================================
// == Mount ==
// =========================================================================

pub struct SimMount {
    world: SharedWorld,
}

impl SimMount {
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

impl CameraMount for SimMount {
    fn point(&mut self, position: SweepPosition) -> Result<(), HardwareFault> {
        lock(&self.world).mount = position;
        Ok(())
    }
}

// =========================================================================
// == Camera ==
// =========================================================================

struct CaptureState {
    rng: SimulationRng,
    count: u64,
}

pub struct SimCamera {
    world: SharedWorld,
    failure_rate: f64,
    state: Mutex<CaptureState>,
}

impl SimCamera {
    pub fn new(world: SharedWorld, config: &CameraConfig, rng: SimulationRng) -> Self {
        Self {
            world,
            failure_rate: config.capture_failure_rate,
            state: Mutex::new(CaptureState { rng, count: 0 }),
        }
    }
}

impl Camera for SimCamera {
    fn capture_frame(&self) -> Result<Frame, HardwareFault> {
        let timestamp = lock(&self.world).time;
        Ok(Frame {
            timestamp,
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            data: Vec::new(),
        })
    }

    fn capture_media(&self, kind: MediaKind) -> Result<Media, HardwareFault> {
        let captured_at = lock(&self.world).time;
        let mut state = guard(&self.state);
        if state.rng.chance(self.failure_rate) {
            return Err(HardwareFault::new("camera", "high-resolution capture failed"));
        }
        state.count += 1;
        let location = match kind {
            MediaKind::Image => format!("sim://camera/image-{:04}.jpg", state.count),
            MediaKind::Clip { seconds } => {
                format!("sim://camera/clip-{:04}-{seconds:.0}s.mp4", state.count)
            }
        };
        debug!(%location, "media captured");
        Ok(Media {
            kind,
            location,
            captured_at,
        })
    }
}

// =========================================================================
// == Detector ==
// =========================================================================

/// Person detector with a geometric visibility model.
///
/// The person is seen when inside the camera's field of view, within range,
/// and not hidden behind furniture. Confidence falls off with distance and
/// carries Gaussian noise; spurious detections appear at a fixed rate and are
/// never recognized. A named person is reported by name.
pub struct SimDetector {
    world: SharedWorld,
    half_fov: f64,
    max_range: f64,
    config: DetectorConfig,
    rng: Mutex<SimulationRng>,
}

impl SimDetector {
    pub fn new(
        world: SharedWorld,
        camera: &CameraConfig,
        config: &DetectorConfig,
        rng: SimulationRng,
    ) -> Self {
        Self {
            world,
            half_fov: camera.fov_deg.to_radians() / 2.0,
            max_range: camera.max_range,
            config: config.clone(),
            rng: Mutex::new(rng),
        }
    }

    /// Bearing (relative to the optical axis), distance and name of the person,
    /// if visible.
    fn sighting(&self) -> Option<(f64, f64, Option<String>)> {
        let world = lock(&self.world);
        let person = world.person.as_ref()?;
        let eye = world.robot.position;
        let offset = person.position - eye;
        let distance = offset.norm();
        let bearing = wrap_angle(offset.y.atan2(offset.x) - world.camera_heading());
        let visible = distance <= self.max_range
            && bearing.abs() <= self.half_fov
            && world.line_of_sight(&eye, &person.position);
        visible.then(|| (bearing, distance, person.name.clone()))
    }
}

impl Detector for SimDetector {
    fn detect(&self, frame: &Frame) -> Result<Option<DetectionEvent>, DetectorError> {
        let sighting = self.sighting();
        let mut rng = guard(&self.rng);

        if let Some((bearing, distance, name)) = sighting {
            let confidence = self.config.base_confidence * (1.0 - 0.5 * distance / self.max_range)
                + rng.gaussian(self.config.noise_stddev);
            // Image x grows to the right; positive bearing is to the left.
            let cx = 0.5 - bearing / (2.0 * self.half_fov);
            let height = (0.8 / distance.max(0.1)).min(0.9);
            let region = BoundingBox::centered(cx, 0.5, 0.4 * height, height);
            let event = DetectionEvent::new(region, confidence, frame.timestamp);
            return Ok(Some(match name {
                Some(name) => event.with_label(name),
                None => event,
            }));
        }

        if rng.chance(self.config.false_positive_rate) {
            let region = BoundingBox::centered(
                rng.uniform(0.1, 0.9),
                rng.uniform(0.2, 0.8),
                rng.uniform(0.05, 0.3),
                rng.uniform(0.1, 0.5),
            );
            let confidence = rng.uniform(0.3, 0.8);
            debug!(confidence, "spurious detection");
            return Ok(Some(DetectionEvent::new(region, confidence, frame.timestamp)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::ScenarioConfig;
    use crate::simulation::core::world::{Circle, Person, World};
    use nalgebra::Point2;

    fn world_with_person(x: f64, y: f64) -> SharedWorld {
        let mut world = World::from_scenario(&ScenarioConfig::default());
        world.person = Some(Person {
            position: Point2::new(x, y),
            name: None,
            activity: "reading".into(),
        });
        world.shared()
    }

    fn detector(world: SharedWorld) -> SimDetector {
        let config = DetectorConfig {
            noise_stddev: 0.0,
            false_positive_rate: 0.0,
            ..DetectorConfig::default()
        };
        SimDetector::new(world, &CameraConfig::default(), &config, SimulationRng::new(Some(3), 4))
    }

    #[test]
    fn sees_a_person_ahead() {
        let world = world_with_person(2.0, 0.0);
        let event = detector(world).detect(&Frame::empty(1.0)).unwrap().unwrap();
        assert!(event.confidence > 0.6);
        assert_eq!(event.frame_timestamp, 1.0);
        assert!((event.region.x_min + event.region.x_max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn named_person_is_recognized() {
        let world = world_with_person(2.0, 0.0);
        let det = detector(world.clone());
        assert_eq!(det.detect(&Frame::empty(0.0)).unwrap().unwrap().label, None);

        if let Some(person) = lock(&world).person.as_mut() {
            person.name = Some("Alex".into());
        }
        let event = det.detect(&Frame::empty(0.5)).unwrap().unwrap();
        assert_eq!(event.identity(), "Alex");
    }

    #[test]
    fn pan_brings_a_person_into_view() {
        // 45 degrees to the left: outside a 60 degree FOV until the mount pans.
        let world = world_with_person(2.0, 2.0);
        let det = detector(world.clone());
        assert!(det.detect(&Frame::empty(0.0)).unwrap().is_none());

        SimMount::new(world).point(SweepPosition::Left).unwrap();
        assert!(det.detect(&Frame::empty(0.0)).unwrap().is_some());
    }

    #[test]
    fn furniture_hides_the_person() {
        let world = world_with_person(3.0, 0.0);
        lock(&world).obstacles.push(Circle {
            center: Point2::new(1.5, 0.0),
            radius: 0.3,
        });
        assert!(detector(world).detect(&Frame::empty(0.0)).unwrap().is_none());
    }

    #[test]
    fn capture_failures_are_hardware_faults() {
        let world = world_with_person(2.0, 0.0);
        let broken = CameraConfig {
            capture_failure_rate: 1.0,
            ..CameraConfig::default()
        };
        let camera = SimCamera::new(world.clone(), &broken, SimulationRng::new(Some(1), 3));
        assert!(camera.capture_media(MediaKind::Image).is_err());

        let camera = SimCamera::new(world, &CameraConfig::default(), SimulationRng::new(Some(1), 3));
        let media = camera.capture_media(MediaKind::Clip { seconds: 5.0 }).unwrap();
        assert!(media.location.ends_with("5s.mp4"));
    }
}
