// scout_sim/src/simulation/core/world.rs

//! Ground truth for the simulated house: robot, furniture, walls, person.

use nalgebra::{Point2, Vector2};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

use scout_core::search::SweepPosition;
use scout_core::types::{wrap_angle, Pose};

use crate::simulation::config::ScenarioConfig;

/// Shared handle: every simulated device reads or writes the same world.
pub type SharedWorld = Arc<Mutex<World>>;

pub fn lock(world: &SharedWorld) -> MutexGuard<'_, World> {
    world.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point2<f64>,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub position: Point2<f64>,
    pub name: Option<String>,
    pub activity: String,
}

/// Unicycle state plus the command currently applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotState {
    pub position: Point2<f64>,
    pub heading: f64,
    pub forward: f64,
    pub turn: f64,
}

#[derive(Debug, Clone)]
pub struct World {
    pub time: f64,
    pub robot: RobotState,
    pub max_speed: f64,
    pub max_turn_rate: f64,
    /// `[min_x, min_y, max_x, max_y]`.
    pub bounds: [f64; 4],
    pub obstacles: Vec<Circle>,
    pub person: Option<Person>,
    pub mount: SweepPosition,
    /// Body radius used for collision checks.
    pub robot_radius: f64,
    pub collisions: u32,
}

impl World {
    pub fn from_scenario(scenario: &ScenarioConfig) -> Self {
        let [x, y] = scenario.robot.start;
        Self {
            time: 0.0,
            robot: RobotState {
                position: Point2::new(x, y),
                heading: scenario.robot.heading_deg.to_radians(),
                forward: 0.0,
                turn: 0.0,
            },
            max_speed: scenario.robot.max_speed,
            max_turn_rate: scenario.robot.max_turn_rate,
            bounds: scenario.world.bounds,
            obstacles: scenario
                .world
                .obstacles
                .iter()
                .map(|o| Circle {
                    center: Point2::new(o.center[0], o.center[1]),
                    radius: o.radius,
                })
                .collect(),
            person: scenario.world.person.as_ref().map(|p| Person {
                position: Point2::new(p.position[0], p.position[1]),
                name: p.name.clone(),
                activity: p.activity.clone(),
            }),
            mount: SweepPosition::Center,
            robot_radius: 0.15,
            collisions: 0,
        }
    }

    pub fn shared(self) -> SharedWorld {
        Arc::new(Mutex::new(self))
    }

    /// Exact robot pose stamped with the world clock.
    pub fn true_pose(&self) -> Pose {
        Pose {
            position: self.robot.position,
            heading: self.robot.heading,
            timestamp: self.time,
        }
    }

    pub fn set_command(&mut self, forward: f64, turn: f64) {
        self.robot.forward = forward.clamp(-self.max_speed, self.max_speed);
        self.robot.turn = turn.clamp(-self.max_turn_rate, self.max_turn_rate);
    }

    pub fn is_moving(&self) -> bool {
        self.robot.forward != 0.0 || self.robot.turn != 0.0
    }

    /// Heading of the camera: body heading plus mount pan.
    pub fn camera_heading(&self) -> f64 {
        wrap_angle(self.robot.heading + self.mount.angles().0)
    }

    /// Advances the clock and integrates the unicycle model.
    ///
    /// A step that would put the body inside furniture or a wall is refused
    /// and the robot is halted, like a bumper would.
    pub fn step(&mut self, dt: f64) {
        self.time += dt;
        let RobotState {
            position,
            heading,
            forward,
            turn,
        } = self.robot;
        let next = position + Vector2::new(heading.cos(), heading.sin()) * forward * dt;
        self.robot.heading = wrap_angle(heading + turn * dt);

        if forward != 0.0 && self.collides(&next) {
            self.collisions += 1;
            warn!(x = next.x, y = next.y, "bumper hit; robot halted");
            self.robot.forward = 0.0;
            self.robot.turn = 0.0;
            return;
        }
        self.robot.position = next;
    }

    fn collides(&self, p: &Point2<f64>) -> bool {
        let [min_x, min_y, max_x, max_y] = self.bounds;
        let r = self.robot_radius;
        let outside = p.x - r < min_x || p.x + r > max_x || p.y - r < min_y || p.y + r > max_y;
        outside
            || self
                .obstacles
                .iter()
                .any(|o| (p - o.center).norm() < o.radius + r)
    }

    /// Free distance along `heading` from `origin`, up to `max_range`.
    pub fn ray_clearance(&self, origin: &Point2<f64>, heading: f64, max_range: f64) -> f64 {
        let dir = Vector2::new(heading.cos(), heading.sin());
        let walls = ray_box(origin, &dir, self.bounds);
        self.obstacles
            .iter()
            .filter_map(|o| ray_circle(origin, &dir, o))
            .fold(walls.min(max_range), f64::min)
    }

    /// No furniture between `a` and `b`.
    pub fn line_of_sight(&self, a: &Point2<f64>, b: &Point2<f64>) -> bool {
        let delta = b - a;
        let length = delta.norm();
        if length < 1e-9 {
            return true;
        }
        let dir = delta / length;
        self.obstacles
            .iter()
            .filter_map(|o| ray_circle(a, &dir, o))
            .all(|t| t >= length)
    }
}

// --- Ray Geometry ---

fn ray_circle(origin: &Point2<f64>, dir: &Vector2<f64>, circle: &Circle) -> Option<f64> {
    let oc = origin - circle.center;
    let b = oc.dot(dir);
    let c = oc.norm_squared() - circle.radius * circle.radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    if -b - root >= 0.0 {
        Some(-b - root)
    } else if -b + root >= 0.0 {
        Some(0.0) // origin inside
    } else {
        None
    }
}

fn ray_box(origin: &Point2<f64>, dir: &Vector2<f64>, bounds: [f64; 4]) -> f64 {
    let [min_x, min_y, max_x, max_y] = bounds;
    let axis = |o: f64, d: f64, lo: f64, hi: f64| {
        if d > 1e-12 {
            (hi - o) / d
        } else if d < -1e-12 {
            (lo - o) / d
        } else {
            f64::INFINITY
        }
    };
    axis(origin.x, dir.x, min_x, max_x)
        .min(axis(origin.y, dir.y, min_y, max_y))
        .max(0.0)
}
