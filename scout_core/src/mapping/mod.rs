// scout_core/src/mapping/mod.rs

//! The waypoint graph the robot navigates, plus the distinguished Home node.

mod store;

pub use store::MapStore;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use crate::error::MapError;
use crate::planning::dijkstra;
use crate::types::Pose;
use crate::utils::serde_helpers;

pub const HOME_ID: &str = "home";

// --- Identifiers ---

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaypointId(pub String);

impl WaypointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn home() -> Self {
        Self(HOME_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WaypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WaypointId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// --- Waypoint ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: WaypointId,
    #[serde(with = "serde_helpers::point2_as_array")]
    pub position: Point2<f64>,
    #[serde(default)]
    pub heading: f64,
    /// Directed edges to reachable neighbors with their traversal cost.
    #[serde(default)]
    pub neighbors: BTreeMap<WaypointId, f64>,
}

impl Waypoint {
    pub fn new(id: impl Into<WaypointId>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            position: Point2::new(x, y),
            heading: 0.0,
            neighbors: BTreeMap::new(),
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }
}

// =========================================================================
// == Waypoint Map ==
// =========================================================================

/// Directed graph of named locations.
///
/// Serialized as `{ "home": ..., "waypoints": [...] }`; loading re-checks that
/// every edge and the Home id refer to existing waypoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "MapFile", into = "MapFile")]
pub struct WaypointMap {
    waypoints: BTreeMap<WaypointId, Waypoint>,
    home: Option<WaypointId>,
}

#[derive(Serialize, Deserialize)]
struct MapFile {
    #[serde(default)]
    home: Option<WaypointId>,
    waypoints: Vec<Waypoint>,
}

impl From<WaypointMap> for MapFile {
    fn from(map: WaypointMap) -> Self {
        Self {
            home: map.home,
            waypoints: map.waypoints.into_values().collect(),
        }
    }
}

impl TryFrom<MapFile> for WaypointMap {
    type Error = MapError;

    fn try_from(file: MapFile) -> Result<Self, Self::Error> {
        let mut map = WaypointMap::new();
        for waypoint in file.waypoints {
            map.insert(waypoint)?;
        }
        for waypoint in map.waypoints.values() {
            for (to, cost) in &waypoint.neighbors {
                check_edge(&map, &waypoint.id, to, *cost)?;
            }
        }
        if let Some(home) = file.home {
            map.set_home(home)?;
        }
        Ok(map)
    }
}

fn check_edge(map: &WaypointMap, from: &WaypointId, to: &WaypointId, cost: f64) -> Result<(), MapError> {
    if !map.contains(to) {
        return Err(MapError::Unknown(to.clone()));
    }
    if !cost.is_finite() || cost < 0.0 {
        return Err(MapError::InvalidCost {
            from: from.clone(),
            to: to.clone(),
            cost,
        });
    }
    Ok(())
}

impl WaypointMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn contains(&self, id: &WaypointId) -> bool {
        self.waypoints.contains_key(id)
    }

    pub fn get(&self, id: &WaypointId) -> Option<&Waypoint> {
        self.waypoints.get(id)
    }

    pub fn waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.values()
    }

    pub fn home(&self) -> Option<&Waypoint> {
        self.home.as_ref().and_then(|id| self.waypoints.get(id))
    }

    pub fn home_id(&self) -> Option<&WaypointId> {
        self.home.as_ref()
    }

    /// Adds a waypoint. Its neighbor edges must already point at known waypoints
    /// or be added afterwards through [`WaypointMap::connect`].
    pub fn insert(&mut self, waypoint: Waypoint) -> Result<(), MapError> {
        if self.waypoints.contains_key(&waypoint.id) {
            return Err(MapError::Duplicate(waypoint.id));
        }
        self.waypoints.insert(waypoint.id.clone(), waypoint);
        Ok(())
    }

    /// Adds or replaces the directed edge `from -> to`.
    pub fn connect(&mut self, from: &WaypointId, to: &WaypointId, cost: f64) -> Result<(), MapError> {
        check_edge(self, from, to, cost)?;
        let waypoint = self
            .waypoints
            .get_mut(from)
            .ok_or_else(|| MapError::Unknown(from.clone()))?;
        waypoint.neighbors.insert(to.clone(), cost);
        Ok(())
    }

    pub fn connect_both(&mut self, a: &WaypointId, b: &WaypointId, cost: f64) -> Result<(), MapError> {
        self.connect(a, b, cost)?;
        self.connect(b, a, cost)
    }

    /// Designates an existing waypoint as Home.
    pub fn set_home(&mut self, id: WaypointId) -> Result<(), MapError> {
        if !self.contains(&id) {
            return Err(MapError::Unknown(id));
        }
        self.home = Some(id);
        Ok(())
    }

    /// Records `pose` as Home.
    ///
    /// Any previous Home node and its edges are replaced. The new node is
    /// linked both ways to the nearest other waypoint with Euclidean cost.
    pub fn set_home_from_pose(&mut self, pose: &Pose) -> WaypointId {
        let id = self.home.clone().unwrap_or_else(WaypointId::home);
        self.waypoints.remove(&id);
        for waypoint in self.waypoints.values_mut() {
            waypoint.neighbors.remove(&id);
        }

        let home = Waypoint {
            id: id.clone(),
            position: pose.position,
            heading: pose.heading,
            neighbors: BTreeMap::new(),
        };
        let link = self
            .nearest(&pose.position)
            .map(|w| (w.id.clone(), (w.position - pose.position).norm()));
        self.waypoints.insert(id.clone(), home);
        if let Some((nearest, cost)) = link {
            for (from, to) in [(&id, &nearest), (&nearest, &id)] {
                if let Some(waypoint) = self.waypoints.get_mut(from) {
                    waypoint.neighbors.insert(to.clone(), cost);
                }
            }
        }
        self.home = Some(id.clone());
        id
    }

    /// Closest waypoint to `point`; ties go to the smaller id.
    pub fn nearest(&self, point: &Point2<f64>) -> Option<&Waypoint> {
        let mut best: Option<(&Waypoint, f64)> = None;
        for waypoint in self.waypoints.values() {
            let d = (waypoint.position - point).norm();
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((waypoint, d));
            }
        }
        best.map(|(w, _)| w)
    }

    /// Breadth-first order from Home, neighbors in ascending id order.
    ///
    /// Home itself and waypoints unreachable from it are left out. The order
    /// depends only on the graph, so repeated runs over one map agree.
    pub fn visitation_order(&self) -> Vec<WaypointId> {
        let Some(home) = self.home.clone() else {
            return Vec::new();
        };
        self.reachable_from(&home, |w| w.neighbors.keys().cloned().collect())
            .into_iter()
            .filter(|id| *id != home)
            .collect()
    }

    /// Cheapest directed route; the returned hops start with `from`.
    pub fn route(&self, from: &WaypointId, to: &WaypointId) -> Result<Vec<WaypointId>, MapError> {
        for id in [from, to] {
            if !self.contains(id) {
                return Err(MapError::Unknown(id.clone()));
            }
        }
        let mut neighbors = |id: &WaypointId| -> Vec<(WaypointId, f64)> {
            self.waypoints
                .get(id)
                .map(|w| w.neighbors.iter().map(|(n, c)| (n.clone(), *c)).collect())
                .unwrap_or_default()
        };
        dijkstra::plan(from, |id| id == to, &mut neighbors)
            .map(|(path, _)| path)
            .ok_or_else(|| MapError::NoRoute {
                from: from.clone(),
                to: to.clone(),
            })
    }

    /// Total cost of the cheapest route, if any.
    pub fn route_cost(&self, from: &WaypointId, to: &WaypointId) -> Option<f64> {
        let mut neighbors = |id: &WaypointId| -> Vec<(WaypointId, f64)> {
            self.waypoints
                .get(id)
                .map(|w| w.neighbors.iter().map(|(n, c)| (n.clone(), *c)).collect())
                .unwrap_or_default()
        };
        dijkstra::plan(from, |id| id == to, &mut neighbors).map(|(_, cost)| cost)
    }

    /// Checks the Home invariant: every waypoint is reachable from Home and can
    /// reach it.
    pub fn validate(&self) -> Result<(), MapError> {
        let home = self.home.clone().ok_or(MapError::NoHome)?;
        let forward: BTreeSet<_> = self
            .reachable_from(&home, |w| w.neighbors.keys().cloned().collect())
            .into_iter()
            .collect();

        let mut reverse: BTreeMap<WaypointId, Vec<WaypointId>> = BTreeMap::new();
        for waypoint in self.waypoints.values() {
            for to in waypoint.neighbors.keys() {
                reverse.entry(to.clone()).or_default().push(waypoint.id.clone());
            }
        }
        let backward: BTreeSet<_> = self
            .reachable_from(&home, |w| reverse.get(&w.id).cloned().unwrap_or_default())
            .into_iter()
            .collect();

        let disconnected: Vec<WaypointId> = self
            .waypoints
            .keys()
            .filter(|id| !forward.contains(*id) || !backward.contains(*id))
            .cloned()
            .collect();
        if disconnected.is_empty() {
            Ok(())
        } else {
            Err(MapError::Disconnected(disconnected))
        }
    }

    fn reachable_from(
        &self,
        start: &WaypointId,
        mut next: impl FnMut(&Waypoint) -> Vec<WaypointId>,
    ) -> Vec<WaypointId> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        if self.contains(start) {
            seen.insert(start.clone());
            queue.push_back(start.clone());
        }
        while let Some(id) = queue.pop_front() {
            if let Some(waypoint) = self.waypoints.get(&id) {
                let mut successors = next(waypoint);
                successors.sort();
                for succ in successors {
                    if self.contains(&succ) && seen.insert(succ.clone()) {
                        queue.push_back(succ);
                    }
                }
            }
            order.push(id);
        }
        order
    }
}
