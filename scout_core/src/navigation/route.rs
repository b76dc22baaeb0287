// scout_core/src/navigation/route.rs

use nalgebra::Point2;

use crate::error::MapError;
use crate::mapping::{WaypointId, WaypointMap};
use crate::types::Pose;

/// Progress along a planned route.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteProgress {
    /// Keep driving towards this hop.
    EnRoute {
        hop: WaypointId,
        target: Point2<f64>,
        is_final: bool,
    },
    /// Within tolerance of the destination.
    AtDestination,
}

/// Hop list produced by the planner, consumed as the robot reaches each hop.
#[derive(Debug, Clone)]
pub struct RouteFollower {
    hops: Vec<(WaypointId, Point2<f64>)>,
    index: usize,
}

impl RouteFollower {
    pub fn plan(map: &WaypointMap, from: &WaypointId, to: &WaypointId) -> Result<Self, MapError> {
        let route = map.route(from, to)?;
        let hops = route
            .into_iter()
            .map(|id| {
                let waypoint = map.get(&id).ok_or_else(|| MapError::Unknown(id.clone()))?;
                Ok((id, waypoint.position))
            })
            .collect::<Result<Vec<_>, MapError>>()?;
        Ok(Self { hops, index: 0 })
    }

    pub fn destination(&self) -> Option<&WaypointId> {
        self.hops.last().map(|(id, _)| id)
    }

    pub fn hops(&self) -> impl Iterator<Item = &WaypointId> {
        self.hops.iter().map(|(id, _)| id)
    }

    /// Position of the hop currently being driven to.
    pub fn current_target(&self) -> Option<Point2<f64>> {
        self.hops.get(self.index).map(|(_, position)| *position)
    }

    pub fn remaining(&self) -> usize {
        self.hops.len().saturating_sub(self.index)
    }

    /// Skips every hop already within `tolerance` and reports what is next.
    pub fn advance(&mut self, pose: &Pose, tolerance: f64) -> RouteProgress {
        while let Some((_, position)) = self.hops.get(self.index) {
            let reached = pose.distance_to(position) <= tolerance;
            let is_final = self.index + 1 == self.hops.len();
            if reached && is_final {
                return RouteProgress::AtDestination;
            }
            if reached {
                self.index += 1;
                continue;
            }
            let (hop, target) = self.hops[self.index].clone();
            return RouteProgress::EnRoute {
                hop,
                target,
                is_final,
            };
        }
        RouteProgress::AtDestination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Waypoint;

    fn line() -> WaypointMap {
        let mut map = WaypointMap::new();
        for (id, x) in [("home", 0.0), ("a", 2.0), ("b", 4.0)] {
            map.insert(Waypoint::new(id, x, 0.0)).unwrap();
        }
        map.connect_both(&"home".into(), &"a".into(), 2.0).unwrap();
        map.connect_both(&"a".into(), &"b".into(), 2.0).unwrap();
        map
    }

    #[test]
    fn hops_are_consumed_in_order() {
        let mut route = RouteFollower::plan(&line(), &"home".into(), &"b".into()).unwrap();
        assert_eq!(route.remaining(), 3);

        let at_home = Pose::new(0.05, 0.0, 0.0, 0.0);
        assert_eq!(
            route.advance(&at_home, 0.25),
            RouteProgress::EnRoute {
                hop: "a".into(),
                target: Point2::new(2.0, 0.0),
                is_final: false
            }
        );

        let at_a = Pose::new(1.9, 0.0, 0.0, 1.0);
        assert!(matches!(
            route.advance(&at_a, 0.25),
            RouteProgress::EnRoute { is_final: true, .. }
        ));

        let at_b = Pose::new(4.1, 0.1, 0.0, 2.0);
        assert_eq!(route.advance(&at_b, 0.25), RouteProgress::AtDestination);
        assert_eq!(route.destination(), Some(&WaypointId::from("b")));
    }

    #[test]
    fn trivial_route_is_immediately_done() {
        let mut route = RouteFollower::plan(&line(), &"a".into(), &"a".into()).unwrap();
        assert_eq!(
            route.advance(&Pose::new(2.0, 0.0, 0.0, 0.0), 0.25),
            RouteProgress::AtDestination
        );
    }

    #[test]
    fn missing_edge_fails_planning() {
        let mut map = line();
        map.insert(Waypoint::new("shed", 9.0, 9.0)).unwrap();
        assert!(RouteFollower::plan(&map, &"home".into(), &"shed".into()).is_err());
    }
}
