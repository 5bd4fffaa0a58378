//! Goal-directed search with a cached per-waypoint estimate.

use std::collections::HashMap;

use tracing::warn;

use crate::graph::{StreetNetwork, Waypoint, WaypointId};
use crate::path::Path;

use super::search::SearchState;
use super::{EdgeCost, Heuristic, RouteAlgorithm, Router, SearchStats};

/// A* search, over travel time unless another [`EdgeCost`] is set.
///
/// The default heuristic is the great-circle distance to the goal divided by
/// a speed that no edge exceeds. By default that speed is the network's own
/// [`StreetNetwork::top_speed`], which keeps the estimate admissible and the
/// result as fast as Dijkstra's. A custom [`Heuristic`] replaces it entirely.
#[derive(Debug, Default)]
pub struct AStarRouter {
    state: SearchState,
    estimates: HashMap<WaypointId, f64>,
    cost: EdgeCost,
    heuristic: Option<Heuristic>,
    heuristic_speed: Option<f64>,
    step_limit: Option<usize>,
}

impl AStarRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed speed (km/h) for the heuristic instead of the network's top
    /// speed.
    ///
    /// A speed below the fastest edge in the network overestimates remaining
    /// time, so paths may no longer be optimal.
    pub fn with_heuristic_speed(mut self, speed: f64) -> Self {
        self.heuristic_speed = Some(speed);
        self
    }

    /// Minimise `cost` instead of travel time.
    ///
    /// The default heuristic estimates travel time. Pair a cost in another
    /// unit with a matching [`AStarRouter::with_heuristic`].
    pub fn with_cost(mut self, cost: impl Into<EdgeCost>) -> Self {
        self.cost = cost.into();
        self
    }

    /// Estimate the remaining cost with `estimate(waypoint, goal)`.
    ///
    /// Takes precedence over [`AStarRouter::with_heuristic_speed`].
    pub fn with_heuristic(mut self, estimate: impl Into<Heuristic>) -> Self {
        self.heuristic = Some(estimate.into());
        self
    }

    /// Give up (returning `None`) after settling more than `steps` waypoints.
    pub fn with_step_limit(mut self, steps: usize) -> Self {
        self.step_limit = Some(steps);
        self
    }

    fn estimate(&mut self, waypoint: &Waypoint, goal: &Waypoint, speed: Option<f64>) -> f64 {
        let custom = self.heuristic.as_ref();
        *self
            .estimates
            .entry(waypoint.id())
            .or_insert_with(|| match (custom, speed) {
                (Some(heuristic), _) => heuristic.estimate(waypoint, goal),
                (None, Some(speed)) => waypoint.distance_to(goal) / speed,
                (None, None) => 0.0,
            })
    }
}

impl Router for AStarRouter {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::AStar
    }

    fn find_path(
        &mut self,
        network: &StreetNetwork,
        start: WaypointId,
        goal: WaypointId,
    ) -> Option<Path> {
        self.state.reset();
        self.estimates.clear();

        let (Some(start_wp), Some(goal_wp)) = (network.waypoint(start), network.waypoint(goal))
        else {
            return None;
        };
        let speed = self
            .heuristic_speed
            .or(network.top_speed())
            .filter(|speed| speed.is_finite() && *speed > 0.0);

        let start_estimate = self.estimate(start_wp, goal_wp, speed);
        self.state.begin(start, start_estimate);

        while let Some((current, distance)) = self.state.settle_next() {
            if current == goal {
                return self.state.reconstruct(network, start, goal);
            }
            if self.state.limit_exceeded(self.step_limit) {
                warn!(start, goal, limit = ?self.step_limit, "a* search hit its step limit");
                return None;
            }

            let Some(waypoint) = network.waypoint(current) else {
                continue;
            };
            for (next, info) in waypoint.connections() {
                let Some(neighbour) = network.waypoint(next) else {
                    continue;
                };
                let Some(step) = self.cost.cost(waypoint, neighbour, info) else {
                    continue;
                };
                let candidate = distance + step;
                if self.state.relax(current, next, candidate) {
                    let key = candidate + self.estimate(neighbour, goal_wp, speed);
                    self.state.push(next, key);
                }
            }
        }

        None
    }

    fn stats(&self) -> SearchStats {
        self.state.stats()
    }
}
