//! Uniform-cost search.

use tracing::warn;

use crate::graph::{StreetNetwork, WaypointId};
use crate::path::Path;

use super::search::SearchState;
use super::{EdgeCost, RouteAlgorithm, Router, SearchStats};

/// Dijkstra's algorithm, over travel time unless another [`EdgeCost`] is set.
///
/// Settles waypoints in order of tentative cost until the goal is settled or
/// the frontier is exhausted.
#[derive(Debug, Default)]
pub struct DijkstraRouter {
    state: SearchState,
    cost: EdgeCost,
    step_limit: Option<usize>,
}

impl DijkstraRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimise `cost` instead of travel time.
    pub fn with_cost(mut self, cost: impl Into<EdgeCost>) -> Self {
        self.cost = cost.into();
        self
    }

    /// Give up (returning `None`) after settling more than `steps` waypoints.
    pub fn with_step_limit(mut self, steps: usize) -> Self {
        self.step_limit = Some(steps);
        self
    }
}

impl Router for DijkstraRouter {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::Dijkstra
    }

    fn find_path(
        &mut self,
        network: &StreetNetwork,
        start: WaypointId,
        goal: WaypointId,
    ) -> Option<Path> {
        self.state.reset();
        if !network.contains(start) || !network.contains(goal) {
            return None;
        }

        self.state.begin(start, 0.0);

        while let Some((current, distance)) = self.state.settle_next() {
            if current == goal {
                return self.state.reconstruct(network, start, goal);
            }
            if self.state.limit_exceeded(self.step_limit) {
                warn!(start, goal, limit = ?self.step_limit, "dijkstra search hit its step limit");
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
                    self.state.push(next, candidate);
                }
            }
        }

        None
    }

    fn stats(&self) -> SearchStats {
        self.state.stats()
    }
}
