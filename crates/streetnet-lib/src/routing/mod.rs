//! Shortest-path strategies over a [`StreetNetwork`].
//!
//! This module provides:
//! - [`Router`] - the strategy contract shared by all search algorithms
//! - [`DijkstraRouter`] - uniform-cost label-setting search
//! - [`AStarRouter`] - heuristic-guided search with a great-circle lower bound
//! - [`EdgeCost`] and [`Heuristic`] - pluggable edge costs and A* estimates
//! - [`RouteAlgorithm`] and [`select_router`] - runtime strategy selection
//!
//! Both routers minimise travel time by default: an edge costs its
//! great-circle length divided by the connection's speed. Any other
//! [`EdgeCost`] can be plugged in with `with_cost`, and [`AStarRouter`] also
//! accepts a custom [`Heuristic`]. Routers own their per-search state
//! (distance table, visited set, predecessors) and reset it on every call,
//! so one instance can be reused for many queries but must not be shared
//! between threads mid-search. The network itself can be shared read-only.
//!
//! # Example
//!
//! ```ignore
//! use streetnet_lib::{select_router, RouteAlgorithm};
//!
//! let mut router = select_router(RouteAlgorithm::AStar);
//! if let Some(path) = router.find_path(&network, start, goal) {
//!     println!("{} waypoints, {:.3} km", path.len(), path.length_km());
//! }
//! println!("settled {} nodes", router.stats().visited);
//! ```

mod a_star;
mod dijkstra;
mod search;

pub use a_star::AStarRouter;
pub use dijkstra::DijkstraRouter;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::graph::{ConnectionInfo, StreetNetwork, Waypoint, WaypointId};
use crate::path::Path;

type CostFn = dyn Fn(&Waypoint, &Waypoint, &ConnectionInfo) -> f64 + Send + Sync;
type EstimateFn = dyn Fn(&Waypoint, &Waypoint) -> f64 + Send + Sync;

/// Cost of travelling one directed edge.
///
/// Routers accept an `EdgeCost` or any matching closure.
///
/// The function receives the source waypoint, the target waypoint, and the
/// connection between them. A negative, NaN, or infinite cost marks the edge
/// as impassable for the search.
#[derive(Clone)]
pub struct EdgeCost(Arc<CostFn>);

impl EdgeCost {
    pub fn new<F>(cost: F) -> Self
    where
        F: Fn(&Waypoint, &Waypoint, &ConnectionInfo) -> f64 + Send + Sync + 'static,
    {
        Self(Arc::new(cost))
    }

    /// Travel time in hours. This is the default.
    pub fn travel_time() -> Self {
        Self::new(|from, to, info| from.distance_to(to) / info.max_speed())
    }

    /// Great-circle length in kilometres, ignoring speed.
    pub fn distance() -> Self {
        Self::new(|from, to, _| from.distance_to(to))
    }

    /// Cost of `from -> to`, or `None` when the edge may not be used.
    pub(crate) fn cost(
        &self,
        from: &Waypoint,
        to: &Waypoint,
        info: &ConnectionInfo,
    ) -> Option<f64> {
        let cost = (self.0)(from, to, info);
        (cost.is_finite() && cost >= 0.0).then_some(cost)
    }
}

impl<F> From<F> for EdgeCost
where
    F: Fn(&Waypoint, &Waypoint, &ConnectionInfo) -> f64 + Send + Sync + 'static,
{
    fn from(cost: F) -> Self {
        Self::new(cost)
    }
}

impl Default for EdgeCost {
    fn default() -> Self {
        Self::travel_time()
    }
}

impl fmt::Debug for EdgeCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EdgeCost(..)")
    }
}

/// Estimated remaining cost from a waypoint to the goal, for [`AStarRouter`].
///
/// The estimate must be in the same unit as the router's [`EdgeCost`] and
/// must not exceed the true remaining cost, or A* may return a path that is
/// not the cheapest.
#[derive(Clone)]
pub struct Heuristic(Arc<EstimateFn>);

impl Heuristic {
    pub fn new<F>(estimate: F) -> Self
    where
        F: Fn(&Waypoint, &Waypoint) -> f64 + Send + Sync + 'static,
    {
        Self(Arc::new(estimate))
    }

    /// Great-circle distance in kilometres. Exact lower bound for
    /// [`EdgeCost::distance`].
    pub fn distance() -> Self {
        Self::new(|waypoint, goal| waypoint.distance_to(goal))
    }

    /// Estimate for `waypoint`. Negative or non-finite values count as zero.
    pub(crate) fn estimate(&self, waypoint: &Waypoint, goal: &Waypoint) -> f64 {
        let estimate = (self.0)(waypoint, goal);
        if estimate.is_finite() && estimate > 0.0 {
            estimate
        } else {
            0.0
        }
    }
}

impl<F> From<F> for Heuristic
where
    F: Fn(&Waypoint, &Waypoint) -> f64 + Send + Sync + 'static,
{
    fn from(estimate: F) -> Self {
        Self::new(estimate)
    }
}

impl fmt::Debug for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Heuristic(..)")
    }
}

/// Supported routing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteAlgorithm {
    /// Dijkstra's algorithm (uniform cost).
    Dijkstra,
    /// A* search (heuristic guided).
    #[default]
    #[serde(rename = "a-star")]
    AStar,
}

impl fmt::Display for RouteAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RouteAlgorithm::Dijkstra => "dijkstra",
            RouteAlgorithm::AStar => "a-star",
        };
        f.write_str(value)
    }
}

impl FromStr for RouteAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(RouteAlgorithm::Dijkstra),
            "a-star" | "astar" | "a*" => Ok(RouteAlgorithm::AStar),
            other => Err(format!(
                "unknown routing algorithm '{other}' (expected 'dijkstra' or 'a-star')"
            )),
        }
    }
}

/// Counters describing the most recent search, for diagnostics and benchmarks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Queue entries processed.
    pub steps: usize,
    /// Waypoints settled with a final distance.
    pub visited: usize,
    /// Waypoints that were ever given a finite tentative distance.
    pub inspected: usize,
}

/// Strategy contract for path finding.
pub trait Router: Send {
    /// The algorithm identifier for this router.
    fn algorithm(&self) -> RouteAlgorithm;

    /// Find the cheapest path from `start` to `goal` (the fastest one with the
    /// default cost).
    ///
    /// Returns `None` when the goal is unreachable, either endpoint is not in
    /// the network, or the configured step limit is exceeded.
    fn find_path(
        &mut self,
        network: &StreetNetwork,
        start: WaypointId,
        goal: WaypointId,
    ) -> Option<Path>;

    /// Counters from the most recent call to [`Router::find_path`].
    fn stats(&self) -> SearchStats;
}

/// Create a router for the requested algorithm.
pub fn select_router(algorithm: RouteAlgorithm) -> Box<dyn Router> {
    match algorithm {
        RouteAlgorithm::Dijkstra => Box::new(DijkstraRouter::new()),
        RouteAlgorithm::AStar => Box::new(AStarRouter::new()),
    }
}
