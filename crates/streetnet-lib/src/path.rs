//! Route results as an ordered list of waypoint positions.

use serde::Serialize;

use crate::geo::great_circle_km;
use crate::graph::{StreetNetwork, Waypoint, WaypointId};

/// Waypoint position recorded in a [`Path`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathPoint {
    pub id: WaypointId,
    pub lat: f64,
    pub lon: f64,
}

impl From<&Waypoint> for PathPoint {
    fn from(waypoint: &Waypoint) -> Self {
        Self {
            id: waypoint.id(),
            lat: waypoint.lat(),
            lon: waypoint.lon(),
        }
    }
}

/// Ordered sequence of waypoints from start to goal, both inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Path {
    waypoints: Vec<PathPoint>,
}

impl Path {
    pub fn new(waypoints: Vec<PathPoint>) -> Self {
        Self { waypoints }
    }

    pub fn waypoints(&self) -> &[PathPoint] {
        &self.waypoints
    }

    pub fn ids(&self) -> Vec<WaypointId> {
        self.waypoints.iter().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Coordinates as `(lat, lon)` pairs, ready for drawing.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.waypoints.iter().map(|p| (p.lat, p.lon)).collect()
    }

    /// Sum of great-circle distances between consecutive waypoints, in km.
    pub fn length_km(&self) -> f64 {
        self.waypoints
            .windows(2)
            .map(|pair| great_circle_km(pair[0].lat, pair[0].lon, pair[1].lat, pair[1].lon))
            .sum()
    }

    /// Total travel time in hours along the network's edges.
    ///
    /// Returns `None` if any consecutive pair is not joined by a directed edge.
    pub fn travel_time_hours(&self, network: &StreetNetwork) -> Option<f64> {
        self.waypoints
            .windows(2)
            .map(|pair| network.edge_cost(pair[0].id, pair[1].id))
            .sum()
    }
}
