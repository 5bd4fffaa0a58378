//! Waypoints, their directed connections, and the street network that owns them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::geo::great_circle_km;
use crate::path::Path;
use crate::routing::{select_router, RouteAlgorithm};
use crate::tags::{TagSet, MAXSPEED};

/// Numeric identifier for a waypoint, shared with the originating raw node.
pub type WaypointId = i64;

/// Attributes of a directed connection between two waypoints.
///
/// The speed is always derived from the tag set; it is never stored on its
/// own, which is why persisted networks only carry tags.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    max_speed: f64,
    tags: TagSet,
}

impl ConnectionInfo {
    /// Derive the connection speed (km/h) from a way's tags.
    ///
    /// Missing or unparsable `maxspeed` values fall back to the classification
    /// default and `maxspeed=none` uses the global fallback. Raw tag data is
    /// noisy, so this never fails.
    pub fn derive(tags: TagSet, config: &NetworkConfig) -> Self {
        let class_default = || match tags.classification().and_then(|c| config.default_speed(c)) {
            Some(speed) => speed,
            None => {
                warn!(
                    classification = tags.classification().unwrap_or("<none>"),
                    "classification has no configured default speed; using global fallback"
                );
                config.max_speed()
            }
        };

        let max_speed = match tags.get(MAXSPEED) {
            None => class_default(),
            Some("none") => config.max_speed(),
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(speed) if speed.is_finite() && speed > 0.0 => speed,
                _ => {
                    debug!(maxspeed = raw, "unparsable maxspeed tag; using classification default");
                    class_default()
                }
            },
        };

        Self { max_speed, tags }
    }

    /// Resolved speed in km/h.
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }
}

/// Graph node with its outgoing connections.
#[derive(Debug, Clone)]
pub struct Waypoint {
    id: WaypointId,
    lat: f64,
    lon: f64,
    connections: BTreeMap<WaypointId, Arc<ConnectionInfo>>,
}

impl Waypoint {
    pub fn new(id: WaypointId, lat: f64, lon: f64) -> Self {
        Self {
            id,
            lat,
            lon,
            connections: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> WaypointId {
        self.id
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Great-circle distance to another waypoint in kilometres.
    pub fn distance_to(&self, other: &Waypoint) -> f64 {
        great_circle_km(self.lat, self.lon, other.lat, other.lon)
    }

    /// Outgoing connections ordered by target id.
    pub fn connections(&self) -> impl Iterator<Item = (WaypointId, &Arc<ConnectionInfo>)> {
        self.connections.iter().map(|(id, info)| (*id, info))
    }

    /// Connection info towards `target`, if connected.
    pub fn info_to(&self, target: WaypointId) -> Option<&Arc<ConnectionInfo>> {
        self.connections.get(&target)
    }

    pub fn is_connected_to(&self, target: WaypointId) -> bool {
        self.connections.contains_key(&target)
    }

    pub fn degree(&self) -> usize {
        self.connections.len()
    }

    /// Connect to `target`, replacing any previous info for that target.
    ///
    /// Self-connections are ignored; returns whether the edge was stored.
    pub(crate) fn connect(&mut self, target: WaypointId, info: Arc<ConnectionInfo>) -> bool {
        if target == self.id {
            return false;
        }
        self.connections.insert(target, info);
        true
    }
}

/// Routable street network: the authoritative waypoint table plus the routing
/// strategy used by [`StreetNetwork::find_path`].
#[derive(Debug, Clone, Default)]
pub struct StreetNetwork {
    waypoints: HashMap<WaypointId, Waypoint>,
    algorithm: RouteAlgorithm,
    top_speed: Option<f64>,
}

impl StreetNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the waypoint for `id`, creating it at the given position on
    /// first use. Later calls keep the original coordinates.
    pub fn waypoint_or_insert(&mut self, id: WaypointId, lat: f64, lon: f64) -> &Waypoint {
        self.waypoints
            .entry(id)
            .or_insert_with(|| Waypoint::new(id, lat, lon))
    }

    /// Connect two existing waypoints. Returns `false` when either waypoint is
    /// missing or `source == target`.
    pub fn connect(
        &mut self,
        source: WaypointId,
        target: WaypointId,
        info: Arc<ConnectionInfo>,
    ) -> bool {
        if !self.waypoints.contains_key(&target) {
            return false;
        }
        let speed = info.max_speed();
        let connected = match self.waypoints.get_mut(&source) {
            Some(waypoint) => waypoint.connect(target, info),
            None => false,
        };
        if connected {
            self.top_speed = Some(self.top_speed.map_or(speed, |top| top.max(speed)));
        }
        connected
    }

    pub fn waypoint(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.get(&id)
    }

    pub fn contains(&self, id: WaypointId) -> bool {
        self.waypoints.contains_key(&id)
    }

    pub fn waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.values()
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.waypoints.values().map(Waypoint::degree).sum()
    }

    /// Number of distinct connection tag sets.
    pub fn info_count(&self) -> usize {
        self.waypoints
            .values()
            .flat_map(|wp| wp.connections.values())
            .map(|info| info.tags())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Highest speed ever assigned to an edge, or `None` for an edgeless
    /// network.
    ///
    /// Dividing a distance by this speed never overestimates the remaining
    /// travel time, which keeps the A* heuristic admissible.
    pub fn top_speed(&self) -> Option<f64> {
        self.top_speed
    }

    /// Travel time (hours) of the direct edge `source -> target`.
    pub fn edge_cost(&self, source: WaypointId, target: WaypointId) -> Option<f64> {
        let from = self.waypoints.get(&source)?;
        let to = self.waypoints.get(&target)?;
        let info = from.info_to(target)?;
        Some(from.distance_to(to) / info.max_speed())
    }

    /// Routing strategy used by [`StreetNetwork::find_path`].
    pub fn algorithm(&self) -> RouteAlgorithm {
        self.algorithm
    }

    pub fn set_algorithm(&mut self, algorithm: RouteAlgorithm) {
        self.algorithm = algorithm;
    }

    /// Find the fastest path between two waypoints with the selected strategy.
    ///
    /// Unknown endpoints are errors; disconnected endpoints yield `Ok(None)`.
    pub fn find_path(&self, start: WaypointId, goal: WaypointId) -> Result<Option<Path>> {
        for id in [start, goal] {
            if !self.contains(id) {
                return Err(Error::UnknownWaypoint { id });
            }
        }
        let mut router = select_router(self.algorithm);
        Ok(router.find_path(self, start, goal))
    }

    /// Waypoint closest to a coordinate by great-circle distance.
    ///
    /// Linear scan; build a [`crate::spatial::WaypointIndex`] for repeated
    /// queries.
    pub fn nearest_waypoint(&self, lat: f64, lon: f64) -> Option<&Waypoint> {
        self.waypoints
            .values()
            .map(|wp| (great_circle_km(lat, lon, wp.lat, wp.lon), wp))
            .min_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)))
            .map(|(_, wp)| wp)
    }
}
