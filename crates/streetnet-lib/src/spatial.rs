//! KD-tree index for snapping coordinates to the nearest waypoint.
//!
//! Waypoints are projected onto the unit sphere. Straight-line (chord)
//! distance between two points on a sphere grows monotonically with their
//! great-circle distance, so the nearest neighbour in 3D is also the nearest
//! waypoint along the earth's surface, with no wrap-around at the antimeridian.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use tracing::debug;

use crate::geo::unit_sphere;
use crate::graph::{StreetNetwork, WaypointId};

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

/// Static nearest-waypoint index over a built network.
///
/// The index does not follow later changes to the network; rebuild it after
/// loading or building a new one.
pub struct WaypointIndex {
    tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32>,
    ids: Vec<WaypointId>,
}

impl WaypointIndex {
    pub fn build(network: &StreetNetwork) -> Self {
        let mut ids: Vec<WaypointId> = network.waypoints().map(|wp| wp.id()).collect();
        ids.sort_unstable();

        let mut tree: KdTree<f64, usize, 3, BUCKET_SIZE, u32> = KdTree::new();
        for (index, id) in ids.iter().enumerate() {
            if let Some(waypoint) = network.waypoint(*id) {
                tree.add(&unit_sphere(waypoint.lat(), waypoint.lon()), index);
            }
        }

        debug!(waypoints = ids.len(), "built waypoint index");
        Self { tree, ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Id of the waypoint closest to `(lat, lon)`.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<WaypointId> {
        if self.ids.is_empty() {
            return None;
        }
        let query = unit_sphere(lat, lon);
        let neighbour = self.tree.nearest_one::<SquaredEuclidean>(&query);
        self.ids.get(neighbour.item).copied()
    }

    /// Ids of up to `k` closest waypoints, nearest first.
    pub fn nearest_n(&self, lat: f64, lon: f64, k: usize) -> Vec<WaypointId> {
        if k == 0 || self.ids.is_empty() {
            return Vec::new();
        }
        let query = unit_sphere(lat, lon);
        self.tree
            .nearest_n::<SquaredEuclidean>(&query, k)
            .into_iter()
            .filter_map(|neighbour| self.ids.get(neighbour.item).copied())
            .collect()
    }
}
