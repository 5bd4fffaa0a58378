//! Street network library entry points.
//!
//! This crate turns OpenStreetMap XML extracts into a routable street graph,
//! persists built graphs in a compact checksummed file, and finds the fastest
//! path between two waypoints with Dijkstra or A* (or the cheapest one under a
//! custom edge cost). Consumers (the CLI, a map viewer) should only depend on
//! the items exported here.
//!
//! A [`NetworkConfig`] must be constructed or loaded first; it is passed
//! explicitly to every build, load, and speed derivation call.

pub mod builder;
pub mod codec;
pub mod config;
pub mod error;
pub mod geo;
pub mod graph;
pub mod osm;
pub mod path;
pub mod routing;
pub mod spatial;
pub mod tags;

pub use builder::{
    build_network, build_network_from_path, build_network_streaming, BuildStats, NetworkBuilder,
};
pub use codec::{load, load_from_path, save, save_to_path};
pub use config::NetworkConfig;
pub use error::{Error, Result};
pub use graph::{ConnectionInfo, StreetNetwork, Waypoint, WaypointId};
pub use osm::{OsmElement, OsmReader, RawMap, RawNode, RawWay};
pub use path::{Path, PathPoint};
pub use routing::{
    select_router, AStarRouter, DijkstraRouter, EdgeCost, Heuristic, RouteAlgorithm, Router,
    SearchStats,
};
pub use spatial::WaypointIndex;
pub use tags::TagSet;
