//! Shared fixtures for the integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use streetnet_lib::{
    build_network_from_path, NetworkBuilder, NetworkConfig, RawNode, RawWay, StreetNetwork,
    TagSet,
};

/// Path to the fixtures directory shared by tests and benches.
#[allow(dead_code)]
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

/// The JSON configuration fixture: residential 50, secondary 70, primary 90,
/// global fallback 130 km/h.
#[allow(dead_code)]
pub fn config() -> NetworkConfig {
    NetworkConfig::from_path(&fixtures_dir().join("network.json")).expect("config fixture loads")
}

/// Network built from `sample.osm`.
///
/// ```text
///   4 --(oneway)--> 5 --(oneway)--> 6        8 -- 9   (separate island)
///   |               |               |
///   |  secondary    |  residential  |  secondary 60
///   |  maxspeed=none|  "30 mph"     |
///   1 ------------- 2 ------------- 3
///          Main Street (residential)
/// ```
#[allow(dead_code)]
pub fn sample_network() -> StreetNetwork {
    build_network_from_path(&fixtures_dir().join("sample.osm"), &config())
        .expect("sample fixture builds")
}

#[allow(dead_code)]
pub fn raw_node(id: i64, lat: f64, lon: f64) -> Arc<RawNode> {
    Arc::new(RawNode {
        id,
        lat,
        lon,
        tags: TagSet::new(),
    })
}

#[allow(dead_code)]
pub fn raw_way(id: i64, nodes: &[Arc<RawNode>], tags: &[(&str, &str)]) -> RawWay {
    RawWay {
        id,
        nodes: nodes.to_vec(),
        tags: tags.iter().copied().collect(),
    }
}

/// Square grid of `size * size` waypoints about 70-110 m apart.
///
/// Rows alternate between residential and secondary streets; columns are
/// residential. Waypoint ids are `row * size + col + 1`.
#[allow(dead_code)]
pub fn grid_network(size: usize) -> StreetNetwork {
    let config = config();
    let nodes: Vec<Arc<RawNode>> = (0..size * size)
        .map(|index| {
            let (row, col) = (index / size, index % size);
            raw_node(
                index as i64 + 1,
                52.0 + row as f64 * 0.001,
                13.0 + col as f64 * 0.001,
            )
        })
        .collect();

    let mut builder = NetworkBuilder::new(&config);
    for row in 0..size {
        let class = if row % 2 == 0 { "residential" } else { "secondary" };
        let row_nodes = &nodes[row * size..(row + 1) * size];
        builder.add_way(&raw_way(1000 + row as i64, row_nodes, &[("highway", class)]));
    }
    for col in 0..size {
        let col_nodes: Vec<Arc<RawNode>> =
            (0..size).map(|row| nodes[row * size + col].clone()).collect();
        builder.add_way(&raw_way(
            2000 + col as i64,
            &col_nodes,
            &[("highway", "residential")],
        ));
    }
    builder.finish().0
}
