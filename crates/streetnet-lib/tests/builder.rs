mod common;

use std::fs::File;
use std::io::BufReader;

use streetnet_lib::{
    build_network, build_network_streaming, NetworkBuilder, NetworkConfig, OsmReader, RawMap,
    StreetNetwork,
};

use common::{config, fixtures_dir, raw_node, raw_way, sample_network};

fn edge_speed(network: &StreetNetwork, source: i64, target: i64) -> Option<f64> {
    network
        .waypoint(source)
        .and_then(|wp| wp.info_to(target))
        .map(|info| info.max_speed())
}

fn edge_list(network: &StreetNetwork) -> Vec<(i64, i64, f64)> {
    let mut edges: Vec<(i64, i64, f64)> = network
        .waypoints()
        .flat_map(|wp| {
            wp.connections()
                .map(move |(target, info)| (wp.id(), target, info.max_speed()))
        })
        .collect();
    edges.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    edges
}

#[test]
fn one_way_residential_only_connects_forward() {
    let cfg = config();
    let (a, b, c) = (
        raw_node(1, 52.0, 13.0),
        raw_node(2, 52.0, 13.001),
        raw_node(3, 52.0, 13.002),
    );
    let mut builder = NetworkBuilder::new(&cfg);
    builder.add_way(&raw_way(
        1,
        &[a, b, c],
        &[("highway", "residential"), ("oneway", "yes")],
    ));
    let (network, stats) = builder.finish();

    assert_eq!(stats.edges, 2);
    assert_eq!(edge_speed(&network, 1, 2), Some(50.0));
    assert_eq!(edge_speed(&network, 2, 3), Some(50.0));
    assert_eq!(edge_speed(&network, 2, 1), None);
    assert_eq!(edge_speed(&network, 3, 2), None);
}

#[test]
fn maxspeed_none_uses_global_fallback_both_ways() {
    let cfg = config();
    let mut builder = NetworkBuilder::new(&cfg);
    builder.add_way(&raw_way(
        1,
        &[raw_node(1, 52.0, 13.0), raw_node(2, 52.0, 13.001)],
        &[("highway", "secondary"), ("maxspeed", "none")],
    ));
    let (network, _) = builder.finish();

    assert_eq!(network.edge_count(), 2);
    assert_eq!(edge_speed(&network, 1, 2), Some(130.0));
    assert_eq!(edge_speed(&network, 2, 1), Some(130.0));
}

#[test]
fn oneway_values_other_than_yes_are_bidirectional() {
    let cfg = config();
    let mut builder = NetworkBuilder::new(&cfg);
    builder.add_way(&raw_way(
        1,
        &[raw_node(1, 52.0, 13.0), raw_node(2, 52.0, 13.001)],
        &[("highway", "residential"), ("oneway", "no")],
    ));
    let (network, _) = builder.finish();
    assert_eq!(network.edge_count(), 2);
}

#[test]
fn sample_fixture_shape() {
    let network = sample_network();

    assert_eq!(network.len(), 8, "footway-only node 7 must not become a waypoint");
    assert!(!network.contains(7));
    assert_eq!(network.edge_count(), 14);
    assert_eq!(network.info_count(), 6);

    // Upper Street is one-way 4 -> 5 -> 6.
    assert!(network.waypoint(4).is_some_and(|wp| wp.is_connected_to(5)));
    assert!(!network.waypoint(5).is_some_and(|wp| wp.is_connected_to(4)));

    assert_eq!(edge_speed(&network, 1, 4), Some(130.0));
    assert_eq!(edge_speed(&network, 3, 6), Some(60.0));
    assert_eq!(edge_speed(&network, 2, 5), Some(50.0), "'30 mph' falls back");
    assert_eq!(network.top_speed(), Some(130.0));
}

#[test]
fn every_edge_has_positive_speed() {
    let network = sample_network();
    for (source, target, speed) in edge_list(&network) {
        assert!(speed > 0.0, "edge {source} -> {target} has speed {speed}");
    }
}

#[test]
fn streaming_and_table_builds_agree() {
    let cfg = config();
    let path = fixtures_dir().join("sample.osm");

    let raw = RawMap::from_path(&path).expect("raw map parses");
    let from_tables = build_network(&raw, &cfg);

    let file = File::open(&path).expect("fixture opens");
    let streamed = build_network_streaming(BufReader::new(file), &cfg).expect("stream builds");

    assert_eq!(edge_list(&from_tables), edge_list(&streamed));
    assert_eq!(from_tables.len(), streamed.len());
}

#[test]
fn builder_counts_ways() {
    let cfg = config();
    let mut builder = NetworkBuilder::new(&cfg);
    builder
        .consume(OsmReader::from_path(&fixtures_dir().join("sample.osm")).expect("opens"))
        .expect("consumes");
    let (_, stats) = builder.finish();

    assert_eq!(stats.ways_seen, 8);
    assert_eq!(stats.ways_used, 6);
    assert_eq!(stats.ways_skipped, 2);
    assert_eq!(stats.waypoints, 8);
    assert_eq!(stats.edges, 14);
}

#[test]
fn xml_and_json_configs_build_the_same_network() {
    let xml = NetworkConfig::from_path(&fixtures_dir().join("network.xml")).expect("xml config");
    assert_eq!(xml, config());

    let raw = RawMap::from_path(&fixtures_dir().join("sample.osm")).expect("raw map parses");
    assert_eq!(
        edge_list(&build_network(&raw, &xml)),
        edge_list(&build_network(&raw, &config()))
    );
}

#[test]
fn truncated_download_is_rejected() {
    let full = std::fs::read_to_string(fixtures_dir().join("sample.osm")).expect("fixture");
    let cut = full.find("<way id=\"104\">").expect("fixture has way 104");
    let truncated = &full[..cut];

    let err = build_network_streaming(truncated.as_bytes(), &config()).expect_err("partial map");
    assert!(matches!(err, streetnet_lib::Error::Parse { .. }), "{err}");
    let err = RawMap::from_reader(truncated.as_bytes()).expect_err("partial map");
    assert!(matches!(err, streetnet_lib::Error::Parse { .. }), "{err}");
}
