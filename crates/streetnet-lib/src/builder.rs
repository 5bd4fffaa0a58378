//! Turns raw OSM ways into a routable [`StreetNetwork`].
//!
//! Only ways whose `highway` classification appears in the [`NetworkConfig`]
//! become roads. Every way gets one shared [`ConnectionInfo`], and its node
//! sequence is walked pairwise to create edges: forward only for one-way
//! streets and roundabouts, both directions otherwise. Waypoints are created
//! the first time a raw node id is seen and reused afterwards, which is how
//! intersections between ways are joined.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::NetworkConfig;
use crate::error::Result;
use crate::graph::{ConnectionInfo, StreetNetwork};
use crate::osm::{OsmElement, OsmReader, RawMap, RawNode, RawNodeId, RawWay};
use crate::tags::TagSet;

/// Counters collected while building a network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Ways offered to the builder.
    pub ways_seen: usize,
    /// Ways with an eligible classification.
    pub ways_used: usize,
    /// Ways dropped because of a missing or ineligible classification.
    pub ways_skipped: usize,
    /// Waypoints in the finished network.
    pub waypoints: usize,
    /// Directed edges in the finished network.
    pub edges: usize,
}

/// Incremental graph builder.
///
/// Feed ways with [`NetworkBuilder::add_way`] (or a whole element stream with
/// [`NetworkBuilder::consume`]) and call [`NetworkBuilder::finish`].
#[derive(Debug)]
pub struct NetworkBuilder<'a> {
    config: &'a NetworkConfig,
    network: StreetNetwork,
    stats: BuildStats,
}

impl<'a> NetworkBuilder<'a> {
    pub fn new(config: &'a NetworkConfig) -> Self {
        Self {
            config,
            network: StreetNetwork::new(),
            stats: BuildStats::default(),
        }
    }

    /// Whether a way with these tags would be turned into roads.
    pub fn is_eligible(&self, way_tags: &TagSet) -> bool {
        way_tags
            .classification()
            .is_some_and(|class| self.config.is_eligible(class))
    }

    /// Add one raw way. Returns `false` when the way was skipped.
    pub fn add_way(&mut self, way: &RawWay) -> bool {
        self.stats.ways_seen += 1;
        if !self.is_eligible(&way.tags) {
            self.stats.ways_skipped += 1;
            debug!(
                way = way.id,
                classification = way.tags.classification().unwrap_or("<none>"),
                "skipping ineligible way"
            );
            return false;
        }
        self.stats.ways_used += 1;

        let one_way = way.tags.is_one_way();
        let info = Arc::new(ConnectionInfo::derive(way.tags.clone(), self.config));

        for node in &way.nodes {
            self.network.waypoint_or_insert(node.id, node.lat, node.lon);
        }

        for pair in way.nodes.windows(2) {
            let (source, target) = (pair[0].id, pair[1].id);
            if source == target {
                continue;
            }
            self.network.connect(source, target, Arc::clone(&info));
            if !one_way {
                self.network.connect(target, source, Arc::clone(&info));
            }
        }

        true
    }

    /// Build from a raw element stream as it is parsed.
    ///
    /// Nodes are kept in a table and each way is added as soon as it closes,
    /// so nodes must precede the ways that reference them (the usual OSM
    /// ordering). Ineligible ways are dropped without resolving their
    /// references; an eligible way that names an unseen node is a parse error.
    pub fn consume<R: BufRead>(&mut self, elements: OsmReader<R>) -> Result<()> {
        let mut nodes: HashMap<RawNodeId, Arc<RawNode>> = HashMap::new();

        for element in elements {
            match element? {
                OsmElement::Node(node) => {
                    let id = node.id;
                    if nodes.insert(id, Arc::new(node)).is_some() {
                        warn!(
                            node = id,
                            "duplicate node id in raw map; keeping the last definition"
                        );
                    }
                }
                OsmElement::Way(record) => {
                    if !self.is_eligible(&record.tags) {
                        self.stats.ways_seen += 1;
                        self.stats.ways_skipped += 1;
                        continue;
                    }
                    let way = record.resolve(&nodes)?;
                    self.add_way(&way);
                }
            }
        }

        debug!(nodes = nodes.len(), "raw node table released");
        Ok(())
    }

    /// Statistics so far.
    pub fn stats(&self) -> BuildStats {
        BuildStats {
            waypoints: self.network.len(),
            edges: self.network.edge_count(),
            ..self.stats
        }
    }

    /// Finish building and hand over the network with its statistics.
    pub fn finish(self) -> (StreetNetwork, BuildStats) {
        let stats = self.stats();
        info!(
            ways_used = stats.ways_used,
            ways_skipped = stats.ways_skipped,
            waypoints = stats.waypoints,
            edges = stats.edges,
            "built street network"
        );
        (self.network, stats)
    }
}

/// Build a network from fully parsed raw tables.
///
/// Ways are processed in ascending id order, so the result does not depend on
/// hash iteration order when two ways share an ordered node pair.
pub fn build_network(raw: &RawMap, config: &NetworkConfig) -> StreetNetwork {
    let mut ways: Vec<&RawWay> = raw.ways.values().collect();
    ways.sort_by_key(|way| way.id);

    let mut builder = NetworkBuilder::new(config);
    for way in ways {
        builder.add_way(way);
    }
    builder.finish().0
}

/// Build a network straight from an OSM XML stream without materialising the
/// way table.
pub fn build_network_streaming<R: BufRead>(
    source: R,
    config: &NetworkConfig,
) -> Result<StreetNetwork> {
    let mut builder = NetworkBuilder::new(config);
    builder.consume(OsmReader::new(source))?;
    Ok(builder.finish().0)
}

/// Stream-build a network from an OSM XML file.
pub fn build_network_from_path(path: &Path, config: &NetworkConfig) -> Result<StreetNetwork> {
    debug!(path = %path.display(), "building street network from raw map");
    let file = File::open(path)?;
    build_network_streaming(BufReader::new(file), config)
}
