//! `nearest`: snap a coordinate to waypoints.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use streetnet_lib::{geo::great_circle_km, NetworkConfig, WaypointIndex};

use super::{open_network, print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct NearestEntry {
    id: i64,
    lat: f64,
    lon: f64,
    distance_km: f64,
    degree: usize,
}

pub fn handle_nearest(
    config: &NetworkConfig,
    network_path: &Path,
    lat: f64,
    lon: f64,
    count: usize,
    format: OutputFormat,
) -> Result<()> {
    let network = open_network(config, network_path)?;
    let index = WaypointIndex::build(&network);

    let entries: Vec<NearestEntry> = index
        .nearest_n(lat, lon, count)
        .into_iter()
        .filter_map(|id| network.waypoint(id))
        .map(|wp| NearestEntry {
            id: wp.id(),
            lat: wp.lat(),
            lon: wp.lon(),
            distance_km: great_circle_km(lat, lon, wp.lat(), wp.lon()),
            degree: wp.degree(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No waypoints in network");
            }
            for entry in &entries {
                println!(
                    "{} ({:.6}, {:.6}) {:.3} km, {} connections",
                    entry.id, entry.lat, entry.lon, entry.distance_km, entry.degree
                );
            }
        }
    }
    Ok(())
}
