//! `inspect`: summary statistics of a network.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use streetnet_lib::NetworkConfig;

use super::{open_network, print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct NetworkSummary {
    waypoints: usize,
    edges: usize,
    connection_infos: usize,
    no_outgoing_edges: usize,
    top_speed_kmh: Option<f64>,
}

pub fn handle_inspect(
    config: &NetworkConfig,
    network_path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let network = open_network(config, network_path)?;

    let summary = NetworkSummary {
        waypoints: network.len(),
        edges: network.edge_count(),
        connection_infos: network.info_count(),
        no_outgoing_edges: network.waypoints().filter(|wp| wp.degree() == 0).count(),
        top_speed_kmh: network.top_speed(),
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            println!("Waypoints: {}", summary.waypoints);
            println!("Edges: {}", summary.edges);
            println!("Connection infos: {}", summary.connection_infos);
            println!(
                "Waypoints without outgoing edges: {}",
                summary.no_outgoing_edges
            );
            match summary.top_speed_kmh {
                Some(speed) => println!("Top speed: {speed} km/h"),
                None => println!("Top speed: n/a"),
            }
        }
    }
    Ok(())
}
