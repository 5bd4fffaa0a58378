//! `build`: stream an OSM extract into a network and persist it.

use std::path::Path;

use anyhow::{Context, Result};

use streetnet_lib::{save_to_path, NetworkBuilder, NetworkConfig, OsmReader};

use super::{print_json, OutputFormat};

pub fn handle_build(
    config: &NetworkConfig,
    input: &Path,
    output: &Path,
    format: OutputFormat,
) -> Result<()> {
    let reader = OsmReader::from_path(input)
        .with_context(|| format!("failed to open OSM extract {}", input.display()))?;

    let mut builder = NetworkBuilder::new(config);
    builder
        .consume(reader)
        .with_context(|| format!("failed to build network from {}", input.display()))?;
    let (network, stats) = builder.finish();

    save_to_path(&network, output)
        .with_context(|| format!("failed to save network to {}", output.display()))?;

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Text => {
            println!("Saved network to {}", output.display());
            println!(
                "  ways: {} used, {} skipped",
                stats.ways_used, stats.ways_skipped
            );
            println!("  waypoints: {}", stats.waypoints);
            println!("  edges: {}", stats.edges);
        }
    }
    Ok(())
}
