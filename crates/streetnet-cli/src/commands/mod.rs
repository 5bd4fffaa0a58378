// Handlers for the CLI subcommands. main.rs parses arguments and dispatches here.

pub mod build;
pub mod inspect;
pub mod nearest;
pub mod route;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use streetnet_lib::{
    build_network_from_path, load_from_path, NetworkConfig, StreetNetwork, WaypointId,
    WaypointIndex,
};

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Route endpoint given on the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Endpoint {
    Waypoint(WaypointId),
    Coordinate { lat: f64, lon: f64 },
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(',') {
            Some((lat, lon)) => {
                let lat = lat
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid latitude in '{s}'"))?;
                let lon = lon
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid longitude in '{s}'"))?;
                Ok(Endpoint::Coordinate { lat, lon })
            }
            None => s
                .trim()
                .parse()
                .map(Endpoint::Waypoint)
                .map_err(|_| format!("expected a waypoint id or 'lat,lon', got '{s}'")),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Waypoint(id) => write!(f, "{id}"),
            Endpoint::Coordinate { lat, lon } => write!(f, "{lat},{lon}"),
        }
    }
}

impl Endpoint {
    /// Resolve to a waypoint id, snapping coordinates through `index`.
    pub fn resolve(&self, network: &StreetNetwork, index: &WaypointIndex) -> Result<WaypointId> {
        match *self {
            Endpoint::Waypoint(id) => {
                if !network.contains(id) {
                    bail!("waypoint {id} is not part of the network");
                }
                Ok(id)
            }
            Endpoint::Coordinate { lat, lon } => index
                .nearest(lat, lon)
                .with_context(|| format!("no waypoint near {lat},{lon}: the network is empty")),
        }
    }
}

/// Load a persisted network, or build one when given an OSM extract.
pub fn open_network(config: &NetworkConfig, path: &Path) -> Result<StreetNetwork> {
    let is_osm = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("osm"))
        .unwrap_or(false);

    if is_osm {
        build_network_from_path(path, config)
            .with_context(|| format!("failed to build network from {}", path.display()))
    } else {
        load_from_path(path, config)
            .with_context(|| format!("failed to load network from {}", path.display()))
    }
}

/// Print a serializable value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to encode output as JSON")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_parse() {
        assert_eq!("42".parse::<Endpoint>(), Ok(Endpoint::Waypoint(42)));
        assert_eq!(
            "52.5, -13.25".parse::<Endpoint>(),
            Ok(Endpoint::Coordinate {
                lat: 52.5,
                lon: -13.25
            })
        );
        assert!("north".parse::<Endpoint>().is_err());
        assert!("1,x".parse::<Endpoint>().is_err());
    }
}
