//! `route`: fastest or shortest path between two waypoints or snapped coordinates.

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use streetnet_lib::{
    AStarRouter, DijkstraRouter, EdgeCost, Heuristic, NetworkConfig, PathPoint, RouteAlgorithm,
    Router, SearchStats, WaypointIndex,
};

use super::{open_network, print_json, Endpoint, OutputFormat};

/// Quantity a route minimises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMetric {
    /// Travel time at each road's speed.
    Fastest,
    /// Great-circle length, ignoring speed.
    Shortest,
}

/// Arguments for the route command.
#[derive(Debug, Clone)]
pub struct RouteArgs {
    pub from: Endpoint,
    pub to: Endpoint,
    pub algorithm: RouteAlgorithm,
    pub metric: RouteMetric,
    pub max_steps: Option<usize>,
}

#[derive(Debug, Serialize)]
struct RouteOutput<'a> {
    algorithm: RouteAlgorithm,
    metric: RouteMetric,
    start: i64,
    goal: i64,
    found: bool,
    length_km: Option<f64>,
    travel_time_minutes: Option<f64>,
    waypoints: &'a [PathPoint],
    stats: SearchStats,
}

fn router(args: &RouteArgs) -> Box<dyn Router> {
    let cost = match args.metric {
        RouteMetric::Fastest => EdgeCost::travel_time(),
        RouteMetric::Shortest => EdgeCost::distance(),
    };
    match args.algorithm {
        RouteAlgorithm::Dijkstra => {
            let router = DijkstraRouter::new().with_cost(cost);
            match args.max_steps {
                Some(limit) => Box::new(router.with_step_limit(limit)),
                None => Box::new(router),
            }
        }
        RouteAlgorithm::AStar => {
            let mut router = AStarRouter::new().with_cost(cost);
            if args.metric == RouteMetric::Shortest {
                router = router.with_heuristic(Heuristic::distance());
            }
            match args.max_steps {
                Some(limit) => Box::new(router.with_step_limit(limit)),
                None => Box::new(router),
            }
        }
    }
}

pub fn handle_route(
    config: &NetworkConfig,
    network_path: &Path,
    args: &RouteArgs,
    format: OutputFormat,
) -> Result<()> {
    let network = open_network(config, network_path)?;
    let index = WaypointIndex::build(&network);

    let start = args
        .from
        .resolve(&network, &index)
        .with_context(|| format!("invalid start '{}'", args.from))?;
    let goal = args
        .to
        .resolve(&network, &index)
        .with_context(|| format!("invalid goal '{}'", args.to))?;

    let mut router = router(args);
    let path = router.find_path(&network, start, goal);
    let stats = router.stats();

    let output = RouteOutput {
        algorithm: args.algorithm,
        metric: args.metric,
        start,
        goal,
        found: path.is_some(),
        length_km: path.as_ref().map(|p| p.length_km()),
        travel_time_minutes: path
            .as_ref()
            .and_then(|p| p.travel_time_hours(&network))
            .map(|hours| hours * 60.0),
        waypoints: path.as_ref().map(|p| p.waypoints()).unwrap_or(&[]),
        stats,
    };

    match format {
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Text => print_text(&output),
    }
    Ok(())
}

fn print_text(output: &RouteOutput<'_>) {
    if !output.found {
        println!(
            "No route from {} to {} ({} waypoints settled)",
            output.start, output.goal, output.stats.visited
        );
        return;
    }

    println!(
        "Route from {} to {} via {} ({} waypoints settled):",
        output.start, output.goal, output.algorithm, output.stats.visited
    );
    for point in output.waypoints {
        println!("- {} ({:.6}, {:.6})", point.id, point.lat, point.lon);
    }
    if let Some(km) = output.length_km {
        println!("Length: {km:.3} km");
    }
    if let Some(minutes) = output.travel_time_minutes {
        println!("Travel time: {minutes:.1} min");
    }
}
