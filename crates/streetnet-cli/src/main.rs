use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use streetnet_lib::{NetworkConfig, RouteAlgorithm};

mod commands;

use commands::route::RouteMetric;
use commands::{Endpoint, OutputFormat};

#[derive(Parser, Debug)]
#[command(author, version, about = "Street network build and routing utilities")]
struct Cli {
    /// Network configuration document (JSON, or legacy XML with a .xml extension).
    #[arg(long, global = true, default_value = "network.json")]
    config: PathBuf,

    /// Output format for command results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a network from an OSM XML extract and save it.
    Build {
        /// OSM XML extract to read.
        #[arg(long)]
        input: PathBuf,
        /// Destination for the persisted network.
        #[arg(long)]
        output: PathBuf,
    },
    /// Find the fastest (or shortest) route between two waypoints.
    Route {
        /// Persisted network, or an OSM extract (`.osm`) to build on the fly.
        #[arg(long)]
        network: PathBuf,
        /// Start waypoint id, or `lat,lon` to snap to the nearest waypoint.
        #[arg(long = "from", allow_hyphen_values = true)]
        from: Endpoint,
        /// Goal waypoint id, or `lat,lon` to snap to the nearest waypoint.
        #[arg(long = "to", allow_hyphen_values = true)]
        to: Endpoint,
        /// Search algorithm.
        #[arg(long, default_value_t = RouteAlgorithm::AStar)]
        algorithm: RouteAlgorithm,
        /// What the route minimises.
        #[arg(long, value_enum, default_value_t = RouteMetric::Fastest)]
        metric: RouteMetric,
        /// Give up after settling this many waypoints.
        #[arg(long)]
        max_steps: Option<usize>,
    },
    /// List the waypoints closest to a coordinate.
    Nearest {
        #[arg(long)]
        network: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Number of waypoints to list.
        #[arg(long, short = 'k', default_value_t = 1)]
        count: usize,
    },
    /// Print summary statistics of a network.
    Inspect {
        #[arg(long)]
        network: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = NetworkConfig::from_path(&cli.config).with_context(|| {
        format!(
            "failed to load network configuration from {}",
            cli.config.display()
        )
    })?;

    match cli.command {
        Command::Build { input, output } => {
            commands::build::handle_build(&config, &input, &output, cli.format)
        }
        Command::Route {
            network,
            from,
            to,
            algorithm,
            metric,
            max_steps,
        } => commands::route::handle_route(
            &config,
            &network,
            &commands::route::RouteArgs {
                from,
                to,
                algorithm,
                metric,
                max_steps,
            },
            cli.format,
        ),
        Command::Nearest {
            network,
            lat,
            lon,
            count,
        } => commands::nearest::handle_nearest(&config, &network, lat, lon, count, cli.format),
        Command::Inspect { network } => {
            commands::inspect::handle_inspect(&config, &network, cli.format)
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
