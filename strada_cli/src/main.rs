use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use comfy_table::Table;
use tracing::info;

use strada_core::engine::{GenerationConfig, GenerationResult, RouteGenerator};
use strada_core::geopoint::GeoPoint;
use strada_core::osm::read_raw_ways;
use strada_core::router::{ConnectorError, ConnectorRouter, NoRouter, RoutedConnector};
use strada_osrm::client::{OsrmClient, OsrmClientParams};

mod parsers;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// OSM extract (.osm.pbf) to generate a coverage route for
    input: PathBuf,

    /// Target duration per chunk, in seconds
    #[arg(long, default_value_t = 3600.0)]
    chunk_duration: f64,

    /// Start coordinate as "lat,lng"; defaults to an arbitrary node
    #[arg(long, value_parser = parsers::parse_point)]
    start: Option<GeoPoint>,

    /// Report and bridge U-turn gaps at dead ends
    #[arg(long)]
    coverage_mode: bool,

    #[arg(long)]
    include_service_roads: bool,

    #[arg(long)]
    include_private_roads: bool,

    /// Ignore oneway restrictions
    #[arg(long)]
    no_restrictions: bool,

    /// How to handle detected gaps
    #[arg(long, default_value = "auto", value_parser = parsers::parse_gap_policy)]
    gap_policy: strada_core::gaps::GapPolicy,

    /// OSRM base url for connector routing; straight-line fallback when absent
    #[arg(long)]
    osrm_url: Option<String>,

    /// Emit the full result as JSON instead of a summary table
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    debug: bool,
}

enum CliRouter {
    Osrm(OsrmClient),
    Offline(NoRouter),
}

impl ConnectorRouter for CliRouter {
    async fn route_between(
        &self,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<RoutedConnector, ConnectorError> {
        match self {
            CliRouter::Osrm(client) => client.route_between(from, to).await,
            CliRouter::Offline(router) => router.route_between(from, to).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let ways = read_raw_ways(&cli.input)?;
    info!(ways = ways.len(), "loaded extract");

    let router = match &cli.osrm_url {
        Some(url) => CliRouter::Osrm(OsrmClient::new(OsrmClientParams {
            osrm_url: url.clone(),
            request_timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        })),
        None => CliRouter::Offline(NoRouter),
    };

    let config = GenerationConfig {
        start_point: cli.start,
        coverage_mode: cli.coverage_mode,
        chunk_duration_s: cli.chunk_duration,
        return_to_start: true,
        include_service_roads: cli.include_service_roads,
        include_private_roads: cli.include_private_roads,
        respect_restrictions: !cli.no_restrictions,
        gap_policy: cli.gap_policy,
    };

    let generator = RouteGenerator::new(router);
    let result = generator.generate(&ways, &config).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &GenerationResult) {
    let mut chunks = Table::new();
    chunks.set_header(vec!["Chunk", "Distance", "Duration", "Points"]);
    for chunk in &result.chunks {
        chunks.add_row(vec![
            format!("{}", chunk.index + 1),
            format!("{}", chunk.distance),
            format!("{:.0} min", chunk.duration_s / 60.0),
            format!("{}", chunk.polyline.len()),
        ]);
    }
    println!("{chunks}");

    if !result.gaps.is_empty() {
        let mut gaps = Table::new();
        gaps.set_header(vec!["Gap", "Kind", "Distance", "Resolution"]);
        for gap in &result.gaps {
            gaps.add_row(vec![
                format!("{}", gap.id + 1),
                format!("{:?}", gap.kind),
                format!("{:.1} m", gap.distance_m),
                format!("{:?}", gap.resolution),
            ]);
        }
        println!("{gaps}");
    }

    for warning in &result.warnings {
        println!("warning: {}", serde_json::to_string(warning).unwrap_or_default());
    }

    println!(
        "total {} in {:.0} min across {} chunk(s), {} deadhead",
        result.totals.distance,
        result.totals.duration_s / 60.0,
        result.totals.chunk_count,
        result.totals.deadhead_distance,
    );
}
