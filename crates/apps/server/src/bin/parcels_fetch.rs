use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use compute::Statistics;
use foundation::point::GeoPoint;
use landuse_server::config::{DEFAULT_OVERPASS_URL, SiteConfig};
use landuse_server::data_sources::{FileSource, OverpassSource};
use layers::export::to_geojson;
use layers::ParcelStyle;
use streaming::{
    Completion, CoordinatorConfig, FetchCoordinator, SpatialSource, DEFAULT_QUERY_TIMEOUT_S,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch land-use parcels around a site and allocate fertilizer")]
struct Args {
    /// Search radius in kilometres
    #[arg(long, default_value_t = 5.0)]
    radius_km: f64,

    /// Centre latitude (defaults to the configured site)
    #[arg(long)]
    lat: Option<f64>,

    /// Centre longitude (defaults to the configured site)
    #[arg(long)]
    lon: Option<f64>,

    /// Raw material volume in litres (defaults to the configured site)
    #[arg(long)]
    raw_input_l: Option<f64>,

    /// Fertilizer yield per litre of raw material
    #[arg(long)]
    conversion_ratio: Option<f64>,

    /// Fertilizer requirement in kg per hectare
    #[arg(long)]
    kg_per_ha: Option<f64>,

    /// Overpass interpreter endpoint
    #[arg(long, default_value = DEFAULT_OVERPASS_URL)]
    overpass_url: String,

    /// Server-side query timeout in seconds
    #[arg(long, default_value_t = DEFAULT_QUERY_TIMEOUT_S)]
    timeout_s: u32,

    /// Replay a saved Overpass JSON response instead of querying the network
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write the allocated parcels as GeoJSON
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the generated query and exit
    #[arg(long)]
    print_query: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// The default site with any command-line overrides applied.
fn site_from(args: &Args) -> SiteConfig {
    let defaults = SiteConfig::default();
    SiteConfig {
        center: GeoPoint::new(
            args.lat.unwrap_or(defaults.center.lat()),
            args.lon.unwrap_or(defaults.center.lon()),
        ),
        raw_input_l: args.raw_input_l.unwrap_or(defaults.raw_input_l),
        conversion_ratio: args.conversion_ratio.unwrap_or(defaults.conversion_ratio),
        required_kg_per_ha: args.kg_per_ha.unwrap_or(defaults.required_kg_per_ha),
        ..defaults
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let site = site_from(&args);
    let center = site.center;

    let config = CoordinatorConfig {
        debounce: Duration::ZERO,
        query_timeout_s: args.timeout_s,
        ..CoordinatorConfig::new(center, site.total_quantity())
    };
    let mut coordinator = FetchCoordinator::new(config);

    let now = Instant::now();
    coordinator.radius_changed(args.radius_km * 1000.0, now)?;
    let Some(dispatch) = coordinator.poll(now) else {
        return Err("query could not be built".into());
    };

    if args.print_query {
        print!("{}", dispatch.text);
        return Ok(());
    }

    let source: Box<dyn SpatialSource> = match &args.input {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(OverpassSource::new(
            args.overpass_url.clone(),
            Duration::from_secs(u64::from(args.timeout_s) + 5),
        )),
    };
    info!(source = source.name(), radius_km = args.radius_km, "fetching parcels");

    let result = source.fetch(&dispatch.text).await;
    let collection = match coordinator.complete(dispatch.request, result) {
        Completion::Published(c) => c,
        Completion::Failed(e) => return Err(e.into()),
        Completion::Stale { .. } => return Err("result was superseded".into()),
    };

    let summary = Statistics::summarize(
        collection.iter(),
        site.total_quantity().value(),
        site.required_kg_per_ha,
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(out) = &args.out {
        let geojson = to_geojson(collection.iter(), |f| ParcelStyle::for_category(f.category()));
        tokio::fs::write(out, serde_json::to_vec_pretty(&geojson)?).await?;
        info!(path = %out.display(), features = collection.len(), "wrote GeoJSON");
    }
    Ok(())
}
