use std::process::ExitCode;
use std::sync::Arc;

use axum::http::Method;
use landuse_server::api::{self, AppState};
use landuse_server::config::ServerConfig;
use landuse_server::data_sources::OverpassSource;
use landuse_server::fetcher;
use streaming::FetchCoordinator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let source = OverpassSource::new(config.overpass_url.clone(), config.http_timeout());
    let coordinator = FetchCoordinator::new(config.coordinator_config());
    let (handle, _driver) = fetcher::spawn(coordinator, Arc::new(source));

    // The start-up radius takes the same debounced path as user changes.
    if let Err(err) = handle.set_radius(config.site.initial_radius_km * 1000.0) {
        error!("{err}");
        return ExitCode::FAILURE;
    }

    let state = AppState::new(config.site.clone(), handle);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS]);

    let app = api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(l) => l,
        Err(err) => {
            error!("failed to bind {}: {err}", config.addr);
            return ExitCode::FAILURE;
        }
    };

    info!(
        site = %config.site.name,
        overpass = %config.overpass_url,
        "land-use server listening on http://{}",
        config.addr
    );
    if let Err(err) = axum::serve(listener, app).await {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
