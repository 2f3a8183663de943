//! Burnscope - Wildfire burn-severity mapping and GOES fire timelapses.
//!
//! # API Endpoints
//!
//! - `POST /severity` - Run a burn-severity analysis
//! - `POST /timelapse` - Render a GOES fire timelapse for a session
//! - `GET /timelapse/current` - Download the session's animation
//! - `DELETE /timelapse/current` - Release the session's animation
//! - `GET /runs/recent` - Run history
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use burnscope::api::{AppState, router};
use burnscope::catalog::EarthEngineClient;
use burnscope::config::Config;
use burnscope::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("burnscope=info".parse()?))
        .init();

    let config = Config::from_env()?;

    info!(
        port = config.port,
        db_url = %config.database_url,
        project = %config.earth_engine.project,
        service_account = config.earth_engine.service_account.as_deref().unwrap_or("-"),
        "Starting Burnscope server"
    );

    let storage = Storage::new(&config.database_url).await?;
    info!("Database initialized");

    let ee = &config.earth_engine;
    let client = Arc::new(match &ee.base_url {
        Some(url) => EarthEngineClient::with_base_url(url, &ee.project, &ee.access_token),
        None => EarthEngineClient::new(&ee.project, &ee.access_token),
    });

    info!(
        max_cloud_pct = config.defaults.max_cloud_pct,
        band_a = %config.defaults.bands.a,
        band_b = %config.defaults.bands.b,
        "Analysis defaults"
    );

    let state = AppState::new(storage, client.clone(), client, config.defaults.clone());
    let app = router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Burnscope is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
