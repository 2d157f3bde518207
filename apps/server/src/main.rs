use anyhow::Context;
use clap::Parser;
use coursedeck_api::{build_router, AppState};
use coursedeck_runtime::{shutdown_signal, telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "coursedeck-server", about = "CourseDeck backend server")]
struct Args {
    /// Listen address override, e.g. 0.0.0.0
    #[arg(long)]
    address: Option<String>,

    /// Listen port override
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing()?;

    let args = Args::parse();

    info!("starting CourseDeck backend");

    let mut config = coursedeck_config::load().context("failed to load configuration")?;
    if let Some(address) = args.address {
        config.http.address = address;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = AppState::new(
        services.db_pool.clone(),
        services.authenticator.clone(),
        config.storage.clone(),
    );
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}
