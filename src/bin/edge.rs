//! Stateless edge adapter.
//!
//! Mirrors the single-invocation hosting model: no configuration is read at
//! startup, the private key comes from `APP_PRIVATE_KEY` only, and every
//! request resolves its own context, so a missing variable is a per-request
//! 500 instead of a crashed process. CORS is any-origin, as the edge variant
//! has no allow-list of its own.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use github_app_relay::routes;
use github_app_relay::AppState;

#[derive(Parser, Debug)]
#[command(name = "relay-edge")]
#[command(about = "GitHub App backend relay (stateless edge adapter)")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8787)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .json()
        .init();

    let args = Args::parse();

    let cors = routes::cors_layer(None)?;
    let app = routes::router(AppState::per_request(), cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("relay edge adapter listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
