//! Persistent relay server.
//!
//! Configuration is read and validated once at startup; a missing App id or
//! key is fatal with a remediation hint. The private key may be loaded from
//! `APP_PRIVATE_KEY` or from the file named by `APP_PRIVATE_KEY_PATH`.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use github_app_relay::routes;
use github_app_relay::{AppState, Config, RelayContext};

#[derive(Parser, Debug)]
#[command(name = "relay-server")]
#[command(about = "GitHub App backend relay (persistent server)")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .json()
        .init();

    let args = Args::parse();
    let config = load_config_or_exit();

    if !config.oauth_configured() {
        warn!(
            "OAUTH_CLIENT_ID / OAUTH_CLIENT_SECRET are not set; \
             /oauth/client-id and /oauth/exchange will report a configuration error"
        );
    }

    let cors = match routes::cors_layer(config.allowed_origins.as_deref()) {
        Ok(cors) => cors,
        Err(err) => fatal(&err.to_string(), "fix ALLOWED_ORIGINS and restart"),
    };

    let context = match RelayContext::new(config) {
        Ok(context) => context,
        Err(err) => fatal(
            &err.to_string(),
            "the key must be an RSA private key in PKCS#1 or PKCS#8 PEM encoding",
        ),
    };

    let app = routes::router(AppState::startup(context), cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("relay server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn load_config_or_exit() -> Config {
    match Config::from_env() {
        Ok(config) => config,
        Err(err) => fatal(
            &err.to_string(),
            "set APP_ID and APP_PRIVATE_KEY (or APP_PRIVATE_KEY_PATH) before starting, \
             e.g. export APP_ID=2587071",
        ),
    }
}

fn fatal(message: &str, hint: &str) -> ! {
    error!("{message}");
    error!("{hint}");
    std::process::exit(1);
}
