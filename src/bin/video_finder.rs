#![forbid(unsafe_code)]

//! HTTP server binary. Settings come from an env file, the process
//! environment and, last, the command line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use video_finder::{
    catalog::CatalogReader,
    config::{self, DEFAULT_ENV_FILE},
    web::{self, AppState},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Search the video catalog and play the matches.")]
struct Cli {
    #[arg(
        long = "env-file",
        value_name = "PATH",
        default_value = DEFAULT_ENV_FILE,
        help = "KEY=VALUE file read before the process environment"
    )]
    env_file: PathBuf,
    #[arg(
        long = "host",
        value_name = "HOST",
        help = "Override VIDEO_FINDER_HOST (IP address or host name)"
    )]
    host: Option<String>,
    #[arg(long = "port", value_name = "PORT", help = "Override VIDEO_FINDER_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut settings = config::load_settings(&cli.env_file).context("loading settings")?;
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }

    let catalog = CatalogReader::from_url(&settings.database_url);
    info!("catalog database: {}", catalog.db_path().display());
    let app = web::router(AppState::new(catalog));

    let addr = settings.socket_addr().await?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!("video finder listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running HTTP server")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", err);
    }
}
