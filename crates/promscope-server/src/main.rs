//! promscope server
//!
//! - Config: `PROMSCOPE_CONFIG` (default `promscope.yaml`)
//! - Scrape endpoint on `server.scrape_path`
//! - Ctrl-C: mark draining (`/readyz` -> 503), then shut down gracefully

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use promscope_server::{app_state::AppState, config, router};

const CONFIG_ENV: &str = "PROMSCOPE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "promscope.yaml";

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "promscope-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.server.listen.parse()?;
    let scrape_path = cfg.server.scrape_path.clone();

    let state = AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, %scrape_path, config = %path, "promscope-server starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    state.set_draining();
    tracing::info!("shutdown requested, draining");
}
