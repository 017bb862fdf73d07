use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use karte_generate::HttpCompletionClient;
use karte_server::config::ServerArgs;
use karte_server::{router, AppState, FLOWCHART_PATH};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("karte_server=info,karte_generate=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    let args = ServerArgs::parse();
    let settings = args.generator_settings();
    if settings.api_key().is_none() {
        warn!("GEMINI_API_KEY is not set; flowchart requests will fail until it is configured");
    }
    info!(?settings, "generator settings loaded");

    let client = HttpCompletionClient::new(args.upstream_timeout())?;
    let app = router(AppState::new(settings, Arc::new(client)));

    let addr = args.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{}{}", addr, FLOWCHART_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
