// Marbete Verifier - Web Server

use anyhow::{Context, Result};
use marbete_verifier::{
    init_tracing, open_database, router, AppState, ChromeFetcher, FetcherSettings, ServerConfig,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ServerConfig::from_env()?;
    info!("Marbete Verifier v{}", marbete_verifier::VERSION);

    let conn = open_database(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    info!("database ready: {:?}", config.database_path);

    let fetcher = ChromeFetcher::new(
        FetcherSettings::default().with_chrome_executable(config.chrome_executable.clone()),
    );
    let state = AppState::new(conn, Arc::new(fetcher));
    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("server running on http://{}", addr);
    info!("  POST /sat  GET /registros  POST /limpiar");

    axum::serve(listener, app)
        .await
        .context("Server stopped with an error")?;

    Ok(())
}
