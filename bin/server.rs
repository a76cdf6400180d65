// Expense Tracker - Web Server

use anyhow::{Context, Result};
use expense_tracker::api::{router, AppState};
use expense_tracker::{open_database, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    expense_tracker::init_tracing(&config.log_filter);

    tracing::info!("Expense tracker server v{}", expense_tracker::VERSION);

    // Store must be reachable before we accept requests
    let conn = open_database(&config.database_path)?;
    expense_tracker::check_store(&conn)?;
    tracing::info!(path = %config.database_path.display(), "Database opened");

    let addr = config.bind_addr.clone();
    let app = router(AppState::new(conn, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(%addr, "Server listening; health check at /api/health");

    axum::serve(listener, app)
        .await
        .context("Server stopped with an error")?;

    Ok(())
}
