use leadflow_api::config::Config;
use leadflow_api::db::Database;
use leadflow_api::handlers::AppState;
use leadflow_api::{api, obs, rescoring};
use std::sync::Arc;
use std::time::Duration;

/// Main entry point for the application.
///
/// Initializes tracing, configuration, the database pool (running pending
/// migrations), shared state and the optional scheduled rescoring pass, then
/// starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    obs::init_tracing();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database connection pool established, migrations applied");

    let app_state = Arc::new(AppState::new(db.pool.clone(), config.clone()));
    if !config.simulated_signals {
        tracing::info!("Behavioural scoring signals pinned to false");
    }

    if let Some(secs) = config.rescore_interval_secs {
        rescoring::spawn_scheduled(
            db.pool.clone(),
            app_state.scorer.clone(),
            Duration::from_secs(secs),
        );
    }

    let app = api::router(app_state)?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
