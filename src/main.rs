use names_api::{create_router, db, AppState, Config, ConnectionProvider};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Starting names-api");

    let cfg = Config::from_env();
    info!(database = ?cfg.database, mode = ?cfg.mode, "Configuration loaded");
    // Not fatal: requests needing the database report the problem until it is fixed.
    for problem in &cfg.problems {
        error!(%problem, "configuration problem; database requests will fail");
    }

    let provider = ConnectionProvider::from_config(&cfg);

    if provider.is_ready() {
        if let Err(e) = db::init_schema(&provider).await {
            warn!(error = %e, "schema initialisation failed; continuing without it");
        }
    }

    let router = create_router(AppState::new(provider));
    let addr = cfg.bind_address();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    info!("API server listening on {}", addr);

    let serve = axum::serve(listener, router);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    if let Err(e) = serve.with_graceful_shutdown(shutdown).await {
        error!(error = %e, "API server error");
    }

    info!("Application shutdown complete");
    Ok(())
}
