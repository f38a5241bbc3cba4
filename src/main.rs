use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use emr_core::{CoreConfig, EnvValues};
use terminology::ConceptTables;

/// Main entry point for the EMR terminology service
///
/// Loads configuration and the concept tables once, then serves the REST API (with Swagger UI at
/// `/swagger-ui/`) until Ctrl-C.
///
/// # Environment Variables
/// - `EMR_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `EMR_BACKEND`: `demo` (default) or `http`
/// - `EMR_API_BASE_URL`: upstream API used by the `http` backend
/// - `EMR_API_TOKEN`: service token for the upstream patient and doctor gateways
/// - `EMR_HTTP_TIMEOUT_SECS`: outbound request timeout (default: 10)
/// - `EMR_TERMINOLOGY_PATH`: YAML tables to load instead of the embedded set
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, table loading or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("emr_run=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_env_values(EnvValues::from_process_env())?;
    let tables = Arc::new(ConceptTables::load_or_embedded(cfg.terminology_path())?);
    tracing::info!(
        concepts = tables.concepts().len(),
        targets = tables.targets().len(),
        mappings = tables.mappings().len(),
        source = %cfg
            .terminology_path()
            .map_or_else(|| "embedded".to_string(), |p| p.display().to_string()),
        "concept tables loaded"
    );

    let rest_addr = cfg.rest_addr();
    let app = router(AppState::from_config(&cfg, tables)?);

    tracing::info!("-- Starting EMR REST API on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- EMR REST API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
