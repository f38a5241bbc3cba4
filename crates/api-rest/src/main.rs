//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, backed by the demo accounts or the upstream API as
//! `EMR_BACKEND` selects.
//!
//! ## Intended use
//! Development and debugging. The workspace's main `emr-run` binary starts the same router.

use api_rest::{router, AppState};
use emr_core::{CoreConfig, EnvValues};
use std::sync::Arc;
use terminology::ConceptTables;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the EMR REST API server.
///
/// # Environment Variables
/// - `EMR_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `EMR_TERMINOLOGY_PATH`: YAML tables to load instead of the embedded set
/// - `EMR_BACKEND`, `EMR_API_BASE_URL`, `EMR_API_TOKEN`: backend selection (see `AppState::from_config`)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration or the concept tables are invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_env_values(EnvValues::from_process_env())?;
    let tables = Arc::new(ConceptTables::load_or_embedded(cfg.terminology_path())?);
    tracing::info!(
        concepts = tables.concepts().len(),
        mappings = tables.mappings().len(),
        "concept tables loaded"
    );

    let addr = cfg.rest_addr();
    let app = router(AppState::from_config(&cfg, tables)?);

    tracing::info!("-- Starting EMR REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
