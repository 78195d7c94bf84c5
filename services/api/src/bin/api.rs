//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, pinecone::{PineconeAssistantAdapter, PineconeConfig}},
    config::Config,
    error::ApiError,
    web::{rest::ApiDoc, router, state::AppState},
};
use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use study_assistant_core::{
    prompts, AssistantManager, AssistantSettings, DocumentSession, StudyOrchestrator,
    UploadCoordinator, UploadSettings,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Remote Assistant ---
    let pinecone = Arc::new(PineconeAssistantAdapter::new(PineconeConfig::from_app_config(
        &config,
    ))?);
    let assistant = Arc::new(AssistantManager::new(
        pinecone,
        AssistantSettings {
            name: config.assistant_name.clone(),
            instructions: prompts::ASSISTANT_INSTRUCTIONS.to_string(),
            ready_timeout: config.assistant_ready_timeout,
            poll_interval: config.poll_interval,
        },
    ));

    // --- 4. Build the Study Services ---
    let shutdown = CancellationToken::new();
    let uploads = Arc::new(UploadCoordinator::new(
        assistant.clone(),
        UploadSettings {
            upload_dir: config.upload_dir.clone(),
            ingest_timeout: config.ingest_timeout,
        },
        shutdown.clone(),
    ));
    let study = Arc::new(StudyOrchestrator::new(
        assistant,
        uploads,
        Arc::new(DocumentSession::new()),
    ));

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        study,
    });

    // --- 6. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped.");
    Ok(())
}

/// Resolves on Ctrl-C and cancels any ingest that is still waiting on the remote side.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested.");
    shutdown.cancel();
}
