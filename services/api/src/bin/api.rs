//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, FsStorageAdapter, HttpAnalysisAdapter, HttpExtractionAdapter,
        HttpIdentityAdapter, ServiceCredentials,
    },
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;
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
    info!(environment = %config.environment, "Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let storage = Arc::new(FsStorageAdapter::new(
        config.storage_root.clone(),
        config.storage_public_url.clone(),
    ));
    let credentials = ServiceCredentials {
        bearer_token: config.external_api_token.clone(),
        api_key: config.external_api_key.clone(),
    };
    let extractor = Arc::new(HttpExtractionAdapter::new(
        config.extraction_url.clone(),
        credentials.clone(),
        config.extraction_timeout,
    )?);
    let analyzer = Arc::new(HttpAnalysisAdapter::new(
        config.analysis_url.clone(),
        credentials,
        config.analysis_timeout,
    )?);
    let identity = Arc::new(HttpIdentityAdapter::new(
        &config.auth_url,
        config.auth_api_key.clone(),
    )?);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        db_adapter,
        storage,
        extractor,
        analyzer,
        identity,
    ));

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Stored objects are served read-only under the public storage prefix.
    let app = Router::new()
        .merge(web::router(app_state.clone()))
        .nest_service("/storage", ServeDir::new(&config.storage_root))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let aborted = app_state.drain_jobs(config.shutdown_grace).await;
    if aborted > 0 {
        tracing::warn!(aborted, "Background analyses were aborted and marked failed.");
    }
    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("Shutdown signal received.");
}
