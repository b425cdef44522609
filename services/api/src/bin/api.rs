//! services/api/src/bin/api.rs

use std::sync::Arc;
use sqlx::postgres::PgPoolOptions;
use support_chat_api::{
    adapters::{
        openai_client, DbAdapter, OpenAiAnswerAdapter, OpenAiClassifierAdapter, PineconeAdapter,
    },
    config::{Config, Environment},
    error::ApiError,
    web::{router, state::AppState},
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(environment = ?config.environment, "Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let llm_client = openai_client(
        &config.llm_api_base,
        &config.llm_api_key,
        config.provider_timeout,
    )?;
    let classifier_adapter = Arc::new(OpenAiClassifierAdapter::new(
        llm_client.clone(),
        config.llm_model.clone(),
        config.prompts.clone(),
        config.retry_policy,
    ));
    let answer_adapter = Arc::new(OpenAiAnswerAdapter::new(
        llm_client,
        config.llm_model.clone(),
        config.prompts.clone(),
        config.retry_policy,
    ));

    info!(index = %config.pinecone.index_name, "Connecting to Pinecone...");
    let retrieval_adapter = Arc::new(
        PineconeAdapter::connect(&config.pinecone, config.provider_timeout, config.retry_policy)
            .await?,
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        retrieval_adapter,
        classifier_adapter,
        answer_adapter,
    });

    // --- 5. Create the Web Router ---
    let app = router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    if config.environment != Environment::Production {
        info!(
            "Swagger UI available at http://{}/swagger-ui",
            config.bind_address
        );
    }
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received.");
}
