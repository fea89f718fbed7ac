//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{GeminiAdapter, JsonFileHistoryStore, OpenAiAdapter, TcpConnectivityProbe},
    config::{AiProvider, Config},
    error::ApiError,
    web::{self, auth::AccessGate, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tax_blog_core::{ContentPipeline, GenerativeModelService};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    if config.access_code_is_placeholder {
        warn!("ACCESS_CODE is not set; the portal is using the default access code.");
    }
    if config.api_key_is_placeholder() {
        warn!(
            "No API key is set for the {:?} provider; AI calls will fail until one is configured.",
            config.provider
        );
    }

    // --- 2. Initialize Service Adapters ---
    let model: Arc<dyn GenerativeModelService> = match config.provider {
        AiProvider::Gemini => {
            info!("Using Gemini at {}", config.gemini_base_url);
            Arc::new(GeminiAdapter::new(
                config.gemini_base_url.clone(),
                config.gemini_api_key.clone(),
            )?)
        }
        AiProvider::OpenAi => {
            info!("Using OpenAI; image generation is unavailable.");
            let openai_config = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());
            Arc::new(OpenAiAdapter::new(Client::with_config(openai_config)))
        }
    };

    info!("Loading history from {}", config.history_path.display());
    let history = Arc::new(JsonFileHistoryStore::open(config.history_path.clone()).await);
    let connectivity = Arc::new(TcpConnectivityProbe::new(
        config.connectivity_probe_addr.clone(),
        CONNECTIVITY_TIMEOUT,
    ));

    // --- 3. Build the Shared AppState ---
    let pipeline = ContentPipeline::new(
        model,
        connectivity,
        history,
        config.models.clone(),
        config.site.clone(),
    );
    let app_state = Arc::new(AppState::new(
        pipeline,
        AccessGate::new(config.access_code.clone()),
    ));

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
