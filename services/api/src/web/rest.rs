//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{self, LoginRequest, LoginResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tax_blog_core::domain::{TONE_OPTIONS, WORD_COUNT_OPTIONS};
use tax_blog_core::pipeline::DRAFT_FAILED_MESSAGE;
use tax_blog_core::{
    AuthorProfile, GenerationRequest, GenerationState, GenerationStatus, HistoryItem,
    PipelineError, PortError, TaxCategory,
};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::logout_handler,
        status_handler,
        form_options_handler,
        create_generation_handler,
        current_generation_handler,
        generate_image_handler,
        list_history_handler,
        get_history_handler,
        delete_history_handler,
        load_history_handler,
    ),
    components(
        schemas(LoginRequest, LoginResponse, StatusResponse, ImagePromptRequest, ImageResponse)
    ),
    tags(
        (name = "Tax Blog Studio API", description = "Research, draft and publish compliant US tax articles.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Whether the AI service is reachable right now.
#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub online: bool,
}

/// The choices the form offers.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormOptions {
    pub categories: Vec<TaxCategory>,
    pub tones: Vec<&'static str>,
    pub word_counts: Vec<&'static str>,
    pub author: AuthorProfile,
}

#[derive(Deserialize, ToSchema)]
pub struct ImagePromptRequest {
    pub prompt: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub data_url: String,
}

fn port_error_status(e: &PortError) -> StatusCode {
    match e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        PortError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

//=========================================================================================
// Status and Form
//=========================================================================================

/// Report whether AI generation can reach the network.
#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Connectivity status", body = StatusResponse))
)]
pub async fn status_handler(State(app_state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        online: app_state.pipeline.is_online().await,
    })
}

/// List the categories, tones and target lengths the form accepts.
#[utoipa::path(
    get,
    path = "/form-options",
    responses((status = 200, description = "Form choices and the active author profile"))
)]
pub async fn form_options_handler(State(app_state): State<Arc<AppState>>) -> Json<FormOptions> {
    Json(FormOptions {
        categories: TaxCategory::ALL.to_vec(),
        tones: TONE_OPTIONS.to_vec(),
        word_counts: WORD_COUNT_OPTIONS.to_vec(),
        author: app_state.author.clone(),
    })
}

//=========================================================================================
// Generation
//=========================================================================================

/// Run the full research, keywords, draft and metadata pipeline for one topic.
///
/// Only one run may be in flight at a time and it runs to completion even when
/// the client goes away. The response carries the final generation state;
/// progress can be polled from `/generations/current`.
#[utoipa::path(
    post,
    path = "/generations",
    request_body(content_type = "application/json", description = "category, topic, files, tone and wordCount."),
    responses(
        (status = 200, description = "Generation complete"),
        (status = 400, description = "Topic is empty"),
        (status = 409, description = "A generation is already running"),
        (status = 502, description = "Draft generation failed"),
        (status = 503, description = "No network connection")
    )
)]
pub async fn create_generation_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<GenerationRequest>,
) -> Result<(StatusCode, Json<GenerationState>), (StatusCode, String)> {
    if request.topic.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Topic is required".to_string()));
    }

    let Some(processing) = app_state.begin_processing() else {
        return Err((
            StatusCode::CONFLICT,
            "A generation is already in progress".to_string(),
        ));
    };

    // The run owns the processing guard and keeps going if the client disconnects.
    let run = tokio::spawn(async move {
        let outcome = run_generation(processing.state(), &request).await;
        drop(processing);
        outcome
    });

    match run.await {
        Ok((code, state)) => Ok((code, Json(state))),
        Err(e) => {
            error!("Generation task failed: {}", e);
            app_state.update_generation(|state| {
                state.status = GenerationStatus::Error;
                state.error = Some(DRAFT_FAILED_MESSAGE.to_string());
            });
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                DRAFT_FAILED_MESSAGE.to_string(),
            ))
        }
    }
}

/// Runs the pipeline for one request and records every transition in the shared state.
async fn run_generation(
    app_state: &AppState,
    request: &GenerationRequest,
) -> (StatusCode, GenerationState) {
    let author = app_state.author.clone();
    let result = app_state
        .pipeline
        .run(request, &author, |status, progress| {
            app_state.update_generation(|state| match status {
                GenerationStatus::Researching => {
                    *state = GenerationState::started(request, author.clone());
                }
                GenerationStatus::Thinking => {
                    state.status = GenerationStatus::Thinking;
                    if let Some(progress) = progress {
                        state.research_data = Some(progress.research.clone());
                        state.keywords = Some(progress.keywords.clone());
                    }
                }
                other => state.status = other,
            })
        })
        .await;

    let code = match result {
        Ok(outcome) => {
            app_state.update_generation(|state| {
                state.status = GenerationStatus::Complete;
                state.research_data = Some(outcome.research);
                state.keywords = Some(outcome.keywords);
                state.blog_content = Some(outcome.blog_content);
                state.seo_metadata = Some(outcome.seo_metadata);
                state.error = None;
            });
            StatusCode::OK
        }
        Err(e) => {
            let code = match e {
                PipelineError::Offline => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::Draft(ref cause) => {
                    error!("Generation failed: {}", cause);
                    StatusCode::BAD_GATEWAY
                }
            };
            app_state.update_generation(|state| {
                state.status = GenerationStatus::Error;
                state.error = Some(e.user_message().to_string());
            });
            code
        }
    };
    (code, app_state.current_generation())
}

/// The state of the current (or most recent) generation.
#[utoipa::path(
    get,
    path = "/generations/current",
    responses((status = 200, description = "Current generation state"))
)]
pub async fn current_generation_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<GenerationState> {
    Json(app_state.current_generation())
}

/// Generate a 16:9 illustration for one of the suggested image prompts.
#[utoipa::path(
    post,
    path = "/images",
    request_body = ImagePromptRequest,
    responses(
        (status = 200, description = "Image generated", body = ImageResponse),
        (status = 400, description = "Prompt is empty"),
        (status = 501, description = "Provider cannot generate images"),
        (status = 502, description = "Image generation failed")
    )
)]
pub async fn generate_image_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<ImagePromptRequest>,
) -> Result<Json<ImageResponse>, (StatusCode, String)> {
    if req.prompt.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Prompt is required".to_string()));
    }

    match app_state.pipeline.image(&req.prompt).await {
        Ok(data_url) => Ok(Json(ImageResponse { data_url })),
        Err(PortError::Unsupported(message)) => Err((StatusCode::NOT_IMPLEMENTED, message)),
        Err(_) => Err((
            StatusCode::BAD_GATEWAY,
            "Failed to generate image.".to_string(),
        )),
    }
}

//=========================================================================================
// History
//=========================================================================================

/// All saved generations, newest first.
#[utoipa::path(
    get,
    path = "/history",
    responses((status = 200, description = "Saved generations"))
)]
pub async fn list_history_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<HistoryItem>>, (StatusCode, String)> {
    app_state.history().list().await.map(Json).map_err(|e| {
        error!("Failed to list history: {:?}", e);
        (port_error_status(&e), "Failed to list history".to_string())
    })
}

#[utoipa::path(
    get,
    path = "/history/{id}",
    params(("id" = String, Path, description = "History entry id")),
    responses(
        (status = 200, description = "The saved generation"),
        (status = 404, description = "No such entry")
    )
)]
pub async fn get_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HistoryItem>, (StatusCode, String)> {
    app_state
        .history()
        .get(&id)
        .await
        .map(Json)
        .map_err(|e| (port_error_status(&e), e.to_string()))
}

#[utoipa::path(
    delete,
    path = "/history/{id}",
    params(("id" = String, Path, description = "History entry id")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "No such entry")
    )
)]
pub async fn delete_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state.history().delete(&id).await.map_err(|e| {
        error!("Failed to delete history item {}: {:?}", id, e);
        (port_error_status(&e), e.to_string())
    })?;
    info!("Deleted history item {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Make a saved generation the current state again.
#[utoipa::path(
    post,
    path = "/history/{id}/load",
    params(("id" = String, Path, description = "History entry id")),
    responses(
        (status = 200, description = "Entry loaded as the current generation"),
        (status = 404, description = "No such entry"),
        (status = 409, description = "A generation is already running")
    )
)]
pub async fn load_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GenerationState>, (StatusCode, String)> {
    if app_state.is_processing() {
        return Err((
            StatusCode::CONFLICT,
            "A generation is already in progress".to_string(),
        ));
    }

    let item = app_state
        .history()
        .get(&id)
        .await
        .map_err(|e| (port_error_status(&e), e.to_string()))?;

    let loaded = GenerationState::from_history(&item);
    app_state.update_generation(|state| *state = loaded.clone());
    Ok(Json(loaded))
}
