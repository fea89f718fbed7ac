//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini REST API.
//! It implements the `GenerativeModelService` port from the `core` crate.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tax_blog_core::domain::Citation;
use tax_blog_core::ports::{
    ContentPart, ContentRequest, ContentResponse, GeneratedImage, GenerativeModelService,
    ImageRequest, PortError, PortResult, ResponseFormat,
};
use tracing::debug;

const SEARCH_SOURCE_LABEL: &str = "Google Search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerativeModelService` using the Gemini API.
#[derive(Clone)]
pub struct GeminiAdapter {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiAdapter {
    /// Creates a new `GeminiAdapter`. `base_url` is the API root including the version
    /// segment, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PortError::Unexpected(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post(&self, url: &str, body: &Value) -> PortResult<String> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(PortError::Upstream {
                status: status.as_u16(),
                message: upstream_error_message(&text),
            });
        }
        Ok(text)
    }
}

//=========================================================================================
// Wire Formats
//=========================================================================================

/// Builds the `generateContent` request body.
pub fn content_request_body(request: &ContentRequest) -> Value {
    let parts: Vec<Value> = request
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => json!({ "text": text }),
            ContentPart::InlineData { mime_type, data } => json!({
                "inlineData": { "mimeType": mime_type, "data": data }
            }),
        })
        .collect();

    let mut body = json!({
        "contents": [{ "role": "user", "parts": parts }]
    });

    if request.search_grounding {
        body["tools"] = json!([{ "googleSearch": {} }]);
    }

    let mut generation_config = serde_json::Map::new();
    if request.response_format == ResponseFormat::Json {
        generation_config.insert("responseMimeType".to_string(), json!("application/json"));
    }
    if let Some(budget) = request.thinking_budget {
        generation_config.insert(
            "thinkingConfig".to_string(),
            json!({ "thinkingBudget": budget }),
        );
    }
    if !generation_config.is_empty() {
        body["generationConfig"] = Value::Object(generation_config);
    }

    body
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    /// Set on reasoning summaries, which are not part of the answer.
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Extracts the answer text and web citations from a `generateContent` response.
pub fn parse_content_response(body: &str) -> PortResult<ContentResponse> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| PortError::Unexpected(format!("Failed to parse response JSON: {}", e)))?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Ok(ContentResponse::default());
    };

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let citations = candidate
        .grounding_metadata
        .map(|meta| {
            meta.grounding_chunks
                .into_iter()
                .filter_map(|chunk| {
                    let web = chunk.web?;
                    match (web.uri, web.title) {
                        (Some(uri), Some(title)) if !uri.is_empty() && !title.is_empty() => {
                            Some(Citation {
                                title,
                                uri,
                                source: SEARCH_SOURCE_LABEL.to_string(),
                            })
                        }
                        _ => None,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ContentResponse { text, citations })
}

pub fn image_request_body(request: &ImageRequest) -> Value {
    json!({
        "instances": [{ "prompt": request.prompt }],
        "parameters": { "sampleCount": 1, "aspectRatio": request.aspect_ratio }
    })
}

#[derive(Debug, Default, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

pub fn parse_image_response(body: &str) -> PortResult<GeneratedImage> {
    let parsed: PredictResponse = serde_json::from_str(body)
        .map_err(|e| PortError::Unexpected(format!("Failed to parse response JSON: {}", e)))?;

    parsed
        .predictions
        .into_iter()
        .find_map(|p| {
            let data = p.bytes_base64_encoded.filter(|d| !d.is_empty())?;
            Some(GeneratedImage {
                mime_type: p.mime_type.unwrap_or_else(|| "image/png".to_string()),
                data,
            })
        })
        .ok_or_else(|| PortError::Unexpected("No image generated.".to_string()))
}

/// Pulls `error.message` out of an error body, falling back to the raw text.
fn upstream_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

//=========================================================================================
// `GenerativeModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerativeModelService for GeminiAdapter {
    async fn generate_content(&self, request: ContentRequest) -> PortResult<ContentResponse> {
        debug!(
            model = %request.model,
            grounded = request.search_grounding,
            thinking = ?request.thinking_budget,
            "Calling generateContent"
        );
        let body = content_request_body(&request);
        let text = self
            .post(&self.endpoint(&request.model, "generateContent"), &body)
            .await?;
        parse_content_response(&text)
    }

    async fn generate_image(&self, request: ImageRequest) -> PortResult<GeneratedImage> {
        debug!(model = %request.model, "Calling predict");
        let body = image_request_body(&request);
        let text = self
            .post(&self.endpoint(&request.model, "predict"), &body)
            .await?;
        parse_image_response(&text)
    }
}
