//! services/api/src/adapters/openai.rs
//!
//! This module contains the adapter for OpenAI's Responses API.
//! It implements the `GenerativeModelService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::responses::{
        CreateResponseArgs, ResponseTextParam, TextResponseFormatConfiguration, Tool,
        WebSearchTool,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use tax_blog_core::domain::Citation;
use tax_blog_core::ports::{
    ContentPart, ContentRequest, ContentResponse, GeneratedImage, GenerativeModelService,
    ImageRequest, PortError, PortResult, ResponseFormat,
};
use tracing::{debug, warn};

const SEARCH_SOURCE_LABEL: &str = "Web Search";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerativeModelService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAdapter {
    client: Client<OpenAIConfig>,
}

impl OpenAiAdapter {
    /// Creates a new `OpenAiAdapter`.
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }
}

fn is_textual(mime_type: &str) -> bool {
    mime_type.starts_with("text/")
        || matches!(mime_type, "application/json" | "application/xml")
}

/// Flattens the request into a single text input. Text attachments are decoded and
/// inlined ahead of the prompt; binary attachments cannot be sent and are skipped.
pub fn responses_input(request: &ContentRequest) -> String {
    let mut sections = Vec::new();
    for part in &request.parts {
        match part {
            ContentPart::Text(text) => sections.push(text.clone()),
            ContentPart::InlineData { mime_type, data } if is_textual(mime_type) => {
                match STANDARD
                    .decode(data)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
                {
                    Some(text) => {
                        sections.push(format!("ATTACHED DOCUMENT ({}):\n{}", mime_type, text))
                    }
                    None => warn!("Skipping attachment that is not valid base64 UTF-8 text."),
                }
            }
            ContentPart::InlineData { mime_type, .. } => {
                warn!("Skipping binary attachment of type {}.", mime_type);
            }
        }
    }
    sections.join("\n\n")
}

/// JSON mode for steps that expect a JSON object back; `None` keeps the default text output.
pub fn text_format(format: ResponseFormat) -> Option<ResponseTextParam> {
    match format {
        ResponseFormat::Text => None,
        ResponseFormat::Json => Some(ResponseTextParam {
            format: TextResponseFormatConfiguration::JsonObject,
            verbosity: None,
        }),
    }
}

/// Collects `url_citation` annotations from a serialized Responses API output.
pub fn url_citations(response: &Value) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();
    let items = response["output"].as_array().cloned().unwrap_or_default();
    for item in &items {
        let Some(contents) = item["content"].as_array() else {
            continue;
        };
        for content in contents {
            let Some(annotations) = content["annotations"].as_array() else {
                continue;
            };
            for annotation in annotations {
                if annotation["type"] != "url_citation" {
                    continue;
                }
                let (Some(uri), Some(title)) =
                    (annotation["url"].as_str(), annotation["title"].as_str())
                else {
                    continue;
                };
                if citations.iter().any(|c| c.uri == uri) {
                    continue;
                }
                citations.push(Citation {
                    title: title.to_string(),
                    uri: uri.to_string(),
                    source: SEARCH_SOURCE_LABEL.to_string(),
                });
            }
        }
    }
    citations
}

//=========================================================================================
// `GenerativeModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerativeModelService for OpenAiAdapter {
    async fn generate_content(&self, request: ContentRequest) -> PortResult<ContentResponse> {
        if request.thinking_budget.is_some() {
            debug!("Thinking budget is managed by the model on this provider; ignoring.");
        }

        let mut args = CreateResponseArgs::default();
        args.model(&request.model).input(responses_input(&request));
        if request.search_grounding {
            args.tools(vec![Tool::WebSearch(WebSearchTool::default())]);
        }
        if let Some(text) = text_format(request.response_format) {
            args.text(text);
        }
        let built = args
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .responses()
            .create(built)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let citations = serde_json::to_value(&response)
            .map(|value| url_citations(&value))
            .unwrap_or_default();
        let text = response.output_text().unwrap_or_default();

        Ok(ContentResponse { text, citations })
    }

    async fn generate_image(&self, _request: ImageRequest) -> PortResult<GeneratedImage> {
        Err(PortError::Unsupported(
            "image generation is only available with the gemini provider".to_string(),
        ))
    }
}
