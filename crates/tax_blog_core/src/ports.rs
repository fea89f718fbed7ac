//! crates/tax_blog_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the hosted AI service, the history storage and the network probe.

use crate::domain::{Citation, HistoryItem};
use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, filesystem).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Operation not supported: {0}")]
    Unsupported(String),
    #[error("Upstream service returned {status}: {message}")]
    Upstream { status: u16, message: String },
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Generative Model Requests
//=========================================================================================

/// One piece of prompt content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Binary attachment, base64 encoded.
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// A single text-generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub model: String,
    pub parts: Vec<ContentPart>,
    /// Ground the answer with live web search results.
    pub search_grounding: bool,
    /// Token budget for the model's reasoning phase, when supported.
    pub thinking_budget: Option<u32>,
    pub response_format: ResponseFormat,
}

impl ContentRequest {
    /// A plain text prompt with no tools and no special configuration.
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            parts: vec![ContentPart::Text(prompt.into())],
            search_grounding: false,
            thinking_budget: None,
            response_format: ResponseFormat::Text,
        }
    }

    pub fn with_search(mut self) -> Self {
        self.search_grounding = true;
        self
    }

    pub fn with_json_output(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    /// Concatenated text parts, for adapters that cannot send binary parts.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentResponse {
    pub text: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    /// Image bytes, base64 encoded.
    pub data: String,
}

impl GeneratedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait GenerativeModelService: Send + Sync {
    /// Generates text (optionally grounded) for the given request.
    async fn generate_content(&self, request: ContentRequest) -> PortResult<ContentResponse>;

    /// Generates a single image for a prompt.
    async fn generate_image(&self, request: ImageRequest) -> PortResult<GeneratedImage>;
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// All stored generations, newest first.
    async fn list(&self) -> PortResult<Vec<HistoryItem>>;

    async fn get(&self, id: &str) -> PortResult<HistoryItem>;

    /// Stores a new generation at the front of the list.
    async fn add(&self, item: HistoryItem) -> PortResult<()>;

    /// Removes exactly the entry with `id`, keeping the others in order.
    async fn delete(&self, id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}
