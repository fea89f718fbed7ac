//! crates/tax_blog_core/src/pipeline.rs
//!
//! The generation pipeline: research, keywords, draft, metadata and the on-demand
//! image step. Each step is callable on its own; `run` chains them for one form
//! submission and records the result in the history.

use crate::domain::{
    AuthorProfile, Citation, GenerationRequest, GenerationStatus, HistoryItem, SearchResult,
    SeoMetadata, SiteProfile, TaxCategory, UploadedFile,
};
use crate::json_extract::extract_json;
use crate::ports::{
    ConnectivityProbe, ContentPart, ContentRequest, GenerativeModelService, HistoryRepository,
    ImageRequest, PortError, PortResult,
};
use crate::prompts::{self, DraftPrompt};
use crate::publishing::{
    author_box_html, build_seo_metadata, fallback_seo_metadata, strip_code_fences,
    DISCLAIMER_HTML,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const NO_SUMMARY_TEXT: &str = "No summary available.";
pub const EMPTY_DRAFT_TEXT: &str = "Failed to generate content.";
pub const OFFLINE_MESSAGE: &str =
    "No internet connection. AI generation requires an active network to reach the AI service.";
pub const DRAFT_FAILED_MESSAGE: &str = "Failed to generate blog content.";
const IMAGE_ASPECT_RATIO: &str = "16:9";

//=========================================================================================
// Configuration and Errors
//=========================================================================================

/// Model identifiers for each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub research: String,
    pub keywords: String,
    pub draft: String,
    /// Cheaper model used for the single retry when the draft step fails.
    pub draft_fallback: String,
    pub metadata: String,
    pub image: String,
    pub thinking_budget: u32,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            research: "gemini-2.5-flash".to_string(),
            keywords: "gemini-3-pro-preview".to_string(),
            draft: "gemini-3-pro-preview".to_string(),
            draft_fallback: "gemini-2.5-flash".to_string(),
            metadata: "gemini-2.5-flash".to_string(),
            image: "imagen-3.0-generate-001".to_string(),
            thinking_budget: 10240,
        }
    }
}

/// Terminal failures of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("connectivity unavailable")]
    Offline,
    /// Draft generation failed on both attempts; holds the fallback attempt's error.
    #[error("draft generation failed: {0}")]
    Draft(PortError),
}

impl PipelineError {
    /// The message shown to the person who submitted the form.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Offline => OFFLINE_MESSAGE,
            PipelineError::Draft(_) => DRAFT_FAILED_MESSAGE,
        }
    }
}

/// Inputs of the draft step.
#[derive(Debug, Clone)]
pub struct DraftInput {
    pub topic: String,
    pub category: TaxCategory,
    pub research: SearchResult,
    pub author: AuthorProfile,
    pub files: Vec<UploadedFile>,
    pub tone: String,
    pub word_count: String,
    pub keywords: Vec<String>,
}

/// Everything a successful run produced, plus the stored history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub research: SearchResult,
    pub keywords: Vec<String>,
    pub blog_content: String,
    pub seo_metadata: SeoMetadata,
    pub history_item: HistoryItem,
}

//=========================================================================================
// The Pipeline
//=========================================================================================

#[derive(Clone)]
pub struct ContentPipeline {
    model: Arc<dyn GenerativeModelService>,
    connectivity: Arc<dyn ConnectivityProbe>,
    history: Arc<dyn HistoryRepository>,
    models: ModelSelection,
    site: SiteProfile,
}

impl ContentPipeline {
    pub fn new(
        model: Arc<dyn GenerativeModelService>,
        connectivity: Arc<dyn ConnectivityProbe>,
        history: Arc<dyn HistoryRepository>,
        models: ModelSelection,
        site: SiteProfile,
    ) -> Self {
        Self {
            model,
            connectivity,
            history,
            models,
            site,
        }
    }

    pub fn models(&self) -> &ModelSelection {
        &self.models
    }

    pub fn history(&self) -> &Arc<dyn HistoryRepository> {
        &self.history
    }

    pub async fn is_online(&self) -> bool {
        self.connectivity.is_online().await
    }

    /// Search-grounded research. Degrades to an empty result on failure.
    pub async fn research(&self, topic: &str, category: TaxCategory) -> SearchResult {
        let request =
            ContentRequest::text(&self.models.research, prompts::research_prompt(topic, category))
                .with_search();

        match self.model.generate_content(request).await {
            Ok(response) => {
                let text = if response.text.trim().is_empty() {
                    NO_SUMMARY_TEXT.to_string()
                } else {
                    response.text
                };
                info!(citations = response.citations.len(), "Research step finished.");
                SearchResult {
                    text,
                    citations: response.citations,
                }
            }
            Err(e) => {
                warn!("Research step failed, continuing without research: {}", e);
                SearchResult::default()
            }
        }
    }

    /// SEO keywords as a list of strings. Degrades to an empty list.
    pub async fn keywords(&self, topic: &str) -> Vec<String> {
        let request = ContentRequest::text(&self.models.keywords, prompts::keywords_prompt(topic))
            .with_search();

        let response = match self.model.generate_content(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Keyword step failed, continuing without keywords: {}", e);
                return Vec::new();
            }
        };

        match extract_json(&response.text) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => {
                warn!("Keyword step returned no JSON array.");
                Vec::new()
            }
        }
    }

    fn draft_request(&self, input: &DraftInput, use_thinking: bool) -> ContentRequest {
        let prompt = prompts::draft_prompt(&DraftPrompt {
            topic: &input.topic,
            category: input.category,
            research: &input.research,
            tone: &input.tone,
            word_count: &input.word_count,
            keywords: &input.keywords,
        });

        let mut parts: Vec<ContentPart> = input
            .files
            .iter()
            .map(|file| ContentPart::InlineData {
                mime_type: file.mime_type.clone(),
                data: file.data.clone(),
            })
            .collect();
        parts.push(ContentPart::Text(prompt));

        let (model, thinking_budget) = if use_thinking {
            (self.models.draft.clone(), Some(self.models.thinking_budget))
        } else {
            (self.models.draft_fallback.clone(), None)
        };

        ContentRequest {
            model,
            parts,
            search_grounding: false,
            thinking_budget,
            response_format: Default::default(),
        }
    }

    /// Writes the HTML post. The primary attempt uses the thinking configuration;
    /// on any failure exactly one plain attempt with the fallback model follows.
    pub async fn draft(&self, input: &DraftInput) -> PortResult<String> {
        let text = match self
            .model
            .generate_content(self.draft_request(input, true))
            .await
        {
            Ok(response) => response.text,
            Err(primary) => {
                warn!(
                    "Thinking model failed, falling back to standard generation: {}",
                    primary
                );
                self.model
                    .generate_content(self.draft_request(input, false))
                    .await
                    .map_err(|e| {
                        error!("Fallback draft generation failed: {}", e);
                        e
                    })?
                    .text
            }
        };

        let body = strip_code_fences(&text);
        let body = if body.is_empty() {
            EMPTY_DRAFT_TEXT.to_string()
        } else {
            body
        };

        Ok(format!(
            "{}{}{}",
            body,
            author_box_html(&input.author),
            DISCLAIMER_HTML
        ))
    }

    /// SEO metadata with a programmatic schema graph. Degrades to topic defaults.
    pub async fn metadata(
        &self,
        topic: &str,
        blog_content: &str,
        author: &AuthorProfile,
        citations: &[Citation],
    ) -> SeoMetadata {
        let request = ContentRequest::text(
            &self.models.metadata,
            prompts::metadata_prompt(topic, blog_content),
        )
        .with_json_output();

        let response = match self.model.generate_content(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("SEO metadata step failed, using defaults: {}", e);
                return fallback_seo_metadata(topic);
            }
        };

        match extract_json(&response.text) {
            Some(parsed) if parsed.is_object() => {
                build_seo_metadata(topic, &parsed, author, citations, &self.site, Utc::now())
            }
            _ => {
                warn!("Failed to parse SEO JSON, using defaults.");
                fallback_seo_metadata(topic)
            }
        }
    }

    /// Generates one 16:9 image and returns it as a `data:` URL.
    pub async fn image(&self, prompt: &str) -> PortResult<String> {
        let request = ImageRequest {
            model: self.models.image.clone(),
            prompt: prompt.to_string(),
            aspect_ratio: IMAGE_ASPECT_RATIO.to_string(),
        };
        let image = self.model.generate_image(request).await.map_err(|e| {
            error!("Image generation error: {}", e);
            e
        })?;
        if image.data.is_empty() {
            return Err(PortError::Unexpected("No image generated.".to_string()));
        }
        Ok(image.data_url())
    }

    /// Runs every step for one form submission.
    ///
    /// `on_status` is told when the run moves to `Researching`, `Thinking` and
    /// `Complete`. Nothing is sent to the model service when offline.
    pub async fn run<F>(
        &self,
        request: &GenerationRequest,
        author: &AuthorProfile,
        on_status: F,
    ) -> Result<GenerationOutcome, PipelineError>
    where
        F: Fn(GenerationStatus, Option<&StepProgress>) + Send + Sync,
    {
        if !self.connectivity.is_online().await {
            warn!("Generation requested while offline.");
            return Err(PipelineError::Offline);
        }

        let topic = request.topic.trim();
        info!(topic, category = %request.category, "Generation started.");
        on_status(GenerationStatus::Researching, None);

        let research = self.research(topic, request.category).await;
        let keywords = self.keywords(topic).await;

        let progress = StepProgress {
            research: research.clone(),
            keywords: keywords.clone(),
        };
        on_status(GenerationStatus::Thinking, Some(&progress));

        let draft_input = DraftInput {
            topic: topic.to_string(),
            category: request.category,
            research: research.clone(),
            author: author.clone(),
            files: request.files.clone(),
            tone: request.tone.clone(),
            word_count: request.word_count.clone(),
            keywords: keywords.clone(),
        };
        let blog_content = self
            .draft(&draft_input)
            .await
            .map_err(PipelineError::Draft)?;

        let seo_metadata = self
            .metadata(topic, &blog_content, author, &research.citations)
            .await;

        let now = Utc::now();
        let history_item = HistoryItem {
            id: Uuid::new_v4().to_string(),
            date: now.timestamp_millis(),
            category: request.category,
            topic: topic.to_string(),
            author: author.clone(),
            research_data: research.clone(),
            blog_content: blog_content.clone(),
            seo_metadata: seo_metadata.clone(),
            keywords: keywords.clone(),
        };
        if let Err(e) = self.history.add(history_item.clone()).await {
            error!("Failed to save generation to history: {}", e);
        }

        let outcome = GenerationOutcome {
            research,
            keywords,
            blog_content,
            seo_metadata,
            history_item,
        };
        on_status(GenerationStatus::Complete, None);
        info!(id = %outcome.history_item.id, "Generation complete.");
        Ok(outcome)
    }
}

/// Partial results available once research and keywords are done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepProgress {
    pub research: SearchResult,
    pub keywords: Vec<String>,
}
