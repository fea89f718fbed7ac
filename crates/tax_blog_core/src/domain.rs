//! crates/tax_blog_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Wire names are camelCase so a saved history list keeps the same shape
//! the browser client has always stored.

use serde::{Deserialize, Serialize};
use std::fmt;

//=========================================================================================
// Form Inputs
//=========================================================================================

/// The audience a post is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxCategory {
    Individual,
    Business,
}

impl TaxCategory {
    pub const ALL: [TaxCategory; 2] = [TaxCategory::Individual, TaxCategory::Business];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxCategory::Individual => "Individual",
            TaxCategory::Business => "Business",
        }
    }
}

impl fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The byline attached to every post (E-E-A-T signal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub name: String,
    pub credentials: String,
    pub bio: String,
}

impl AuthorProfile {
    /// The fixed author profile used for every generation.
    pub fn house_author() -> Self {
        Self {
            name: "ARUN KP".to_string(),
            credentials: "Entrepreneur | AI Content Generator | India-US Tax Professional | Accountant"
                .to_string(),
            bio: "With over 15 years of extensive experience in the accounting and taxation industry, \
                  Arun KP specializes in cross-border India-US taxation. As an Entrepreneur and AI \
                  Content Generator, he leverages cutting-edge technology to simplify complex \
                  financial landscapes for individuals and businesses."
                .to_string(),
        }
    }
}

/// A reference document attached to the form. `data` is base64 without a `data:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub data: String,
}

pub const TONE_OPTIONS: [&str; 5] = [
    "Expert Tax Advisor (Professional & Authoritative)",
    "Tax Journalist (Objective & News-focused)",
    "Friendly Tax Consultant (Approachable & Helpful)",
    "Strict CPA (Formal & Regulation-heavy)",
    "Financial Educator (Instructional & Clear)",
];

pub const WORD_COUNT_OPTIONS: [&str; 4] = [
    "Short Overview (500-800 words)",
    "Standard Blog Post (800-1200 words)",
    "Deep Dive / Guide (1500-2000 words)",
    "Comprehensive Whitepaper (2500+ words)",
];

pub fn default_tone() -> String {
    TONE_OPTIONS[0].to_string()
}

pub fn default_word_count() -> String {
    WORD_COUNT_OPTIONS[1].to_string()
}

/// Everything the form submits for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub category: TaxCategory,
    pub topic: String,
    #[serde(default)]
    pub files: Vec<UploadedFile>,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_word_count")]
    pub word_count: String,
}

//=========================================================================================
// Step Outputs
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub uri: String,
    pub source: String,
}

/// Research prose plus the web sources the model cited, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub text: String,
    pub citations: Vec<Citation>,
}

// The step outputs below are model-written JSON stored as-is, so any field may
// be missing in saved history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageIdea {
    pub description: String,
    pub prompt: String,
    pub alt_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialPosts {
    pub linkedin: String,
    pub twitter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedTopic {
    pub title: String,
    pub slug: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeoMetadata {
    pub meta_title: String,
    pub meta_description: String,
    pub slug: String,
    /// JSON-LD document, serialized.
    #[serde(rename = "schemaJSON")]
    pub schema_json: String,
    /// Open Graph / Twitter `<meta>` tags, one per line.
    pub social_meta_tags: String,
    pub image_ideas: Vec<ImageIdea>,
    pub social_posts: SocialPosts,
    pub related_topics: Vec<RelatedTopic>,
}

/// Snapshot of one complete generation. Never edited after it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    /// Creation time in epoch milliseconds.
    pub date: i64,
    pub category: TaxCategory,
    pub topic: String,
    pub author: AuthorProfile,
    pub research_data: SearchResult,
    pub blog_content: String,
    pub seo_metadata: SeoMetadata,
    pub keywords: Vec<String>,
}

//=========================================================================================
// Surface State
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Idle,
    Researching,
    Thinking,
    Complete,
    Error,
}

/// The state a client renders: progress, error, or the finished post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
    pub category: TaxCategory,
    pub topic: String,
    pub author: AuthorProfile,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_data: Option<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Names of the attached reference documents; payloads are never kept.
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_metadata: Option<SeoMetadata>,
}

impl Default for GenerationState {
    fn default() -> Self {
        Self {
            category: TaxCategory::Individual,
            topic: String::new(),
            author: AuthorProfile::house_author(),
            status: GenerationStatus::Idle,
            research_data: None,
            blog_content: None,
            error: None,
            files: Vec::new(),
            keywords: None,
            seo_metadata: None,
        }
    }
}

impl GenerationState {
    /// Fresh state for a run that is about to start researching.
    pub fn started(request: &GenerationRequest, author: AuthorProfile) -> Self {
        Self {
            category: request.category,
            topic: request.topic.clone(),
            author,
            status: GenerationStatus::Researching,
            files: request.files.iter().map(|f| f.name.clone()).collect(),
            ..Self::default()
        }
    }

    /// Rebuilds a completed state from a stored history entry.
    pub fn from_history(item: &HistoryItem) -> Self {
        Self {
            category: item.category,
            topic: item.topic.clone(),
            author: item.author.clone(),
            status: GenerationStatus::Complete,
            research_data: Some(item.research_data.clone()),
            blog_content: Some(item.blog_content.clone()),
            error: None,
            files: Vec::new(),
            keywords: Some(item.keywords.clone()),
            seo_metadata: Some(item.seo_metadata.clone()),
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(
            self.status,
            GenerationStatus::Researching | GenerationStatus::Thinking
        )
    }
}

/// The publisher brand used for permalinks and the schema graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub name: String,
    pub url: String,
    pub logo_url: String,
    pub default_image_url: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            name: "Our Tax Partner".to_string(),
            url: "https://ourtaxpartner.com".to_string(),
            logo_url: "https://peakbcs.com/assets/images/logo.jpg".to_string(),
            default_image_url: "https://ourtaxpartner.com/assets/default-tax.jpg".to_string(),
        }
    }
}

impl SiteProfile {
    pub fn permalink(&self, slug: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), slug)
    }
}
