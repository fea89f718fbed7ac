//! crates/tax_blog_core/src/prompts.rs
//!
//! Prompt texts for each pipeline step.

use crate::domain::{Citation, SearchResult, TaxCategory};
use regex::{Captures, Regex};
use std::sync::OnceLock;

const RESEARCH_TEMPLATE: &str = r#"I need to write a compliant, factual US Taxation blog post for {category}.
Topic: "{topic}".

Step 1: Search for official IRS sources, Tax Code (IRC), and authoritative news.
Priority Sources: site:irs.gov OR site:taxpayeradvocate.irs.gov OR site:congress.gov.

Step 2: Find the latest limits, deadlines, and inflation adjustments for the current tax year.

Provide a comprehensive summary of the facts found, referencing the sources."#;

const KEYWORDS_TEMPLATE: &str = r#"You are an expert SEO strategist using Retrieval-Augmented Generation (RAG).
Topic: "{topic}" (US Taxation).
Identify 6-10 "high-quality" keywords based on current search volume and intent.
Return ONLY a raw JSON array of strings."#;

const DRAFT_TEMPLATE: &str = r#"Write a professional, accurate blog post about "{topic}" for a US {category} audience.

Primary Sources: Google Search Research Summary & Attached Documents.
Author Persona: {tone}.
Target Length: {word_count}.

{keywords_instruction}

Instructions:
- Prioritize official IRS guidelines over third-party blogs (YMYL Standard).
- Cite attached documents if used.

Structure (HTML5):
1. <h1>Title</h1>
2. Introduction
3. Key Takeaways (<ul> list) - Target Featured Snippet.
4. Detailed Body (MUST include 4-6 detailed examples/scenarios and 1-2 <table>s with width="100%").
5. Common Pitfalls & Mistakes (Actionable advice).
6. FAQ Section (3-4 Q&A).
7. Conclusion.

Constraint: Do NOT include a "References" list.

OUTPUT FORMAT:
- Raw SEO-optimized semantic HTML5.
- <h1> first. No <article> wrapper.
- LCP/CLS Optimization: Simple structure, proper table headers.
- No inline styles (except table width).

{research_context}"#;

const METADATA_TEMPLATE: &str = r#"Analyze the blog post HTML about "{topic}".

Generate a comprehensive SEO Strategy with strict JSON output.

REQUIREMENTS:
1. "metaTitle": SEO title (max 60 chars).
2. "metaDescription": SEO description (max 160 chars).
3. "slug": URL slug (kebab-case).
4. "imageIdeas": EXACTLY 3 distinct AI image ideas.
   - "prompt": Detailed prompt for an image generation model.
   - "altText": SEO optimized alt text.
   - "description": Short label.
5. "relatedTopics": EXACTLY 3-5 semantically related topics for internal linking.
   - "title": Blog title.
   - "slug": URL slug.

OUTPUT JSON FORMAT EXAMPLE:
{
  "metaTitle": "...",
  "metaDescription": "...",
  "slug": "...",
  "imageIdeas": [
     { "description": "Office", "prompt": "A modern office...", "altText": "Tax office" },
     { "description": "Form", "prompt": "A close up...", "altText": "IRS Form" },
     { "description": "Concept", "prompt": "Growth...", "altText": "Finance" }
  ],
  "socialPosts": { "linkedin": "...", "twitter": "..." },
  "relatedTopics": [
     { "title": "Topic 1", "slug": "topic-1" },
     { "title": "Topic 2", "slug": "topic-2" },
     { "title": "Topic 3", "slug": "topic-3" }
  ]
}

Blog Preview:
{preview}..."#;

/// Characters of the draft sent to the metadata step.
pub const METADATA_PREVIEW_CHARS: usize = 3000;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"))
}

/// Substitutes `{name}` placeholders in one pass. Inserted values are never
/// scanned again, so braces inside a topic or the research text stay literal.
/// Unknown names are left untouched.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

pub fn research_prompt(topic: &str, category: TaxCategory) -> String {
    fill(
        RESEARCH_TEMPLATE,
        &[("category", category.as_str()), ("topic", topic)],
    )
}

pub fn keywords_prompt(topic: &str) -> String {
    fill(KEYWORDS_TEMPLATE, &[("topic", topic)])
}

/// Inputs of the draft prompt that are plain text.
pub struct DraftPrompt<'a> {
    pub topic: &'a str,
    pub category: TaxCategory,
    pub research: &'a SearchResult,
    pub tone: &'a str,
    pub word_count: &'a str,
    pub keywords: &'a [String],
}

pub fn draft_prompt(input: &DraftPrompt<'_>) -> String {
    let keywords_instruction = if input.keywords.is_empty() {
        String::new()
    } else {
        format!(
            "SEO Optimization: Naturally integrate these keywords (NO stuffing): {}.",
            input.keywords.join(", ")
        )
    };

    let research_context = research_context(input.research);
    fill(
        DRAFT_TEMPLATE,
        &[
            ("topic", input.topic),
            ("category", input.category.as_str()),
            ("tone", input.tone),
            ("word_count", input.word_count),
            ("keywords_instruction", &keywords_instruction),
            ("research_context", &research_context),
        ],
    )
}

fn research_context(research: &SearchResult) -> String {
    format!(
        "Research Summary from Google Search (Prioritizing IRS.gov):\n{}\n\nAvailable Web Source URLs:\n{}",
        research.text,
        citation_lines(&research.citations)
    )
}

fn citation_lines(citations: &[Citation]) -> String {
    citations
        .iter()
        .map(|c| format!("- {}: {}", c.title, c.uri))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn metadata_prompt(topic: &str, draft: &str) -> String {
    let preview: String = draft.chars().take(METADATA_PREVIEW_CHARS).collect();
    fill(METADATA_TEMPLATE, &[("topic", topic), ("preview", &preview)])
}
