//! crates/tax_blog_core/src/publishing.rs
//!
//! Publishing artefacts built around model output: the byline and disclaimer
//! blocks, the schema.org graph, social meta tags and the final SEO metadata.

use crate::domain::{
    AuthorProfile, Citation, ImageIdea, RelatedTopic, SeoMetadata, SiteProfile, SocialPosts,
};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

pub const MAX_IMAGE_IDEAS: usize = 3;
pub const MAX_RELATED_TOPICS: usize = 5;

pub const DISCLAIMER_HTML: &str = r#"
<div class="disclaimer-box">
<p>
  <strong>Disclaimer:</strong> The information provided in this article is for educational and informational purposes only and does not constitute professional financial or tax advice. Tax laws are subject to change. We recommend consulting with a qualified tax professional regarding your specific situation.
</p>
</div>
"#;

/// Escapes text for use inside HTML element content or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn author_box_html(author: &AuthorProfile) -> String {
    format!(
        r#"
<div class="author-box">
   <div style="flex: 1;">
      <h4>About the Author</h4>
      <p class="name">{}, {}</p>
      <p class="bio">{}</p>
   </div>
</div>
"#,
        escape_html(&author.name),
        escape_html(&author.credentials),
        escape_html(&author.bio)
    )
}

/// Removes markdown code fences the model sometimes wraps HTML in.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```html", "").replace("```", "").trim().to_string()
}

fn whitespace_regex() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

fn non_slug_regex() -> &'static Regex {
    static NON_SLUG: OnceLock<Regex> = OnceLock::new();
    NON_SLUG.get_or_init(|| Regex::new(r"[^a-z0-9-]").expect("slug pattern is valid"))
}

/// Lowercases, turns whitespace runs into `-` and drops everything outside `[a-z0-9-]`.
pub fn slugify(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let dashed = whitespace_regex().replace_all(&lower, "-");
    non_slug_regex().replace_all(&dashed, "").into_owned()
}

fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Article fields shared by the schema graph and the social tags.
pub struct ArticleMeta<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub permalink: &'a str,
}

/// Builds the schema.org `@graph` (Organization, BreadcrumbList, Article).
pub fn schema_graph(
    site: &SiteProfile,
    author: &AuthorProfile,
    article: &ArticleMeta<'_>,
    citations: &[Citation],
    now: DateTime<Utc>,
) -> Value {
    let base = site.url.trim_end_matches('/');
    let organization_id = format!("{}/#organization", base);
    let timestamp = iso_timestamp(now);

    let organization = json!({
        "@type": "Organization",
        "@id": organization_id,
        "name": site.name,
        "url": base,
        "logo": {
            "@type": "ImageObject",
            "url": site.logo_url,
            "width": 192,
            "height": 192
        }
    });

    let person = json!({
        "@type": "Person",
        "@id": format!("{}/#person/{}", base, slugify(&author.name)),
        "name": author.name,
        "description": author.bio,
        "jobTitle": "Tax Professional",
        "worksFor": { "@id": organization_id }
    });

    let breadcrumbs = json!({
        "@type": "BreadcrumbList",
        "itemListElement": [
            { "@type": "ListItem", "position": 1, "name": "Home", "item": base },
            { "@type": "ListItem", "position": 2, "name": "Blog", "item": format!("{}/blog", base) },
            { "@type": "ListItem", "position": 3, "name": article.title, "item": article.permalink }
        ]
    });

    let citation_list: Vec<&str> = citations.iter().map(|c| c.uri.as_str()).collect();

    json!({
        "@context": "https://schema.org",
        "@graph": [
            organization,
            breadcrumbs,
            {
                "@type": "Article",
                "@id": format!("{}#article", article.permalink),
                "isPartOf": { "@id": article.permalink },
                "author": person,
                "headline": article.title,
                "datePublished": timestamp,
                "dateModified": timestamp,
                "mainEntityOfPage": { "@id": article.permalink },
                "publisher": { "@id": organization_id },
                "image": {
                    "@type": "ImageObject",
                    "url": site.default_image_url
                },
                "description": article.description,
                "citation": citation_list
            }
        ]
    })
}

pub fn social_meta_tags(
    site: &SiteProfile,
    author: &AuthorProfile,
    article: &ArticleMeta<'_>,
) -> String {
    let title = escape_html(article.title);
    let description = escape_html(article.description);
    [
        format!(r#"<meta property="og:title" content="{}" />"#, title),
        format!(r#"<meta property="og:description" content="{}" />"#, description),
        r#"<meta property="og:type" content="article" />"#.to_string(),
        format!(r#"<meta property="og:url" content="{}" />"#, escape_html(article.permalink)),
        format!(r#"<meta property="og:site_name" content="{}" />"#, escape_html(&site.name)),
        format!(r#"<meta name="author" content="{}" />"#, escape_html(&author.name)),
        r#"<meta name="twitter:card" content="summary_large_image" />"#.to_string(),
        format!(r#"<meta name="twitter:title" content="{}" />"#, title),
        format!(r#"<meta name="twitter:description" content="{}" />"#, description),
    ]
    .join("\n")
}

fn default_title(topic: &str) -> String {
    format!("{} - Tax Guide", topic)
}

fn default_description(topic: &str) -> String {
    format!("Read our detailed guide on {}.", topic)
}

/// Metadata used when the model call or its parse fails entirely.
pub fn fallback_seo_metadata(topic: &str) -> SeoMetadata {
    SeoMetadata {
        meta_title: default_title(topic),
        meta_description: default_description(topic),
        slug: slugify(topic),
        schema_json: "{}".to_string(),
        social_meta_tags: String::new(),
        image_ideas: Vec::new(),
        social_posts: SocialPosts::default(),
        related_topics: Vec::new(),
    }
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn str_or_empty(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn parse_image_ideas(parsed: &Value) -> Vec<ImageIdea> {
    parsed
        .get("imageIdeas")
        .and_then(Value::as_array)
        .map(|ideas| {
            ideas
                .iter()
                .filter(|idea| idea.is_object())
                .take(MAX_IMAGE_IDEAS)
                .map(|idea| ImageIdea {
                    description: str_or_empty(idea, "description"),
                    prompt: str_or_empty(idea, "prompt"),
                    alt_text: str_or_empty(idea, "altText"),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_social_posts(parsed: &Value) -> SocialPosts {
    match parsed.get("socialPosts") {
        Some(posts) if posts.is_object() => SocialPosts {
            linkedin: str_or_empty(posts, "linkedin"),
            twitter: str_or_empty(posts, "twitter"),
        },
        _ => SocialPosts::default(),
    }
}

fn parse_related_topics(parsed: &Value, site: &SiteProfile) -> Vec<RelatedTopic> {
    parsed
        .get("relatedTopics")
        .and_then(Value::as_array)
        .map(|topics| {
            topics
                .iter()
                .filter_map(|topic| {
                    let title = non_empty_str(topic, "title")?.to_string();
                    let slug = non_empty_str(topic, "slug")
                        .map(str::to_string)
                        .unwrap_or_else(|| slugify(&title));
                    Some(RelatedTopic {
                        url: site.permalink(&slug),
                        title,
                        slug,
                    })
                })
                .take(MAX_RELATED_TOPICS)
                .collect()
        })
        .unwrap_or_default()
}

/// Assembles the final metadata from the model's parsed JSON, filling defaults
/// for missing fields and building the schema graph and social tags in code.
pub fn build_seo_metadata(
    topic: &str,
    parsed: &Value,
    author: &AuthorProfile,
    citations: &[Citation],
    site: &SiteProfile,
    now: DateTime<Utc>,
) -> SeoMetadata {
    let meta_title = non_empty_str(parsed, "metaTitle")
        .map(str::to_string)
        .unwrap_or_else(|| default_title(topic));
    let meta_description = non_empty_str(parsed, "metaDescription")
        .map(str::to_string)
        .unwrap_or_else(|| default_description(topic));
    let slug = non_empty_str(parsed, "slug")
        .map(str::to_string)
        .unwrap_or_else(|| slugify(topic));
    let permalink = site.permalink(&slug);

    let article = ArticleMeta {
        title: &meta_title,
        description: &meta_description,
        permalink: &permalink,
    };
    let schema_json = schema_graph(site, author, &article, citations, now).to_string();
    let social_meta_tags = social_meta_tags(site, author, &article);

    SeoMetadata {
        image_ideas: parse_image_ideas(parsed),
        social_posts: parse_social_posts(parsed),
        related_topics: parse_related_topics(parsed, site),
        meta_title,
        meta_description,
        slug,
        schema_json,
        social_meta_tags,
    }
}
