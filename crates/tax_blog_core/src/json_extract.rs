//! crates/tax_blog_core/src/json_extract.rs
//!
//! Best-effort recovery of a JSON value from model output that may be wrapped in
//! markdown fences or surrounded by commentary.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::warn;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?i)```json|```").expect("fence pattern is valid"))
}

/// Parses `text` as JSON, tolerating fences and surrounding prose.
///
/// After a failed direct parse, the substring from the first `{` or `[` (whichever
/// comes first) to the last closing character of the same kind is tried. Nested
/// delimiters are not balanced, so a stray closer after the value defeats the slice.
/// Returns `None` rather than an error when nothing parses.
pub fn extract_json(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }

    let clean = fence_regex().replace_all(text, "");
    let clean = clean.trim();

    if let Ok(value) = serde_json::from_str::<Value>(clean) {
        return Some(value);
    }

    let first_brace = clean.find('{');
    let first_bracket = clean.find('[');

    let span = match (first_brace, first_bracket) {
        (Some(brace), bracket) if bracket.map_or(true, |b| brace < b) => {
            clean.rfind('}').map(|end| (brace, end + 1))
        }
        (_, Some(bracket)) => clean.rfind(']').map(|end| (bracket, end + 1)),
        _ => None,
    };

    if let Some((start, end)) = span {
        if end > start {
            match serde_json::from_str::<Value>(&clean[start..end]) {
                Ok(value) => return Some(value),
                Err(e) => warn!("Failed to parse extracted JSON: {}", e),
            }
        }
    }

    warn!("JSON parse failed for model output ({} bytes)", text.len());
    None
}
