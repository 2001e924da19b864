//! Markdown code fence removal.
//!
//! Only a fence wrapping the whole (trimmed) input is recognized. Fences in the
//! middle of prose are left for the boundary scanner to step over.

use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

static FENCE: OnceLock<Regex> = OnceLock::new();

fn fence_regex() -> &'static Regex {
    FENCE.get_or_init(|| {
        Regex::new(r"(?is)\A```(?:json)?[ \t]*\r?\n(.*?)\r?\n?[ \t]*```\z")
            .expect("fence pattern is valid")
    })
}

/// Returns the body of a wrapping ```` ```json ```` fence, or `text` unchanged.
pub fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match fence_regex().captures(trimmed).and_then(|c| c.get(1)) {
        Some(body) => {
            trace!(target = "llm_json_extract::fence", body_len = body.len(), "stripped fence");
            body.as_str()
        }
        None => text,
    }
}

/// True when `strip_fence` would remove a wrapping fence from `text`.
pub fn has_fence(text: &str) -> bool {
    fence_regex().is_match(text.trim())
}
