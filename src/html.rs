//! HTML normalization and completion-response parsing.
//!
//! Two jobs live here:
//!
//! 1. **Normalizing** raw article HTML into the clean text fragment sent to
//!    the model: a lenient parse, `<style>` content excluded, remaining text
//!    nodes concatenated and wrapped in `<article>...</article>`.
//! 2. **Parsing** the model's response: strip a ```` ```html ```` Markdown
//!    fence if present, then pull title, meta description, and article body
//!    out of the HTML document the model was instructed to produce.
//!
//! Both sides ride on html5ever's recovering parser, so malformed input
//! degrades to best-effort extraction instead of failing. Missing structure
//! degrades to field-level sentinel strings.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node, Selector};

/// Title sentinel when the completion has no `<title>` element.
pub const NO_TITLE: &str = "No title";

/// Body sentinel when the completion has no `<article>` element.
pub const ARTICLE_NOT_FOUND: &str = "article not found";

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```html\s*([\s\S]*?)\s*```").unwrap());

/// Strip raw article HTML down to its visible text, wrapped in a single
/// `<article>` container.
///
/// `<style>` elements are dropped entirely so stylesheet text never leaks
/// into the article body. Never fails: malformed markup is handled by the
/// recovering parser.
pub fn normalize_article(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let mut text = String::new();
    for node in document.tree.nodes() {
        if let Node::Text(chunk) = node.value() {
            let in_style = node
                .ancestors()
                .any(|a| matches!(a.value(), Node::Element(el) if el.name() == "style"));
            if !in_style {
                text.push_str(&chunk.text);
            }
        }
    }
    format!("<article>{}</article>", text.trim())
}

/// Remove a ```` ```html ```` Markdown fence around the response, if any.
///
/// Every fenced span is replaced by its content (innermost, non-greedy) and
/// the result is trimmed. Unfenced input passes through unchanged apart from
/// trimming, which makes the operation idempotent.
pub fn strip_code_fence(response: &str) -> String {
    FENCE_RE.replace_all(response, "$1").trim().to_string()
}

/// Structured fields pulled out of one completion response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCompletion {
    pub title: String,
    pub description: String,
    /// Inner HTML of the `<article>` element, markup preserved.
    pub processed_text: String,
}

/// Extract title, description, and article body from fence-stripped HTML.
///
/// Missing elements yield sentinels rather than errors: [`NO_TITLE`] for the
/// title, an empty description, [`ARTICLE_NOT_FOUND`] for the body.
fn extract_fields(html: &str) -> ParsedCompletion {
    let document = Html::parse_document(html);

    let title_selector = Selector::parse("title").unwrap();
    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let description_selector = Selector::parse(r#"meta[name="description"]"#).unwrap();
    let description = document
        .select(&description_selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .unwrap_or_default()
        .to_string();

    let article_selector = Selector::parse("article").unwrap();
    let processed_text = document
        .select(&article_selector)
        .next()
        .map(|el| el.inner_html().trim().to_string())
        .unwrap_or_else(|| ARTICLE_NOT_FOUND.to_string());

    ParsedCompletion {
        title,
        description,
        processed_text,
    }
}

/// Fence stripping and field extraction in one step.
pub fn parse_completion(raw: &str) -> ParsedCompletion {
    extract_fields(&strip_code_fence(raw))
}
