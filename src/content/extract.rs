//! Main-content extraction from fetched HTML.

use crate::error::ContentError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

static BOILERPLATE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("nav, header, footer, aside, script, style, noscript, iframe, svg, template").unwrap()
});
static FORMS: Lazy<Selector> = Lazy::new(|| Selector::parse("form").unwrap());
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static BLOCKS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, h1, h2, h3, h4, h5, h6, li, blockquote, pre, td, dd, figcaption").unwrap()
});
static CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article",
        "main",
        "[role=main]",
        ".post-content",
        ".entry-content",
        ".article-body",
        ".article-content",
        "#content",
        ".content",
        "body",
    ]
    .iter()
    .map(|css| Selector::parse(css).unwrap())
    .collect()
});
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "td", "dd", "figcaption",
];

/// Pull the readable body text out of `html`.
///
/// Navigation, scripts and similar chrome are removed first. The first
/// content container (article, main, common CMS wrappers, then body) whose
/// text reaches `min_chars` wins; otherwise the longest candidate is judged
/// against the same threshold.
pub fn extract_text(html: &str, min_chars: usize) -> Result<String, ContentError> {
    let mut document = Html::parse_document(html);
    strip_boilerplate(&mut document);

    let mut best = String::new();
    for (index, selector) in CANDIDATES.iter().enumerate() {
        for element in document.select(selector) {
            let text = element_text(element);
            let chars = text.chars().count();
            if chars >= min_chars {
                debug!(candidate = index, chars, "Extracted main content");
                return Ok(text);
            }
            if chars > best.chars().count() {
                best = text;
            }
        }
    }

    let chars = best.chars().count();
    if chars >= min_chars && chars > 0 {
        return Ok(best);
    }
    warn!(chars, min_chars, "Page has too little readable text");
    Err(ContentError::NoExtractableContent)
}

/// Best-effort page title from `og:title` or `<title>`.
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let og = document
        .select(&OG_TITLE)
        .filter_map(|meta| meta.value().attr("content"))
        .map(normalize_inline)
        .find(|title| !title.is_empty());
    og.or_else(|| {
        document
            .select(&TITLE)
            .map(|title| normalize_inline(&title.text().collect::<String>()))
            .find(|title| !title.is_empty())
    })
}

fn strip_boilerplate(document: &mut Html) {
    let mut ids: Vec<_> = document.select(&BOILERPLATE).map(|el| el.id()).collect();
    ids.extend(
        document
            .select(&FORMS)
            .filter(|form| !wraps_page_content(*form))
            .map(|form| form.id()),
    );
    debug!(count = ids.len(), "Removing boilerplate elements");
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Search and signup forms are chrome. Some frameworks wrap the whole page
/// in one form; those hold a content container or sit directly under body
/// with the page's paragraphs.
fn wraps_page_content(form: ElementRef<'_>) -> bool {
    if CANDIDATES.iter().any(|selector| form.select(selector).next().is_some()) {
        return true;
    }
    let under_body = form
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| parent.value().name() == "body");
    under_body && form.select(&PARAGRAPHS).next().is_some()
}

fn element_text(root: ElementRef<'_>) -> String {
    let blocks: Vec<String> = root
        .select(&BLOCKS)
        .filter(|block| !nested_in_block(*block, root))
        .map(|block| normalize_inline(&block.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect();

    if !blocks.is_empty() {
        return blocks.join("\n\n");
    }

    // No block structure (plain or reader-proxied text); flatten the markup.
    match html2text::from_read(root.html().as_bytes(), 10_000) {
        Ok(plain) => {
            let plain: String = plain.nfkc().collect();
            RE_BLANK_LINES.replace_all(plain.trim(), "\n\n").into_owned()
        }
        Err(err) => {
            warn!("html2text failed: {err}");
            String::new()
        }
    }
}

fn nested_in_block(element: ElementRef<'_>, root: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .take_while(|ancestor| ancestor.id() != root.id())
        .filter_map(ElementRef::wrap)
        .any(|ancestor| BLOCK_TAGS.contains(&ancestor.value().name()))
}

fn normalize_inline(text: &str) -> String {
    let text: String = text.nfkc().collect();
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}
