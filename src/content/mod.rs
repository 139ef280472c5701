//! Page retrieval and readable-text extraction.

mod extract;
mod fetch;

pub use extract::{extract_text, page_title};
pub use fetch::{ContentFetcher, expand_strategy, validate_url};

use crate::error::ContentError;

/// Readable text pulled from a page or document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: Option<String>,
    pub text: String,
}

impl Article {
    /// Extract an article from already-retrieved HTML.
    pub fn from_html(html: &str, min_chars: usize) -> Result<Self, ContentError> {
        Ok(Self {
            title: page_title(html),
            text: extract_text(html, min_chars)?,
        })
    }
}

/// Fetch `url` and extract its main content.
pub async fn fetch_article(
    fetcher: &ContentFetcher,
    url: &str,
    min_chars: usize,
) -> Result<Article, ContentError> {
    let html = fetcher.fetch(url).await?;
    Article::from_html(&html, min_chars)
}
