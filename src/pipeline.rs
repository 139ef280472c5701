//! Source to insight: fetch or read the input, extract text, analyze it.

use crate::analysis::Analyzer;
use crate::cache::{InsightKey, load_insight, save_insight};
use crate::config::AppConfig;
use crate::content::{Article, ContentFetcher, fetch_article};
use crate::error::InsightResult;
use std::path::PathBuf;
use tracing::info;

/// Where the text to analyze comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A web page to fetch.
    Url(String),
    /// Already-retrieved HTML.
    Html(String),
    /// Plain or markdown text, analyzed as-is.
    Text(String),
}

impl InputSource {
    /// Classify loaded document contents by sniffing for markup.
    pub fn from_document(contents: String) -> Self {
        let lower: String = contents
            .trim_start()
            .chars()
            .take(512)
            .collect::<String>()
            .to_ascii_lowercase();
        if lower.starts_with("<!doctype html") || lower.starts_with("<html") || lower.contains("<body") {
            InputSource::Html(contents)
        } else {
            InputSource::Text(contents)
        }
    }
}

/// A finished analysis ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub title: Option<String>,
    pub text: String,
    pub from_cache: bool,
}

pub struct Pipeline {
    fetcher: ContentFetcher,
    analyzer: Analyzer,
    extract_min_chars: usize,
    cache_dir: Option<PathBuf>,
}

impl Pipeline {
    pub fn from_config(config: &AppConfig) -> InsightResult<Self> {
        let cache_dir = config
            .cache_insights
            .then(|| PathBuf::from(&config.cache_dir));
        Ok(Self::new(
            ContentFetcher::new(config)?,
            Analyzer::from_config(config)?,
            config.extract_min_chars,
            cache_dir,
        ))
    }

    pub fn new(
        fetcher: ContentFetcher,
        analyzer: Analyzer,
        extract_min_chars: usize,
        cache_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            analyzer,
            extract_min_chars,
            cache_dir,
        }
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_dir = None;
        self
    }

    pub async fn load_article(&self, source: InputSource) -> InsightResult<Article> {
        let article = match source {
            InputSource::Url(url) => {
                fetch_article(&self.fetcher, &url, self.extract_min_chars).await?
            }
            InputSource::Html(html) => Article::from_html(&html, self.extract_min_chars)?,
            InputSource::Text(text) => Article {
                title: None,
                text: text.trim().to_string(),
            },
        };
        info!(
            title = article.title.as_deref().unwrap_or("(untitled)"),
            chars = article.text.chars().count(),
            "Loaded article"
        );
        Ok(article)
    }

    /// Analyze `text`, reusing a cached insight when one exists.
    pub async fn analyze(&self, text: &str) -> InsightResult<(String, bool)> {
        let key = InsightKey::new(
            self.analyzer.provider(),
            self.analyzer.model(),
            self.analyzer.prompt_template(),
            text.trim(),
        );
        if let Some(dir) = &self.cache_dir {
            if let Some(insight) = load_insight(dir, &key) {
                info!("Using cached insight");
                return Ok((insight, true));
            }
        }

        let insight = self.analyzer.analyze(text).await?;
        if let Some(dir) = &self.cache_dir {
            save_insight(dir, &key, &insight);
        }
        Ok((insight, false))
    }

    pub async fn run(&self, source: InputSource) -> InsightResult<Insight> {
        let article = self.load_article(source).await?;
        let (text, from_cache) = self.analyze(&article.text).await?;
        Ok(Insight {
            title: article.title,
            text,
            from_cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisError, ContentError, InsightError};
    use crate::test_support::{direct_client, http_response, serve};

    const ARTICLE: &str = "Borrowing lets code read a value without taking ownership of it, \
                           and the borrow checker makes sure no reference outlives its data.";

    fn pipeline(base_url: &str, cache_dir: Option<PathBuf>) -> Pipeline {
        let config = AppConfig {
            api_key: Some("test-key".into()),
            analysis_base_url: Some(base_url.to_string()),
            fetch_strategies: vec![format!("{base_url}/fetch?u={{url_encoded}}")],
            extract_min_chars: 40,
            ..AppConfig::default()
        };
        Pipeline::new(
            ContentFetcher::with_client(direct_client(), config.fetch_strategies.clone()),
            Analyzer::with_client(direct_client(), &config),
            config.extract_min_chars,
            cache_dir,
        )
    }

    #[test]
    fn documents_are_classified_by_markup() {
        assert!(matches!(
            InputSource::from_document("<!DOCTYPE html><html></html>".into()),
            InputSource::Html(_)
        ));
        assert!(matches!(
            InputSource::from_document("  <html><body>x</body></html>".into()),
            InputSource::Html(_)
        ));
        assert!(matches!(
            InputSource::from_document("# Notes\n\nUse <b> sparingly.".into()),
            InputSource::Text(_)
        ));
    }

    #[tokio::test]
    async fn html_without_content_is_a_content_error() {
        let pipeline = pipeline("http://127.0.0.1:9", None);
        let err = pipeline
            .run(InputSource::Html("<html><body><nav>Menu</nav></body></html>".into()))
            .await
            .expect_err("no content");
        assert_eq!(err, InsightError::Content(ContentError::NoExtractableContent));
    }

    #[tokio::test]
    async fn short_text_is_an_analysis_error() {
        let pipeline = pipeline("http://127.0.0.1:9", None);
        let err = pipeline
            .run(InputSource::Text("too short".into()))
            .await
            .expect_err("short");
        assert!(matches!(
            err,
            InsightError::Analysis(AnalysisError::InputTooShort { actual: 9, .. })
        ));
    }

    #[tokio::test]
    async fn fetches_extracts_analyzes_and_caches() {
        let page = format!(
            "<html><head><title>Borrowing</title></head><body><article><p>{ARTICLE}</p></article></body></html>"
        );
        let answer = r###"{"candidates":[{"content":{"parts":[{"text":"## Summary\nBorrows are checked."}]}}]}"###;
        let (base, captured) = serve(vec![
            http_response("200 OK", "text/html", &page),
            http_response("200 OK", "application/json", answer),
        ])
        .await;
        let cache = tempfile::tempdir().expect("tempdir");
        let pipeline = pipeline(&base, Some(cache.path().to_path_buf()));

        let insight = pipeline
            .run(InputSource::Url("https://example.com/borrowing".into()))
            .await
            .expect("insight");

        assert_eq!(insight.title.as_deref(), Some("Borrowing"));
        assert_eq!(insight.text, "## Summary\nBorrows are checked.");
        assert!(!insight.from_cache);
        assert_eq!(captured.lock().expect("lock").len(), 2);

        // Second run is served from disk; the fixture has no responses left.
        let again = pipeline.analyze(ARTICLE).await.expect("cached");
        assert_eq!(again, ("## Summary\nBorrows are checked.".to_string(), true));
    }
}
