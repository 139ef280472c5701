use crate::config::AppConfig;
use crate::error::ContentError;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

/// Retrieves raw HTML for a page, trying each configured strategy in order.
///
/// A strategy is a URL template: `{url}` expands to the page URL and
/// `{url_encoded}` to its form-encoded form, which lets a strategy route the
/// request through a reader or CORS proxy.
#[derive(Clone)]
pub struct ContentFetcher {
    http: Client,
    strategies: Vec<String>,
}

impl ContentFetcher {
    pub fn new(config: &AppConfig) -> Result<Self, ContentError> {
        let http = Client::builder()
            .timeout(config.fetch_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ContentError::FetchFailed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, config.fetch_strategies.clone()))
    }

    pub fn with_client(http: Client, strategies: Vec<String>) -> Self {
        Self { http, strategies }
    }

    pub fn strategies(&self) -> &[String] {
        &self.strategies
    }

    /// Fetch `url`, returning the first non-empty body any strategy yields.
    pub async fn fetch(&self, url: &str) -> Result<String, ContentError> {
        let url = validate_url(url)?;
        let mut last_error = None;

        for (index, template) in self.strategies.iter().enumerate() {
            let target = expand_strategy(template, url.as_str());
            debug!(strategy = index, target = %target, "Fetching page");
            match self.fetch_once(&target).await {
                Ok(body) => {
                    info!(strategy = index, bytes = body.len(), "Fetched page");
                    return Ok(body);
                }
                Err(message) => {
                    warn!(strategy = index, "Fetch strategy failed: {message}");
                    last_error = Some(message);
                }
            }
        }

        Err(ContentError::FetchFailed(
            last_error.unwrap_or_else(|| "no fetch strategies configured".to_string()),
        ))
    }

    async fn fetch_once(&self, target: &str) -> Result<String, String> {
        let resp = self
            .http
            .get(target)
            .send()
            .await
            .map_err(|e| format!("request to {target} failed: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("HTTP {} from {target}", status.as_u16()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| format!("reading body from {target} failed: {e}"))?;
        if body.trim().is_empty() {
            return Err(format!("empty body from {target}"));
        }
        Ok(body)
    }
}

/// Accept only absolute http(s) URLs.
pub fn validate_url(input: &str) -> Result<Url, ContentError> {
    let url = Url::parse(input.trim())
        .map_err(|e| ContentError::FetchFailed(format!("invalid URL {input:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ContentError::FetchFailed(format!(
            "unsupported URL scheme {other:?}"
        ))),
    }
}

pub fn expand_strategy(template: &str, url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
    template
        .replace("{url_encoded}", &encoded)
        .replace("{url}", url)
}
