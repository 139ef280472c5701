//! LLM-backed insight generation.
//!
//! The analyzer turns article text into a markdown insight document using
//! either Google's Gemini `generateContent` API or an OpenAI-compatible
//! chat-completions endpoint.

mod prompt;
mod response;

pub use prompt::{render_prompt, truncate_chars};
pub use response::map_status;

use crate::config::{AnalysisProvider, AppConfig};
use crate::error::AnalysisError;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use std::env;
use tracing::{debug, info, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct Analyzer {
    http: Client,
    provider: AnalysisProvider,
    api_key: Option<String>,
    model: String,
    base_url: String,
    min_input_chars: usize,
    max_input_chars: usize,
    temperature: f32,
    max_output_tokens: u32,
    prompt_template: String,
}

impl Analyzer {
    pub fn from_config(config: &AppConfig) -> Result<Self, AnalysisError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AnalysisError::NotConfigured(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: Client, config: &AppConfig) -> Self {
        let default_base = match config.analysis_provider {
            AnalysisProvider::Gemini => GEMINI_BASE_URL,
            AnalysisProvider::OpenAi => OPENAI_BASE_URL,
        };
        let base_url = config
            .analysis_base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(default_base)
            .trim_end_matches('/')
            .to_string();
        Self {
            http,
            provider: config.analysis_provider,
            api_key: resolve_api_key(config),
            model: config.analysis_model.clone(),
            base_url,
            min_input_chars: config.min_input_chars,
            max_input_chars: config.max_input_chars.max(config.min_input_chars),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            prompt_template: config.prompt_template.clone(),
        }
    }

    pub fn provider(&self) -> AnalysisProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt_template(&self) -> &str {
        &self.prompt_template
    }

    /// Validate and bound the input, returning the text that will be sent.
    pub fn prepare_input<'a>(&self, text: &'a str) -> Result<&'a str, AnalysisError> {
        let text = text.trim();
        let actual = text.chars().count();
        if actual < self.min_input_chars {
            return Err(AnalysisError::InputTooShort {
                actual,
                minimum: self.min_input_chars,
            });
        }
        Ok(truncate_chars(text, self.max_input_chars))
    }

    /// Produce insight text for `text`.
    pub async fn analyze(&self, text: &str) -> Result<String, AnalysisError> {
        let input = self.prepare_input(text)?;
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AnalysisError::NotConfigured(format!("no API key for the {} provider", self.provider))
        })?;
        let prompt = render_prompt(&self.prompt_template, input);

        info!(
            provider = %self.provider,
            model = %self.model,
            input_chars = input.chars().count(),
            "Requesting analysis"
        );
        let request = match self.provider {
            AnalysisProvider::Gemini => self.gemini_request(api_key, &prompt),
            AnalysisProvider::OpenAi => self.chat_request(api_key, &prompt),
        };

        let resp = request.send().await.map_err(|e| {
            warn!("Analysis request failed: {e}");
            AnalysisError::UpstreamError {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: format!("request failed: {e}"),
            }
        })?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(%status, "Analysis service returned an error");
            return Err(map_status(status.as_u16(), &body));
        }

        let value = response::parse_body(status.as_u16(), &body)?;
        let text = match self.provider {
            AnalysisProvider::Gemini => response::gemini_text(&value),
            AnalysisProvider::OpenAi => response::chat_completion_text(&value),
        }?;
        debug!(chars = text.len(), "Analysis complete");
        Ok(text)
    }

    fn gemini_request(&self, api_key: &str, prompt: &str) -> RequestBuilder {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(url = %url, "POST generateContent");
        self.http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&json!({
                "contents": [{"role": "user", "parts": [{"text": prompt}]}],
                "generationConfig": {
                    "temperature": self.temperature,
                    "maxOutputTokens": self.max_output_tokens,
                },
            }))
    }

    fn chat_request(&self, api_key: &str, prompt: &str) -> RequestBuilder {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, "POST chat completions");
        self.http.post(url).bearer_auth(api_key).json(&json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "max_tokens": self.max_output_tokens,
        }))
    }
}

/// The configured key wins; otherwise the named environment variable.
fn resolve_api_key(config: &AppConfig) -> Option<String> {
    let configured = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty());
    if let Some(key) = configured {
        return Some(key.to_string());
    }
    let name = config.api_key_env.trim();
    if name.is_empty() {
        return None;
    }
    env::var(name)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}
