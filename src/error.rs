//! Error taxonomy shared by the speech, content and analysis layers.

use thiserror::Error;

/// Failures raised by the speech engine adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeechError {
    #[error("speech synthesis is not supported on this platform")]
    UnsupportedPlatform,
    #[error("nothing to read aloud after cleaning the text")]
    EmptyInput,
    #[error("speech engine error: {0}")]
    EngineError(String),
}

/// Failures raised while retrieving or extracting readable content.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("failed to fetch content: {0}")]
    FetchFailed(String),
    #[error("no readable content found on the page")]
    NoExtractableContent,
}

/// Failures raised by the LLM analysis client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("analysis is not configured: {0}")]
    NotConfigured(String),
    #[error("text is too short to analyze ({actual} chars, need at least {minimum})")]
    InputTooShort { actual: usize, minimum: usize },
    #[error("rate limited by the analysis service")]
    RateLimited,
    #[error("analysis service rejected the credentials")]
    Unauthorized,
    #[error("analysis service rejected the request: {0}")]
    BadRequest(String),
    #[error("analysis service failed (status {status}): {message}")]
    UpstreamError { status: u16, message: String },
    #[error("analysis service returned no content")]
    EmptyResponse,
}

/// Umbrella error for the insight pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InsightError {
    #[error(transparent)]
    Speech(#[from] SpeechError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

pub type InsightResult<T> = Result<T, InsightError>;
