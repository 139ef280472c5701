//! insight-reader: analyze an article with an LLM and read the result aloud.

pub mod analysis;
pub mod cache;
pub mod cancellation;
pub mod config;
pub mod content;
pub mod controls;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod session;
pub mod speech;
#[cfg(test)]
mod test_support;

pub use error::{AnalysisError, ContentError, InsightError, InsightResult, SpeechError};
