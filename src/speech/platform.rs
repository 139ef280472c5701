//! The platform speech primitive the adapter drives.
//!
//! Implementations are shared singletons outside the crate's control (a
//! system speech service, a local neural engine, a test double). Only
//! [`SpeechAdapter`](super::SpeechAdapter) may call into them.

use crate::error::SpeechError;
use std::sync::Arc;

/// A voice offered by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// BCP-47-ish language tag, e.g. `en-US` or `en_GB`.
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// Everything the platform needs to synthesize one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<Voice>,
}

/// Lifecycle notifications emitted by the platform for one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceEvent {
    Started,
    Paused,
    Resumed,
    Ended,
    Failed(String),
}

/// Callback the platform invokes for the utterance it was handed.
pub type UtteranceCallback = Arc<dyn Fn(UtteranceEvent) + Send + Sync>;

/// One-shot callback fired once the voice list has been populated.
pub type VoicesReadyCallback = Box<dyn FnOnce() + Send>;

pub trait SpeechPlatform: Send + Sync {
    /// Whether any speech capability exists at all.
    fn is_supported(&self) -> bool;

    /// Currently known voices; may be empty until the platform finishes loading.
    fn voices(&self) -> Vec<Voice>;

    /// Register a one-time callback for when the voice list becomes available.
    fn on_voices_ready(&self, callback: VoicesReadyCallback);

    /// Queue an utterance. Events for it are delivered through `events`.
    fn speak(&self, request: SynthesisRequest, events: UtteranceCallback);

    fn pause(&self);

    fn resume(&self);

    /// Drop everything queued or playing.
    fn cancel(&self);

    /// True while an utterance is queued or audible, including while paused.
    fn is_speaking(&self) -> Result<bool, SpeechError>;

    fn is_paused(&self) -> Result<bool, SpeechError>;
}

/// Stand-in used when no speech backend is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailablePlatform;

impl SpeechPlatform for UnavailablePlatform {
    fn is_supported(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn on_voices_ready(&self, _callback: VoicesReadyCallback) {}

    fn speak(&self, _request: SynthesisRequest, events: UtteranceCallback) {
        events(UtteranceEvent::Failed(
            SpeechError::UnsupportedPlatform.to_string(),
        ));
    }

    fn pause(&self) {}

    fn resume(&self) {}

    fn cancel(&self) {}

    fn is_speaking(&self) -> Result<bool, SpeechError> {
        Ok(false)
    }

    fn is_paused(&self) -> Result<bool, SpeechError> {
        Ok(false)
    }
}
