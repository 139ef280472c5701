//! Read-aloud playback: engine adapter, playback intent and reconciliation.

mod adapter;
#[cfg(feature = "piper")]
mod piper;
mod platform;
mod poller;
mod state;
#[cfg(test)]
pub(crate) mod testing;
mod tracker;
mod voice;

pub use adapter::{PlaybackOutcome, SpeechAdapter, Utterance, UtteranceConfig, UtteranceHandle};
#[cfg(feature = "piper")]
pub use piper::PiperPlatform;
pub use platform::{
    SpeechPlatform, SynthesisRequest, UnavailablePlatform, UtteranceCallback, UtteranceEvent,
    Voice, VoicesReadyCallback,
};
pub use poller::{PollerHandle, Reconciliation, poll_once, reconcile, spawn_reconciliation};
pub use state::PlaybackState;
pub use tracker::{PlaybackTracker, StatePublisher, publish};
pub use voice::select_voice;

use crate::config::AppConfig;
use std::sync::Arc;

/// The speech backend this build was compiled with.
#[cfg(feature = "piper")]
pub fn default_platform(config: &AppConfig) -> Arc<dyn SpeechPlatform> {
    use std::path::PathBuf;
    use tracing::warn;

    match PiperPlatform::new(
        PathBuf::from(&config.piper_voices_dir),
        PathBuf::from(&config.piper_espeak_path),
        PathBuf::from(&config.cache_dir),
    ) {
        Ok(platform) => Arc::new(platform),
        Err(err) => {
            warn!("Piper backend unavailable: {err:#}");
            Arc::new(UnavailablePlatform)
        }
    }
}

/// The speech backend this build was compiled with.
#[cfg(not(feature = "piper"))]
pub fn default_platform(_config: &AppConfig) -> Arc<dyn SpeechPlatform> {
    tracing::warn!("Built without a speech backend; rebuild with the `piper` feature to read aloud");
    Arc::new(UnavailablePlatform)
}
