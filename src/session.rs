//! The insights view: one analysis result plus its read-aloud controls.
//!
//! Opening a view starts the reconciliation loop; closing or dropping it stops
//! the loop and silences any speech still in flight.

use crate::speech::{
    PlaybackOutcome, PlaybackState, PlaybackTracker, PollerHandle, SpeechAdapter, UtteranceConfig,
    spawn_reconciliation,
};
use crate::error::SpeechError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct InsightsView {
    insight: String,
    utterance_config: UtteranceConfig,
    tracker: PlaybackTracker,
    state: watch::Receiver<PlaybackState>,
    poller: Option<PollerHandle>,
    notice: Option<String>,
}

impl InsightsView {
    /// Present `insight` and start reconciling playback every `poll_interval`.
    /// Must be called inside a Tokio runtime.
    pub fn open(
        adapter: Arc<SpeechAdapter>,
        insight: String,
        utterance_config: UtteranceConfig,
        poll_interval: Duration,
    ) -> Self {
        let (sender, state) = watch::channel(PlaybackState::Idle);
        let published = Arc::new(sender);
        let tracker = PlaybackTracker::new(Arc::clone(&adapter), Arc::clone(&published));
        let poller = spawn_reconciliation(adapter, published, poll_interval);
        info!(chars = insight.len(), "Insights view opened");
        Self {
            insight,
            utterance_config,
            tracker,
            state,
            poller: Some(poller),
            notice: None,
        }
    }

    pub fn insight(&self) -> &str {
        &self.insight
    }

    /// Reconciled playback state.
    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    /// Watch reconciled state changes.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    /// Read the insight aloud from the beginning.
    pub fn play(&mut self) -> Option<JoinHandle<Result<PlaybackOutcome, SpeechError>>> {
        self.notice = None;
        match self.tracker.play(&self.insight, &self.utterance_config) {
            Ok(task) => Some(task),
            Err(err) => {
                self.notice = Some(err.to_string());
                None
            }
        }
    }

    pub fn pause(&self) {
        self.tracker.pause();
    }

    pub fn resume(&self) {
        self.tracker.resume();
    }

    pub fn stop(&self) {
        self.tracker.stop();
    }

    /// Show a message to the user until dismissed.
    pub fn show_notice(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    /// Current user-facing message, including playback failures.
    pub fn notice(&self) -> Option<String> {
        self.notice
            .clone()
            .or_else(|| self.tracker.last_error().map(|err| err.to_string()))
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
        self.tracker.clear_error();
    }

    /// Stop playback and the reconciliation loop.
    pub async fn close(mut self) {
        if let Some(poller) = self.poller.take() {
            poller.shutdown().await;
        }
        debug!("Insights view closed");
    }
}
