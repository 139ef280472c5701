//! User-facing playback intent layered over the speech adapter.
//!
//! The tracker publishes the state the user asked for as soon as they ask
//! for it. The reconciliation loop later overwrites that with what the engine
//! actually reports, so a wrong guess here is corrected within one poll.
//! Commands are gated on that reconciled state; the intent is only a hint.

use super::adapter::{PlaybackOutcome, SpeechAdapter, UtteranceConfig};
use super::state::PlaybackState;
use crate::error::SpeechError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Shared publication point for the reconciled state.
pub type StatePublisher = Arc<watch::Sender<PlaybackState>>;

/// Publish `next` if it differs from the current value. Returns whether
/// subscribers were notified.
pub fn publish(published: &watch::Sender<PlaybackState>, next: PlaybackState) -> bool {
    published.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    })
}

#[derive(Debug, Default)]
struct Intent {
    state: PlaybackState,
    /// Bumped by every play and stop; completion tasks from older
    /// generations leave the state alone.
    generation: u64,
    last_error: Option<SpeechError>,
}

pub struct PlaybackTracker {
    adapter: Arc<SpeechAdapter>,
    intent: Arc<Mutex<Intent>>,
    published: StatePublisher,
}

fn lock_intent(intent: &Mutex<Intent>) -> MutexGuard<'_, Intent> {
    intent.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PlaybackTracker {
    pub fn new(adapter: Arc<SpeechAdapter>, published: StatePublisher) -> Self {
        Self {
            adapter,
            intent: Arc::new(Mutex::new(Intent::default())),
            published,
        }
    }

    pub fn intended(&self) -> PlaybackState {
        lock_intent(&self.intent).state
    }

    pub fn published(&self) -> PlaybackState {
        *self.published.borrow()
    }

    /// Start reading `text`. Any previous utterance is cancelled first.
    ///
    /// The returned task resolves with the utterance outcome once the engine
    /// finishes. Must be called from within a Tokio runtime.
    pub fn play(
        &self,
        text: &str,
        config: &UtteranceConfig,
    ) -> Result<JoinHandle<Result<PlaybackOutcome, SpeechError>>, SpeechError> {
        let generation = {
            let mut intent = lock_intent(&self.intent);
            intent.generation = intent.generation.wrapping_add(1);
            intent.state = PlaybackState::Speaking;
            intent.last_error = None;
            intent.generation
        };
        publish(&self.published, PlaybackState::Speaking);

        let handle = match self.adapter.start(text, config) {
            Ok(handle) => handle,
            Err(err) => {
                warn!("Could not start playback: {err}");
                settle(&self.intent, &self.published, generation, Some(err.clone()));
                return Err(err);
            }
        };

        let intent = Arc::clone(&self.intent);
        let published = Arc::clone(&self.published);
        Ok(tokio::spawn(async move {
            let outcome = handle.finished().await;
            let error = outcome.as_ref().err().cloned();
            if let Some(err) = &error {
                warn!("Playback ended with an engine error: {err}");
            }
            settle(&intent, &published, generation, error);
            outcome
        }))
    }

    /// Pause when the reconciled state shows speech. The adapter decides
    /// whether the engine is actually touched.
    pub fn pause(&self) {
        let mut intent = lock_intent(&self.intent);
        let shown = self.published();
        if shown != PlaybackState::Speaking {
            debug!(%shown, "Pause ignored");
            return;
        }
        if self.adapter.pause() {
            intent.state = PlaybackState::Paused;
            publish(&self.published, PlaybackState::Paused);
        }
    }

    /// Resume when the reconciled state shows a pause.
    pub fn resume(&self) {
        let mut intent = lock_intent(&self.intent);
        let shown = self.published();
        if shown != PlaybackState::Paused {
            debug!(%shown, "Resume ignored");
            return;
        }
        if self.adapter.resume() {
            intent.state = PlaybackState::Speaking;
            publish(&self.published, PlaybackState::Speaking);
        }
    }

    /// Cancel playback unconditionally and publish idle.
    pub fn stop(&self) {
        {
            let mut intent = lock_intent(&self.intent);
            intent.generation = intent.generation.wrapping_add(1);
            intent.state = PlaybackState::Idle;
        }
        self.adapter.cancel();
        publish(&self.published, PlaybackState::Idle);
    }

    /// Most recent playback failure, until the next play or `clear_error`.
    pub fn last_error(&self) -> Option<SpeechError> {
        lock_intent(&self.intent).last_error.clone()
    }

    pub fn clear_error(&self) {
        lock_intent(&self.intent).last_error = None;
    }
}

fn settle(
    intent: &Mutex<Intent>,
    published: &watch::Sender<PlaybackState>,
    generation: u64,
    error: Option<SpeechError>,
) {
    {
        let mut intent = lock_intent(intent);
        if intent.generation != generation {
            debug!(generation, "Stale playback completion ignored");
            return;
        }
        intent.state = PlaybackState::Idle;
        if error.is_some() {
            intent.last_error = error;
        }
    }
    publish(published, PlaybackState::Idle);
}
