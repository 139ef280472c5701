//! Sole owner of the platform speech primitive.
//!
//! At most one utterance is current at any time. Every callback handed to
//! the platform carries the id of the utterance it was created for, so events
//! from a cancelled or superseded utterance are recognised and dropped.

use super::platform::{SpeechPlatform, SynthesisRequest, UtteranceCallback, UtteranceEvent};
use super::state::PlaybackState;
use super::voice::select_voice;
use crate::config::AppConfig;
use crate::error::SpeechError;
use crate::normalizer::clean_for_speech;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Voice parameters applied to each utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceConfig {
    pub lang: String,
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice_hints: Vec<String>,
}

impl Default for UtteranceConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl UtteranceConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            lang: config.speech_lang.clone(),
            voice: config.speech_voice.clone(),
            rate: config.clamped_speech_rate(),
            pitch: config.clamped_speech_pitch(),
            volume: config.clamped_speech_volume(),
            voice_hints: config.voice_name_hints.clone(),
        }
    }
}

/// The text being read plus the parameters it was started with.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub raw_text: String,
    pub clean_text: String,
    pub config: UtteranceConfig,
}

/// How an utterance left the adapter when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
}

type Completion = oneshot::Sender<Result<(), SpeechError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Registered, waiting for the platform's voice list.
    AwaitingVoices,
    /// Handed to the platform.
    Handed,
}

struct ActiveUtterance {
    id: u64,
    utterance: Utterance,
    phase: Phase,
    paused: bool,
    completion: Option<Completion>,
}

#[derive(Default)]
struct Slot {
    next_id: u64,
    current: Option<ActiveUtterance>,
}

fn lock_slot(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves when the utterance it was returned for finishes.
#[derive(Debug)]
pub struct UtteranceHandle {
    id: u64,
    completion: oneshot::Receiver<Result<(), SpeechError>>,
}

impl UtteranceHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Completed on natural end, Cancelled if the utterance was cancelled or
    /// superseded, and an error if the engine reported one.
    pub async fn finished(self) -> Result<PlaybackOutcome, SpeechError> {
        match self.completion.await {
            Ok(Ok(())) => Ok(PlaybackOutcome::Completed),
            Ok(Err(err)) => Err(err),
            Err(_) => Ok(PlaybackOutcome::Cancelled),
        }
    }
}

pub struct SpeechAdapter {
    platform: Arc<dyn SpeechPlatform>,
    slot: Arc<Mutex<Slot>>,
}

impl SpeechAdapter {
    pub fn new(platform: Arc<dyn SpeechPlatform>) -> Self {
        Self {
            platform,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.platform.is_supported()
    }

    /// Clean `text`, cancel whatever is current and begin reading it.
    pub fn start(
        &self,
        text: &str,
        config: &UtteranceConfig,
    ) -> Result<UtteranceHandle, SpeechError> {
        if !self.platform.is_supported() {
            warn!("Speech requested but the platform has no speech support");
            return Err(SpeechError::UnsupportedPlatform);
        }
        let clean_text = clean_for_speech(text);
        if clean_text.is_empty() {
            debug!(raw_chars = text.len(), "Nothing left to speak after cleaning");
            return Err(SpeechError::EmptyInput);
        }

        self.cancel();

        let (completion, receiver) = oneshot::channel();
        let chars = clean_text.chars().count();
        let id = {
            let mut slot = lock_slot(&self.slot);
            slot.next_id = slot.next_id.wrapping_add(1);
            let id = slot.next_id;
            slot.current = Some(ActiveUtterance {
                id,
                utterance: Utterance {
                    raw_text: text.to_string(),
                    clean_text,
                    config: config.clone(),
                },
                phase: Phase::AwaitingVoices,
                paused: false,
                completion: Some(completion),
            });
            id
        };
        info!(utterance_id = id, chars, "Starting utterance");

        if self.platform.voices().is_empty() {
            debug!(utterance_id = id, "Voice list not loaded yet; deferring playback");
            let platform = Arc::downgrade(&self.platform);
            let slot = Arc::downgrade(&self.slot);
            self.platform.on_voices_ready(Box::new(move || {
                if let (Some(platform), Some(slot)) = (platform.upgrade(), slot.upgrade()) {
                    begin_speaking(&platform, &slot, id);
                }
            }));
        } else {
            begin_speaking(&self.platform, &self.slot, id);
        }

        Ok(UtteranceHandle {
            id,
            completion: receiver,
        })
    }

    /// Drop the current utterance, if any, and silence the engine.
    pub fn cancel(&self) {
        let previous = lock_slot(&self.slot).current.take();
        if let Some(active) = &previous {
            info!(utterance_id = active.id, "Cancelling utterance");
        }
        self.platform.cancel();
        // Dropping the completion sender resolves the handle as cancelled.
        drop(previous);
    }

    /// Pause the handed-over utterance unless the engine already reports it
    /// paused. Returns whether the engine was asked to pause.
    pub fn pause(&self) -> bool {
        let engine_paused = self.platform.is_paused().ok();
        let id = {
            let mut slot = lock_slot(&self.slot);
            match slot.current.as_mut() {
                Some(active)
                    if active.phase == Phase::Handed
                        && !engine_paused.unwrap_or(active.paused) =>
                {
                    active.paused = true;
                    Some(active.id)
                }
                _ => None,
            }
        };
        match id {
            Some(id) => {
                debug!(utterance_id = id, "Pausing utterance");
                self.platform.pause();
                true
            }
            None => {
                debug!("Pause ignored; nothing is speaking");
                false
            }
        }
    }

    /// Resume the current utterance if the engine (or, when the engine cannot
    /// be queried, our own bookkeeping) says it is paused. Returns whether
    /// the engine was asked to resume.
    pub fn resume(&self) -> bool {
        let engine_paused = self.platform.is_paused().ok();
        let id = {
            let mut slot = lock_slot(&self.slot);
            match slot.current.as_mut() {
                Some(active)
                    if active.phase == Phase::Handed
                        && engine_paused.unwrap_or(active.paused) =>
                {
                    active.paused = false;
                    Some(active.id)
                }
                _ => None,
            }
        };
        match id {
            Some(id) => {
                debug!(utterance_id = id, "Resuming utterance");
                self.platform.resume();
                true
            }
            None => {
                debug!("Resume ignored; nothing is paused");
                false
            }
        }
    }

    /// Raw engine state. Query failures read as idle; an utterance still
    /// waiting for voices reads as speaking.
    pub fn engine_state(&self) -> PlaybackState {
        let pending = lock_slot(&self.slot)
            .current
            .as_ref()
            .is_some_and(|active| active.phase == Phase::AwaitingVoices);
        if pending {
            return PlaybackState::Speaking;
        }

        match (self.platform.is_speaking(), self.platform.is_paused()) {
            (Ok(speaking), Ok(paused)) => PlaybackState::from_flags(speaking, paused),
            (Err(err), _) | (_, Err(err)) => {
                debug!("Speech engine query failed; reporting idle: {err}");
                PlaybackState::Idle
            }
        }
    }

    pub fn current_utterance(&self) -> Option<Utterance> {
        lock_slot(&self.slot)
            .current
            .as_ref()
            .map(|active| active.utterance.clone())
    }

    pub fn has_current(&self) -> bool {
        lock_slot(&self.slot).current.is_some()
    }
}

impl Drop for SpeechAdapter {
    fn drop(&mut self) {
        if self.has_current() {
            self.cancel();
        }
    }
}

/// Hand utterance `id` to the platform if it is still current and waiting.
fn begin_speaking(platform: &Arc<dyn SpeechPlatform>, slot: &Arc<Mutex<Slot>>, id: u64) {
    let voices = platform.voices();
    let request = {
        let mut guard = lock_slot(slot);
        let Some(active) = guard.current.as_mut().filter(|active| active.id == id) else {
            debug!(utterance_id = id, "Deferred start skipped; utterance was superseded");
            return;
        };
        if active.phase != Phase::AwaitingVoices {
            return;
        }
        active.phase = Phase::Handed;

        let config = &active.utterance.config;
        let voice = select_voice(
            &voices,
            &config.lang,
            config.voice.as_deref(),
            &config.voice_hints,
        );
        match &voice {
            Some(voice) => debug!(utterance_id = id, voice = %voice.name, "Selected voice"),
            None => debug!(utterance_id = id, "No voices listed; using platform default"),
        }
        SynthesisRequest {
            text: active.utterance.clean_text.clone(),
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
            voice,
        }
    };

    platform.speak(request, event_callback(Arc::downgrade(slot), id));
}

fn event_callback(slot: Weak<Mutex<Slot>>, id: u64) -> UtteranceCallback {
    Arc::new(move |event| {
        let Some(slot) = slot.upgrade() else {
            return;
        };
        let mut guard = lock_slot(&slot);
        let Some(active) = guard.current.as_mut().filter(|active| active.id == id) else {
            debug!(utterance_id = id, ?event, "Ignoring event from stale utterance");
            return;
        };

        match event {
            UtteranceEvent::Started => debug!(utterance_id = id, "Utterance audible"),
            UtteranceEvent::Paused => active.paused = true,
            UtteranceEvent::Resumed => active.paused = false,
            UtteranceEvent::Ended => {
                let finished = guard.current.take();
                drop(guard);
                info!(utterance_id = id, "Utterance finished");
                if let Some(tx) = finished.and_then(|mut active| active.completion.take()) {
                    let _ = tx.send(Ok(()));
                }
            }
            UtteranceEvent::Failed(message) => {
                let failed = guard.current.take();
                drop(guard);
                warn!(utterance_id = id, "Speech engine reported an error: {message}");
                if let Some(tx) = failed.and_then(|mut active| active.completion.take()) {
                    let _ = tx.send(Err(SpeechError::EngineError(message)));
                }
            }
        }
    })
}
