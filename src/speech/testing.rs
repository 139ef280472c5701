//! Scriptable in-memory speech platform for unit tests.

use super::platform::{
    SpeechPlatform, SynthesisRequest, UtteranceCallback, UtteranceEvent, Voice,
    VoicesReadyCallback,
};
use crate::error::SpeechError;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct FakeState {
    supported: bool,
    voices: Vec<Voice>,
    voice_waiters: Vec<VoicesReadyCallback>,
    spoken: Vec<SynthesisRequest>,
    callbacks: Vec<UtteranceCallback>,
    current: Option<UtteranceCallback>,
    speaking: bool,
    paused: bool,
    fail_queries: bool,
    pause_calls: usize,
    resume_calls: usize,
    cancel_calls: usize,
}

pub(crate) struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    /// Supported platform with one English voice loaded.
    pub(crate) fn new() -> Arc<Self> {
        Self::build(true, vec![Voice::new("Alex", "en-US")])
    }

    /// Supported platform whose voice list has not loaded yet.
    pub(crate) fn without_voices() -> Arc<Self> {
        Self::build(true, Vec::new())
    }

    pub(crate) fn unsupported() -> Arc<Self> {
        Self::build(false, Vec::new())
    }

    fn build(supported: bool, voices: Vec<Voice>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                supported,
                voices,
                ..FakeState::default()
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake platform lock")
    }

    /// Populate the voice list and fire pending voices-ready callbacks.
    pub(crate) fn publish_voices(&self, voices: Vec<Voice>) {
        let waiters = {
            let mut state = self.lock();
            state.voices = voices;
            std::mem::take(&mut state.voice_waiters)
        };
        for waiter in waiters {
            waiter();
        }
    }

    /// Let the current utterance play to its natural end.
    pub(crate) fn finish_current(&self) {
        if let Some(callback) = self.stop_current() {
            callback(UtteranceEvent::Ended);
        }
    }

    pub(crate) fn fail_current(&self, message: &str) {
        if let Some(callback) = self.stop_current() {
            callback(UtteranceEvent::Failed(message.to_string()));
        }
    }

    /// Deliver `event` through the callback of the `index`-th spoken utterance.
    pub(crate) fn fire_recorded(&self, index: usize, event: UtteranceEvent) {
        let callback = self.lock().callbacks.get(index).cloned();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    /// Change the engine flags without emitting any event.
    pub(crate) fn set_raw(&self, speaking: bool, paused: bool) {
        let mut state = self.lock();
        state.speaking = speaking;
        state.paused = paused;
    }

    pub(crate) fn set_query_failure(&self, fail: bool) {
        self.lock().fail_queries = fail;
    }

    pub(crate) fn spoken(&self) -> Vec<SynthesisRequest> {
        self.lock().spoken.clone()
    }

    pub(crate) fn pause_count(&self) -> usize {
        self.lock().pause_calls
    }

    pub(crate) fn resume_count(&self) -> usize {
        self.lock().resume_calls
    }

    pub(crate) fn cancel_count(&self) -> usize {
        self.lock().cancel_calls
    }

    fn stop_current(&self) -> Option<UtteranceCallback> {
        let mut state = self.lock();
        state.speaking = false;
        state.paused = false;
        state.current.take()
    }

    fn query(&self, read: impl FnOnce(&FakeState) -> bool) -> Result<bool, SpeechError> {
        let state = self.lock();
        if state.fail_queries {
            return Err(SpeechError::EngineError("query failed".into()));
        }
        Ok(read(&state))
    }
}

impl SpeechPlatform for FakePlatform {
    fn is_supported(&self) -> bool {
        self.lock().supported
    }

    fn voices(&self) -> Vec<Voice> {
        self.lock().voices.clone()
    }

    fn on_voices_ready(&self, callback: VoicesReadyCallback) {
        self.lock().voice_waiters.push(callback);
    }

    fn speak(&self, request: SynthesisRequest, events: UtteranceCallback) {
        {
            let mut state = self.lock();
            state.spoken.push(request);
            state.callbacks.push(events.clone());
            state.current = Some(events.clone());
            state.speaking = true;
            state.paused = false;
        }
        events(UtteranceEvent::Started);
    }

    fn pause(&self) {
        let callback = {
            let mut state = self.lock();
            state.pause_calls += 1;
            if !state.speaking {
                return;
            }
            state.paused = true;
            state.current.clone()
        };
        if let Some(callback) = callback {
            callback(UtteranceEvent::Paused);
        }
    }

    fn resume(&self) {
        let callback = {
            let mut state = self.lock();
            state.resume_calls += 1;
            if !state.paused {
                return;
            }
            state.paused = false;
            state.current.clone()
        };
        if let Some(callback) = callback {
            callback(UtteranceEvent::Resumed);
        }
    }

    /// Mirrors engines that report an interruption error for the cancelled
    /// utterance.
    fn cancel(&self) {
        let callback = {
            let mut state = self.lock();
            state.cancel_calls += 1;
            state.speaking = false;
            state.paused = false;
            state.current.take()
        };
        if let Some(callback) = callback {
            callback(UtteranceEvent::Failed("interrupted".into()));
        }
    }

    fn is_speaking(&self) -> Result<bool, SpeechError> {
        self.query(|state| state.speaking)
    }

    fn is_paused(&self) -> Result<bool, SpeechError> {
        self.query(|state| state.paused)
    }
}
