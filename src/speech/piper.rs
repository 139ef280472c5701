//! Local neural speech backend using `piper-rs`, played through `rodio`.
//!
//! Synthesized audio is cached as WAV under the cache directory, keyed by
//! voice model, text and rate. Playback runs on a dedicated audio thread that
//! owns the output stream; the platform talks to it over a channel. Engine
//! flags carry the sequence number of the newest speak or cancel, and the
//! audio thread only writes them for that sequence.

use super::platform::{
    SpeechPlatform, SynthesisRequest, UtteranceCallback, UtteranceEvent, Voice,
    VoicesReadyCallback,
};
use crate::error::SpeechError;
use anyhow::{Context, Result};
use piper_rs::from_config_path;
use piper_rs::synth::{AudioOutputConfig, PiperSpeechSynthesizer};
use rodio::{Decoder, OutputStream, Sink};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::env;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const AUDIO_TICK: Duration = Duration::from_millis(50);

enum AudioCommand {
    Speak {
        seq: u64,
        request: SynthesisRequest,
        model_path: Option<PathBuf>,
        events: UtteranceCallback,
    },
    Pause,
    Resume,
    Cancel,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct EngineFlags {
    seq: u64,
    speaking: bool,
    paused: bool,
}

/// Raw engine state shared between the platform and the audio thread.
#[derive(Default)]
struct Flags(Mutex<EngineFlags>);

impl Flags {
    fn lock(&self) -> MutexGuard<'_, EngineFlags> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> EngineFlags {
        *self.lock()
    }

    /// Claim a sequence for a newly queued utterance. Synthesis takes a
    /// while, so it reads as speaking from this point.
    fn begin(&self) -> u64 {
        let mut flags = self.lock();
        flags.seq = flags.seq.wrapping_add(1);
        flags.speaking = true;
        flags.paused = false;
        flags.seq
    }

    fn cancel(&self) {
        let mut flags = self.lock();
        flags.seq = flags.seq.wrapping_add(1);
        flags.speaking = false;
        flags.paused = false;
    }

    /// Record a pause or resume request. Ignored when nothing is speaking.
    fn request_paused(&self, paused: bool) -> bool {
        let mut flags = self.lock();
        if !flags.speaking {
            return false;
        }
        flags.paused = paused;
        true
    }

    /// Requested pause state for `seq`, or `None` once it was superseded.
    fn wants_paused(&self, seq: u64) -> Option<bool> {
        let flags = self.lock();
        (flags.seq == seq).then_some(flags.paused)
    }

    /// Audio for `seq` is playing. Returns whether it should start paused,
    /// or `None` if it was superseded during synthesis.
    fn started(&self, seq: u64) -> Option<bool> {
        let mut flags = self.lock();
        if flags.seq != seq {
            return None;
        }
        flags.speaking = true;
        Some(flags.paused)
    }

    /// `seq` ended or failed. Stale sequences leave the flags alone.
    fn finished(&self, seq: u64) -> bool {
        let mut flags = self.lock();
        if flags.seq != seq {
            return false;
        }
        flags.speaking = false;
        flags.paused = false;
        true
    }
}

#[derive(Default)]
struct VoiceRegistry {
    loaded: bool,
    voices: Vec<(Voice, PathBuf)>,
    waiters: Vec<VoicesReadyCallback>,
}

pub struct PiperPlatform {
    commands: mpsc::Sender<AudioCommand>,
    flags: Arc<Flags>,
    registry: Arc<Mutex<VoiceRegistry>>,
}

fn lock_registry(registry: &Mutex<VoiceRegistry>) -> MutexGuard<'_, VoiceRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PiperPlatform {
    pub fn new(voices_dir: PathBuf, espeak_path: PathBuf, cache_root: PathBuf) -> Result<Self> {
        let espeak_path = sanitize_espeak_root(espeak_path);
        if env::var_os("PIPER_ESPEAKNG_DATA_DIRECTORY").is_none() {
            // Set once during startup, before any synthesis thread exists.
            unsafe {
                env::set_var("PIPER_ESPEAKNG_DATA_DIRECTORY", &espeak_path);
            }
        }
        info!(
            voices_dir = %voices_dir.display(),
            espeak_root = %espeak_path.display(),
            "Initializing Piper speech backend"
        );

        let flags = Arc::new(Flags::default());
        let (commands, receiver) = mpsc::channel();
        let audio_flags = Arc::clone(&flags);
        let audio_cache = cache_root.join("speech");
        thread::Builder::new()
            .name("speech-audio".into())
            .spawn(move || audio_thread(receiver, audio_flags, audio_cache))
            .context("Spawning audio thread")?;

        let registry = Arc::new(Mutex::new(VoiceRegistry::default()));
        let scan_registry = Arc::clone(&registry);
        thread::Builder::new()
            .name("speech-voices".into())
            .spawn(move || {
                let voices = discover_voices(&voices_dir);
                info!(count = voices.len(), "Piper voices discovered");
                let waiters = {
                    let mut registry = lock_registry(&scan_registry);
                    registry.voices = voices;
                    registry.loaded = true;
                    std::mem::take(&mut registry.waiters)
                };
                for waiter in waiters {
                    waiter();
                }
            })
            .context("Spawning voice discovery thread")?;

        Ok(Self {
            commands,
            flags,
            registry,
        })
    }

    fn model_for(&self, voice: Option<&Voice>) -> Option<PathBuf> {
        let registry = lock_registry(&self.registry);
        voice
            .and_then(|voice| registry.voices.iter().find(|(v, _)| v == voice))
            .or_else(|| registry.voices.first())
            .map(|(_, path)| path.clone())
    }

    fn send(&self, command: AudioCommand) {
        if self.commands.send(command).is_err() {
            warn!("Audio thread is gone; speech command dropped");
        }
    }
}

impl SpeechPlatform for PiperPlatform {
    fn is_supported(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<Voice> {
        lock_registry(&self.registry)
            .voices
            .iter()
            .map(|(voice, _)| voice.clone())
            .collect()
    }

    fn on_voices_ready(&self, callback: VoicesReadyCallback) {
        {
            let mut registry = lock_registry(&self.registry);
            if !registry.loaded {
                registry.waiters.push(callback);
                return;
            }
        }
        callback();
    }

    fn speak(&self, request: SynthesisRequest, events: UtteranceCallback) {
        let model_path = self.model_for(request.voice.as_ref());
        let seq = self.flags.begin();
        self.send(AudioCommand::Speak {
            seq,
            request,
            model_path,
            events,
        });
    }

    fn pause(&self) {
        if self.flags.request_paused(true) {
            self.send(AudioCommand::Pause);
        }
    }

    fn resume(&self) {
        if self.flags.request_paused(false) {
            self.send(AudioCommand::Resume);
        }
    }

    fn cancel(&self) {
        self.flags.cancel();
        self.send(AudioCommand::Cancel);
    }

    fn is_speaking(&self) -> Result<bool, SpeechError> {
        Ok(self.flags.snapshot().speaking)
    }

    fn is_paused(&self) -> Result<bool, SpeechError> {
        Ok(self.flags.snapshot().paused)
    }
}

struct Playing {
    seq: u64,
    sink: Sink,
    events: UtteranceCallback,
}

fn audio_thread(receiver: mpsc::Receiver<AudioCommand>, flags: Arc<Flags>, cache_root: PathBuf) {
    let output = OutputStream::try_default();
    if let Err(err) = &output {
        warn!("Opening audio output failed: {err}");
    }
    let mut synthesizers: HashMap<PathBuf, PiperSpeechSynthesizer> = HashMap::new();
    let mut playing: Option<Playing> = None;

    loop {
        match receiver.recv_timeout(AUDIO_TICK) {
            Ok(AudioCommand::Speak {
                seq,
                request,
                model_path,
                events,
            }) => {
                if let Some(previous) = playing.take() {
                    previous.sink.stop();
                }
                if flags.wants_paused(seq).is_none() {
                    debug!(seq, "Skipping superseded utterance");
                    continue;
                }
                let handle = match &output {
                    Ok((_stream, handle)) => handle,
                    Err(err) => {
                        flags.finished(seq);
                        events(UtteranceEvent::Failed(format!("no audio output: {err}")));
                        continue;
                    }
                };
                match start_playback(handle, &mut synthesizers, &cache_root, &request, model_path) {
                    Ok(sink) => match flags.started(seq) {
                        Some(start_paused) => {
                            events(UtteranceEvent::Started);
                            if start_paused {
                                sink.pause();
                                events(UtteranceEvent::Paused);
                            }
                            playing = Some(Playing { seq, sink, events });
                        }
                        None => {
                            debug!(seq, "Utterance superseded during synthesis");
                            sink.stop();
                        }
                    },
                    Err(err) => {
                        warn!("Piper playback failed: {err:#}");
                        flags.finished(seq);
                        events(UtteranceEvent::Failed(format!("{err:#}")));
                    }
                }
            }
            Ok(AudioCommand::Pause) => {
                // Requests made before audio starts are applied by `started`.
                if let Some(current) = &playing {
                    if flags.wants_paused(current.seq) == Some(true) && !current.sink.is_paused() {
                        current.sink.pause();
                        (current.events)(UtteranceEvent::Paused);
                    }
                }
            }
            Ok(AudioCommand::Resume) => {
                if let Some(current) = &playing {
                    if flags.wants_paused(current.seq) == Some(false) && current.sink.is_paused() {
                        current.sink.play();
                        (current.events)(UtteranceEvent::Resumed);
                    }
                }
            }
            Ok(AudioCommand::Cancel) => {
                if let Some(current) = playing.take() {
                    debug!("Stopping audio sink");
                    current.sink.stop();
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if playing.as_ref().is_some_and(|current| current.sink.empty()) {
            if let Some(finished) = playing.take() {
                flags.finished(finished.seq);
                (finished.events)(UtteranceEvent::Ended);
            }
        }
    }
    debug!("Audio thread exiting");
}

fn start_playback(
    handle: &rodio::OutputStreamHandle,
    synthesizers: &mut HashMap<PathBuf, PiperSpeechSynthesizer>,
    cache_root: &Path,
    request: &SynthesisRequest,
    model_path: Option<PathBuf>,
) -> Result<Sink> {
    let model_path = model_path.context("No Piper voices available")?;
    let path = cache_path(cache_root, &model_path, &request.text, request.rate, request.pitch);

    if !path.exists() {
        if !synthesizers.contains_key(&model_path) {
            let config_path = resolve_piper_config(&model_path);
            if !config_path.exists() {
                anyhow::bail!(
                    "Piper config not found at {} (expected from {})",
                    config_path.display(),
                    model_path.display()
                );
            }
            let model = from_config_path(&config_path).context("Loading Piper model")?;
            let synthesizer =
                PiperSpeechSynthesizer::new(model).context("Preparing Piper synthesizer")?;
            synthesizers.insert(model_path.clone(), synthesizer);
        }
        let piper = synthesizers
            .get(&model_path)
            .context("Piper synthesizer missing after load")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Creating speech cache directory")?;
        }
        synth_with_piper(piper, &path, request)?;
    } else {
        debug!(path = %path.display(), "Reusing cached speech audio");
    }

    let sink = Sink::try_new(handle).context("Creating sink")?;
    let reader = BufReader::new(File::open(&path).context("Opening synthesized audio")?);
    sink.append(Decoder::new(reader).context("Decoding synthesized audio")?);
    sink.set_volume(request.volume);
    sink.play();
    Ok(sink)
}

fn synth_with_piper(piper: &PiperSpeechSynthesizer, path: &Path, request: &SynthesisRequest) -> Result<()> {
    debug!(
        path = %path.display(),
        rate = request.rate,
        pitch = request.pitch,
        chars = request.text.len(),
        "Synthesizing utterance with Piper"
    );
    let unchanged = (request.rate - 1.0).abs() <= f32::EPSILON
        && (request.pitch - 1.0).abs() <= f32::EPSILON;
    let output_config = if unchanged {
        None
    } else {
        Some(AudioOutputConfig {
            rate: Some(speed_to_rate_percent(request.rate)),
            volume: None,
            pitch: Some(pitch_to_percent(request.pitch)),
            appended_silence_ms: None,
        })
    };
    piper
        .synthesize_to_file(path, request.text.clone(), output_config)
        .context("Synthesizing audio")?;
    Ok(())
}

/// Every `<name>.onnx` with a sibling `<name>.onnx.json` is a voice. The
/// language comes from the conventional `en_US-name-quality` stem.
fn discover_voices(dir: &Path) -> Vec<(Voice, PathBuf)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), "Reading Piper voices directory failed: {err}");
            return Vec::new();
        }
    };
    let mut voices: Vec<(Voice, PathBuf)> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "onnx"))
        .filter(|path| resolve_piper_config(path).exists())
        .filter_map(|path| {
            let stem = path.file_stem()?.to_string_lossy().into_owned();
            Some((voice_from_stem(&stem), path))
        })
        .collect();
    voices.sort_by(|a, b| a.0.name.cmp(&b.0.name));
    voices
}

fn voice_from_stem(stem: &str) -> Voice {
    let lang = stem.split(['-', '.']).next().unwrap_or_default();
    Voice::new(stem, lang)
}

fn cache_path(base: &Path, model_path: &Path, text: &str, rate: f32, pitch: f32) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(model_path.as_os_str().to_string_lossy().as_bytes());
    hasher.update(text.as_bytes());
    hasher.update(rate.to_le_bytes());
    hasher.update(pitch.to_le_bytes());
    let hash = format!("{:x}", hasher.finalize());
    base.join(format!("tts-{hash}.wav"))
}

/// Piper expects the parent directory that contains `espeak-ng-data/phonindex`.
/// Users often point directly at `.../espeak-ng-data`; trim that to avoid
/// duplicated segments like `/espeak-ng-data/espeak-ng-data/phonindex`.
fn sanitize_espeak_root(path: PathBuf) -> PathBuf {
    if path
        .file_name()
        .map(|n| n == "espeak-ng-data")
        .unwrap_or(false)
    {
        if let Some(parent) = path.parent() {
            debug!(
                original = %path.display(),
                sanitized = %parent.display(),
                "Trimming espeak-ng-data suffix"
            );
            return parent.to_path_buf();
        }
    }
    path
}

fn resolve_piper_config(model_path: &Path) -> PathBuf {
    if model_path
        .extension()
        .map(|ext| ext == "onnx")
        .unwrap_or(false)
    {
        return model_path.with_extension("onnx.json");
    }
    model_path.to_path_buf()
}

fn speed_to_rate_percent(speed: f32) -> u8 {
    let clamped = speed.clamp(0.5, 5.5);
    let percent = ((clamped - 0.5) / 5.0) * 100.0;
    percent.round().clamp(0.0, 100.0) as u8
}

fn pitch_to_percent(pitch: f32) -> u8 {
    (pitch.clamp(0.0, 2.0) * 50.0).round() as u8
}
