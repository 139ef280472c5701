//! Keyboard controls for the terminal read-aloud session.

use crate::cancellation::CancellationToken;
use crate::config::AppConfig;
use crate::error::SpeechError;
use crate::session::InsightsView;
use crate::speech::PlaybackOutcome;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// How the most recent utterance finished.
pub type PlaybackResult = Result<PlaybackOutcome, SpeechError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Play,
    Pause,
    Resume,
    Stop,
    Quit,
}

/// Configured key for each action.
#[derive(Debug, Clone)]
pub struct Controls {
    bindings: Vec<(String, Action)>,
}

impl Controls {
    pub fn from_config(config: &AppConfig) -> Self {
        let bindings = [
            (&config.key_play, Action::Play),
            (&config.key_pause, Action::Pause),
            (&config.key_resume, Action::Resume),
            (&config.key_stop, Action::Stop),
            (&config.key_quit, Action::Quit),
        ]
        .into_iter()
        .map(|(key, action)| (key.trim().to_lowercase(), action))
        .filter(|(key, _)| !key.is_empty())
        .collect();
        Self { bindings }
    }

    /// Action bound to a line of input, if any. The first binding wins when
    /// two actions share a key.
    pub fn action_for(&self, input: &str) -> Option<Action> {
        let input = input.trim().to_lowercase();
        self.bindings
            .iter()
            .find(|(key, _)| *key == input)
            .map(|(_, action)| *action)
    }

    pub fn help(&self) -> String {
        let parts: Vec<String> = self
            .bindings
            .iter()
            .map(|(key, action)| format!("{key}={}", action_label(*action)))
            .collect();
        format!("Controls (type a key, then Enter): {}", parts.join("  "))
    }
}

fn action_label(action: Action) -> &'static str {
    match action {
        Action::Play => "play",
        Action::Pause => "pause",
        Action::Resume => "resume",
        Action::Stop => "stop",
        Action::Quit => "quit",
    }
}

/// Read the view's insight aloud, applying control lines from `input`.
///
/// Returns on quit, cancellation, or once `input` is exhausted and playback
/// has gone idle. The result is the outcome of the last utterance that
/// finished while the loop was running.
pub async fn read_aloud<R>(
    view: &mut InsightsView,
    controls: &Controls,
    token: &CancellationToken,
    input: R,
) -> io::Result<Option<PlaybackResult>>
where
    R: AsyncBufRead + Unpin,
{
    eprintln!("{}", controls.help());
    let mut states = view.subscribe();
    let mut lines = input.lines();
    let mut input_open = true;
    let mut last = None;

    let mut playback = view.play();
    report_notice(view);

    loop {
        if !input_open && !view.state().is_active() {
            break;
        }
        tokio::select! {
            _ = token.cancelled() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                info!(%state, "Playback state changed");
                eprintln!("[{state}]");
            }
            joined = next_outcome(&mut playback) => {
                playback = None;
                last = record_outcome(joined).or(last);
                report_notice(view);
            }
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    debug!("Control input closed; reading until playback ends");
                    input_open = false;
                    continue;
                };
                match controls.action_for(&line) {
                    Some(Action::Play) => playback = view.play(),
                    Some(Action::Pause) => view.pause(),
                    Some(Action::Resume) => view.resume(),
                    Some(Action::Stop) => view.stop(),
                    Some(Action::Quit) => break,
                    None if line.trim().is_empty() => {}
                    None => eprintln!("{}", controls.help()),
                }
                report_notice(view);
            }
        }
    }

    if let Some(task) = playback.filter(|task| task.is_finished()) {
        last = record_outcome(task.await).or(last);
        report_notice(view);
    }
    Ok(last)
}

async fn next_outcome(
    playback: &mut Option<JoinHandle<PlaybackResult>>,
) -> Result<PlaybackResult, JoinError> {
    match playback {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

fn record_outcome(joined: Result<PlaybackResult, JoinError>) -> Option<PlaybackResult> {
    match joined {
        Ok(Ok(outcome)) => {
            debug!(?outcome, "Playback finished");
            Some(Ok(outcome))
        }
        Ok(Err(err)) => {
            warn!("Playback failed: {err}");
            Some(Err(err))
        }
        Err(err) => {
            warn!("Playback task ended abnormally: {err}");
            None
        }
    }
}

fn report_notice(view: &mut InsightsView) {
    if let Some(notice) = view.notice() {
        eprintln!("! {notice}");
        view.dismiss_notice();
    }
}
