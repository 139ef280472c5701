use serde::{Deserialize, Serialize};

/// Tri-state playback status shared by the engine, the tracker and the view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Speaking,
    Paused,
}

impl PlaybackState {
    /// Collapse the platform's two flags into one state.
    pub fn from_flags(speaking: bool, paused: bool) -> Self {
        if paused {
            PlaybackState::Paused
        } else if speaking {
            PlaybackState::Speaking
        } else {
            PlaybackState::Idle
        }
    }

    pub fn is_active(self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Speaking => "speaking",
            PlaybackState::Paused => "paused",
        };
        write!(f, "{}", label)
    }
}
