use serde::Deserialize;
use std::time::Duration;

pub(crate) const MIN_POLL_INTERVAL_MS: u64 = 100;
pub(crate) const MAX_POLL_INTERVAL_MS: u64 = 200;
pub(crate) const MIN_SPEECH_RATE: f32 = 0.1;
pub(crate) const MAX_SPEECH_RATE: f32 = 10.0;
pub(crate) const MAX_SPEECH_PITCH: f32 = 2.0;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "crate::config::defaults::default_speech_lang")]
    pub speech_lang: String,
    #[serde(default)]
    pub speech_voice: Option<String>,
    #[serde(default = "crate::config::defaults::default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "crate::config::defaults::default_speech_pitch")]
    pub speech_pitch: f32,
    #[serde(default = "crate::config::defaults::default_speech_volume")]
    pub speech_volume: f32,
    #[serde(default = "crate::config::defaults::default_voice_name_hints")]
    pub voice_name_hints: Vec<String>,
    #[serde(default = "crate::config::defaults::default_piper_voices_dir")]
    pub piper_voices_dir: String,
    #[serde(default = "crate::config::defaults::default_piper_espeak_path")]
    pub piper_espeak_path: String,
    #[serde(default = "crate::config::defaults::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "crate::config::defaults::default_analysis_provider")]
    pub analysis_provider: AnalysisProvider,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "crate::config::defaults::default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "crate::config::defaults::default_analysis_model")]
    pub analysis_model: String,
    #[serde(default)]
    pub analysis_base_url: Option<String>,
    #[serde(default = "crate::config::defaults::default_min_input_chars")]
    pub min_input_chars: usize,
    #[serde(default = "crate::config::defaults::default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "crate::config::defaults::default_temperature")]
    pub temperature: f32,
    #[serde(default = "crate::config::defaults::default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "crate::config::defaults::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_prompt_template")]
    pub prompt_template: String,
    #[serde(default = "crate::config::defaults::default_fetch_strategies")]
    pub fetch_strategies: Vec<String>,
    #[serde(default = "crate::config::defaults::default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "crate::config::defaults::default_extract_min_chars")]
    pub extract_min_chars: usize,
    #[serde(default = "crate::config::defaults::default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "crate::config::defaults::default_cache_insights")]
    pub cache_insights: bool,
    #[serde(default = "crate::config::defaults::default_key_play")]
    pub key_play: String,
    #[serde(default = "crate::config::defaults::default_key_pause")]
    pub key_pause: String,
    #[serde(default = "crate::config::defaults::default_key_resume")]
    pub key_resume: String,
    #[serde(default = "crate::config::defaults::default_key_stop")]
    pub key_stop: String,
    #[serde(default = "crate::config::defaults::default_key_quit")]
    pub key_quit: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            speech_lang: crate::config::defaults::default_speech_lang(),
            speech_voice: None,
            speech_rate: crate::config::defaults::default_speech_rate(),
            speech_pitch: crate::config::defaults::default_speech_pitch(),
            speech_volume: crate::config::defaults::default_speech_volume(),
            voice_name_hints: crate::config::defaults::default_voice_name_hints(),
            piper_voices_dir: crate::config::defaults::default_piper_voices_dir(),
            piper_espeak_path: crate::config::defaults::default_piper_espeak_path(),
            poll_interval_ms: crate::config::defaults::default_poll_interval_ms(),
            analysis_provider: crate::config::defaults::default_analysis_provider(),
            api_key: None,
            api_key_env: crate::config::defaults::default_api_key_env(),
            analysis_model: crate::config::defaults::default_analysis_model(),
            analysis_base_url: None,
            min_input_chars: crate::config::defaults::default_min_input_chars(),
            max_input_chars: crate::config::defaults::default_max_input_chars(),
            temperature: crate::config::defaults::default_temperature(),
            max_output_tokens: crate::config::defaults::default_max_output_tokens(),
            request_timeout_secs: crate::config::defaults::default_request_timeout_secs(),
            prompt_template: crate::config::defaults::default_prompt_template(),
            fetch_strategies: crate::config::defaults::default_fetch_strategies(),
            fetch_timeout_secs: crate::config::defaults::default_fetch_timeout_secs(),
            user_agent: crate::config::defaults::default_user_agent(),
            extract_min_chars: crate::config::defaults::default_extract_min_chars(),
            cache_dir: crate::config::defaults::default_cache_dir(),
            cache_insights: crate::config::defaults::default_cache_insights(),
            key_play: crate::config::defaults::default_key_play(),
            key_pause: crate::config::defaults::default_key_pause(),
            key_resume: crate::config::defaults::default_key_resume(),
            key_stop: crate::config::defaults::default_key_stop(),
            key_quit: crate::config::defaults::default_key_quit(),
        }
    }
}

impl AppConfig {
    /// Poll cadence for the reconciliation loop, clamped to 100–200 ms.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        )
    }

    pub fn clamped_speech_rate(&self) -> f32 {
        self.speech_rate.clamp(MIN_SPEECH_RATE, MAX_SPEECH_RATE)
    }

    pub fn clamped_speech_pitch(&self) -> f32 {
        self.speech_pitch.clamp(0.0, MAX_SPEECH_PITCH)
    }

    pub fn clamped_speech_volume(&self) -> f32 {
        self.speech_volume.clamp(0.0, 1.0)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

/// Which LLM wire protocol the analysis client speaks.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisProvider {
    Gemini,
    #[serde(alias = "openai")]
    OpenAi,
}

impl Default for AnalysisProvider {
    fn default() -> Self {
        AnalysisProvider::Gemini
    }
}

impl std::fmt::Display for AnalysisProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AnalysisProvider::Gemini => "gemini",
            AnalysisProvider::OpenAi => "open-ai",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
