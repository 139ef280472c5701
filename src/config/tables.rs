use super::defaults;
use super::models::{AnalysisProvider, AppConfig, LogLevel};
use serde::Deserialize;

/// On-disk layout of `config.toml`, grouped into tables.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    speech: SpeechConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    analysis: AnalysisConfig,
    #[serde(default)]
    fetch: FetchConfig,
    #[serde(default)]
    extract: ExtractConfig,
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    keys: KeysConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            speech_lang: tables.speech.lang,
            speech_voice: tables.speech.voice,
            speech_rate: tables.speech.rate,
            speech_pitch: tables.speech.pitch,
            speech_volume: tables.speech.volume,
            voice_name_hints: tables.speech.voice_name_hints,
            piper_voices_dir: tables.speech.piper_voices_dir,
            piper_espeak_path: tables.speech.piper_espeak_path,
            poll_interval_ms: tables.playback.poll_interval_ms,
            analysis_provider: tables.analysis.provider,
            api_key: tables.analysis.api_key,
            api_key_env: tables.analysis.api_key_env,
            analysis_model: tables.analysis.model,
            analysis_base_url: tables.analysis.base_url,
            min_input_chars: tables.analysis.min_input_chars,
            max_input_chars: tables.analysis.max_input_chars,
            temperature: tables.analysis.temperature,
            max_output_tokens: tables.analysis.max_output_tokens,
            request_timeout_secs: tables.analysis.request_timeout_secs,
            prompt_template: tables.analysis.prompt_template,
            fetch_strategies: tables.fetch.strategies,
            fetch_timeout_secs: tables.fetch.timeout_secs,
            user_agent: tables.fetch.user_agent,
            extract_min_chars: tables.extract.min_chars,
            cache_dir: tables.cache.dir,
            cache_insights: tables.cache.insights,
            key_play: tables.keys.play,
            key_pause: tables.keys.pause,
            key_resume: tables.keys.resume,
            key_stop: tables.keys.stop,
            key_quit: tables.keys.quit,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            speech: SpeechConfig {
                lang: config.speech_lang.clone(),
                voice: config.speech_voice.clone(),
                rate: config.speech_rate,
                pitch: config.speech_pitch,
                volume: config.speech_volume,
                voice_name_hints: config.voice_name_hints.clone(),
                piper_voices_dir: config.piper_voices_dir.clone(),
                piper_espeak_path: config.piper_espeak_path.clone(),
            },
            playback: PlaybackConfig {
                poll_interval_ms: config.poll_interval_ms,
            },
            analysis: AnalysisConfig {
                provider: config.analysis_provider,
                // Credentials are never written back to disk.
                api_key: None,
                api_key_env: config.api_key_env.clone(),
                model: config.analysis_model.clone(),
                base_url: config.analysis_base_url.clone(),
                min_input_chars: config.min_input_chars,
                max_input_chars: config.max_input_chars,
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
                request_timeout_secs: config.request_timeout_secs,
                prompt_template: config.prompt_template.clone(),
            },
            fetch: FetchConfig {
                strategies: config.fetch_strategies.clone(),
                timeout_secs: config.fetch_timeout_secs,
                user_agent: config.user_agent.clone(),
            },
            extract: ExtractConfig {
                min_chars: config.extract_min_chars,
            },
            cache: CacheConfig {
                dir: config.cache_dir.clone(),
                insights: config.cache_insights,
            },
            keys: KeysConfig {
                play: config.key_play.clone(),
                pause: config.key_pause.clone(),
                resume: config.key_resume.clone(),
                stop: config.key_stop.clone(),
                quit: config.key_quit.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct SpeechConfig {
    #[serde(default = "defaults::default_speech_lang")]
    lang: String,
    #[serde(default)]
    voice: Option<String>,
    #[serde(default = "defaults::default_speech_rate")]
    rate: f32,
    #[serde(default = "defaults::default_speech_pitch")]
    pitch: f32,
    #[serde(default = "defaults::default_speech_volume")]
    volume: f32,
    #[serde(default = "defaults::default_voice_name_hints")]
    voice_name_hints: Vec<String>,
    #[serde(default = "defaults::default_piper_voices_dir")]
    piper_voices_dir: String,
    #[serde(default = "defaults::default_piper_espeak_path")]
    piper_espeak_path: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        SpeechConfig {
            lang: defaults::default_speech_lang(),
            voice: None,
            rate: defaults::default_speech_rate(),
            pitch: defaults::default_speech_pitch(),
            volume: defaults::default_speech_volume(),
            voice_name_hints: defaults::default_voice_name_hints(),
            piper_voices_dir: defaults::default_piper_voices_dir(),
            piper_espeak_path: defaults::default_piper_espeak_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_poll_interval_ms")]
    poll_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            poll_interval_ms: defaults::default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct AnalysisConfig {
    #[serde(default = "defaults::default_analysis_provider")]
    provider: AnalysisProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default = "defaults::default_api_key_env")]
    api_key_env: String,
    #[serde(default = "defaults::default_analysis_model")]
    model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default = "defaults::default_min_input_chars")]
    min_input_chars: usize,
    #[serde(default = "defaults::default_max_input_chars")]
    max_input_chars: usize,
    #[serde(default = "defaults::default_temperature")]
    temperature: f32,
    #[serde(default = "defaults::default_max_output_tokens")]
    max_output_tokens: u32,
    #[serde(default = "defaults::default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "defaults::default_prompt_template")]
    prompt_template: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            provider: defaults::default_analysis_provider(),
            api_key: None,
            api_key_env: defaults::default_api_key_env(),
            model: defaults::default_analysis_model(),
            base_url: None,
            min_input_chars: defaults::default_min_input_chars(),
            max_input_chars: defaults::default_max_input_chars(),
            temperature: defaults::default_temperature(),
            max_output_tokens: defaults::default_max_output_tokens(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
            prompt_template: defaults::default_prompt_template(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct FetchConfig {
    #[serde(default = "defaults::default_fetch_strategies")]
    strategies: Vec<String>,
    #[serde(default = "defaults::default_fetch_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "defaults::default_user_agent")]
    user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            strategies: defaults::default_fetch_strategies(),
            timeout_secs: defaults::default_fetch_timeout_secs(),
            user_agent: defaults::default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ExtractConfig {
    #[serde(default = "defaults::default_extract_min_chars")]
    min_chars: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            min_chars: defaults::default_extract_min_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct CacheConfig {
    #[serde(default = "defaults::default_cache_dir")]
    dir: String,
    #[serde(default = "defaults::default_cache_insights")]
    insights: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            dir: defaults::default_cache_dir(),
            insights: defaults::default_cache_insights(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct KeysConfig {
    #[serde(default = "defaults::default_key_play")]
    play: String,
    #[serde(default = "defaults::default_key_pause")]
    pause: String,
    #[serde(default = "defaults::default_key_resume")]
    resume: String,
    #[serde(default = "defaults::default_key_stop")]
    stop: String,
    #[serde(default = "defaults::default_key_quit")]
    quit: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        KeysConfig {
            play: defaults::default_key_play(),
            pause: defaults::default_key_pause(),
            resume: defaults::default_key_resume(),
            stop: defaults::default_key_stop(),
            quit: defaults::default_key_quit(),
        }
    }
}
