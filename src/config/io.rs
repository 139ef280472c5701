use super::models::AppConfig;
use super::tables::ConfigTables;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str::<ConfigTables>(contents).map(AppConfig::from)
}

pub fn serialize_config(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&ConfigTables::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisProvider, LogLevel};
    use std::time::Duration;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse_config("").expect("empty TOML is valid");
        assert_eq!(cfg.log_level, LogLevel::Info);
        assert_eq!(cfg.poll_interval_ms, 150);
        assert_eq!(cfg.analysis_provider, AnalysisProvider::Gemini);
        assert_eq!(cfg.fetch_strategies.len(), 3);
    }

    #[test]
    fn tables_map_onto_flat_config() {
        let cfg = parse_config(
            r#"
            [logging]
            log_level = "trace"

            [speech]
            lang = "fr"
            voice = "Amelie (Enhanced)"
            rate = 1.5

            [playback]
            poll_interval_ms = 120

            [analysis]
            provider = "open-ai"
            model = "gpt-4o-mini"
            min_input_chars = 80

            [keys]
            pause = "x"
            "#,
        )
        .expect("valid config");
        assert_eq!(cfg.log_level, LogLevel::Trace);
        assert_eq!(cfg.speech_lang, "fr");
        assert_eq!(cfg.speech_voice.as_deref(), Some("Amelie (Enhanced)"));
        assert_eq!(cfg.speech_rate, 1.5);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(120));
        assert_eq!(cfg.analysis_provider, AnalysisProvider::OpenAi);
        assert_eq!(cfg.analysis_model, "gpt-4o-mini");
        assert_eq!(cfg.min_input_chars, 80);
        assert_eq!(cfg.key_pause, "x");
        assert_eq!(cfg.key_resume, "r");
    }

    #[test]
    fn poll_interval_is_clamped() {
        let fast = parse_config("[playback]\npoll_interval_ms = 5").expect("valid");
        assert_eq!(fast.poll_interval(), Duration::from_millis(100));
        let slow = parse_config("[playback]\npoll_interval_ms = 5000").expect("valid");
        assert_eq!(slow.poll_interval(), Duration::from_millis(200));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&dir.path().join("missing.toml"));
        assert_eq!(cfg.speech_lang, "en");
    }

    #[test]
    fn invalid_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[speech\nlang = ").expect("write config");
        let cfg = load_config(&path);
        assert_eq!(cfg.speech_lang, "en");
    }

    #[test]
    fn serialized_config_omits_api_key_and_reloads() {
        let mut cfg = AppConfig::default();
        cfg.api_key = Some("secret".to_string());
        cfg.speech_lang = "de".to_string();
        let text = serialize_config(&cfg).expect("serialize");
        assert!(!text.contains("secret"));
        let reloaded = parse_config(&text).expect("reparse");
        assert_eq!(reloaded.speech_lang, "de");
        assert_eq!(reloaded.api_key, None);
    }
}
