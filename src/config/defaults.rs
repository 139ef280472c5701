pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}

pub(crate) fn default_speech_lang() -> String {
    "en".to_string()
}

pub(crate) fn default_speech_rate() -> f32 {
    1.0
}

pub(crate) fn default_speech_pitch() -> f32 {
    1.0
}

pub(crate) fn default_speech_volume() -> f32 {
    1.0
}

pub(crate) fn default_voice_name_hints() -> Vec<String> {
    vec![
        "enhanced".to_string(),
        "premium".to_string(),
        "natural".to_string(),
    ]
}

pub(crate) fn default_piper_voices_dir() -> String {
    "/usr/share/piper-voices".to_string()
}

pub(crate) fn default_piper_espeak_path() -> String {
    "/usr/share".to_string()
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    150
}

pub(crate) fn default_analysis_provider() -> crate::config::AnalysisProvider {
    crate::config::AnalysisProvider::Gemini
}

pub(crate) fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

pub(crate) fn default_analysis_model() -> String {
    "gemini-1.5-flash".to_string()
}

pub(crate) fn default_min_input_chars() -> usize {
    50
}

pub(crate) fn default_max_input_chars() -> usize {
    30_000
}

pub(crate) fn default_temperature() -> f32 {
    0.4
}

pub(crate) fn default_max_output_tokens() -> u32 {
    2048
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_prompt_template() -> String {
    "Analyze the following text and return a structured breakdown in markdown with these \
     sections:\n\
     ## Summary\nTwo or three sentences capturing the main point.\n\
     ## Key Points\nA bulleted list of the most important claims or facts.\n\
     ## Insights\nNon-obvious implications, connections or takeaways.\n\
     ## Questions\nOpen questions a careful reader would ask.\n\n\
     Text:\n\"\"\"\n{text}\n\"\"\""
        .to_string()
}

pub(crate) fn default_fetch_strategies() -> Vec<String> {
    vec![
        "{url}".to_string(),
        "https://api.allorigins.win/raw?url={url_encoded}".to_string(),
        "https://r.jina.ai/{url}".to_string(),
    ]
}

pub(crate) fn default_fetch_timeout_secs() -> u64 {
    20
}

pub(crate) fn default_user_agent() -> String {
    concat!("insight-reader/", env!("CARGO_PKG_VERSION")).to_string()
}

pub(crate) fn default_extract_min_chars() -> usize {
    200
}

pub(crate) fn default_cache_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_cache_insights() -> bool {
    true
}

pub(crate) fn default_key_play() -> String {
    "a".to_string()
}

pub(crate) fn default_key_pause() -> String {
    "p".to_string()
}

pub(crate) fn default_key_resume() -> String {
    "r".to_string()
}

pub(crate) fn default_key_stop() -> String {
    "s".to_string()
}

pub(crate) fn default_key_quit() -> String {
    "q".to_string()
}
