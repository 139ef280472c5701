use super::platform::Voice;

/// Pick the best voice for `lang`.
///
/// Preference order: the explicitly requested voice, a language match whose
/// name carries a quality hint, any language match, the first voice, none.
pub fn select_voice(
    voices: &[Voice],
    lang: &str,
    requested: Option<&str>,
    quality_hints: &[String],
) -> Option<Voice> {
    if let Some(name) = requested.map(str::trim).filter(|name| !name.is_empty()) {
        if let Some(voice) = voices.iter().find(|v| v.name.eq_ignore_ascii_case(name)) {
            return Some(voice.clone());
        }
    }

    let prefix = normalize_lang(lang);
    let matches_lang = |voice: &&Voice| !prefix.is_empty() && normalize_lang(&voice.lang).starts_with(&prefix);
    let has_hint = |voice: &&Voice| {
        let name = voice.name.to_lowercase();
        quality_hints
            .iter()
            .any(|hint| !hint.is_empty() && name.contains(&hint.to_lowercase()))
    };

    voices
        .iter()
        .filter(matches_lang)
        .find(has_hint)
        .or_else(|| voices.iter().find(matches_lang))
        .or_else(|| voices.first())
        .cloned()
}

fn normalize_lang(lang: &str) -> String {
    lang.trim().to_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> Vec<String> {
        vec!["enhanced".into(), "premium".into(), "natural".into()]
    }

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("Thomas", "fr-FR"),
            Voice::new("Alex", "en-US"),
            Voice::new("Ava (Premium)", "en-US"),
            Voice::new("Daniel", "en_GB"),
        ]
    }

    #[test]
    fn prefers_hinted_voice_in_language() {
        let picked = select_voice(&voices(), "en", None, &hints()).expect("voice");
        assert_eq!(picked.name, "Ava (Premium)");
    }

    #[test]
    fn falls_back_to_plain_language_match() {
        let picked = select_voice(&voices(), "en-gb", None, &hints()).expect("voice");
        assert_eq!(picked.name, "Daniel");
    }

    #[test]
    fn falls_back_to_first_voice_without_language_match() {
        let picked = select_voice(&voices(), "ja", None, &hints()).expect("voice");
        assert_eq!(picked.name, "Thomas");
    }

    #[test]
    fn explicit_voice_wins_regardless_of_language() {
        let picked = select_voice(&voices(), "en", Some("thomas"), &hints()).expect("voice");
        assert_eq!(picked.name, "Thomas");
    }

    #[test]
    fn unknown_explicit_voice_uses_normal_preference() {
        let picked = select_voice(&voices(), "en", Some("Nobody"), &hints()).expect("voice");
        assert_eq!(picked.name, "Ava (Premium)");
    }

    #[test]
    fn empty_voice_list_selects_nothing() {
        assert_eq!(select_voice(&[], "en", None, &hints()), None);
    }
}
