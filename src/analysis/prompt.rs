use tracing::debug;

const TEXT_PLACEHOLDER: &str = "{text}";

/// Fill the analysis template with the article text. Templates without a
/// `{text}` placeholder get the text appended after a blank line.
pub fn render_prompt(template: &str, text: &str) -> String {
    if template.contains(TEXT_PLACEHOLDER) {
        template.replace(TEXT_PLACEHOLDER, text)
    } else {
        format!("{}\n\n{}", template.trim_end(), text)
    }
}

/// Cut `text` to at most `max_chars` characters, preferring a whitespace
/// boundary near the limit.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };
    let head = &text[..cut];
    let trimmed = match head.rfind(char::is_whitespace) {
        Some(space) if space >= cut / 2 => head[..space].trim_end(),
        _ => head,
    };
    debug!(
        original_bytes = text.len(),
        kept_bytes = trimmed.len(),
        "Truncated analysis input"
    );
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_replaced() {
        assert_eq!(
            render_prompt("Summarize:\n{text}\nEnd", "body"),
            "Summarize:\nbody\nEnd"
        );
    }

    #[test]
    fn missing_placeholder_appends_text() {
        assert_eq!(render_prompt("Summarize this.  ", "body"), "Summarize this.\n\nbody");
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_chars("short text", 100), "short text");
        assert_eq!(truncate_chars("exact", 5), "exact");
    }

    #[test]
    fn truncation_prefers_word_boundary() {
        assert_eq!(truncate_chars("alpha beta gamma", 13), "alpha beta");
    }

    #[test]
    fn truncation_respects_multibyte_chars() {
        let text = "ééééééééé";
        assert_eq!(truncate_chars(text, 4), "éééé");
    }
}
