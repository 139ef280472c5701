//! Markdown-to-speech text cleanup applied before synthesis.
//!
//! The insight text produced by the analysis step is markdown. Speech engines
//! read markup characters literally, so everything structural is rewritten
//! into spoken phrasing: headers and emphasis collapse to their inner text,
//! bullets become "Point:", numbered items become "Number N.", paragraph
//! breaks end sentences and single line breaks become commas.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:```|~~~)[^\n]*$").unwrap());
static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static RE_MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").unwrap());
static RE_REFERENCE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\[[^\]]*\]").unwrap());
static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+([^`]+)`+").unwrap());
static RE_HORIZONTAL_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:[-*_][ \t]*){3,}$").unwrap());
static RE_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]*").unwrap());
static RE_HEADER_TRAILER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)[ \t]+#+[ \t]*$").unwrap());
static RE_BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*>[ \t]?").unwrap());
static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*+•][ \t]+").unwrap());
static RE_NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(\d+)[.)][ \t]+").unwrap());
static RE_BOLD_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static RE_BOLD_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.+?)__").unwrap());
static RE_ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").unwrap());
static RE_ITALIC_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b_([^_\n]+)_\b").unwrap());
static RE_STRIKETHROUGH: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~(.+?)~~").unwrap());
static RE_LEFTOVER_MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#*`]+").unwrap());
static RE_PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?:;,])?[ \t]*\n(?:[ \t]*\n)+[ \t]*").unwrap());
static RE_LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?:;,])?[ \t]*\n[ \t]*").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.;:!?])").unwrap());
static RE_DOUBLED_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;]\s*([.!?])").unwrap());

/// Rewrite markdown-flavoured text into plain spoken prose.
///
/// Pure and safe to call repeatedly; already-clean text passes through
/// unchanged.
pub fn clean_for_speech(input: &str) -> String {
    let mut text = input.replace("\r\n", "\n").replace('\r', "\n");

    text = RE_CODE_FENCE.replace_all(&text, "").into_owned();
    text = RE_IMAGE.replace_all(&text, "$1").into_owned();
    text = RE_MARKDOWN_LINK.replace_all(&text, "$1").into_owned();
    text = RE_REFERENCE_LINK.replace_all(&text, "$1").into_owned();
    text = RE_INLINE_CODE.replace_all(&text, "$1").into_owned();
    text = RE_HORIZONTAL_RULE.replace_all(&text, "").into_owned();
    text = RE_HEADER.replace_all(&text, "").into_owned();
    text = RE_HEADER_TRAILER.replace_all(&text, "").into_owned();
    text = RE_BLOCKQUOTE.replace_all(&text, "").into_owned();
    text = RE_BULLET.replace_all(&text, "Point: ").into_owned();
    text = RE_NUMBERED.replace_all(&text, "Number $1. ").into_owned();
    text = RE_BOLD_STAR.replace_all(&text, "$1").into_owned();
    text = RE_BOLD_UNDERSCORE.replace_all(&text, "$1").into_owned();
    text = RE_ITALIC_STAR.replace_all(&text, "$1").into_owned();
    text = RE_ITALIC_UNDERSCORE.replace_all(&text, "$1").into_owned();
    text = RE_STRIKETHROUGH.replace_all(&text, "$1").into_owned();
    text = RE_LEFTOVER_MARKUP.replace_all(&text, "").into_owned();

    let text = text.trim();
    let text = RE_PARAGRAPH_BREAK.replace_all(text, |caps: &Captures| match caps.get(1) {
        Some(punct) if punct.as_str() != "," => format!("{} ", punct.as_str()),
        _ => ". ".to_string(),
    });
    let text = RE_LINE_BREAK.replace_all(&text, |caps: &Captures| match caps.get(1) {
        Some(punct) => format!("{} ", punct.as_str()),
        None => ", ".to_string(),
    });

    let text = RE_WHITESPACE.replace_all(&text, " ");
    let text = RE_SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = RE_DOUBLED_PUNCT.replace_all(&text, "$1");
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';'))
        .trim_start_matches(['.', ':'])
        .trim()
        .to_string()
}
