//! Text normalization for evidence snippets and slide copy.
//!
//! Handles snippet canonicalization for hashing, banned-phrase scrubbing,
//! whitespace tidying after edits, and tokenization for visual matching.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse runs of spaces and tabs into one.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Regex to match whitespace left in front of punctuation after a removal.
static SPACE_BEFORE_PUNCT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+([.,;:!?])").unwrap());

/// Regex to match three or more consecutive newlines.
static BLANK_LINES_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Regex splitting text into alphanumeric tokens.
static TOKEN_SPLIT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap());

/// Marker appended to snippets cut at the length limit.
pub const TRUNCATION_MARKER: &str = "…[truncated]";

/// Canonical form of a snippet used for hashing.
///
/// Unicode NFC, CRLF/CR to LF, trailing whitespace trimmed per line,
/// outer whitespace trimmed.
pub fn normalize_snippet(text: &str) -> String {
    let nfc: String = text.nfc().collect();
    nfc.replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Cut a snippet to `limit` characters, appending [`TRUNCATION_MARKER`] if cut.
pub fn truncate_snippet(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit).collect();
    format!("{}{}", head.trim_end(), TRUNCATION_MARKER)
}

/// Cut text to at most `max` characters, ending in `…` when shortened.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(1);
    let head: String = text.chars().take(keep).collect();
    format!("{}…", head.trim_end())
}

/// Tidy text after phrases were removed from it.
///
/// - Collapses space runs within each line
/// - Drops spaces in front of punctuation
/// - Collapses three or more newlines to two
/// - Trims every line and the whole text
pub fn tidy_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n");
    let lines: Vec<String> = unified
        .split('\n')
        .map(|line| {
            let collapsed = WHITESPACE_COLLAPSE_REGEX.replace_all(line, " ");
            let attached = SPACE_BEFORE_PUNCT_REGEX.replace_all(&collapsed, "$1");
            attached.trim().to_string()
        })
        .collect();
    let joined = lines.join("\n");
    BLANK_LINES_REGEX
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Lowercase alphanumeric tokens of at least `min_len` characters.
pub fn tokenize(text: &str, min_len: usize) -> BTreeSet<String> {
    TOKEN_SPLIT_REGEX
        .split(&text.to_lowercase())
        .filter(|t| t.len() >= min_len)
        .map(str::to_string)
        .collect()
}

/// Case-insensitive matcher and remover for a fixed set of phrases.
#[derive(Debug, Clone, Default)]
pub struct PhraseScrubber {
    patterns: Vec<(String, Regex)>,
}

impl PhraseScrubber {
    /// Compile one matcher per non-empty phrase.
    ///
    /// Phrases that begin or end with a word character only match on word
    /// boundaries, so `ai` does not match inside `maintain`.
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> Self {
        let mut patterns = Vec::new();
        for phrase in phrases {
            let phrase = phrase.as_ref().trim();
            if phrase.is_empty() || patterns.iter().any(|(p, _)| p == phrase) {
                continue;
            }
            let lead = if starts_with_word_char(phrase) { r"\b" } else { "" };
            let tail = if ends_with_word_char(phrase) { r"\b" } else { "" };
            let pattern = format!("(?i){}{}{}", lead, regex::escape(phrase), tail);
            match Regex::new(&pattern) {
                Ok(re) => patterns.push((phrase.to_string(), re)),
                Err(e) => log::warn!("Skipping banned phrase {:?}: {}", phrase, e),
            }
        }
        Self { patterns }
    }

    /// Phrases present in `text`, in configured order.
    pub fn find<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(p, _)| p.as_str())
            .collect()
    }

    /// Remove every configured phrase from `text` and tidy the result.
    ///
    /// Text containing none of the phrases is returned unchanged.
    pub fn scrub(&self, text: &str) -> String {
        if self.find(text).is_empty() {
            return text.to_string();
        }
        let mut out = text.to_string();
        for (_, re) in &self.patterns {
            out = re.replace_all(&out, "").into_owned();
        }
        tidy_text(&out)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn starts_with_word_char(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_')
}

fn ends_with_word_char(s: &str) -> bool {
    s.chars().last().is_some_and(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_snippet_line_endings() {
        assert_eq!(normalize_snippet("a  \r\nb\t\r\n\r\n"), "a\nb");
        assert_eq!(normalize_snippet("  x\ry  "), "x\ny");
    }

    #[test]
    fn test_normalize_snippet_nfc() {
        // "e" + combining acute vs precomposed "é"
        assert_eq!(normalize_snippet("cafe\u{301}"), normalize_snippet("caf\u{e9}"));
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("short", 320), "short");
        let long = "x".repeat(400);
        let cut = truncate_snippet(&long, 320);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert_eq!(cut.chars().count(), 320 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 6), "hello…");
    }

    #[test]
    fn test_tidy_text() {
        assert_eq!(tidy_text("This is a   tool ."), "This is a tool.");
        assert_eq!(tidy_text("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(tidy_text("  lead , trail  "), "lead, trail");
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("Demo-Screenshot of the UI v2", 3);
        assert!(tokens.contains("demo"));
        assert!(tokens.contains("screenshot"));
        assert!(!tokens.contains("ui"));
        assert!(!tokens.contains("of"));
    }

    #[test]
    fn test_scrubber_removes_all_phrases() {
        let scrubber = PhraseScrubber::new(&["cutting-edge", "revolutionary"]);
        assert_eq!(
            scrubber.scrub("This is a cutting-edge revolutionary tool."),
            "This is a tool."
        );
        assert_eq!(scrubber.find("A Revolutionary idea"), vec!["revolutionary"]);
    }

    #[test]
    fn test_scrubber_respects_word_boundaries() {
        let scrubber = PhraseScrubber::new(&["ai"]);
        assert!(scrubber.find("We maintain it").is_empty());
        assert_eq!(scrubber.scrub("We maintain it"), "We maintain it");
        assert_eq!(scrubber.scrub("Powered by AI."), "Powered by.");
    }

    #[test]
    fn test_scrub_is_idempotent() {
        let scrubber = PhraseScrubber::new(&["seamless"]);
        let once = scrubber.scrub("A seamless ,  fast flow");
        assert_eq!(scrubber.scrub(&once), once);
    }
}
