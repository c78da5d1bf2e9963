//! Small text helpers shared by the webhook flow and the processor

use regex::Regex;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"https?://[^\s<>"']+"#).unwrap()
});

/// Current time in Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Find http(s) URLs in a message, in order, without duplicates
///
/// Trailing punctuation that usually belongs to the sentence is trimmed.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for m in URL_PATTERN.find_iter(text) {
        let candidate = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
        if url::Url::parse(candidate).is_ok() && !urls.iter().any(|u| u == candidate) {
            urls.push(candidate.to_string());
        }
    }
    urls
}

/// SHA-256 of the normalized source, used for duplicate detection
///
/// URLs are compared without fragment and trailing slash; text is compared with
/// collapsed whitespace.
pub fn source_hash(source: &str) -> String {
    use sha2::{Digest, Sha256};

    let trimmed = source.trim();
    let normalized = match url::Url::parse(trimmed) {
        Ok(mut parsed) if matches!(parsed.scheme(), "http" | "https") => {
            parsed.set_fragment(None);
            parsed.as_str().trim_end_matches('/').to_lowercase()
        }
        _ => trimmed.split_whitespace().collect::<Vec<_>>().join(" "),
    };

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Truncate to at most `max` characters, appending an ellipsis when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut = cut.trim_end().to_string();
    cut.push('…');
    cut
}

/// Number of whitespace-separated words
pub fn count_words(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
