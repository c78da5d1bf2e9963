//! Normalization of generated or extracted text into the publishing format
//!
//! Published content is plain paragraphs separated by blank lines. Markdown
//! syntax and promotional boilerplate are removed before images are placed.

use crate::utils::{count_words, truncate_chars};
use regex::Regex;
use std::sync::LazyLock;

/// Categories an article may be filed under
pub const CATEGORIES: [&str; 7] = [
    "ai", "tech", "gadgets", "software", "hardware", "internet", "security",
];

/// Maximum excerpt length in characters
pub const EXCERPT_MAX_CHARS: usize = 160;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

#[allow(clippy::unwrap_used)]
fn rule(pattern: &str, replacement: &'static str) -> Rule {
    Rule {
        pattern: Regex::new(pattern).unwrap(),
        replacement,
    }
}

static MARKDOWN_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(r"(?s)```.*?```", ""),
        rule(r"(?s)<!--.*?-->", ""),
        rule(r"(?m)^#{1,6}\s+", ""),
        rule(r"!\[[^\]]*\]\([^)]*\)", ""),
        rule(r"\[([^\]]+)\]\([^)]*\)", "$1"),
        rule(r"\*\*(.+?)\*\*", "$1"),
        rule(r"__(.+?)__", "$1"),
        rule(r"(?m)^[-*+]\s+", ""),
        rule(r"\*([^*\n]+)\*", "$1"),
        rule(r"`([^`\n]+)`", "$1"),
        rule(r"(?m)^\d+\.\s+", ""),
        rule(r"(?m)^>\s?", ""),
        rule(r"(?m)^\|.*\|\s*$", ""),
        rule(r"(?m)^-{3,}\s*$", ""),
    ]
});

static PROMO_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    [
        r"(?i)stay with us[^.!\n]*[.!]",
        r"(?i)follow us[^.!\n]*[.!]",
        r"(?i)subscribe[^.!\n]*channel[^.!\n]*[.!]",
        r"(?i)join[^.!\n]*newsletter[^.!\n]*[.!]",
        r"(?i)google news[^.!\n]*[.!]",
        r"(?i)share this[^.!\n]*[.!]",
        r"(?i)like and subscribe[^.!\n]*[.!]",
        r"(?i)будьте с нами[^.!\n]*[.!]",
        r"(?i)подпишитесь[^.!\n]*[.!]",
        r"(?im)^(source|via|источник|źródło):.*$",
        r"(?im)^written by .*$",
    ]
    .into_iter()
    .map(|p| rule(p, ""))
    .collect()
});

static SPACES: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"[ \t]+").unwrap()
});

/// Article text in publishing format
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedText {
    /// Title without markup
    pub title: String,
    /// Paragraphs separated by blank lines
    pub content: String,
    /// Short summary
    pub excerpt: String,
    /// Word count of `content`
    pub word_count: u32,
}

/// Clean a title, body, and optional excerpt into publishing format
pub fn normalize(title: &str, content: &str, excerpt: Option<&str>) -> NormalizedText {
    let title = collapse_line(&strip_markdown(title));
    let content = normalize_whitespace(&remove_promotional(&strip_markdown(content)));
    let excerpt = excerpt
        .map(|e| collapse_line(&strip_markdown(e)))
        .filter(|e| !e.is_empty())
        .map(|e| truncate_chars(&e, EXCERPT_MAX_CHARS))
        .unwrap_or_else(|| make_excerpt(&content));
    let word_count = count_words(&content);

    NormalizedText {
        title,
        content,
        excerpt,
        word_count,
    }
}

/// Remove markdown syntax, keeping link and emphasis text
pub fn strip_markdown(text: &str) -> String {
    MARKDOWN_RULES
        .iter()
        .fold(text.replace("\r\n", "\n"), |acc, r| {
            r.pattern.replace_all(&acc, r.replacement).into_owned()
        })
}

/// Remove newsletter calls-to-action, source lines, and similar boilerplate
pub fn remove_promotional(text: &str) -> String {
    PROMO_RULES.iter().fold(text.to_string(), |acc, r| {
        r.pattern.replace_all(&acc, r.replacement).into_owned()
    })
}

/// Collapse runs of spaces and keep at most one blank line between paragraphs
pub fn normalize_whitespace(text: &str) -> String {
    paragraphs(text).join("\n\n")
}

/// Split content into non-empty paragraphs
///
/// Blank lines separate paragraphs; single line breaks inside a paragraph are kept.
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in text.lines() {
        let line = SPACES.replace_all(line.trim(), " ").into_owned();
        if line.is_empty() {
            if !current.is_empty() {
                result.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        result.push(current.join("\n"));
    }
    result
}

/// First sentence-ish slice of the content, at most [`EXCERPT_MAX_CHARS`]
pub fn make_excerpt(content: &str) -> String {
    let first = paragraphs(content).into_iter().next().unwrap_or_default();
    truncate_chars(&collapse_line(&first), EXCERPT_MAX_CHARS)
}

/// Map user or model input onto a known category
pub fn normalize_category(input: &str) -> Option<&'static str> {
    let lower = input.trim().to_lowercase();
    CATEGORIES.iter().copied().find(|c| *c == lower)
}

/// Guess a category from keywords; `None` when nothing matches
pub fn guess_category(text: &str) -> Option<&'static str> {
    const KEYWORDS: [(&str, &[&str]); 6] = [
        (
            "ai",
            &[
                "artificial intelligence",
                " ai ",
                "machine learning",
                "neural",
                "llm",
                "chatgpt",
                "openai",
                "нейросет",
                "искусственн",
                "sztuczn",
            ],
        ),
        (
            "security",
            &[
                "security",
                "vulnerability",
                "malware",
                "ransomware",
                "breach",
                "exploit",
                "безопасн",
                "bezpiecze",
            ],
        ),
        (
            "gadgets",
            &["smartphone", "iphone", "gadget", "smartwatch", "headphones", "смартфон"],
        ),
        (
            "hardware",
            &["processor", "cpu", "gpu", "chip", "semiconductor", "процессор"],
        ),
        (
            "software",
            &["software", "update", "release", "app ", "operating system", "windows", "linux"],
        ),
        (
            "internet",
            &["internet", "browser", "social network", "website", "интернет"],
        ),
    ];

    let haystack = format!(" {} ", text.to_lowercase());
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| haystack.contains(w)))
        .map(|(category, _)| *category)
}

fn collapse_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
